use atithi_core::model::{AdditionalGuest, CreatedRecord, NewGuestRecord, RegistrationStatus};
use atithi_core::repository::{GuestStore, ScratchStore, StoreError};
use atithi_core::schema::{
    self, check_after, check_not_past, FieldError, PersonView, CHECKIN_DATE, CHECKOUT_DATE,
    CONTACT_NUMBER, NUMBER_OF_GUESTS,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use crate::form::{GuestDraft, RegistrationForm, SubmissionPhase};

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// One entry per failing field; nothing reached the network.
    #[error("registration has {} invalid field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// The record store refused or was unreachable. All entered data and
    /// uploaded document references survive for a retry.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives a form through Validating and Submitting to a terminal state, with
/// exactly one record-store create call on the happy path.
pub struct SubmissionProtocol {
    guests: Arc<dyn GuestStore>,
    scratch: Arc<dyn ScratchStore>,
}

impl SubmissionProtocol {
    pub fn new(guests: Arc<dyn GuestStore>, scratch: Arc<dyn ScratchStore>) -> Self {
        Self { guests, scratch }
    }

    pub async fn submit(
        &self,
        form: &mut RegistrationForm,
        today: NaiveDate,
    ) -> Result<CreatedRecord, SubmissionError> {
        form.phase = SubmissionPhase::Validating;
        let record = match validate(form, today) {
            Ok(record) => record,
            Err(errors) => {
                form.phase = SubmissionPhase::Failed;
                return Err(SubmissionError::Validation(errors));
            }
        };

        form.phase = SubmissionPhase::Submitting;
        match self.guests.create(&record).await {
            Ok(created) => {
                form.phase = SubmissionPhase::Succeeded;
                info!(record_id = %created.id, guests = record.number_of_guests, "registration stored");
                // Cleanup: free scratch-backed documents, then hand back a
                // pristine form for the next registration.
                form.reset(self.scratch.as_ref());
                Ok(created)
            }
            Err(err) => {
                form.phase = SubmissionPhase::Failed;
                Err(err.into())
            }
        }
    }
}

/// Runs every field rule independently so the guest sees all invalid fields
/// at once, then assembles the composite record if nothing failed.
fn validate(form: &RegistrationForm, today: NaiveDate) -> Result<NewGuestRecord, Vec<FieldError>> {
    let mut errors = Vec::new();

    errors.extend(schema::validate_person(
        "",
        &PersonView {
            name: &form.name,
            nationality: &form.nationality,
            id_type: form.id_type,
            id_number: &form.id_number.0,
            document_count: form.documents.len(),
        },
    ));
    errors.extend(CONTACT_NUMBER.check_text(&form.contact_number.0, ""));
    errors.extend(NUMBER_OF_GUESTS.check_int(form.number_of_guests, ""));

    match form.checkin_date {
        None => errors.extend(CHECKIN_DATE.check_present::<NaiveDate>(None, "")),
        Some(checkin) => errors.extend(check_not_past(&CHECKIN_DATE, checkin, today, "")),
    }
    match (form.checkin_date, form.checkout_date) {
        (_, None) => errors.extend(CHECKOUT_DATE.check_present::<NaiveDate>(None, "")),
        (Some(checkin), Some(checkout)) => {
            errors.extend(check_after(&CHECKOUT_DATE, checkout, checkin, ""))
        }
        (None, Some(_)) => {}
    }

    for (i, draft) in form.additional_guests.iter().enumerate() {
        let prefix = format!("additional_guests[{}].", i);
        errors.extend(schema::validate_person(
            &prefix,
            &PersonView {
                name: &draft.name,
                nationality: &draft.nationality,
                id_type: draft.id_type,
                id_number: &draft.id_number.0,
                document_count: draft.documents.len(),
            },
        ));
    }

    let additional: Option<Vec<AdditionalGuest>> =
        form.additional_guests.iter().map(assemble_guest).collect();

    match (
        errors.is_empty(),
        form.id_type,
        form.number_of_guests,
        form.checkin_date,
        form.checkout_date,
        additional,
    ) {
        (true, Some(id_type), Some(count), Some(checkin), Some(checkout), Some(additional)) => {
            let (urls, names) = split_documents(&form.documents);
            Ok(NewGuestRecord {
                name: form.name.trim().to_owned(),
                number_of_guests: count as u32,
                contact_number: form.contact_number.clone(),
                nationality: form.nationality.trim().to_owned(),
                id_type,
                id_number: form.id_number.clone(),
                checkin_date: checkin,
                checkout_date: checkout,
                identity_document_url: urls,
                identity_document_name: names,
                status: RegistrationStatus::Pending,
                additional_guests: additional,
            })
        }
        _ => Err(errors),
    }
}

fn assemble_guest(draft: &GuestDraft) -> Option<AdditionalGuest> {
    let (urls, names) = split_documents(&draft.documents);
    Some(AdditionalGuest {
        name: draft.name.trim().to_owned(),
        nationality: draft.nationality.trim().to_owned(),
        id_type: draft.id_type?,
        id_number: draft.id_number.clone(),
        identity_document_url: urls,
        identity_document_name: names,
    })
}

/// Splits a document list into the parallel url/name sequences the record
/// carries; both follow the list's order, so they stay index-aligned.
fn split_documents(docs: &[atithi_core::document::DocumentRef]) -> (Vec<String>, Vec<String>) {
    let urls = docs.iter().map(|d| d.url.clone()).collect();
    let names = docs.iter().map(|d| d.name.clone()).collect();
    (urls, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{GuestPatch, GuestSlot, PrimaryPatch};
    use atithi_core::document::{DocumentRef, ScratchDoc, StoredDocument};
    use atithi_core::model::{GuestRecord, IdType};
    use atithi_core::repository::ScratchError;
    use atithi_shared::RecordId;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingGuestStore {
        create_calls: AtomicUsize,
        fail_next: AtomicBool,
        last_record: std::sync::Mutex<Option<NewGuestRecord>>,
    }

    #[async_trait]
    impl GuestStore for RecordingGuestStore {
        async fn create(&self, record: &NewGuestRecord) -> Result<CreatedRecord, StoreError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Unavailable("simulated outage".into()));
            }
            *self.last_record.lock().unwrap() = Some(record.clone());
            Ok(CreatedRecord {
                id: RecordId::from("rec-1"),
                registration_date: Utc::now(),
            })
        }

        async fn list(&self) -> Result<Vec<GuestRecord>, StoreError> {
            Ok(Vec::new())
        }

        async fn update_status(
            &self,
            _id: &RecordId,
            _status: RegistrationStatus,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn delete(&self, _id: &RecordId) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingScratch {
        released: AtomicUsize,
    }

    impl ScratchStore for CountingScratch {
        fn stash(&self, name: &str, bytes: &[u8]) -> Result<ScratchDoc, ScratchError> {
            Ok(ScratchDoc {
                key: Uuid::new_v4(),
                name: name.to_owned(),
                size_bytes: bytes.len() as u64,
            })
        }

        fn release(&self, _key: Uuid) -> bool {
            self.released.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn today() -> NaiveDate {
        "2025-06-01".parse().unwrap()
    }

    fn remote_doc(seq: u64) -> DocumentRef {
        DocumentRef::from_stored(
            StoredDocument {
                url: format!("https://media.example/doc-{seq}.jpg"),
                public_id: format!("doc-{seq}"),
                size_bytes: 100,
                format: Some("jpg".into()),
            },
            format!("doc-{seq}.jpg"),
            seq,
        )
    }

    fn scratch_doc(seq: u64) -> DocumentRef {
        DocumentRef::from_scratch(
            ScratchDoc {
                key: Uuid::new_v4(),
                name: format!("doc-{seq}.jpg"),
                size_bytes: 100,
            },
            seq,
        )
    }

    /// The worked example: primary guest plus one additional guest, one
    /// document each, check-in tomorrow, check-out the day after.
    fn filled_form() -> RegistrationForm {
        let scratch = CountingScratch::default();
        let mut form = RegistrationForm::new();
        form.apply(PrimaryPatch {
            name: Some("A. Sharma".into()),
            contact_number: Some("9876543210".into()),
            nationality: Some("Indian".into()),
            id_type: Some(IdType::Aadhar),
            id_number: Some("ABCD1234".into()),
            checkin_date: Some(today() + Duration::days(1)),
            checkout_date: Some(today() + Duration::days(2)),
        });
        form.resize(2, &scratch);
        form.apply_guest(
            0,
            GuestPatch {
                name: Some("B. Sharma".into()),
                nationality: Some("Indian".into()),
                id_type: Some(IdType::Aadhar),
                id_number: Some("WXYZ5678".into()),
            },
        )
        .unwrap();
        form.attach_document(GuestSlot::Primary, remote_doc(0)).unwrap();
        form.attach_document(GuestSlot::Additional(0), remote_doc(1)).unwrap();
        form
    }

    fn protocol(
        guests: Arc<RecordingGuestStore>,
        scratch: Arc<CountingScratch>,
    ) -> SubmissionProtocol {
        SubmissionProtocol::new(guests, scratch)
    }

    #[tokio::test]
    async fn test_missing_documents_fail_before_any_store_call() {
        let guests = Arc::new(RecordingGuestStore::default());
        let scratch = Arc::new(CountingScratch::default());
        let protocol = protocol(guests.clone(), scratch);

        let mut form = filled_form();
        form.remove_document(GuestSlot::Primary, 0, &CountingScratch::default()).unwrap();

        let err = protocol.submit(&mut form, today()).await.unwrap_err();
        match err {
            SubmissionError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.field == "identity_document_url"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(guests.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(form.phase, SubmissionPhase::Failed);
        // entered data survives a failed validation untouched
        assert_eq!(form.name, "A. Sharma");
        assert_eq!(form.additional_guests.len(), 1);
    }

    #[tokio::test]
    async fn test_all_invalid_fields_reported_at_once() {
        let guests = Arc::new(RecordingGuestStore::default());
        let scratch = Arc::new(CountingScratch::default());
        let protocol = protocol(guests.clone(), scratch.clone());

        let mut form = RegistrationForm::new();
        form.resize(2, scratch.as_ref());

        let err = protocol.submit(&mut form, today()).await.unwrap_err();
        let errors = match err {
            SubmissionError::Validation(errors) => errors,
            other => panic!("expected validation failure, got {other:?}"),
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"contact_number"));
        assert!(fields.contains(&"checkin_date"));
        assert!(fields.contains(&"additional_guests[0].id_type"));
        assert!(fields.contains(&"additional_guests[0].identity_document_url"));
    }

    #[tokio::test]
    async fn test_checkout_must_follow_checkin() {
        let guests = Arc::new(RecordingGuestStore::default());
        let scratch = Arc::new(CountingScratch::default());
        let protocol = protocol(guests.clone(), scratch);

        let mut form = filled_form();
        form.apply(PrimaryPatch {
            checkout_date: Some(today() + Duration::days(1)), // equals check-in
            ..Default::default()
        });
        let err = protocol.submit(&mut form, today()).await.unwrap_err();
        match err {
            SubmissionError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "checkout_date");
            }
            other => panic!("expected validation failure, got {other:?}"),
        }

        // one night later is acceptable
        form.apply(PrimaryPatch {
            checkout_date: Some(today() + Duration::days(2)),
            ..Default::default()
        });
        protocol.submit(&mut form, today()).await.unwrap();
    }

    #[tokio::test]
    async fn test_successful_submission_creates_exactly_one_aligned_record() {
        let guests = Arc::new(RecordingGuestStore::default());
        let scratch = Arc::new(CountingScratch::default());
        let protocol = protocol(guests.clone(), scratch);

        let mut form = filled_form();
        let created = protocol.submit(&mut form, today()).await.unwrap();
        assert_eq!(created.id, RecordId::from("rec-1"));
        assert_eq!(guests.create_calls.load(Ordering::SeqCst), 1);

        let record = guests.last_record.lock().unwrap().clone().unwrap();
        assert_eq!(record.status, RegistrationStatus::Pending);
        assert_eq!(record.number_of_guests, 2);
        assert_eq!(record.additional_guests.len(), 1);
        assert_eq!(
            record.identity_document_url.len(),
            record.identity_document_name.len()
        );
        assert_eq!(record.additional_guests[0].identity_document_url.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_preserves_state_for_retry() {
        let guests = Arc::new(RecordingGuestStore::default());
        let scratch = Arc::new(CountingScratch::default());
        let protocol = protocol(guests.clone(), scratch.clone());

        guests.fail_next.store(true, Ordering::SeqCst);
        let mut form = filled_form();
        let err = protocol.submit(&mut form, today()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Store(_)));
        assert_eq!(form.phase, SubmissionPhase::Failed);
        // no data loss, no document release: retry reuses the same references
        assert_eq!(form.name, "A. Sharma");
        assert_eq!(form.documents.len(), 1);
        assert_eq!(scratch.released.load(Ordering::SeqCst), 0);

        // the retry succeeds with the second call
        protocol.submit(&mut form, today()).await.unwrap();
        assert_eq!(guests.create_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_success_resets_form_and_releases_scratch_refs() {
        let guests = Arc::new(RecordingGuestStore::default());
        let scratch = Arc::new(CountingScratch::default());
        let protocol = protocol(guests.clone(), scratch.clone());

        let mut form = filled_form();
        form.attach_document(GuestSlot::Primary, scratch_doc(2)).unwrap();
        form.attach_document(GuestSlot::Additional(0), scratch_doc(3)).unwrap();

        protocol.submit(&mut form, today()).await.unwrap();
        assert!(form.is_pristine());
        assert_eq!(scratch.released.load(Ordering::SeqCst), 2);
    }
}
