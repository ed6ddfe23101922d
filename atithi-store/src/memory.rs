use async_trait::async_trait;
use atithi_core::document::{StoredDocument, UploadFile, UploadOptions};
use atithi_core::model::{CreatedRecord, GuestRecord, NewGuestRecord, RegistrationStatus};
use atithi_core::repository::{DocumentStore, DocumentStoreError, GuestStore, StoreError};
use atithi_shared::RecordId;
use chrono::Utc;
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory record store used by the test suites and local development
/// runs; mirrors the hosted store's contract without the network.
#[derive(Default)]
pub struct MemoryGuestStore {
    records: Mutex<Vec<GuestRecord>>,
}

impl MemoryGuestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GuestStore for MemoryGuestStore {
    async fn create(&self, record: &NewGuestRecord) -> Result<CreatedRecord, StoreError> {
        let created = CreatedRecord {
            id: RecordId::from(Uuid::new_v4().to_string()),
            registration_date: Utc::now(),
        };
        let stored = GuestRecord {
            id: created.id.clone(),
            name: record.name.clone(),
            number_of_guests: record.number_of_guests,
            contact_number: record.contact_number.clone(),
            nationality: record.nationality.clone(),
            id_type: record.id_type,
            id_number: record.id_number.clone(),
            checkin_date: record.checkin_date,
            checkout_date: record.checkout_date,
            identity_document_url: record.identity_document_url.clone(),
            identity_document_name: record.identity_document_name.clone(),
            registration_date: created.registration_date,
            status: record.status,
            additional_guests: record.additional_guests.clone(),
        };
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?
            .push(stored);
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<GuestRecord>, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?
            .clone();
        records.sort_by(|a, b| b.registration_date.cmp(&a.registration_date));
        Ok(records)
    }

    async fn update_status(&self, id: &RecordId, status: RegistrationStatus) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.status = status;
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
        let before = records.len();
        records.retain(|r| &r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// In-memory document store: accepts everything the policy let through and
/// fabricates a durable-looking URL.
#[derive(Default)]
pub struct MemoryDocumentStore;

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upload(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
    ) -> Result<StoredDocument, DocumentStoreError> {
        let public_id = format!("{}/{}", options.folder, Uuid::new_v4());
        Ok(StoredDocument {
            url: format!("https://media.local/{}/{}", public_id, file.name),
            public_id,
            size_bytes: file.size_bytes(),
            format: file.name.rsplit('.').next().map(str::to_owned),
        })
    }
}
