use atithi_core::document::{UploadFile, UploadOptions, UploadPolicy};
use atithi_core::model::CreatedRecord;
use atithi_core::repository::{DocumentStore, GuestStore, ScratchStore};
use atithi_core::schema::{FieldError, NUMBER_OF_GUESTS};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::form::{GuestPatch, GuestSetError, GuestSlot, PrimaryPatch, RegistrationForm};
use crate::submit::{SubmissionError, SubmissionProtocol};
use crate::uploader::{FileOutcome, UploadCoordinator};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("registration session not found: {0}")]
    NotFound(Uuid),

    /// The form was reset while an upload was in flight; the stale results
    /// were discarded and their scratch resources freed.
    #[error("registration form was reset while the upload was in flight")]
    Stale,

    #[error("{}", .0.message)]
    Invalid(FieldError),

    #[error(transparent)]
    GuestSet(#[from] GuestSetError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Owns every in-progress registration form, addressed by session id. Each
/// form is locked on its own, so a submission awaiting the record store never
/// blocks other guests; the registry map lock is only held for lookups.
pub struct SessionRegistry {
    uploader: UploadCoordinator,
    protocol: SubmissionProtocol,
    scratch: Arc<dyn ScratchStore>,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<RegistrationForm>>>>,
}

impl SessionRegistry {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        guests: Arc<dyn GuestStore>,
        scratch: Arc<dyn ScratchStore>,
        policy: UploadPolicy,
        options: UploadOptions,
    ) -> Self {
        Self {
            uploader: UploadCoordinator::new(documents, scratch.clone(), policy, options),
            protocol: SubmissionProtocol::new(guests, scratch.clone()),
            scratch,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn open(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(RegistrationForm::new())));
        debug!(session = %id, "registration session opened");
        id
    }

    async fn form(&self, id: Uuid) -> Result<Arc<Mutex<RegistrationForm>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    /// Serialized view of the form for re-rendering.
    pub async fn snapshot(&self, id: Uuid) -> Result<serde_json::Value, SessionError> {
        let form = self.form(id).await?;
        let form = form.lock().await;
        serde_json::to_value(&*form).map_err(|_| SessionError::NotFound(id))
    }

    pub async fn patch_primary(&self, id: Uuid, patch: PrimaryPatch) -> Result<(), SessionError> {
        let form = self.form(id).await?;
        form.lock().await.apply(patch);
        Ok(())
    }

    pub async fn patch_guest(
        &self,
        id: Uuid,
        index: usize,
        patch: GuestPatch,
    ) -> Result<(), SessionError> {
        let form = self.form(id).await?;
        form.lock().await.apply_guest(index, patch)?;
        Ok(())
    }

    /// Field-level range check first, then the list re-derivation; the resize
    /// itself never clamps.
    pub async fn set_guest_count(&self, id: Uuid, count: i64) -> Result<(), SessionError> {
        if let Some(error) = NUMBER_OF_GUESTS.check_int(Some(count), "") {
            return Err(SessionError::Invalid(error));
        }
        let form = self.form(id).await?;
        form.lock().await.resize(count, self.scratch.as_ref());
        Ok(())
    }

    /// Uploads a batch for one guest slot. Sequence numbers are reserved
    /// before the network round-trip; completions are applied afterwards only
    /// if the same form lifecycle instance is still registered.
    pub async fn upload_documents(
        &self,
        id: Uuid,
        slot: GuestSlot,
        files: Vec<UploadFile>,
    ) -> Result<Vec<FileOutcome>, SessionError> {
        let (epoch, base_seq) = {
            let form = self.form(id).await?;
            let mut form = form.lock().await;
            form.documents(slot)?;
            (form.epoch(), form.reserve_seqs(files.len()))
        };

        // Store round-trips run unlocked; every other field and session stays
        // editable while the files travel.
        let outcomes = self.uploader.submit_batch(files, base_seq).await;

        let live = self.sessions.read().await.get(&id).cloned();
        match live {
            Some(form) => {
                let mut form = form.lock().await;
                if form.epoch() != epoch {
                    self.discard_outcomes(&outcomes);
                    return Err(SessionError::Stale);
                }
                for outcome in &outcomes {
                    if let Ok(doc) = &outcome.result {
                        if form.attach_document(slot, doc.clone()).is_err() {
                            // slot shrank away mid-flight; the result is
                            // discardable but its scratch copy is not leaked
                            if let Some(key) = doc.scratch_key {
                                self.scratch.release(key);
                            }
                        }
                    }
                }
                Ok(outcomes)
            }
            None => {
                self.discard_outcomes(&outcomes);
                Err(SessionError::NotFound(id))
            }
        }
    }

    fn discard_outcomes(&self, outcomes: &[FileOutcome]) {
        for outcome in outcomes {
            if let Ok(doc) = &outcome.result {
                if let Some(key) = doc.scratch_key {
                    self.scratch.release(key);
                }
            }
        }
    }

    pub async fn remove_document(
        &self,
        id: Uuid,
        slot: GuestSlot,
        index: usize,
    ) -> Result<(), SessionError> {
        let form = self.form(id).await?;
        form.lock()
            .await
            .remove_document(slot, index, self.scratch.as_ref())?;
        Ok(())
    }

    pub async fn submit(&self, id: Uuid, today: NaiveDate) -> Result<CreatedRecord, SessionError> {
        let form = self.form(id).await?;
        let mut form = form.lock().await;
        let created = self.protocol.submit(&mut form, today).await?;
        Ok(created)
    }

    /// Abandons the session, freeing any scratch-backed documents. The reset
    /// also advances the epoch, so an upload that slipped past the map lookup
    /// discards itself instead of attaching to the detached form.
    pub async fn abandon(&self, id: Uuid) -> Result<(), SessionError> {
        let form = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;
        form.lock().await.reset(self.scratch.as_ref());
        debug!(session = %id, "registration session abandoned");
        Ok(())
    }
}
