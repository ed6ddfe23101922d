use async_trait::async_trait;
use atithi_shared::RecordId;
use uuid::Uuid;

use crate::document::{ScratchDoc, StoredDocument, UploadFile, UploadOptions};
use crate::model::{CreatedRecord, GuestRecord, NewGuestRecord, RegistrationStatus};

/// Record-store failure, surfaced to the caller with full client state
/// preserved so a retry reuses already-obtained document references.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("record store unreachable: {0}")]
    Unavailable(String),

    #[error("record store rejected the request: {0}")]
    Rejected(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("malformed record store response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("document store unreachable: {0}")]
    Unavailable(String),

    #[error("document store rejected the file: {0}")]
    Rejected(String),

    #[error("malformed document store response: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ScratchError {
    #[error("scratch store cannot hold the file: {0}")]
    Exhausted(String),
}

/// The hosted document database holding guest registrations. Every call is a
/// network round-trip with no local transaction wrapping.
#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Persist one composite record; the store assigns the identifier and the
    /// registration timestamp.
    async fn create(&self, record: &NewGuestRecord) -> Result<CreatedRecord, StoreError>;

    /// All registrations, newest first
    async fn list(&self) -> Result<Vec<GuestRecord>, StoreError>;

    /// Status is the only field the moderation surface may change
    async fn update_status(&self, id: &RecordId, status: RegistrationStatus) -> Result<(), StoreError>;

    async fn delete(&self, id: &RecordId) -> Result<(), StoreError>;
}

/// The hosted object store returning a durable URL per uploaded file. No
/// delete is exposed here: removal needs a server-held credential.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upload(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
    ) -> Result<StoredDocument, DocumentStoreError>;
}

/// Session-scoped staging area for local-fallback documents. Synchronous on
/// purpose: it never leaves the process.
pub trait ScratchStore: Send + Sync {
    fn stash(&self, name: &str, bytes: &[u8]) -> Result<ScratchDoc, ScratchError>;

    /// Free the stashed bytes. Returns false if the key was already released.
    fn release(&self, key: Uuid) -> bool;
}
