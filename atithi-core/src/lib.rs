pub mod document;
pub mod model;
pub mod repository;
pub mod schema;

pub use document::{
    DocumentRef, PolicyViolation, ScratchDoc, StoredDocument, UploadFile, UploadOptions, UploadPolicy,
};
pub use model::{AdditionalGuest, CreatedRecord, GuestRecord, IdType, NewGuestRecord, RegistrationStatus};
pub use repository::{
    DocumentStore, DocumentStoreError, GuestStore, ScratchError, ScratchStore, StoreError,
};
pub use schema::FieldError;
