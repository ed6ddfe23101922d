pub mod form;
pub mod session;
pub mod submit;
pub mod uploader;

pub use form::{GuestDraft, GuestSetError, GuestSlot, PrimaryPatch, GuestPatch, RegistrationForm, SubmissionPhase};
pub use session::{SessionError, SessionRegistry};
pub use submit::{SubmissionError, SubmissionProtocol};
pub use uploader::{FileOutcome, UploadCoordinator, UploadError};
