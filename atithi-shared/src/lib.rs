pub mod ids;
pub mod pii;

pub use ids::RecordId;
pub use pii::Masked;
