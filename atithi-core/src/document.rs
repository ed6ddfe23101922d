use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A file as received from the guest, before any store interaction
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Options forwarded to the document store on upload
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub folder: String,
    pub resource_type_hint: String,
}

/// What the document store returns for a durably stored file
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub url: String,
    pub public_id: String,
    pub size_bytes: u64,
    pub format: Option<String>,
}

/// A session-scoped document stashed locally when the document store is
/// unreachable. Its backing bytes must be released when the reference is
/// dropped from a guest's list or the form is reset.
#[derive(Debug, Clone)]
pub struct ScratchDoc {
    pub key: Uuid,
    pub name: String,
    pub size_bytes: u64,
}

/// One entry in a guest's document list. Remote references point at the
/// document store; scratch references only resolve within the session.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRef {
    pub url: String,
    pub name: String,
    pub size_bytes: u64,
    pub remote: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_key: Option<Uuid>,
    /// Client-side dispatch order; appends are sorted by it so a guest's list
    /// reflects submission order even when completions interleave.
    pub seq: u64,
}

impl DocumentRef {
    pub fn from_stored(doc: StoredDocument, name: String, seq: u64) -> Self {
        Self {
            url: doc.url,
            name,
            size_bytes: doc.size_bytes,
            remote: true,
            scratch_key: None,
            seq,
        }
    }

    pub fn from_scratch(doc: ScratchDoc, seq: u64) -> Self {
        Self {
            url: format!("local://scratch/{}", doc.key),
            name: doc.name,
            size_bytes: doc.size_bytes,
            remote: false,
            scratch_key: Some(doc.key),
            seq,
        }
    }
}

/// Upload acceptance policy. Both values are operational tuning knobs read
/// from configuration, never baked-in constants.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadPolicy {
    pub allowed_types: Vec<String>,
    pub max_size_bytes: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("unsupported media type {found}: expected one of {allowed}")]
    UnsupportedType { found: String, allowed: String },

    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
}

impl UploadPolicy {
    /// Checked before any network attempt; a violation must not touch state.
    pub fn evaluate(&self, file: &UploadFile) -> Result<(), PolicyViolation> {
        if !self.allowed_types.iter().any(|t| t == &file.content_type) {
            return Err(PolicyViolation::UnsupportedType {
                found: file.content_type.clone(),
                allowed: self.allowed_types.join(", "),
            });
        }
        if file.size_bytes() > self.max_size_bytes {
            return Err(PolicyViolation::TooLarge {
                size: file.size_bytes(),
                limit: self.max_size_bytes,
            });
        }
        Ok(())
    }
}
