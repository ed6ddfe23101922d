use atithi_core::document::{DocumentRef, PolicyViolation, UploadFile, UploadOptions, UploadPolicy};
use atithi_core::repository::{DocumentStore, ScratchStore};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::warn;

/// Per-file upload failure. A document-store outage is not represented here:
/// it is downgraded to a scratch-backed reference so the guest is never
/// blocked by a transient outage.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Failed the configured policy before any network attempt
    #[error(transparent)]
    Rejected(#[from] PolicyViolation),

    /// Store upload failed and the local fallback could not be materialized
    #[error("document could not be stored remotely or locally: {0}")]
    Unrecoverable(String),
}

/// Outcome of one file in a batch, keyed by the submitted filename
#[derive(Debug)]
pub struct FileOutcome {
    pub name: String,
    pub result: Result<DocumentRef, UploadError>,
}

/// Dispatches identity documents to the document store, falling back to the
/// session-scoped scratch store when the remote store fails.
pub struct UploadCoordinator {
    documents: Arc<dyn DocumentStore>,
    scratch: Arc<dyn ScratchStore>,
    policy: UploadPolicy,
    options: UploadOptions,
}

impl UploadCoordinator {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        scratch: Arc<dyn ScratchStore>,
        policy: UploadPolicy,
        options: UploadOptions,
    ) -> Self {
        Self {
            documents,
            scratch,
            policy,
            options,
        }
    }

    /// `seq` is the caller-assigned dispatch number; appends into a guest's
    /// list are ordered by it, not by completion order.
    pub async fn submit_file(&self, file: &UploadFile, seq: u64) -> Result<DocumentRef, UploadError> {
        self.policy.evaluate(file)?;

        match self.documents.upload(file, &self.options).await {
            Ok(stored) => Ok(DocumentRef::from_stored(stored, file.name.clone(), seq)),
            Err(err) => {
                warn!(file = %file.name, %err, "document store upload failed, stashing a session-local copy");
                let doc = self
                    .scratch
                    .stash(&file.name, &file.bytes)
                    .map_err(|e| UploadError::Unrecoverable(e.to_string()))?;
                Ok(DocumentRef::from_scratch(doc, seq))
            }
        }
    }

    /// Processes each file independently: one rejection neither blocks nor
    /// rolls back its siblings.
    pub async fn submit_batch(&self, files: Vec<UploadFile>, base_seq: u64) -> Vec<FileOutcome> {
        let uploads = files.into_iter().enumerate().map(|(i, file)| async move {
            let name = file.name.clone();
            let result = self.submit_file(&file, base_seq + i as u64).await;
            FileOutcome { name, result }
        });
        join_all(uploads).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atithi_core::document::{ScratchDoc, StoredDocument};
    use atithi_core::repository::{DocumentStoreError, ScratchError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Fails any upload whose filename contains "flaky"; counts attempts.
    #[derive(Default)]
    struct ScriptedDocumentStore {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for ScriptedDocumentStore {
        async fn upload(
            &self,
            file: &UploadFile,
            options: &UploadOptions,
        ) -> Result<StoredDocument, DocumentStoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if file.name.contains("flaky") {
                return Err(DocumentStoreError::Unavailable("simulated outage".into()));
            }
            Ok(StoredDocument {
                url: format!("https://media.example/{}/{}", options.folder, file.name),
                public_id: file.name.clone(),
                size_bytes: file.size_bytes(),
                format: Some("jpg".into()),
            })
        }
    }

    #[derive(Default)]
    struct CountingScratch {
        stashed: AtomicUsize,
        released: AtomicUsize,
    }

    impl ScratchStore for CountingScratch {
        fn stash(&self, name: &str, bytes: &[u8]) -> Result<ScratchDoc, ScratchError> {
            self.stashed.fetch_add(1, Ordering::SeqCst);
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

    fn coordinator(
        store: Arc<ScriptedDocumentStore>,
        scratch: Arc<CountingScratch>,
    ) -> UploadCoordinator {
        UploadCoordinator::new(
            store,
            scratch,
            UploadPolicy {
                allowed_types: vec!["image/jpeg".into(), "application/pdf".into()],
                max_size_bytes: 5 * 1024 * 1024,
            },
            UploadOptions {
                folder: "registration-docs".into(),
                resource_type_hint: "auto".into(),
            },
        )
    }

    fn jpeg(name: &str) -> UploadFile {
        UploadFile {
            name: name.into(),
            content_type: "image/jpeg".into(),
            bytes: vec![0u8; 2048],
        }
    }

    #[tokio::test]
    async fn test_policy_rejection_never_reaches_the_store() {
        let store = Arc::new(ScriptedDocumentStore::default());
        let scratch = Arc::new(CountingScratch::default());
        let coordinator = coordinator(store.clone(), scratch.clone());

        let file = UploadFile {
            name: "notes.txt".into(),
            content_type: "text/plain".into(),
            bytes: vec![0u8; 10],
        };
        let err = coordinator.submit_file(&file, 0).await.unwrap_err();
        assert!(matches!(err, UploadError::Rejected(_)));
        assert_eq!(store.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(scratch.stashed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_outage_downgrades_to_scratch_reference() {
        let store = Arc::new(ScriptedDocumentStore::default());
        let scratch = Arc::new(CountingScratch::default());
        let coordinator = coordinator(store.clone(), scratch.clone());

        let doc = coordinator.submit_file(&jpeg("flaky-id.jpg"), 3).await.unwrap();
        assert!(!doc.remote);
        assert!(doc.scratch_key.is_some());
        assert!(doc.url.starts_with("local://scratch/"));
        assert_eq!(doc.seq, 3);
        assert_eq!(scratch.stashed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batch_failure_is_isolated_per_file() {
        let store = Arc::new(ScriptedDocumentStore::default());
        let scratch = Arc::new(CountingScratch::default());
        let coordinator = coordinator(store.clone(), scratch.clone());

        let outcomes = coordinator
            .submit_batch(
                vec![jpeg("front.jpg"), jpeg("flaky-back.jpg"), jpeg("visa.jpg")],
                0,
            )
            .await;

        assert_eq!(outcomes.len(), 3);
        let docs: Vec<&DocumentRef> = outcomes.iter().filter_map(|o| o.result.as_ref().ok()).collect();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs.iter().filter(|d| d.remote).count(), 2);
        assert_eq!(docs.iter().filter(|d| !d.remote).count(), 1);
        // sequence numbers follow dispatch order
        assert_eq!(docs.iter().map(|d| d.seq).collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}
