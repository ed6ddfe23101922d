use atithi_core::document::ScratchDoc;
use atithi_core::repository::{ScratchError, ScratchStore};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

struct ScratchEntry {
    bytes: Vec<u8>,
}

/// In-process staging area for local-fallback documents. Entries live only as
/// long as the registration session that stashed them; release frees the
/// bytes immediately.
#[derive(Default)]
pub struct MemoryScratchStore {
    entries: Mutex<HashMap<Uuid, ScratchEntry>>,
}

impl MemoryScratchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes for a stashed entry, if it is still held.
    pub fn read(&self, key: Uuid) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&key).map(|entry| entry.bytes.clone()))
    }
}

impl ScratchStore for MemoryScratchStore {
    fn stash(&self, name: &str, bytes: &[u8]) -> Result<ScratchDoc, ScratchError> {
        let key = Uuid::new_v4();
        let doc = ScratchDoc {
            key,
            name: name.to_owned(),
            size_bytes: bytes.len() as u64,
        };
        self.entries
            .lock()
            .map_err(|_| ScratchError::Exhausted("scratch store lock poisoned".into()))?
            .insert(key, ScratchEntry { bytes: bytes.to_vec() });
        Ok(doc)
    }

    fn release(&self, key: Uuid) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => entries.remove(&key).is_some(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stash_and_release_lifecycle() {
        let store = MemoryScratchStore::new();
        let doc = store.stash("id.jpg", b"front-side").unwrap();
        assert_eq!(doc.name, "id.jpg");
        assert_eq!(doc.size_bytes, 10);
        assert_eq!(store.read(doc.key).unwrap(), b"front-side");

        assert!(store.release(doc.key));
        assert!(store.is_empty());
        // releasing twice reports that nothing was held
        assert!(!store.release(doc.key));
    }
}
