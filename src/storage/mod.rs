//! State persistence for search monitoring.
//!
//! The store is split in two:
//! - [`BlobStore`] is the injected key→blob backend (local filesystem here;
//!   a CI cache or any durable key/value medium satisfies the same trait).
//! - [`StateStore`] owns serialization (versioned JSON schema) and keying
//!   (`site_id::search_name` hashed to a filename-safe blob key).
//!
//! Every save is a whole-snapshot replace. A corrupt or foreign-format blob
//! surfaces as a recoverable [`AppError::StateCorrupt`]; the caller decides
//! whether to reseed or abort.

pub mod local;
pub mod memory;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::{SearchState, STATE_SCHEMA_VERSION};
use crate::pipeline::SearchIdentity;

// Re-export for convenience
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

/// Injected key→blob persistence backend.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read a blob, `None` if the key was never written.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Atomically replace the blob under `key`.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Per-search state store over an injected blob backend.
pub struct StateStore<S> {
    backend: S,
}

impl<S: BlobStore> StateStore<S> {
    /// Create a store over the given backend.
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Blob key for an identity: hashed partition key, filename-safe.
    fn blob_key(identity: &SearchIdentity) -> String {
        let digest = Sha256::digest(identity.partition_key().as_bytes());
        format!("{}.json", hex::encode(digest))
    }

    /// Load prior state for an identity.
    ///
    /// `None` signals "never seen" and the caller seeds this run. An
    /// unreadable blob or a schema-version mismatch is reported as
    /// [`AppError::StateCorrupt`], never a panic.
    pub async fn load(&self, identity: &SearchIdentity) -> Result<Option<SearchState>> {
        let key = Self::blob_key(identity);
        let Some(bytes) = self.backend.get(&key).await? else {
            return Ok(None);
        };

        let state: SearchState = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::state_corrupt(format!("{identity}: {e}")))?;

        if state.version != STATE_SCHEMA_VERSION {
            return Err(AppError::state_corrupt(format!(
                "{identity}: schema version {} (expected {})",
                state.version, STATE_SCHEMA_VERSION
            )));
        }

        Ok(Some(state))
    }

    /// Persist state for an identity as one whole-snapshot write.
    pub async fn save(&self, identity: &SearchIdentity, state: &SearchState) -> Result<()> {
        let mut stamped = state.clone();
        stamped.updated_at = Some(Utc::now());

        let bytes = serde_json::to_vec_pretty(&stamped)?;
        self.backend.put(&Self::blob_key(identity), &bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> SearchIdentity {
        SearchIdentity::resolve("uma_global", "stamina-long", "https://example.com/#/search")
    }

    #[tokio::test]
    async fn test_load_absent_is_none() {
        let store = StateStore::new(MemoryBlobStore::new());
        let loaded = store.load(&identity()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let store = StateStore::new(MemoryBlobStore::new());
        let identity = identity();

        let mut state = SearchState::new(&identity);
        state.seeded = true;
        state.entries.insert(133102601857, "abc123".to_string());

        store.save(&identity, &state).await.unwrap();
        let loaded = store.load(&identity).await.unwrap().unwrap();

        assert!(loaded.seeded);
        assert_eq!(loaded.entries[&133102601857], "abc123");
        assert!(loaded.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_recoverable_error() {
        let backend = MemoryBlobStore::new();
        let identity = identity();
        let key = StateStore::<MemoryBlobStore>::blob_key(&identity);
        backend.put(&key, b"{ not json").await.unwrap();

        let store = StateStore::new(backend);
        let result = store.load(&identity).await;
        assert!(matches!(result, Err(AppError::StateCorrupt(_))));
    }

    #[tokio::test]
    async fn test_foreign_schema_version_is_corrupt() {
        let backend = MemoryBlobStore::new();
        let identity = identity();
        let key = StateStore::<MemoryBlobStore>::blob_key(&identity);

        let mut state = SearchState::new(&identity);
        state.version = 99;
        let bytes = serde_json::to_vec(&state).unwrap();
        backend.put(&key, &bytes).await.unwrap();

        let store = StateStore::new(backend);
        let result = store.load(&identity).await;
        assert!(matches!(result, Err(AppError::StateCorrupt(_))));
    }

    #[tokio::test]
    async fn test_keying_isolates_identities() {
        let store = StateStore::new(MemoryBlobStore::new());
        let a = identity();
        let b = SearchIdentity::resolve("uma_global", "speed-mile", "https://example.com/#/search");

        let mut state_a = SearchState::new(&a);
        state_a.entries.insert(7, "fp-a".to_string());
        store.save(&a, &state_a).await.unwrap();

        assert!(store.load(&b).await.unwrap().is_none());
        let loaded_a = store.load(&a).await.unwrap().unwrap();
        assert_eq!(loaded_a.entries[&7], "fp-a");
    }
}
