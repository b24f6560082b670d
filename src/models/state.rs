//! Persisted per-search state snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::SearchIdentity;

/// Schema version written into every state blob.
///
/// Bumped when the serialized shape changes so an old binary never
/// misreads a newer blob (and vice versa).
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Persisted state for one search identity.
///
/// `entries` always mirrors the most recent successfully completed run's
/// full snapshot; entries the search no longer returns are evicted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchState {
    /// Serialized schema version
    pub version: u32,

    /// Site this state belongs to
    pub site_id: String,

    /// Search name (partition key suffix)
    pub search_name: String,

    /// Canonical search URL at last write, kept for drift audit only
    pub search_url: String,

    /// True once the first run for this identity has completed
    pub seeded: bool,

    /// trainer_id -> fingerprint for the latest snapshot
    pub entries: BTreeMap<u64, String>,

    /// When this identity was first seen
    pub created_at: DateTime<Utc>,

    /// When this state was last written
    pub updated_at: Option<DateTime<Utc>>,
}

impl SearchState {
    /// Create fresh, unseeded state for an identity.
    pub fn new(identity: &SearchIdentity) -> Self {
        Self {
            version: STATE_SCHEMA_VERSION,
            site_id: identity.site_id.clone(),
            search_name: identity.search_name.clone(),
            search_url: identity.canonical_url.clone(),
            seeded: false,
            entries: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Number of tracked entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
