//! Delta result for notification dispatch.
//!
//! A delta proves *that* something whitelisted changed, not *what*;
//! field-level diffing is a formatter concern.

use serde::{Deserialize, Serialize};

use crate::models::TrainerRecord;
use crate::pipeline::SearchIdentity;

/// New and changed entries detected for one search in one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delta {
    /// Search this delta belongs to
    pub identity: SearchIdentity,

    /// Entries not present in the prior state, ascending trainer id
    pub new_entries: Vec<TrainerRecord>,

    /// Entries whose whitelisted fingerprint changed, ascending trainer id
    pub changed_entries: Vec<ChangedEntry>,
}

/// A tracked entry whose fingerprint changed between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedEntry {
    /// Current record snapshot
    pub record: TrainerRecord,

    /// Fingerprint from the prior state
    pub previous_fingerprint: String,

    /// Fingerprint computed this run
    pub new_fingerprint: String,
}

impl Delta {
    /// Create an empty delta for an identity.
    pub fn empty(identity: SearchIdentity) -> Self {
        Self {
            identity,
            new_entries: Vec::new(),
            changed_entries: Vec::new(),
        }
    }

    /// Check if there is anything to announce.
    pub fn has_changes(&self) -> bool {
        !self.new_entries.is_empty() || !self.changed_entries.is_empty()
    }

    /// Total number of announceable entries.
    pub fn change_count(&self) -> usize {
        self.new_entries.len() + self.changed_entries.len()
    }
}
