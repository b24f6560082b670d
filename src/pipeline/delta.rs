//! Delta computation for change notifications.
//!
//! The engine compares the current snapshot of a search against its prior
//! state and classifies every entry as new, changed, or unchanged. Entries
//! the search no longer returns are evicted from state silently; there is
//! no "removed" notification category.
//!
//! The first run for an identity is a seed: state is written in full but
//! the delta is empty by construction. Seeding and delta computation share
//! this one code path.

use std::collections::BTreeMap;

use crate::models::{ChangedEntry, Delta, SearchState, TrainerRecord};
use crate::pipeline::fingerprint::fingerprint;
use crate::pipeline::SearchIdentity;

/// Result of one engine run for one search.
#[derive(Debug, Clone)]
pub struct DeltaOutcome {
    /// Next state snapshot, ready to persist
    pub state: SearchState,
    /// Entries to announce (always empty for a seed run)
    pub delta: Delta,
    /// True if this run seeded a previously unseen identity
    pub seeded: bool,
}

/// Pure per-search delta engine.
#[derive(Debug, Clone)]
pub struct DeltaEngine {
    whitelist: Vec<String>,
    per_run_max: usize,
}

impl DeltaEngine {
    /// Create an engine for a given whitelist and per-run entry cap.
    pub fn new(whitelist: Vec<String>, per_run_max: usize) -> Self {
        Self {
            whitelist,
            per_run_max,
        }
    }

    /// Compute the next state and delta for one search.
    ///
    /// `prior` of `None` means the identity was never seen: the run seeds
    /// state and yields an empty delta. Records beyond `per_run_max` are
    /// ignored (the source site additionally caps its own result count).
    pub fn compute(
        &self,
        identity: &SearchIdentity,
        prior: Option<&SearchState>,
        records: &[TrainerRecord],
    ) -> DeltaOutcome {
        let capped = &records[..records.len().min(self.per_run_max)];

        // BTreeMap keys give ascending trainer-id iteration, which is what
        // makes delta ordering deterministic regardless of input order.
        let mut current: BTreeMap<u64, (&TrainerRecord, String)> = BTreeMap::new();
        for record in capped {
            let digest = fingerprint(record, &self.whitelist);
            current.insert(record.trainer_id, (record, digest));
        }

        let mut state = match prior {
            Some(prev) => {
                let mut next = prev.clone();
                next.search_url = identity.canonical_url.clone();
                next
            }
            None => SearchState::new(identity),
        };

        let mut delta = Delta::empty(identity.clone());
        let seeded = prior.is_none();

        if let Some(prev) = prior {
            for (id, (record, digest)) in &current {
                match prev.entries.get(id) {
                    None => delta.new_entries.push((*record).clone()),
                    Some(previous) if previous != digest => {
                        delta.changed_entries.push(ChangedEntry {
                            record: (*record).clone(),
                            previous_fingerprint: previous.clone(),
                            new_fingerprint: digest.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        // Whole-snapshot replace: ids absent from the current fetch drop out.
        state.entries = current
            .into_iter()
            .map(|(id, (_, digest))| (id, digest))
            .collect();
        state.seeded = true;

        DeltaOutcome {
            state,
            delta,
            seeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fingerprint::fingerprint;

    fn make_record(id: u64, white: &[&str]) -> TrainerRecord {
        TrainerRecord {
            trainer_id: id,
            profile_url: format!("https://uma-global.pure-db.com/#/user/{id}"),
            source_url: "https://uma-global.pure-db.com/#/search".to_string(),
            blue_list: vec!["Stamina9 (Representative3)".to_string()],
            pink_list: vec![],
            unique_list: vec![],
            white_list: white.iter().map(|s| s.to_string()).collect(),
            white_count: white.len() as u32,
            g1_count: 5,
        }
    }

    fn engine() -> DeltaEngine {
        DeltaEngine::new(vec!["white_list".to_string()], 100)
    }

    fn identity() -> SearchIdentity {
        SearchIdentity::resolve(
            "uma_global",
            "stamina-long",
            "https://uma-global.pure-db.com/#/search?blue=Stamina",
        )
    }

    #[test]
    fn seed_run_yields_empty_delta() {
        let records = vec![make_record(1, &["A1"]), make_record(2, &["B1"])];
        let outcome = engine().compute(&identity(), None, &records);

        assert!(outcome.seeded);
        assert!(!outcome.delta.has_changes());
        assert!(outcome.state.seeded);
        assert_eq!(outcome.state.entry_count(), 2);
        assert_eq!(
            outcome.state.entries[&1],
            fingerprint(&records[0], &["white_list".to_string()])
        );
    }

    #[test]
    fn rerun_with_same_records_is_noop() {
        let records = vec![make_record(1, &["A1"]), make_record(2, &["B1"])];
        let eng = engine();
        let seeded = eng.compute(&identity(), None, &records);
        let outcome = eng.compute(&identity(), Some(&seeded.state), &records);

        assert!(!outcome.seeded);
        assert!(!outcome.delta.has_changes());
        assert_eq!(outcome.state.entries, seeded.state.entries);
    }

    #[test]
    fn detects_new_entry() {
        let eng = engine();
        let first = vec![make_record(1, &["A1"])];
        let seeded = eng.compute(&identity(), None, &first);

        let second = vec![make_record(1, &["A1"]), make_record(2, &["B1"])];
        let outcome = eng.compute(&identity(), Some(&seeded.state), &second);

        assert_eq!(outcome.delta.new_entries.len(), 1);
        assert_eq!(outcome.delta.new_entries[0].trainer_id, 2);
        assert!(outcome.delta.changed_entries.is_empty());
    }

    #[test]
    fn detects_whitelisted_change_with_both_fingerprints() {
        let eng = engine();
        let first = vec![make_record(1, &["A1"])];
        let seeded = eng.compute(&identity(), None, &first);

        let second = vec![make_record(1, &["A1", "C2"])];
        let outcome = eng.compute(&identity(), Some(&seeded.state), &second);

        assert_eq!(outcome.delta.changed_entries.len(), 1);
        let changed = &outcome.delta.changed_entries[0];
        assert_eq!(changed.record.trainer_id, 1);
        assert_eq!(changed.previous_fingerprint, seeded.state.entries[&1]);
        assert_ne!(changed.previous_fingerprint, changed.new_fingerprint);
        assert_eq!(outcome.state.entries[&1], changed.new_fingerprint);
    }

    #[test]
    fn ignores_non_whitelisted_change() {
        let eng = engine();
        let first = vec![make_record(1, &["A1"])];
        let seeded = eng.compute(&identity(), None, &first);

        let mut tweaked = make_record(1, &["A1"]);
        tweaked.g1_count = 99;
        tweaked.blue_list = vec!["Speed9 (Representative3)".to_string()];
        let outcome = eng.compute(&identity(), Some(&seeded.state), &[tweaked]);

        assert!(!outcome.delta.has_changes());
    }

    #[test]
    fn evicts_without_removal_notification() {
        let eng = engine();
        let first = vec![make_record(1, &["A1"]), make_record(2, &["B1"])];
        let seeded = eng.compute(&identity(), None, &first);

        let second = vec![make_record(1, &["A1"])];
        let outcome = eng.compute(&identity(), Some(&seeded.state), &second);

        assert!(!outcome.delta.has_changes());
        assert_eq!(outcome.state.entry_count(), 1);
        assert!(!outcome.state.entries.contains_key(&2));
    }

    #[test]
    fn reappearing_entry_reported_as_new() {
        let eng = engine();
        let first = vec![make_record(1, &["A1"]), make_record(2, &["B1"])];
        let seeded = eng.compute(&identity(), None, &first);

        // Entry 2 drops out of the result window...
        let second = vec![make_record(1, &["A1"])];
        let middle = eng.compute(&identity(), Some(&seeded.state), &second);
        assert!(!middle.delta.has_changes());

        // ...and reappears unchanged: it was evicted, so it is new again.
        let outcome = eng.compute(&identity(), Some(&middle.state), &first);
        assert_eq!(outcome.delta.new_entries.len(), 1);
        assert_eq!(outcome.delta.new_entries[0].trainer_id, 2);
    }

    #[test]
    fn identities_are_isolated() {
        let eng = engine();
        let other = SearchIdentity::resolve(
            "uma_global",
            "speed-mile",
            "https://uma-global.pure-db.com/#/search?blue=Speed",
        );

        let overlap = vec![make_record(7, &["A1"])];
        let a = eng.compute(&identity(), None, &overlap);
        let b = eng.compute(&other, None, &overlap);

        // Entry 7 changes only under the first identity
        let changed = vec![make_record(7, &["A1", "Z9"])];
        let a2 = eng.compute(&identity(), Some(&a.state), &changed);
        let b2 = eng.compute(&other, Some(&b.state), &overlap);

        assert_eq!(a2.delta.changed_entries.len(), 1);
        assert!(!b2.delta.has_changes());
        assert_ne!(a2.state.entries[&7], b2.state.entries[&7]);
    }

    #[test]
    fn delta_ordering_is_ascending_regardless_of_input() {
        let eng = engine();
        let seeded = eng.compute(&identity(), None, &[make_record(50, &["X"])]);

        let shuffled = vec![
            make_record(300, &["C"]),
            make_record(50, &["X"]),
            make_record(100, &["A"]),
            make_record(200, &["B"]),
        ];
        let outcome = eng.compute(&identity(), Some(&seeded.state), &shuffled);

        let ids: Vec<u64> = outcome
            .delta
            .new_entries
            .iter()
            .map(|r| r.trainer_id)
            .collect();
        assert_eq!(ids, vec![100, 200, 300]);
    }

    #[test]
    fn per_run_max_truncates() {
        let eng = DeltaEngine::new(vec!["white_list".to_string()], 2);
        let records = vec![
            make_record(1, &["A"]),
            make_record(2, &["B"]),
            make_record(3, &["C"]),
        ];
        let outcome = eng.compute(&identity(), None, &records);
        assert_eq!(outcome.state.entry_count(), 2);
        assert!(!outcome.state.entries.contains_key(&3));
    }

    #[test]
    fn url_drift_updates_audit_field_only() {
        let eng = engine();
        let seeded = eng.compute(&identity(), None, &[make_record(1, &["A"])]);

        let drifted = SearchIdentity::resolve(
            "uma_global",
            "stamina-long",
            "https://uma-global.pure-db.com/#/search?blue=Stamina&pink=Long",
        );
        let outcome = eng.compute(&drifted, Some(&seeded.state), &[make_record(1, &["A"])]);

        assert!(!outcome.delta.has_changes());
        assert_eq!(outcome.state.search_url, drifted.canonical_url);
        assert_eq!(outcome.state.created_at, seeded.state.created_at);
    }
}
