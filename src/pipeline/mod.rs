//! Core monitoring pipeline.
//!
//! - `fingerprint`: whitelist-based change-detection digests
//! - `identity`: search identity resolution and URL canonicalization
//! - `delta`: the per-search delta engine (seed vs. delta decision)
//! - `run`: the run coordinator tying sources, engine, store, and outputs

pub mod delta;
pub mod fingerprint;
pub mod identity;
pub mod run;

pub use delta::{DeltaEngine, DeltaOutcome};
pub use fingerprint::fingerprint;
pub use identity::{canonicalize_url, SearchIdentity};
pub use run::{run_monitor, run_site, RunOptions, RunReport};
