// src/models/mod.rs

//! Domain models for the monitor application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod delta;
mod record;
mod state;

// Re-export all public types
pub use config::{Config, OutputSpec, RunConfig, SearchConfig, SiteConfig, SiteOptions};
pub use delta::{ChangedEntry, Delta};
pub use record::{FieldView, TrainerRecord};
pub use state::{SearchState, STATE_SCHEMA_VERSION};
