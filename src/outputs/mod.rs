//! Notification outputs.
//!
//! Outputs are capability interfaces: one `Notifier` implementation per
//! backend, selected by configuration through a registry built once at
//! startup. No ambient global catalogue.

mod discord;
pub mod format;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Delta, OutputSpec, RunConfig};

pub use discord::DiscordForumNotifier;

/// Delivers one search's delta to a downstream channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Deliver every announceable entry in `delta`.
    ///
    /// Callers only invoke this for non-empty deltas; an implementation
    /// never needs its own emptiness check.
    async fn deliver(&self, delta: &Delta) -> Result<()>;
}

/// Build the notifier registry from configuration.
///
/// Fails fast on unknown kinds or missing credentials so nothing is half
/// configured by the time deltas exist.
pub fn build_registry(specs: &[OutputSpec], run: &RunConfig) -> Result<Vec<Box<dyn Notifier>>> {
    let mut registry: Vec<Box<dyn Notifier>> = Vec::with_capacity(specs.len());
    for spec in specs {
        match spec.kind.as_str() {
            "discord_forum" => registry.push(Box::new(DiscordForumNotifier::from_spec(
                spec,
                run.request_delay_ms,
            )?)),
            other => {
                return Err(AppError::config(format!("unknown output kind '{other}'")));
            }
        }
    }
    Ok(registry)
}
