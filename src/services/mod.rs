//! Service layer: the scraping side of the system.
//!
//! Sources are capability traits so the core never depends on one
//! particular website. One implementation ships: `UmaGlobalSource`.

mod uma_global;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{SearchConfig, TrainerRecord};

pub use uma_global::UmaGlobalSource;

/// Produces the current records for one configured search.
///
/// Implementations own their own retries; the core treats a fetch as a
/// single fallible unit and never retries within a run.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the current result set for `search`, in the site's own order.
    async fn fetch(&self, search: &SearchConfig) -> Result<Vec<TrainerRecord>>;
}
