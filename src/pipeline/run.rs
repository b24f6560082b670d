//! Run coordinator.
//!
//! One invocation processes every configured search: resolve identity,
//! load prior state, fetch current records, run the delta engine, persist
//! the new snapshot, then hand non-empty deltas to the notifier registry.
//!
//! Failure isolation: one search failing (fetch error, timeout, store
//! error) never aborts the others; its state stays untouched and the data
//! is retried next run. State is saved before anything is announced, so
//! notifications are at-least-once, never at-most-once.

use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{Config, Delta, RunConfig, SearchConfig, SiteConfig};
use crate::outputs::Notifier;
use crate::pipeline::delta::DeltaEngine;
use crate::pipeline::SearchIdentity;
use crate::services::{RecordSource, UmaGlobalSource};
use crate::storage::{BlobStore, StateStore};

/// Independent toggles for a run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Persist new state snapshots
    pub commit_state: bool,
    /// Hand non-empty deltas to the notifier registry
    pub deliver: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            commit_state: true,
            deliver: true,
        }
    }
}

impl RunOptions {
    /// Dry run: compute and log deltas, touch nothing downstream.
    pub fn dry_run() -> Self {
        Self {
            commit_state: false,
            deliver: false,
        }
    }
}

/// Aggregated counters for one run.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    /// Searches processed (across all sites)
    pub searches: usize,
    /// Searches skipped due to fetch/store failures
    pub failures: usize,
    /// Searches seeded this run
    pub seeded: usize,
    /// Entries delivered to at least one output (new + changed)
    pub announced: usize,
}

impl RunReport {
    fn merge(&mut self, other: RunReport) {
        self.searches += other.searches;
        self.failures += other.failures;
        self.seeded += other.seeded;
        self.announced += other.announced;
    }
}

/// What one search produced, before the delivery phase.
struct SearchResult {
    delta: Delta,
    seeded: bool,
}

/// Run every search of every configured site.
pub async fn run_monitor<S: BlobStore>(
    config: &Config,
    store: &StateStore<S>,
    notifiers: &[Box<dyn Notifier>],
    options: RunOptions,
) -> Result<RunReport> {
    let mut report = RunReport::default();

    for site in &config.sites {
        let source = match UmaGlobalSource::new(site.options.clone()) {
            Ok(source) => source,
            Err(e) => {
                log::error!("Site '{}': source setup failed: {e}", site.site_id);
                report.failures += site.searches.len();
                report.searches += site.searches.len();
                continue;
            }
        };

        let site_report = run_site(
            &config.whitelist,
            &config.run,
            site,
            &source,
            store,
            notifiers,
            options,
        )
        .await;
        report.merge(site_report);
    }

    log::info!(
        "Run complete: {} search(es), {} failed, {} seeded, {} entries announced",
        report.searches,
        report.failures,
        report.seeded,
        report.announced
    );
    Ok(report)
}

/// Run all searches of one site against one source.
///
/// Searches fan out concurrently (bounded by `run.max_concurrent`); the
/// delivery phase afterwards is sequential so the politeness delay between
/// posts holds.
pub async fn run_site<S: BlobStore>(
    whitelist: &[String],
    run_cfg: &RunConfig,
    site: &SiteConfig,
    source: &dyn RecordSource,
    store: &StateStore<S>,
    notifiers: &[Box<dyn Notifier>],
    options: RunOptions,
) -> RunReport {
    let engine = DeltaEngine::new(whitelist.to_vec(), site.options.per_run_max);
    let concurrency = run_cfg.max_concurrent.max(1);

    let mut report = RunReport {
        searches: site.searches.len(),
        ..RunReport::default()
    };

    let mut results = Vec::new();
    let mut search_stream = stream::iter(&site.searches)
        .map(|search| {
            let engine = &engine;
            async move {
                let outcome = process_search(site, search, source, store, engine, options).await;
                (search, outcome)
            }
        })
        .buffer_unordered(concurrency);

    while let Some((search, outcome)) = search_stream.next().await {
        match outcome {
            Ok(result) => results.push(result),
            Err(error) => {
                report.failures += 1;
                log::warn!(
                    "Search '{}::{}' skipped this run: {}",
                    site.site_id,
                    search.name,
                    error
                );
            }
        }
    }

    // Delivery phase. Seed runs and empty deltas never reach an output.
    // The politeness pause separates every delivered delta, not just posts
    // within one delta.
    let pause = Duration::from_millis(run_cfg.request_delay_ms);
    let mut delivered_before = false;
    for result in results {
        if result.seeded {
            report.seeded += 1;
            log::info!("Seeded {} (no notifications)", result.delta.identity);
            continue;
        }
        if !result.delta.has_changes() {
            continue;
        }

        if !options.deliver {
            log::info!(
                "Dry run: would announce {} entr(ies) for {}",
                result.delta.change_count(),
                result.delta.identity
            );
            continue;
        }

        if delivered_before && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        let mut any_delivered = false;
        for notifier in notifiers {
            match notifier.deliver(&result.delta).await {
                Ok(()) => any_delivered = true,
                Err(error) => {
                    log::warn!(
                        "Delivery via {} failed for {}: {}",
                        notifier.name(),
                        result.delta.identity,
                        error
                    );
                }
            }
        }
        delivered_before = delivered_before || !notifiers.is_empty();
        if any_delivered {
            report.announced += result.delta.change_count();
        }
    }

    report
}

/// Process one search: load, fetch, compute, save.
async fn process_search<S: BlobStore>(
    site: &SiteConfig,
    search: &SearchConfig,
    source: &dyn RecordSource,
    store: &StateStore<S>,
    engine: &DeltaEngine,
    options: RunOptions,
) -> Result<SearchResult> {
    let identity = SearchIdentity::resolve(&site.site_id, &search.name, &search.url);

    // Corrupt state is recoverable by policy: reseed, loudly. Silently
    // skipping notifications forever would be the worse failure.
    let prior = match store.load(&identity).await {
        Ok(prior) => prior,
        Err(AppError::StateCorrupt(message)) => {
            log::error!("State for {identity} unreadable ({message}); reseeding");
            None
        }
        Err(error) => return Err(error),
    };

    let budget = Duration::from_millis(site.options.search_timeout_ms);
    let records = match tokio::time::timeout(budget, source.fetch(search)).await {
        Ok(Ok(records)) => records,
        Ok(Err(error)) => return Err(error),
        // A timeout is absent data, not "zero records": writing an empty
        // snapshot here would evict everything previously tracked.
        Err(_) => {
            return Err(AppError::fetch(
                &search.name,
                format!("timed out after {}ms", site.options.search_timeout_ms),
            ));
        }
    };

    // An empty result set is not a valid snapshot: the site renders rows
    // client-side, so an empty shell page would evict everything tracked
    // and re-announce it all once results return. Keep prior state and
    // retry next run. A search already tracking nothing may stay empty.
    if records.is_empty() && prior.as_ref().is_none_or(|p| p.entry_count() > 0) {
        return Err(AppError::fetch(&search.name, "returned no records"));
    }

    let outcome = engine.compute(&identity, prior.as_ref(), &records);

    // Save before any notification so "notified" never outruns "persisted".
    if options.commit_state {
        store.save(&identity, &outcome.state).await?;
    }

    log::debug!(
        "{identity}: {} tracked, {} new, {} changed{}",
        outcome.state.entry_count(),
        outcome.delta.new_entries.len(),
        outcome.delta.changed_entries.len(),
        if outcome.seeded { " (seed)" } else { "" }
    );

    Ok(SearchResult {
        delta: outcome.delta,
        seeded: outcome.seeded,
    })
}
