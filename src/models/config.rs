//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::TrainerRecord;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ordered field names used for change-detection fingerprints
    #[serde(default = "defaults::whitelist")]
    pub whitelist: Vec<String>,

    /// Run coordinator behavior settings
    #[serde(default)]
    pub run: RunConfig,

    /// Monitored sites
    #[serde(default)]
    pub sites: Vec<SiteConfig>,

    /// Notification outputs
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.whitelist.is_empty() {
            return Err(AppError::validation("whitelist is empty"));
        }
        for name in &self.whitelist {
            if !TrainerRecord::KNOWN_FIELDS.contains(&name.as_str()) {
                return Err(AppError::validation(format!(
                    "whitelist field '{name}' is not a known record field"
                )));
            }
        }
        if self.run.max_concurrent == 0 {
            return Err(AppError::validation("run.max_concurrent must be > 0"));
        }
        if self.sites.is_empty() {
            return Err(AppError::validation("No sites defined"));
        }
        for site in &self.sites {
            site.validate()?;
        }
        for output in &self.outputs {
            output.validate()?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            whitelist: defaults::whitelist(),
            run: RunConfig::default(),
            sites: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

/// Run coordinator behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum searches processed concurrently
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Delay between notification deliveries in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// One monitored site with its searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Stable site identifier (state partition key prefix)
    pub site_id: String,

    /// Fetch behavior options for this site
    #[serde(default)]
    pub options: SiteOptions,

    /// Searches monitored on this site
    #[serde(default)]
    pub searches: Vec<SearchConfig>,
}

impl SiteConfig {
    fn validate(&self) -> Result<()> {
        if self.site_id.trim().is_empty() {
            return Err(AppError::validation("site_id is empty"));
        }
        if self.options.search_timeout_ms == 0 {
            return Err(AppError::validation(format!(
                "site '{}': options.search_timeout_ms must be > 0",
                self.site_id
            )));
        }
        if self.options.per_run_max == 0 {
            return Err(AppError::validation(format!(
                "site '{}': options.per_run_max must be > 0",
                self.site_id
            )));
        }

        let mut seen = HashSet::new();
        for search in &self.searches {
            if search.name.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "site '{}': search with empty name",
                    self.site_id
                )));
            }
            if !seen.insert(search.name.as_str()) {
                return Err(AppError::validation(format!(
                    "site '{}': duplicate search name '{}'",
                    self.site_id, search.name
                )));
            }
        }
        Ok(())
    }
}

/// Fetch behavior options for a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteOptions {
    /// Run the fetch without a visible browser (kept for parity with
    /// browser-driven sources; the HTTP source ignores it)
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// Verbose per-fetch logging
    #[serde(default)]
    pub verbose: bool,

    /// Budget for one search fetch in milliseconds
    #[serde(default = "defaults::search_timeout")]
    pub search_timeout_ms: u64,

    /// Fixed wait before reading fetched content in milliseconds
    #[serde(default = "defaults::settle")]
    pub settle_ms: u64,

    /// Maximum entries tracked per search per run
    #[serde(default = "defaults::per_run_max")]
    pub per_run_max: usize,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            headless: defaults::headless(),
            verbose: false,
            search_timeout_ms: defaults::search_timeout(),
            settle_ms: defaults::settle(),
            per_run_max: defaults::per_run_max(),
        }
    }
}

/// One monitored search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Stable name (state partition key suffix; renaming starts fresh state)
    pub name: String,

    /// Search URL as configured
    pub url: String,
}

/// Configuration for one notification output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Output backend kind (currently only "discord_forum")
    pub kind: String,

    /// Name of the environment variable holding the webhook URL
    #[serde(default)]
    pub webhook_env: String,

    /// Maximum body length in characters
    #[serde(default = "defaults::max_chars")]
    pub max_chars: usize,

    /// Forum tag IDs applied to created threads
    #[serde(default)]
    pub applied_tags: Vec<u64>,
}

impl OutputSpec {
    fn validate(&self) -> Result<()> {
        if self.kind != "discord_forum" {
            return Err(AppError::validation(format!(
                "unknown output kind '{}'",
                self.kind
            )));
        }
        if self.webhook_env.trim().is_empty() {
            return Err(AppError::validation(
                "output 'discord_forum': webhook_env is empty",
            ));
        }
        Ok(())
    }
}

mod defaults {
    // Fingerprint defaults
    pub fn whitelist() -> Vec<String> {
        vec!["white_list".to_string()]
    }

    // Run defaults
    pub fn max_concurrent() -> usize {
        2
    }
    pub fn request_delay() -> u64 {
        1000
    }

    // Site option defaults
    pub fn headless() -> bool {
        true
    }
    pub fn search_timeout() -> u64 {
        90_000
    }
    pub fn settle() -> u64 {
        250
    }
    pub fn per_run_max() -> usize {
        100
    }

    // Output defaults
    pub fn max_chars() -> usize {
        1800
    }
}
