//! Discord forum webhook notifier.
//!
//! Each announceable entry becomes one new forum thread. The webhook URL
//! is read from a named environment variable at startup and never stored
//! in configuration or state.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{Delta, OutputSpec};
use crate::outputs::format::{clip, render_record, Rendered, CONTENT_LIMIT, TITLE_LIMIT};
use crate::outputs::Notifier;

const REQUEST_TIMEOUT_SECS: u64 = 20;
const MAX_RETRY_AFTER_SECS: f64 = 5.0;

/// Notifier that creates forum threads via a Discord webhook.
pub struct DiscordForumNotifier {
    client: Client,
    webhook_url: String,
    max_chars: usize,
    applied_tags: Vec<u64>,
    pause: Duration,
}

impl DiscordForumNotifier {
    /// Build a notifier from its output spec.
    ///
    /// Fails if the configured environment variable is unset, so a
    /// misconfigured deployment surfaces at startup rather than after a
    /// delta was computed.
    pub fn from_spec(spec: &OutputSpec, pause_ms: u64) -> Result<Self> {
        let webhook_url = std::env::var(&spec.webhook_env).map_err(|_| {
            AppError::config(format!(
                "Discord webhook URL not provided; expected env var {}",
                spec.webhook_env
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            webhook_url,
            max_chars: spec.max_chars.min(CONTENT_LIMIT),
            applied_tags: spec.applied_tags.clone(),
            pause: Duration::from_millis(pause_ms),
        })
    }

    /// Post one rendered entry as a new forum thread.
    async fn post(&self, rendered: &Rendered) -> Result<()> {
        let mut payload = json!({
            "thread_name": clip(&rendered.title, TITLE_LIMIT),
            "content": clip(&rendered.body, self.max_chars),
        });
        if !self.applied_tags.is_empty() {
            payload["applied_tags"] = json!(self.applied_tags);
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        // One retry on rate limit, honoring Retry-After.
        let response = if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(1.0)
                .min(MAX_RETRY_AFTER_SECS);
            tokio::time::sleep(Duration::from_secs_f64(retry_after)).await;

            self.client
                .post(&self.webhook_url)
                .json(&payload)
                .send()
                .await?
        } else {
            response
        };

        response.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordForumNotifier {
    fn name(&self) -> &'static str {
        "discord_forum"
    }

    async fn deliver(&self, delta: &Delta) -> Result<()> {
        let mut posted = 0usize;

        for record in &delta.new_entries {
            if posted > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            self.post(&render_record(record, false))
                .await
                .map_err(|e| AppError::output(self.name(), e))?;
            posted += 1;
        }

        for changed in &delta.changed_entries {
            if posted > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            self.post(&render_record(&changed.record, true))
                .await
                .map_err(|e| AppError::output(self.name(), e))?;
            posted += 1;
        }

        log::info!(
            "Posted {} thread(s) for {} to Discord forum",
            posted,
            delta.identity
        );
        Ok(())
    }
}
