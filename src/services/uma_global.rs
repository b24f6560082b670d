//! Source adapter for the global trainer database site.
//!
//! Fetches a search results page over HTTP and parses trainer rows with
//! CSS selectors. Trainer ids are long digit runs in the profile hrefs;
//! spark chips live in fixed factor classes per row.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{SearchConfig, SiteOptions, TrainerRecord};
use crate::services::RecordSource;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; uma-watch/0.1)";

const ROW_SELECTOR: &str = "tr";
const LINK_SELECTOR: &str = "a[href*='user']";
const BLUE_SELECTOR: &str = ".factor1";
const PINK_SELECTOR: &str = ".factor2";
const UNIQUE_SELECTOR: &str = ".factor3";
const WHITE_SELECTOR: &str = ".factor4";
const WHITE_COUNT_SELECTOR: &str = ".white_factor_count";
const G1_COUNT_SELECTOR: &str = ".g1_win_count";

/// HTTP source for trainer search results.
pub struct UmaGlobalSource {
    client: Client,
    options: SiteOptions,
}

impl UmaGlobalSource {
    /// Create a source with the given site options.
    pub fn new(options: SiteOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(options.search_timeout_ms))
            .build()?;
        Ok(Self { client, options })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    /// Parse all trainer rows out of a results page.
    pub fn parse_results(html: &str, source_url: &str) -> Result<Vec<TrainerRecord>> {
        let document = Html::parse_document(html);

        let row_sel = Self::parse_selector(ROW_SELECTOR)?;
        let link_sel = Self::parse_selector(LINK_SELECTOR)?;
        let blue_sel = Self::parse_selector(BLUE_SELECTOR)?;
        let pink_sel = Self::parse_selector(PINK_SELECTOR)?;
        let unique_sel = Self::parse_selector(UNIQUE_SELECTOR)?;
        let white_sel = Self::parse_selector(WHITE_SELECTOR)?;
        let white_count_sel = Self::parse_selector(WHITE_COUNT_SELECTOR)?;
        let g1_count_sel = Self::parse_selector(G1_COUNT_SELECTOR)?;

        let mut records = Vec::new();
        for row in document.select(&row_sel) {
            let Some(link) = row.select(&link_sel).next() else {
                continue;
            };
            let href = link.value().attr("href").unwrap_or("");
            let Some(trainer_id) = extract_trainer_id(href) else {
                log::debug!("Skipping row without parsable trainer id: {href}");
                continue;
            };

            let profile_url = if href.starts_with("http") {
                href.to_string()
            } else {
                format!("https://uma-global.pure-db.com/#/user/{trainer_id}")
            };

            records.push(TrainerRecord {
                trainer_id,
                profile_url,
                source_url: source_url.to_string(),
                blue_list: chip_texts(&row, &blue_sel),
                pink_list: chip_texts(&row, &pink_sel),
                unique_list: chip_texts(&row, &unique_sel),
                white_list: chip_texts(&row, &white_sel),
                white_count: count_text(&row, &white_count_sel),
                g1_count: count_text(&row, &g1_count_sel),
            });
        }

        Ok(records)
    }
}

#[async_trait]
impl RecordSource for UmaGlobalSource {
    async fn fetch(&self, search: &SearchConfig) -> Result<Vec<TrainerRecord>> {
        let response = self.client.get(&search.url).send().await?;
        let html = response.error_for_status()?.text().await?;

        // Fixed wait before reading fetched content; gives the page's own
        // rate limiting some slack between searches.
        if self.options.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.options.settle_ms)).await;
        }

        let records = Self::parse_results(&html, &search.url)?;
        if self.options.verbose {
            log::debug!(
                "Search '{}' returned {} parsable rows",
                search.name,
                records.len()
            );
        }
        Ok(records)
    }
}

/// Extract a trainer id from a profile href (ids are long digit runs).
fn extract_trainer_id(href: &str) -> Option<u64> {
    static ID_RE: OnceLock<Regex> = OnceLock::new();
    let re = ID_RE.get_or_init(|| Regex::new(r"(\d{6,})").unwrap());
    re.captures(href)?.get(1)?.as_str().parse().ok()
}

/// Collect trimmed, non-empty chip texts under a row.
fn chip_texts(row: &ElementRef<'_>, selector: &Selector) -> Vec<String> {
    row.select(selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Extract the first number out of a count cell ("1,234 wins" -> 1234).
fn count_text(row: &ElementRef<'_>, selector: &Selector) -> u32 {
    static NUM_RE: OnceLock<Regex> = OnceLock::new();
    let re = NUM_RE.get_or_init(|| Regex::new(r"(\d+)").unwrap());

    let Some(el) = row.select(selector).next() else {
        return 0;
    };
    let text: String = el.text().collect::<String>().replace(',', "");
    re.captures(&text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r##"
        <table>
          <tr>
            <td><a href="#/user/133102601857">133102601857</a></td>
            <td>
              <span class="factor1">Stamina9 (Representative3)</span>
              <span class="factor2">Long6 (Representative2)</span>
              <span class="factor3">Blue Rose Closer2 (Representative2)</span>
              <span class="factor4">Tail Held High2 (Representative2)</span>
              <span class="factor4">Fighter1 (Representative1)</span>
            </td>
            <td class="white_factor_count">15</td>
            <td class="g1_win_count">13 wins</td>
          </tr>
          <tr>
            <td><a href="https://uma-global.pure-db.com/#/user/200300400500">200300400500</a></td>
            <td class="white_factor_count">1,024</td>
          </tr>
          <tr>
            <td><a href="#/about">not a profile</a></td>
          </tr>
        </table>
    "##;

    #[test]
    fn test_parse_results() {
        let records =
            UmaGlobalSource::parse_results(FIXTURE, "https://example.com/#/search").unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.trainer_id, 133102601857);
        assert_eq!(
            first.profile_url,
            "https://uma-global.pure-db.com/#/user/133102601857"
        );
        assert_eq!(first.blue_list, vec!["Stamina9 (Representative3)"]);
        assert_eq!(first.white_list.len(), 2);
        assert_eq!(first.white_count, 15);
        assert_eq!(first.g1_count, 13);
        assert_eq!(first.source_url, "https://example.com/#/search");
    }

    #[test]
    fn test_absolute_href_kept() {
        let records =
            UmaGlobalSource::parse_results(FIXTURE, "https://example.com/#/search").unwrap();
        assert_eq!(
            records[1].profile_url,
            "https://uma-global.pure-db.com/#/user/200300400500"
        );
    }

    #[test]
    fn test_missing_chips_are_empty() {
        let records =
            UmaGlobalSource::parse_results(FIXTURE, "https://example.com/#/search").unwrap();
        assert!(records[1].blue_list.is_empty());
        assert!(records[1].white_list.is_empty());
        assert_eq!(records[1].g1_count, 0);
    }

    #[test]
    fn test_count_strips_thousands_separator() {
        let records =
            UmaGlobalSource::parse_results(FIXTURE, "https://example.com/#/search").unwrap();
        assert_eq!(records[1].white_count, 1024);
    }

    #[test]
    fn test_extract_trainer_id() {
        assert_eq!(extract_trainer_id("#/user/133102601857"), Some(133102601857));
        assert_eq!(extract_trainer_id("#/about"), None);
        assert_eq!(extract_trainer_id("#/user/123"), None); // too short
    }

    #[test]
    fn test_empty_page_yields_no_records() {
        let records =
            UmaGlobalSource::parse_results("<html><body></body></html>", "https://x.test").unwrap();
        assert!(records.is_empty());
    }
}
