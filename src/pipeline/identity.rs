//! Search identity resolution.
//!
//! A search identity binds a logical search to its persisted state across
//! runs. The partition key is `site_id::search_name`; the canonical URL is
//! carried alongside for drift audit only. Renaming a search deliberately
//! produces a new identity with fresh state.

use serde::{Deserialize, Serialize};
use url::Url;

/// Stable identity of one monitored search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SearchIdentity {
    /// Site the search belongs to
    pub site_id: String,

    /// Configured search name
    pub search_name: String,

    /// Canonicalized search URL
    pub canonical_url: String,
}

impl SearchIdentity {
    /// Resolve an identity from configuration values. Pure, no I/O.
    pub fn resolve(site_id: &str, search_name: &str, raw_url: &str) -> Self {
        Self {
            site_id: site_id.to_string(),
            search_name: search_name.to_string(),
            canonical_url: canonicalize_url(raw_url),
        }
    }

    /// State partition key for this identity.
    pub fn partition_key(&self) -> String {
        format!("{}::{}", self.site_id, self.search_name)
    }
}

impl std::fmt::Display for SearchIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.site_id, self.search_name)
    }
}

/// Canonicalize a search URL so cosmetic configuration edits do not look
/// like different searches.
///
/// - query parameters sorted bytewise, empty query dropped
/// - trailing path slash stripped (non-root)
/// - fragment preserved; a query embedded in the fragment (the site routes
///   through `#/search?...`) gets the same parameter sorting
/// - unparseable input falls back to the trimmed raw string
pub fn canonicalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        pairs.sort();
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &pairs {
            serializer.append_pair(k, v);
        }
        let query = serializer.finish();
        parsed.set_query(Some(&query));
    }

    if let Some(fragment) = parsed.fragment().map(|f| f.to_string()) {
        let canonical = canonicalize_fragment(&fragment);
        if canonical.is_empty() {
            parsed.set_fragment(None);
        } else {
            parsed.set_fragment(Some(&canonical));
        }
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    parsed.to_string()
}

/// Sort a query embedded in a URL fragment (`#/search?b=2&a=1`).
fn canonicalize_fragment(fragment: &str) -> String {
    let Some((route, query)) = fragment.split_once('?') else {
        return fragment.to_string();
    };
    if query.is_empty() {
        return route.to_string();
    }

    let mut params: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
    params.sort();
    if params.is_empty() {
        route.to_string()
    } else {
        format!("{}?{}", route, params.join("&"))
    }
}
