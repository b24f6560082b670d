//! Trainer record data structure.

use serde::{Deserialize, Serialize};

/// One trainer entry fetched from a search result page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainerRecord {
    /// Numeric trainer identifier (unique within one search's results)
    pub trainer_id: u64,

    /// Full URL to the trainer's profile page
    pub profile_url: String,

    /// URL of the search this record was fetched from
    pub source_url: String,

    /// Blue (stat) spark chips
    #[serde(default)]
    pub blue_list: Vec<String>,

    /// Pink (aptitude) spark chips
    #[serde(default)]
    pub pink_list: Vec<String>,

    /// Unique skill spark chips
    #[serde(default)]
    pub unique_list: Vec<String>,

    /// White (skill) spark chips
    #[serde(default)]
    pub white_list: Vec<String>,

    /// Total white spark count
    #[serde(default)]
    pub white_count: u32,

    /// G1 win count
    #[serde(default)]
    pub g1_count: u32,
}

/// Borrowed view of one record field, as seen by the fingerprint function.
#[derive(Debug, Clone, Copy)]
pub enum FieldView<'a> {
    /// Multi-valued chip list (order not significant)
    List(&'a [String]),
    /// Scalar text
    Text(&'a str),
    /// Scalar count
    Count(u32),
}

impl TrainerRecord {
    /// Look up a field by its configured name.
    ///
    /// Returns `None` for names this record shape does not declare; the
    /// fingerprint function treats those as canonically empty.
    pub fn field(&self, name: &str) -> Option<FieldView<'_>> {
        match name {
            "blue_list" => Some(FieldView::List(&self.blue_list)),
            "pink_list" => Some(FieldView::List(&self.pink_list)),
            "unique_list" => Some(FieldView::List(&self.unique_list)),
            "white_list" => Some(FieldView::List(&self.white_list)),
            "white_count" => Some(FieldView::Count(self.white_count)),
            "g1_count" => Some(FieldView::Count(self.g1_count)),
            "profile_url" => Some(FieldView::Text(&self.profile_url)),
            _ => None,
        }
    }

    /// Field names that may appear in a fingerprint whitelist.
    pub const KNOWN_FIELDS: &'static [&'static str] = &[
        "blue_list",
        "pink_list",
        "unique_list",
        "white_list",
        "white_count",
        "g1_count",
        "profile_url",
    ];
}
