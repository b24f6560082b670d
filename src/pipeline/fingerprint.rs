//! Change-detection fingerprints.
//!
//! A fingerprint is a SHA-256 digest over the whitelisted subset of a
//! record's fields. Two records agreeing on every whitelisted field after
//! normalization hash identically, no matter what their other fields do.
//!
//! Normalization rules (applied before hashing):
//! - zero-width and BOM characters stripped, non-breaking spaces folded
//!   to plain spaces, whitespace runs collapsed, ends trimmed
//! - stray spaces around punctuation tightened (`"Long 6 ,"` -> `"Long 6,"`)
//! - list-valued fields are sorted after cleanup, so chip order on the page
//!   cannot cause spurious fingerprint drift
//! - a field name the record does not declare hashes as the empty value

use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::models::{FieldView, TrainerRecord};

// Separators inside the hashed blob. Unit separator between list items,
// record separator between fields, so values can never collide across
// field boundaries.
const ITEM_SEP: char = '\u{1f}';
const FIELD_SEP: char = '\u{1e}';

/// Compute the fingerprint of `record` over the whitelisted fields.
pub fn fingerprint(record: &TrainerRecord, whitelist: &[String]) -> String {
    let mut hasher = Sha256::new();

    for (i, name) in whitelist.iter().enumerate() {
        if i > 0 {
            let mut sep = [0u8; 4];
            hasher.update(FIELD_SEP.encode_utf8(&mut sep).as_bytes());
        }
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(canonical_field(record, name).as_bytes());
    }

    hex::encode(hasher.finalize())
}

/// Render one field into its canonical hashed form.
fn canonical_field(record: &TrainerRecord, name: &str) -> String {
    match record.field(name) {
        Some(FieldView::List(items)) => {
            let mut tokens: Vec<String> = items
                .iter()
                .map(|item| clean_token(item))
                .filter(|token| !token.is_empty())
                .collect();
            tokens.sort();
            tokens.join(&ITEM_SEP.to_string())
        }
        Some(FieldView::Text(text)) => clean_token(text),
        Some(FieldView::Count(count)) => count.to_string(),
        None => String::new(),
    }
}

/// Clean a single text token for hashing.
pub fn clean_token(s: &str) -> String {
    static SPACE_RUNS: OnceLock<Regex> = OnceLock::new();
    static SPACE_BEFORE_PUNCT: OnceLock<Regex> = OnceLock::new();
    static SPACE_AFTER_OPEN: OnceLock<Regex> = OnceLock::new();

    let folded: String = s
        .chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{FEFF}'))
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect();

    let collapsed = SPACE_RUNS
        .get_or_init(|| Regex::new(r"\s+").unwrap())
        .replace_all(folded.trim(), " ");

    let tightened = SPACE_BEFORE_PUNCT
        .get_or_init(|| Regex::new(r" +([,)\]])").unwrap())
        .replace_all(&collapsed, "$1");

    SPACE_AFTER_OPEN
        .get_or_init(|| Regex::new(r"([(\[]) +").unwrap())
        .replace_all(&tightened, "$1")
        .trim()
        .to_string()
}
