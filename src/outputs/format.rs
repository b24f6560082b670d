//! Message formatting for forum-style outputs.
//!
//! Renders one trainer record into a thread title and body. Markdown
//! control characters are escaped minimally so spark chips show as
//! literal text.

use crate::models::TrainerRecord;

/// Hard platform limit for message content.
pub const CONTENT_LIMIT: usize = 2000;

/// Forum thread titles are short; keep conservative.
pub const TITLE_LIMIT: usize = 96;

/// A rendered title/body pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub title: String,
    pub body: String,
}

/// Escape Markdown control characters so chips render literally.
pub fn escape_markdown(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '_' | '~' | '`' | '|' | '>') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Clip to `max` characters, ellipsis on overflow.
pub fn clip(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(1);
    let mut out: String = s.chars().take(keep).collect();
    out.push('…');
    out
}

fn join_chips(chips: &[String]) -> String {
    chips
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(escape_markdown)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Render a record for announcement.
///
/// `updated` marks entries whose fingerprint changed (as opposed to
/// newly appeared ones).
pub fn render_record(record: &TrainerRecord, updated: bool) -> Rendered {
    let blue = join_chips(&record.blue_list);
    let pink = join_chips(&record.pink_list);
    let unique = join_chips(&record.unique_list);
    let white = join_chips(&record.white_list);

    let sparks: String = [blue.as_str(), pink.as_str()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" | ");

    let mut title_parts = vec![record.trainer_id.to_string()];
    if !sparks.is_empty() {
        title_parts.push(sparks);
    }
    title_parts.push(format!(
        "White {} | G1 {}",
        record.white_count, record.g1_count
    ));
    let mut title = title_parts.join(" — ");
    if updated {
        title = format!("[updated] {title}");
    }

    let body = format!(
        "Blue:   {blue}\nPink:   {pink}\nUnique: {unique}\nWhite:  {white}\n\n{}",
        record.profile_url.trim()
    )
    .trim()
    .to_string();

    Rendered {
        title: clip(&title, TITLE_LIMIT),
        body,
    }
}
