//! Name normalization invariant.
//!
//! Every name-bearing entity goes through `normalize` before a write: the
//! display name is trimmed, inner whitespace collapsed and re-cased, and a
//! lowercase search key is derived from it. The function is idempotent, so
//! re-normalizing a stored display name is a no-op.

/// Casing applied to the collapsed name.
///
/// User names are title-cased per word; category and product names only
/// capitalize the first letter of the whole name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    Title,
    Sentence,
}

/// A normalized display name and its derived search key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub display: String,
    pub search_key: String,
}

/// Normalize a raw name: collapse whitespace, apply the casing style and
/// derive the lowercase search key.
pub fn normalize(raw: &str, style: NameStyle) -> Normalized {
    let collapsed: Vec<&str> = raw.split_whitespace().collect();

    let display = match style {
        NameStyle::Title => collapsed
            .iter()
            .map(|token| capitalize(token))
            .collect::<Vec<_>>()
            .join(" "),
        NameStyle::Sentence => capitalize(&collapsed.join(" ")),
    };

    let search_key = display.to_lowercase();

    Normalized {
        display,
        search_key,
    }
}

/// Uppercase the first character, lowercase the remainder.
fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect(),
        None => String::new(),
    }
}
