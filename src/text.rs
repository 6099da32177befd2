//! Complaint text normalization.
//!
//! All classifier input flows through [`normalize`] first: lowercase,
//! alphabetic-only, single spaces. Normalization is pure and idempotent, so a
//! feature string can be re-normalized without changing.

use std::sync::OnceLock;

use regex::Regex;

use crate::complaints::Category;

fn non_alpha() -> &'static Regex {
    static NON_ALPHA: OnceLock<Regex> = OnceLock::new();
    NON_ALPHA.get_or_init(|| Regex::new(r"[^a-z]+").expect("normalizer regex must compile"))
}

/// Normalize free text into a lowercase, alphabetic-only feature string.
///
/// Empty or symbol-only input yields an empty string.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let spaced = non_alpha().replace_all(&lowered, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the combined feature string for a complaint: normalized description
/// followed by the normalized category name.
pub fn combine(description: &str, category: Category) -> String {
    let description = normalize(description);
    let category = normalize(category.as_str());
    if description.is_empty() {
        category
    } else {
        format!("{description} {category}")
    }
}
