//! Text helpers shared by the catalog engine.
//!
//! Pure functions for:
//! - Case-insensitive containment (search)
//! - Attribute name normalization (URL keys, snake_case record keys, synonym keys)
//! - Accent-insensitive folding for search and the alphabetical sort

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Comparison form of free text: compatibility-decomposed, accents dropped,
/// lower-cased. "Émeraude", "EMERAUDE" and a decomposed "Émeraude" all fold
/// to "emeraude".
pub fn fold(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Case- and accent-insensitive substring test.
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    fold(haystack).contains(&fold(needle))
}

/// Split an attribute or field name into lower-cased words.
///
/// Word boundaries are whitespace, `_`, `-` and lower-to-upper case changes,
/// so "Metal Type", "metal_type" and "metalType" all yield `["metal", "type"]`.
pub fn words(name: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// URL parameter form of an attribute name: lower-cased, spaces as underscores.
pub fn param_key(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// snake_case record key for an attribute name ("Metal Type" -> "metal_type").
pub fn snake_case(name: &str) -> String {
    words(name).join("_")
}

/// Spacing- and case-insensitive key used for synonym lookups
/// ("Metal Type", "metal_type", "metalType" -> "metal type").
pub fn synonym_key(name: &str) -> String {
    words(name).join(" ")
}

/// Compare product names the way a shopper expects: by folded text, so an
/// accented initial sorts with its base letter, then case-folded, then raw
/// text so the order is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    fold(a)
        .cmp(&fold(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Split a comma-separated parameter value, dropping blanks.
pub fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
