//! Autocomplete suggestions extracted from highlight fragments.

use std::{collections::HashSet, sync::LazyLock};

use common::{
    search_const::{SUGGEST_POST_TAG, SUGGEST_PRE_TAG},
    text_highlight::{decode_html_entities, strip_tags},
};
use regex::Regex;

use crate::db_utils::engine::EngineHit;

// Marked term plus the word characters glued to the closing marker.
static SUGGEST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?s)^.*?{}(.*?){}(\w*)(?:\W.*)?$",
        regex::escape(SUGGEST_PRE_TAG),
        regex::escape(SUGGEST_POST_TAG)
    );
    Regex::new(&pattern).expect("suggest pattern is valid")
});

/// Turns a highlight fragment into a suggestion: the marked term and the
/// rest of its word, entity-decoded, lower-cased and stripped of tags.
/// Fragments without a marker pair are cleaned whole.
pub fn clean_suggest(fragment: &str) -> String {
    let extracted = match SUGGEST_PATTERN.captures(fragment) {
        Some(caps) => format!("{}{}", &caps[1], &caps[2]),
        None => fragment.to_string(),
    };
    strip_tags(&decode_html_entities(&extracted).to_lowercase())
}

/// First fragment of each field in `fields`, for every hit in order;
/// duplicates keep their first position.
pub fn extract_suggestions(hits: &[EngineHit], fields: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut suggestions = Vec::new();
    for hit in hits {
        for field in fields {
            let Some(fragment) = hit.highlights.get(field).and_then(|f| f.first()) else {
                continue;
            };
            let cleaned = clean_suggest(fragment);
            if cleaned.is_empty() {
                continue;
            }
            if seen.insert(cleaned.clone()) {
                suggestions.push(cleaned);
            }
        }
    }
    suggestions
}
