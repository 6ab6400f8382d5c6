use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Category, Intent};

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

static GREETING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:hi|hello|hey|heya|howdy|greetings|namaste|good (?:morning|afternoon|evening))\b")
        .expect("greeting pattern is valid")
});

static HELP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:help|what can you do|how do you work|what do you do|who are you)\b")
        .expect("help pattern is valid")
});

/// Synonym table scanned as case-insensitive substrings. Declaration order
/// is the tie-break and is observable behavior: the first key found
/// anywhere in the text wins, regardless of its position in the text.
/// Short keys that embed easily ("er" in "where", "security") sit last.
const CATEGORY_SYNONYMS: &[(&str, Category)] = &[
    ("hospital", Category::Hospital),
    ("pharmacy", Category::Pharmacy),
    ("chemist", Category::Pharmacy),
    ("drugstore", Category::Pharmacy),
    ("drug store", Category::Pharmacy),
    ("medical store", Category::Pharmacy),
    ("medicine", Category::Pharmacy),
    ("police station", Category::PoliceStation),
    ("police", Category::PoliceStation),
    ("cops", Category::PoliceStation),
    ("clinic", Category::Hospital),
    ("emergency room", Category::Hospital),
    ("emergency", Category::Hospital),
    ("security", Category::PoliceStation),
    ("er", Category::Hospital),
];

/// Pure and total over all string inputs; no side effects.
pub fn classify(text: &str) -> Intent {
    let lower = normalize_text(text).to_lowercase();

    if GREETING_RE.is_match(&lower) {
        return Intent::Greeting;
    }

    if HELP_RE.is_match(&lower) {
        return Intent::Help;
    }

    if let Some(category) = resolve_category(&lower) {
        return Intent::Place(category);
    }

    Intent::Unclassified
}

fn resolve_category(lower: &str) -> Option<Category> {
    CATEGORY_SYNONYMS
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map(|(_, category)| *category)
}
