use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::terms::{Abbreviation, NO_ABBREVIATION};

/// A leading hyphen or a trailing run of punctuation.
static EDGE_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-|\p{P}+$").unwrap());

/// Normalize a title word or LTWA term for lookup.
///
/// Each space-separated part loses a leading `-` and any trailing
/// punctuation, then is lowercased and NFKD-decomposed:
/// `"Stomatology:"` → `"stomatology"`, `"-ology"` → `"ology"`.
pub fn normalize_word(word: &str) -> String {
    word.split(' ')
        .map(|part| {
            EDGE_PUNCTUATION
                .replace_all(part, "")
                .trim()
                .to_lowercase()
                .nfkd()
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Normalize an LTWA abbreviation: strip hyphens and trailing periods,
/// lowercase, NFKD. The `n.a.` placeholder becomes
/// [`Abbreviation::NotAbbreviated`].
pub fn normalize_abbreviation(abbreviation: &str) -> Abbreviation {
    if abbreviation.trim() == NO_ABBREVIATION {
        return Abbreviation::NotAbbreviated;
    }
    let text = abbreviation
        .split(' ')
        .map(|part| {
            part.trim_matches(|c| c == '-' || c == ' ')
                .trim_end_matches('.')
                .to_lowercase()
                .nfkd()
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ");
    Abbreviation::Text(text)
}
