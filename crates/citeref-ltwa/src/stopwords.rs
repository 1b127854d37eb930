use std::collections::HashSet;

use once_cell::sync::Lazy;
use unicode_normalization::UnicodeNormalization;

/// Articles, conjunctions and prepositions that ISO-4 drops from titles.
const STOPWORDS: &[&str] = &[
    // English
    "a", "about", "afore", "after", "ago", "along", "amid", "among", "amongst", "an", "and",
    "apropos", "as", "at", "atop", "but", "by", "ca", "circa", "for", "from", "hence", "in",
    "into", "like", "nor", "of", "off", "on", "onto", "ontop", "or", "out", "over", "per",
    "since", "so", "than", "the", "though", "til", "till", "to", "unlike", "until", "unto",
    "up", "upon", "upside", "versus", "via", "vis-a-vis", "vs", "when", "whenever", "where",
    "whereas", "wherever", "while", "with", "within", "yet",
    // German
    "aus", "des", "der", "für", "im", "und", "zu", "zur",
    // Romance
    "da", "de", "del", "della", "delle", "di", "do", "e", "el", "en", "et", "i", "la", "le",
    "lo", "las", "les", "los", "y",
    // Dutch, Scandinavian
    "van", "voor", "og",
];

/// Stopwords in the same NFKD form the resolver compares against.
static STOPWORD_SET: Lazy<HashSet<String>> =
    Lazy::new(|| STOPWORDS.iter().map(|w| w.nfkd().collect()).collect());

pub(crate) fn is_stopword(word: &str) -> bool {
    STOPWORD_SET.contains(word)
}
