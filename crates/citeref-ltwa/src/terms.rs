//! LTWA term tables.
//!
//! Raw LTWA rows (`word`, `abbreviation`, optional comma-separated language
//! list) are folded into three read-only structures:
//!
//! - a per-category abbreviation table (`full`, `prefix`, `suffix`, `infix`),
//! - a per-category conflict table for words whose abbreviation depends on
//!   the language, keyed `word -> language -> abbreviation`,
//! - the sorted list of multi-word terms, regex-escaped for the tokenizer.
//!
//! A key that appears more than once within a category is a conflict: it is
//! evicted from the abbreviation table and only the conflict table knows it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::{normalize_abbreviation, normalize_word};

/// Placeholder the LTWA uses for words that are never abbreviated.
pub const NO_ABBREVIATION: &str = "n.a.";

/// Morphological matching rule of a stored fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Full,
    Prefix,
    Suffix,
    Infix,
}

impl TermKind {
    /// All categories, in lookup priority order.
    pub const ALL: [TermKind; 4] = [
        TermKind::Full,
        TermKind::Prefix,
        TermKind::Suffix,
        TermKind::Infix,
    ];

    /// Classify a raw LTWA word by its hyphen markers: `-ology` is a suffix,
    /// `stomatolog-` a prefix, `-graph-` an infix, anything else a full word.
    pub fn classify(raw: &str) -> Self {
        match (raw.starts_with('-'), raw.ends_with('-')) {
            (true, true) => TermKind::Infix,
            (true, false) => TermKind::Suffix,
            (false, true) => TermKind::Prefix,
            (false, false) => TermKind::Full,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TermKind::Full => "full",
            TermKind::Prefix => "prefix",
            TermKind::Suffix => "suffix",
            TermKind::Infix => "infix",
        }
    }

    /// Whether `word` is matched by `fragment` under this category's rule.
    pub fn matches(self, word: &str, fragment: &str) -> bool {
        match self {
            TermKind::Full => word == fragment,
            TermKind::Prefix => word.starts_with(fragment),
            TermKind::Suffix => word.ends_with(fragment),
            TermKind::Infix => word.contains(fragment),
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per term category. Accessors are exhaustive over [`TermKind`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct ByKind<T> {
    pub full: T,
    pub prefix: T,
    pub suffix: T,
    pub infix: T,
}

impl<T> ByKind<T> {
    pub fn get(&self, kind: TermKind) -> &T {
        match kind {
            TermKind::Full => &self.full,
            TermKind::Prefix => &self.prefix,
            TermKind::Suffix => &self.suffix,
            TermKind::Infix => &self.infix,
        }
    }

    fn get_mut(&mut self, kind: TermKind) -> &mut T {
        match kind {
            TermKind::Full => &mut self.full,
            TermKind::Prefix => &mut self.prefix,
            TermKind::Suffix => &mut self.suffix,
            TermKind::Infix => &mut self.infix,
        }
    }

    /// Iterate categories in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (TermKind, &T)> {
        TermKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(TermKind, &T) -> U) -> ByKind<U> {
        ByKind {
            full: f(TermKind::Full, &self.full),
            prefix: f(TermKind::Prefix, &self.prefix),
            suffix: f(TermKind::Suffix, &self.suffix),
            infix: f(TermKind::Infix, &self.infix),
        }
    }
}

/// A stored abbreviation. [`Abbreviation::NotAbbreviated`] is the LTWA's
/// `n.a.` marker: the word is known and must be kept as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Abbreviation {
    Text(String),
    NotAbbreviated,
}

impl Abbreviation {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Abbreviation::Text(text) => Some(text),
            Abbreviation::NotAbbreviated => None,
        }
    }

    /// An empty abbreviation carries no information and never ends a lookup.
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Abbreviation::Text(text) if text.is_empty())
    }
}

impl From<String> for Abbreviation {
    fn from(value: String) -> Self {
        if value == NO_ABBREVIATION {
            Abbreviation::NotAbbreviated
        } else {
            Abbreviation::Text(value)
        }
    }
}

impl From<Abbreviation> for String {
    fn from(value: Abbreviation) -> Self {
        match value {
            Abbreviation::Text(text) => text,
            Abbreviation::NotAbbreviated => NO_ABBREVIATION.to_string(),
        }
    }
}

/// Normalized term -> abbreviation.
pub type TermMap = BTreeMap<String, Abbreviation>;
/// Language code -> abbreviation.
pub type LanguageMap = BTreeMap<String, Abbreviation>;
/// Normalized term -> language-specific abbreviations.
pub type ConflictMap = BTreeMap<String, LanguageMap>;

/// The three immutable LTWA lookup structures.
///
/// Serialized with the cache-file keys `abbrev`, `conflicts` and
/// `multi_word_abbrev`. Deserialization goes through [`TermTables::from_parts`]
/// so a hand-edited cache cannot break the table/conflict partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TermTablesRepr")]
pub struct TermTables {
    #[serde(rename = "abbrev")]
    abbreviations: ByKind<TermMap>,
    conflicts: ByKind<ConflictMap>,
    #[serde(rename = "multi_word_abbrev")]
    multi_word_terms: Vec<String>,
}

#[derive(Deserialize)]
struct TermTablesRepr {
    #[serde(rename = "abbrev", default)]
    abbreviations: ByKind<TermMap>,
    #[serde(default)]
    conflicts: ByKind<ConflictMap>,
    #[serde(rename = "multi_word_abbrev", default)]
    multi_word_terms: Vec<String>,
}

impl From<TermTablesRepr> for TermTables {
    fn from(repr: TermTablesRepr) -> Self {
        TermTables::from_parts(repr.abbreviations, repr.conflicts, repr.multi_word_terms)
    }
}

impl TermTables {
    /// Assemble tables built elsewhere. Every conflicted key is removed from
    /// the abbreviation table of its category and the multi-word list is
    /// sorted and de-duplicated.
    pub fn from_parts(
        mut abbreviations: ByKind<TermMap>,
        conflicts: ByKind<ConflictMap>,
        mut multi_word_terms: Vec<String>,
    ) -> Self {
        for (kind, conflict_map) in conflicts.iter() {
            let table = abbreviations.get_mut(kind);
            for term in conflict_map.keys() {
                table.remove(term);
            }
        }
        multi_word_terms.sort();
        multi_word_terms.dedup();
        Self {
            abbreviations,
            conflicts,
            multi_word_terms,
        }
    }

    /// Build the tables from raw LTWA rows.
    ///
    /// Rows that do not have exactly two or three fields are logged and
    /// skipped. Which of several duplicate rows is seen first does not matter:
    /// all of them end up in the conflict table.
    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        let mut entries = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for (index, row) in rows.iter().enumerate() {
            match RawEntry::parse(row) {
                Some(entry) if entry.word.is_empty() => {
                    tracing::debug!(line = index + 1, "LTWA row normalizes to an empty word, skipping");
                    skipped += 1;
                }
                Some(entry) => entries.push(entry),
                None => {
                    let fields: Vec<&str> = row.iter().map(|field| field.as_ref()).collect();
                    tracing::error!(line = index + 1, ?fields, "format issue in LTWA row, skipping");
                    skipped += 1;
                }
            }
        }

        let mut abbreviations: ByKind<TermMap> = ByKind::default();
        let mut conflicted: ByKind<BTreeSet<String>> = ByKind::default();
        let mut multi_word_terms = Vec::new();

        for entry in &entries {
            let table = abbreviations.get_mut(entry.kind);
            if table.contains_key(&entry.word) {
                conflicted.get_mut(entry.kind).insert(entry.word.clone());
            } else if entry.word.contains(' ') {
                multi_word_terms.push(regex::escape(&entry.word));
            }
            table.insert(entry.word.clone(), entry.abbreviation.clone());
        }

        let mut conflicts: ByKind<ConflictMap> = ByKind::default();
        for entry in &entries {
            if !conflicted.get(entry.kind).contains(&entry.word) {
                continue;
            }
            let languages = conflicts
                .get_mut(entry.kind)
                .entry(entry.word.clone())
                .or_default();
            for language in entry.languages.split(',').map(str::trim) {
                if !language.is_empty() {
                    languages.insert(language.to_string(), entry.abbreviation.clone());
                }
            }
        }

        let tables = Self::from_parts(abbreviations, conflicts, multi_word_terms);
        for (kind, table) in tables.abbreviations.iter() {
            tracing::debug!(%kind, terms = table.len(), "abbreviation category size");
        }
        tracing::info!(
            rows = rows.len(),
            skipped,
            terms = tables.term_count(),
            conflicts = tables.conflict_count(),
            multi_word_terms = tables.multi_word_terms.len(),
            "built LTWA term tables"
        );
        tables
    }

    pub fn abbreviations(&self, kind: TermKind) -> &TermMap {
        self.abbreviations.get(kind)
    }

    pub fn conflicts(&self, kind: TermKind) -> &ConflictMap {
        self.conflicts.get(kind)
    }

    /// Regex-escaped multi-word terms, sorted.
    pub fn multi_word_terms(&self) -> &[String] {
        &self.multi_word_terms
    }

    pub fn term_count(&self) -> usize {
        self.abbreviations.iter().map(|(_, table)| table.len()).sum()
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts.iter().map(|(_, table)| table.len()).sum()
    }

    /// Sanity check for a full LTWA snapshot (the 2016 list has ~40k whole
    /// words and a few hundred multi-word terms).
    pub fn is_complete_snapshot(&self) -> bool {
        self.abbreviations.full.len() > 39_000 && self.multi_word_terms.len() > 250
    }
}

/// One well-formed LTWA row, normalized.
struct RawEntry<'a> {
    kind: TermKind,
    word: String,
    abbreviation: Abbreviation,
    languages: &'a str,
}

impl<'a> RawEntry<'a> {
    fn parse<S: AsRef<str>>(row: &'a [S]) -> Option<Self> {
        let (word, abbreviation, languages) = match row {
            [word, abbreviation] => (word.as_ref(), abbreviation.as_ref(), ""),
            [word, abbreviation, languages] => {
                (word.as_ref(), abbreviation.as_ref(), languages.as_ref())
            }
            _ => return None,
        };
        let word = word.trim();
        Some(Self {
            kind: TermKind::classify(word),
            word: normalize_word(word),
            abbreviation: normalize_abbreviation(abbreviation),
            languages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|f| f.to_string()).collect())
            .collect()
    }

    fn text(s: &str) -> Abbreviation {
        Abbreviation::Text(s.to_string())
    }

    #[test]
    fn test_classify() {
        assert_eq!(TermKind::classify("journal"), TermKind::Full);
        assert_eq!(TermKind::classify("stomatolog-"), TermKind::Prefix);
        assert_eq!(TermKind::classify("-ology"), TermKind::Suffix);
        assert_eq!(TermKind::classify("-graph-"), TermKind::Infix);
    }

    #[test]
    fn test_build_categories() {
        let tables = TermTables::from_rows(&rows(&[
            &["journal", "j.", "eng"],
            &["stomatolog-", "stomatol.", "mul"],
            &["-ology", "-ol.", "eng"],
            &["-graph-", "-gr.", "mul"],
        ]));

        assert_eq!(tables.abbreviations(TermKind::Full).get("journal"), Some(&text("j")));
        assert_eq!(
            tables.abbreviations(TermKind::Prefix).get("stomatolog"),
            Some(&text("stomatol"))
        );
        assert_eq!(tables.abbreviations(TermKind::Suffix).get("ology"), Some(&text("ol")));
        assert_eq!(tables.abbreviations(TermKind::Infix).get("graph"), Some(&text("gr")));
        assert_eq!(tables.term_count(), 4);
        assert_eq!(tables.conflict_count(), 0);
    }

    #[test]
    fn test_placeholder_kept_verbatim() {
        let tables = TermTables::from_rows(&rows(&[&["open", "n.a.", "eng"]]));
        assert_eq!(
            tables.abbreviations(TermKind::Full).get("open"),
            Some(&Abbreviation::NotAbbreviated)
        );
    }

    #[test]
    fn test_duplicate_becomes_conflict() {
        let tables = TermTables::from_rows(&rows(&[
            &["annales", "ann.", "fre"],
            &["annales", "annls.", "eng, ger"],
            &["acta", "acta", "lat"],
        ]));

        assert!(!tables.abbreviations(TermKind::Full).contains_key("annales"));
        let langs = tables.conflicts(TermKind::Full).get("annales").unwrap();
        assert_eq!(langs.get("fre"), Some(&text("ann")));
        assert_eq!(langs.get("eng"), Some(&text("annls")));
        assert_eq!(langs.get("ger"), Some(&text("annls")));
        assert_eq!(tables.abbreviations(TermKind::Full).get("acta"), Some(&text("acta")));
    }

    #[test]
    fn test_conflicts_are_per_category() {
        let tables = TermTables::from_rows(&rows(&[
            &["medic-", "med.", "eng"],
            &["medic", "medic", "eng"],
        ]));
        assert_eq!(tables.conflict_count(), 0);
        assert!(tables.abbreviations(TermKind::Prefix).contains_key("medic"));
        assert!(tables.abbreviations(TermKind::Full).contains_key("medic"));
    }

    #[test]
    fn test_conflict_independent_of_row_order() {
        let forward = TermTables::from_rows(&rows(&[
            &["annales", "ann.", "fre"],
            &["annales", "annls.", "eng"],
        ]));
        let backward = TermTables::from_rows(&rows(&[
            &["annales", "annls.", "eng"],
            &["annales", "ann.", "fre"],
        ]));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let tables = TermTables::from_rows(&rows(&[
            &["lonely"],
            &["a", "b", "c", "d"],
            &["journal", "j."],
        ]));
        assert_eq!(tables.term_count(), 1);
        assert!(tables.abbreviations(TermKind::Full).contains_key("journal"));
    }

    #[test]
    fn test_multi_word_terms_sorted_and_escaped() {
        let tables = TermTables::from_rows(&rows(&[
            &["united states", "U. S.", "eng"],
            &["acta medica", "acta med.", "lat"],
            &["journal", "j.", "eng"],
        ]));
        assert_eq!(tables.multi_word_terms(), ["acta medica", "united states"]);
    }

    #[test]
    fn test_from_parts_enforces_partition() {
        let mut abbreviations: ByKind<TermMap> = ByKind::default();
        abbreviations.full.insert("annales".into(), text("ann"));
        abbreviations.full.insert("journal".into(), text("j"));
        let mut conflicts: ByKind<ConflictMap> = ByKind::default();
        conflicts
            .full
            .entry("annales".into())
            .or_default()
            .insert("fre".into(), text("ann"));

        let tables = TermTables::from_parts(abbreviations, conflicts, Vec::new());
        assert!(!tables.abbreviations(TermKind::Full).contains_key("annales"));
        assert!(tables.abbreviations(TermKind::Full).contains_key("journal"));
    }

    #[test]
    fn test_json_layout() {
        let tables = TermTables::from_rows(&rows(&[
            &["journal", "j.", "eng"],
            &["open", "n.a.", "eng"],
            &["annales", "ann.", "fre"],
            &["annales", "annls.", "eng"],
        ]));
        let json = serde_json::to_value(&tables).unwrap();
        assert_eq!(json["abbrev"]["full"]["journal"], "j");
        assert_eq!(json["abbrev"]["full"]["open"], "n.a.");
        assert_eq!(json["conflicts"]["full"]["annales"]["fre"], "ann");
        assert!(json["multi_word_abbrev"].as_array().unwrap().is_empty());

        let parsed: TermTables = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, tables);
    }
}
