//! Per-word resolution against the term tables.
//!
//! Each candidate form of a word (normalized, then lemmatized) is checked
//! against the conflict table before the plain abbreviation table, in
//! category order `full`, `prefix`, `suffix`, `infix`. The first candidate
//! that resolves wins.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::ConflictError;
use crate::lemma::Lemmatizer;
use crate::stopwords::is_stopword;
use crate::terms::{Abbreviation, ByKind, TermKind, TermTables};

/// Outcome of resolving one normalized title word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// Stopword: contributes nothing to the output.
    Dropped,
    /// Normalized abbreviation text.
    Abbreviated(String),
    /// No usable abbreviation (unknown, or marked `n.a.`); carries the
    /// normalized word to render instead.
    Unabbreviated(String),
}

pub(crate) struct WordResolver {
    tables: TermTables,
    /// Fragments of each category ordered longest first, ties lexicographic.
    longest_first: ByKind<Vec<String>>,
    lemmatizer: Box<dyn Lemmatizer>,
}

impl WordResolver {
    pub(crate) fn new(tables: TermTables, lemmatizer: Box<dyn Lemmatizer>) -> Self {
        let longest_first = ByKind {
            full: Vec::new(),
            prefix: longest_first(&tables, TermKind::Prefix),
            suffix: longest_first(&tables, TermKind::Suffix),
            infix: longest_first(&tables, TermKind::Infix),
        };
        Self {
            tables,
            longest_first,
            lemmatizer,
        }
    }

    pub(crate) fn tables(&self) -> &TermTables {
        &self.tables
    }

    pub(crate) fn set_lemmatizer(&mut self, lemmatizer: Box<dyn Lemmatizer>) {
        self.lemmatizer = lemmatizer;
    }

    /// Resolve a normalized word for the given active languages.
    ///
    /// A conflict entry that matches but does not narrow down to exactly one
    /// active language is an error for the whole title.
    pub(crate) fn resolve(
        &self,
        word: &str,
        languages: &BTreeSet<String>,
    ) -> Result<Resolution, ConflictError> {
        if is_stopword(word) {
            return Ok(Resolution::Dropped);
        }

        let lemma = self.lemmatizer.lemmatize(word);
        let mut candidates = vec![word];
        if lemma != word {
            candidates.push(&*lemma);
        }

        for candidate in candidates {
            let found = match self.conflict_lookup(candidate, languages)? {
                Some(abbreviation) => Some(abbreviation),
                None => self.table_lookup(candidate),
            };
            match found {
                Some(Abbreviation::Text(text)) => return Ok(Resolution::Abbreviated(text.clone())),
                Some(Abbreviation::NotAbbreviated) => {
                    return Ok(Resolution::Unabbreviated(word.to_string()));
                }
                None => {}
            }
        }
        Ok(Resolution::Unabbreviated(word.to_string()))
    }

    /// The first conflicted fragment matching `word`, categories in priority
    /// order and fragments ascending within a category.
    fn conflict_lookup(
        &self,
        word: &str,
        languages: &BTreeSet<String>,
    ) -> Result<Option<&Abbreviation>, ConflictError> {
        for kind in TermKind::ALL {
            let Some((term, variants)) = self
                .tables
                .conflicts(kind)
                .iter()
                .find(|(fragment, _)| kind.matches(word, fragment))
            else {
                continue;
            };
            let mut active = variants
                .iter()
                .filter(|(language, _)| languages.contains(*language));
            return match (active.next(), active.next()) {
                (Some((_, abbreviation)), None) if !abbreviation.is_empty() => Ok(Some(abbreviation)),
                (Some(_), None) => Ok(None),
                _ => {
                    let error = ConflictError {
                        kind,
                        term: term.clone(),
                        languages: variants.keys().cloned().collect(),
                    };
                    tracing::error!(word, %error, "language mapping conflict");
                    Err(error)
                }
            };
        }
        Ok(None)
    }

    fn table_lookup(&self, word: &str) -> Option<&Abbreviation> {
        if let Some(abbreviation) = self.tables.abbreviations(TermKind::Full).get(word)
            && !abbreviation.is_empty()
        {
            return Some(abbreviation);
        }
        [TermKind::Prefix, TermKind::Suffix, TermKind::Infix]
            .into_iter()
            .find_map(|kind| {
                let table = self.tables.abbreviations(kind);
                self.longest_first
                    .get(kind)
                    .iter()
                    .find(|fragment| kind.matches(word, fragment))
                    .and_then(|fragment| table.get(fragment.as_str()))
                    .filter(|abbreviation| !abbreviation.is_empty())
            })
    }
}

fn longest_first(tables: &TermTables, kind: TermKind) -> Vec<String> {
    let mut fragments: Vec<String> = tables.abbreviations(kind).keys().cloned().collect();
    fragments.sort_by_cached_key(|fragment| (Reverse(fragment.chars().count()), fragment.clone()));
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lemma::EnglishLemmatizer;

    fn resolver(data: &[&[&str]]) -> WordResolver {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|row| row.iter().map(|f| f.to_string()).collect())
            .collect();
        WordResolver::new(TermTables::from_rows(&rows), Box::new(EnglishLemmatizer))
    }

    fn english() -> BTreeSet<String> {
        BTreeSet::from(["eng".to_string()])
    }

    fn abbreviated(s: &str) -> Resolution {
        Resolution::Abbreviated(s.to_string())
    }

    #[test]
    fn test_stopword_dropped() {
        let r = resolver(&[&["of", "o.", "eng"]]);
        assert_eq!(r.resolve("of", &english()).unwrap(), Resolution::Dropped);
    }

    #[test]
    fn test_full_beats_prefix() {
        let r = resolver(&[&["medical", "med.", "eng"], &["medic-", "medic.", "eng"]]);
        assert_eq!(r.resolve("medical", &english()).unwrap(), abbreviated("med"));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let r = resolver(&[&["bio-", "bio.", "eng"], &["biolog-", "biol.", "eng"]]);
        assert_eq!(r.resolve("biological", &english()).unwrap(), abbreviated("biol"));
        assert_eq!(r.resolve("biochemistry", &english()).unwrap(), abbreviated("bio"));
    }

    #[test]
    fn test_equal_length_ties_lexicographic() {
        let r = resolver(&[&["-raphi-", "-raph.", "eng"], &["-graph-", "-gr.", "eng"]]);
        assert_eq!(r.resolve("graphic", &english()).unwrap(), abbreviated("gr"));
    }

    #[test]
    fn test_suffix_and_infix() {
        let r = resolver(&[&["-ology", "-ol.", "eng"], &["-graph-", "-gr.", "eng"]]);
        assert_eq!(r.resolve("stomatology", &english()).unwrap(), abbreviated("ol"));
        assert_eq!(r.resolve("lithographic", &english()).unwrap(), abbreviated("gr"));
    }

    #[test]
    fn test_lemma_fallback() {
        let r = resolver(&[&["journal", "j.", "eng"]]);
        assert_eq!(r.resolve("journals", &english()).unwrap(), abbreviated("j"));
    }

    #[test]
    fn test_surface_form_before_lemma() {
        let r = resolver(&[&["letters", "lett.", "eng"], &["letter", "letter", "eng"]]);
        assert_eq!(r.resolve("letters", &english()).unwrap(), abbreviated("lett"));
    }

    #[test]
    fn test_placeholder_and_unknown() {
        let r = resolver(&[&["open", "n.a.", "eng"]]);
        assert_eq!(
            r.resolve("open", &english()).unwrap(),
            Resolution::Unabbreviated("open".into())
        );
        assert_eq!(
            r.resolve("zeitschrift", &english()).unwrap(),
            Resolution::Unabbreviated("zeitschrift".into())
        );
    }

    #[test]
    fn test_unique_conflict_language() {
        let r = resolver(&[&["annales", "ann.", "fre"], &["annales", "annls.", "eng"]]);
        assert_eq!(r.resolve("annales", &english()).unwrap(), abbreviated("annls"));
    }

    #[test]
    fn test_ambiguous_conflict_is_error() {
        let r = resolver(&[&["annales", "ann.", "eng"], &["annales", "annls.", "ger"]]);
        let languages = BTreeSet::from(["eng".to_string(), "ger".to_string()]);
        let err = r.resolve("annales", &languages).unwrap_err();
        assert_eq!(err.kind, TermKind::Full);
        assert_eq!(err.term, "annales");
    }

    #[test]
    fn test_conflict_without_active_language_is_error() {
        let r = resolver(&[&["annales", "ann.", "fre"], &["annales", "annls.", "ger"]]);
        let err = r.resolve("annales", &english()).unwrap_err();
        assert_eq!(err.languages, vec!["fre".to_string(), "ger".to_string()]);
    }

    #[test]
    fn test_prefix_conflict_matched_by_fragment() {
        let r = resolver(&[&["annal-", "ann.", "fre"], &["annal-", "annls.", "eng"]]);
        assert_eq!(r.resolve("annalen", &english()).unwrap(), abbreviated("annls"));
    }

    #[test]
    fn test_conflict_beats_plain_table() {
        let r = resolver(&[
            &["annal-", "annal.", "eng"],
            &["annales", "ann.", "fre"],
            &["annales", "annls.", "eng"],
        ]);
        assert_eq!(r.resolve("annales", &english()).unwrap(), abbreviated("annls"));
    }
}
