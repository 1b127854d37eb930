use std::collections::BTreeSet;
use std::path::Path;

use unicode_normalization::UnicodeNormalization;

use crate::format::{Capitalization, format_term};
use crate::lemma::{EnglishLemmatizer, Lemmatizer};
use crate::normalize::normalize_word;
use crate::resolver::{Resolution, WordResolver};
use crate::terms::TermTables;
use crate::tokenizer::Tokenizer;
use crate::{ConflictError, LtwaError};

/// ISO 639-2 code of the language used for conflict resolution by default.
pub const ENGLISH: &str = "eng";

/// ISO-4 journal title abbreviator over a fixed set of LTWA tables.
///
/// Construction compiles the multi-word tokenizer and indexes the tables;
/// after that the abbreviator is immutable and can be shared across threads
/// behind an `Arc`.
///
/// ```no_run
/// # fn main() -> Result<(), citeref_ltwa::LtwaError> {
/// use citeref_ltwa::JournalAbbreviator;
///
/// let abbreviator = JournalAbbreviator::from_cache("/var/cache/citeref".as_ref())?;
/// assert_eq!(
///     abbreviator.journal_abbreviation("Open Journal of Stomatology", false),
///     "Open J Stomatol"
/// );
/// # Ok(())
/// # }
/// ```
pub struct JournalAbbreviator {
    tokenizer: Tokenizer,
    resolver: WordResolver,
    languages: BTreeSet<String>,
}

impl JournalAbbreviator {
    pub fn new(tables: TermTables) -> Result<Self, LtwaError> {
        let tokenizer = Tokenizer::new(tables.multi_word_terms())?;
        Ok(Self {
            tokenizer,
            resolver: WordResolver::new(tables, Box::new(EnglishLemmatizer)),
            languages: BTreeSet::from([ENGLISH.to_string()]),
        })
    }

    /// Load the tables cached by [`crate::build_cache`] in `cache_dir`.
    pub fn from_cache(cache_dir: &Path) -> Result<Self, LtwaError> {
        let tables = crate::load_cache(cache_dir)?.ok_or_else(|| LtwaError::MissingCache {
            path: crate::cache_path(cache_dir),
        })?;
        Self::new(tables)
    }

    pub fn with_lemmatizer(mut self, lemmatizer: impl Lemmatizer + 'static) -> Self {
        self.resolver.set_lemmatizer(Box::new(lemmatizer));
        self
    }

    /// Replace the set of languages conflicted terms are resolved against.
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn tables(&self) -> &TermTables {
        self.resolver.tables()
    }

    pub fn languages(&self) -> &BTreeSet<String> {
        &self.languages
    }

    /// Abbreviate `title`, falling back to the unchanged title when a
    /// language conflict cannot be resolved.
    pub fn journal_abbreviation(&self, title: &str, use_punctuation: bool) -> String {
        match self.try_abbreviate(title, use_punctuation) {
            Ok(abbreviation) => abbreviation,
            Err(error) => {
                tracing::error!(title, %error, "could not abbreviate journal title");
                title.to_string()
            }
        }
    }

    /// Abbreviate `title`, reporting an unresolvable language conflict
    /// instead of hiding it.
    pub fn try_abbreviate(&self, title: &str, use_punctuation: bool) -> Result<String, ConflictError> {
        let decomposed: String = title.nfkd().collect();
        let tokens = self.tokenizer.tokenize(&decomposed);
        if let [only] = tokens.as_slice()
            && !only.contains(char::is_whitespace)
        {
            return Ok(title.to_string());
        }

        let mut parts = Vec::with_capacity(tokens.len());
        for token in tokens {
            let word = normalize_word(token);
            if word.is_empty() {
                continue;
            }
            let capitalization = Capitalization::of(token);
            match self.resolver.resolve(&word, &self.languages)? {
                Resolution::Dropped => {}
                Resolution::Abbreviated(text) => {
                    parts.push(format_term(&text, capitalization, use_punctuation));
                }
                Resolution::Unabbreviated(word) => {
                    parts.push(format_term(&word, capitalization, false));
                }
            }
        }
        let abbreviation: String = parts.join(" ").nfkc().collect();
        tracing::debug!(title, %abbreviation, "abbreviated journal title");
        Ok(abbreviation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abbreviator(data: &[&[&str]]) -> JournalAbbreviator {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|row| row.iter().map(|f| f.to_string()).collect())
            .collect();
        JournalAbbreviator::new(TermTables::from_rows(&rows)).unwrap()
    }

    #[test]
    fn test_single_word_unchanged() {
        let a = abbreviator(&[&["journal", "j.", "eng"]]);
        assert_eq!(a.journal_abbreviation("Journal", true), "Journal");
        assert_eq!(a.journal_abbreviation("  Journal ", false), "  Journal ");
    }

    #[test]
    fn test_single_multi_word_term_is_abbreviated() {
        let a = abbreviator(&[&["acta medica", "acta med.", "lat"]]);
        assert_eq!(a.journal_abbreviation("Acta Medica", false), "Acta Med");
    }

    #[test]
    fn test_punctuation_only_on_abbreviations() {
        let a = abbreviator(&[&["journal", "j.", "eng"], &["open", "n.a.", "eng"]]);
        assert_eq!(a.journal_abbreviation("Open Journal", true), "Open J.");
        assert_eq!(a.journal_abbreviation("Open Journal", false), "Open J");
    }

    #[test]
    fn test_upper_case_preserved() {
        let a = abbreviator(&[&["journal", "j.", "eng"], &["virology", "virol.", "eng"]]);
        assert_eq!(a.journal_abbreviation("JOURNAL OF VIROLOGY", true), "J. VIROL.");
    }

    #[test]
    fn test_output_is_recomposed() {
        let a = abbreviator(&[&["revue", "rev.", "fre"], &["medecine", "med.", "fre"]]);
        assert_eq!(a.journal_abbreviation("Revue Médicale", false), "Rev Médicale");
    }

    #[test]
    fn test_try_abbreviate_reports_conflict() {
        let a = abbreviator(&[&["annales", "ann.", "fre"], &["annales", "annls.", "ger"]]);
        let err = a.try_abbreviate("Annales de Chimie", true).unwrap_err();
        assert_eq!(err.term, "annales");
        assert_eq!(a.journal_abbreviation("Annales de Chimie", true), "Annales de Chimie");
    }

    #[test]
    fn test_with_languages() {
        let a = abbreviator(&[&["annales", "ann.", "fre"], &["annales", "annls.", "ger"]])
            .with_languages(["fre"]);
        assert_eq!(a.journal_abbreviation("Annales de Chimie", false), "Ann Chimie");
    }
}
