use regex::{Regex, RegexBuilder};

/// Room for a few hundred case-insensitive multi-word alternatives.
const PATTERN_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Splits titles on whitespace while keeping configured multi-word terms
/// (e.g. `"acta medica"`) together as single tokens.
#[derive(Debug, Clone)]
pub(crate) struct Tokenizer {
    pattern: Regex,
}

impl Tokenizer {
    /// `multi_word_terms` must already be regex-escaped. Alternatives are
    /// tried in list order, so at a given position the first listed term wins.
    pub(crate) fn new(multi_word_terms: &[String]) -> Result<Self, regex::Error> {
        let pattern = if multi_word_terms.is_empty() {
            r"\s+".to_string()
        } else {
            let alternatives: Vec<String> = multi_word_terms
                .iter()
                .map(|term| format!(r"(?:^|\s){term}(?:\s|$)"))
                .collect();
            format!(r"{}|\s+", alternatives.join("|"))
        };
        let pattern = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()?;
        Ok(Self { pattern })
    }

    /// Ordered, trimmed, non-empty tokens of `title`.
    pub(crate) fn tokenize<'t>(&self, title: &'t str) -> Vec<&'t str> {
        let mut tokens = Vec::new();
        let mut last = 0;
        for found in self.pattern.find_iter(title) {
            tokens.push(&title[last..found.start()]);
            tokens.push(found.as_str());
            last = found.end();
        }
        tokens.push(&title[last..]);
        tokens
            .into_iter()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| regex::escape(t)).collect()
    }

    #[test]
    fn test_whitespace_split() {
        let tokenizer = Tokenizer::new(&[]).unwrap();
        assert_eq!(
            tokenizer.tokenize("  Open Journal\tof   Stomatology "),
            vec!["Open", "Journal", "of", "Stomatology"]
        );
    }

    #[test]
    fn test_multi_word_term_kept_together() {
        let tokenizer = Tokenizer::new(&terms(&["acta medica"])).unwrap();
        assert_eq!(
            tokenizer.tokenize("Archives of Acta Medica Research"),
            vec!["Archives", "of", "Acta Medica", "Research"]
        );
    }

    #[test]
    fn test_multi_word_term_at_edges() {
        let tokenizer = Tokenizer::new(&terms(&["acta medica"])).unwrap();
        assert_eq!(
            tokenizer.tokenize("acta medica Scandinavica"),
            vec!["acta medica", "Scandinavica"]
        );
        assert_eq!(
            tokenizer.tokenize("Nova ACTA MEDICA"),
            vec!["Nova", "ACTA MEDICA"]
        );
    }

    #[test]
    fn test_multi_word_term_needs_whole_words() {
        let tokenizer = Tokenizer::new(&terms(&["acta medica"])).unwrap();
        assert_eq!(
            tokenizer.tokenize("Exacta Medicals"),
            vec!["Exacta", "Medicals"]
        );
    }

    #[test]
    fn test_empty_title() {
        let tokenizer = Tokenizer::new(&terms(&["acta medica"])).unwrap();
        assert!(tokenizer.tokenize("   ").is_empty());
        assert!(tokenizer.tokenize("").is_empty());
    }

    #[test]
    fn test_escaped_metacharacters() {
        let tokenizer = Tokenizer::new(&terms(&["c. r. acad"])).unwrap();
        assert_eq!(
            tokenizer.tokenize("Bulletin C. R. Acad Sci"),
            vec!["Bulletin", "C. R. Acad", "Sci"]
        );
    }
}
