//! Output formatting: re-apply the casing of the original title word and
//! the optional abbreviation period.

/// Casing style of an original title word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capitalization {
    Upper,
    Title,
    Lower,
}

impl Capitalization {
    /// `"NMR"` is upper, `"Journal"` title, anything else lower. Words
    /// without cased letters count as upper.
    pub fn of(word: &str) -> Self {
        if word.to_uppercase() == word {
            Capitalization::Upper
        } else if word.chars().next().is_some_and(char::is_uppercase) {
            Capitalization::Title
        } else {
            Capitalization::Lower
        }
    }
}

/// Format a resolved value for display.
///
/// Every space-separated part gets the casing style and, when
/// `with_period` is set, a trailing `.`.
pub fn format_term(value: &str, capitalization: Capitalization, with_period: bool) -> String {
    value
        .split(' ')
        .map(|part| {
            let mut part = match capitalization {
                Capitalization::Upper => part.to_uppercase(),
                Capitalization::Title => capitalize_words(part),
                Capitalization::Lower => part.to_string(),
            };
            if with_period {
                part.push('.');
            }
            part
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_words(text: &str) -> String {
    text.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalization_of() {
        assert_eq!(Capitalization::of("NMR"), Capitalization::Upper);
        assert_eq!(Capitalization::of("Journal"), Capitalization::Title);
        assert_eq!(Capitalization::of("McGill"), Capitalization::Title);
        assert_eq!(Capitalization::of("journal"), Capitalization::Lower);
        assert_eq!(Capitalization::of("eLife"), Capitalization::Lower);
        assert_eq!(Capitalization::of("2020"), Capitalization::Upper);
    }

    #[test]
    fn test_format_title_case() {
        assert_eq!(format_term("stomatol", Capitalization::Title, false), "Stomatol");
        assert_eq!(format_term("stomatol", Capitalization::Title, true), "Stomatol.");
    }

    #[test]
    fn test_format_upper_and_lower() {
        assert_eq!(format_term("j", Capitalization::Upper, true), "J.");
        assert_eq!(format_term("j", Capitalization::Lower, true), "j.");
        assert_eq!(format_term("j", Capitalization::Lower, false), "j");
    }

    #[test]
    fn test_format_every_part() {
        assert_eq!(format_term("u s", Capitalization::Title, true), "U. S.");
        assert_eq!(
            format_term("acta med", Capitalization::Title, false),
            "Acta Med"
        );
    }
}
