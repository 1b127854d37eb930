use once_cell::sync::Lazy;
use regex::Regex;

/// Up to eight ISSN characters once separators are gone; only the check
/// character may be `X`.
static COMPACT_ISSN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{0,7}[0-9X]$").unwrap());

/// Canonical `NNNN-NNNC` form of an ISSN, or `None` if `raw` is not one.
///
/// Hyphens and whitespace are dropped, a lowercase check character is
/// upper-cased and stripped leading zeros are restored, so CrossRef's
/// `"3784"` and Medline's `"0000-3784"` agree.
pub fn normalize_issn(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if !COMPACT_ISSN.is_match(&compact) {
        return None;
    }
    let padded = format!("{compact:0>8}");
    Some(format!("{}-{}", &padded[..4], &padded[4..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_form_unchanged() {
        assert_eq!(normalize_issn("0160-6999").as_deref(), Some("0160-6999"));
        assert_eq!(normalize_issn("1476-4687").as_deref(), Some("1476-4687"));
    }

    #[test]
    fn test_crossref_stripped_form() {
        assert_eq!(normalize_issn("14764687").as_deref(), Some("1476-4687"));
        assert_eq!(normalize_issn("1606999").as_deref(), Some("0160-6999"));
    }

    #[test]
    fn test_check_character() {
        assert_eq!(normalize_issn("0378-597x").as_deref(), Some("0378-597X"));
        assert_eq!(normalize_issn(" 2049-372X ").as_deref(), Some("2049-372X"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(normalize_issn(""), None);
        assert_eq!(normalize_issn("   "), None);
        assert_eq!(normalize_issn("X123-4567"), None);
        assert_eq!(normalize_issn("1234-56789"), None);
        assert_eq!(normalize_issn("n/a"), None);
    }
}
