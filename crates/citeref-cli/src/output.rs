use std::io::Write;

use citeref_journals::{CrossRefJournal, MedlineJournal};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// One title and its abbreviation. Titles that came back unchanged are dimmed.
pub fn print_abbreviation(
    w: &mut dyn Write,
    title: &str,
    abbreviation: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    if !color.enabled() {
        return writeln!(w, "{} => {}", title, abbreviation);
    }
    if title == abbreviation {
        writeln!(w, "{} => {}", title, abbreviation.dimmed())
    } else {
        writeln!(w, "{} => {}", title, abbreviation.green().bold())
    }
}

/// Everything both journal lists know about one ISSN.
pub fn print_lookup(
    w: &mut dyn Write,
    issn: &str,
    medline: Option<&MedlineJournal>,
    crossref: Option<&CrossRefJournal>,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", issn.bold())?;
    } else {
        writeln!(w, "{}", issn)?;
    }

    if medline.is_none() && crossref.is_none() {
        let msg = "  not found in Medline or CrossRef";
        if color.enabled() {
            writeln!(w, "{}", msg.yellow())?;
        } else {
            writeln!(w, "{}", msg)?;
        }
        return Ok(());
    }

    if let Some(journal) = medline {
        field(w, "Medline title", Some(journal.title.as_str()))?;
        field(w, "Medline abbreviation", journal.medline_abbreviation.as_deref())?;
        field(w, "ISO abbreviation", journal.iso_abbreviation.as_deref())?;
        field(w, "NLM ID", journal.nlm_id.as_deref())?;
    }
    if let Some(journal) = crossref {
        field(w, "CrossRef title", Some(journal.title.as_str()))?;
        field(w, "Journal DOI", journal.doi.as_deref())?;
    }
    Ok(())
}

fn field(w: &mut dyn Write, label: &str, value: Option<&str>) -> std::io::Result<()> {
    match value {
        Some(value) => writeln!(w, "  {:<22} {}", format!("{label}:"), value),
        None => Ok(()),
    }
}

/// Warning line on stderr-style output.
pub fn print_warning(w: &mut dyn Write, msg: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "warning:".yellow().bold(), msg)
    } else {
        writeln!(w, "warning: {}", msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: ColorMode = ColorMode(false);

    fn render(f: impl FnOnce(&mut dyn Write) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn abbreviation_line() {
        let out = render(|w| print_abbreviation(w, "Open Journal of Stomatology", "Open J. Stomatol.", PLAIN));
        assert_eq!(out, "Open Journal of Stomatology => Open J. Stomatol.\n");
    }

    #[test]
    fn lookup_lists_known_fields() {
        let medline = MedlineJournal {
            title: "Journal of molecular biology".into(),
            medline_abbreviation: Some("J Mol Biol".into()),
            iso_abbreviation: Some("J. Mol. Biol.".into()),
            ..Default::default()
        };
        let out = render(|w| print_lookup(w, "0022-2836", Some(&medline), None, PLAIN));
        assert!(out.starts_with("0022-2836\n"));
        assert!(out.contains("ISO abbreviation:      J. Mol. Biol.\n"));
        assert!(!out.contains("NLM ID"));
        assert!(!out.contains("CrossRef"));
    }

    #[test]
    fn lookup_not_found() {
        let out = render(|w| print_lookup(w, "9999-9999", None, None, PLAIN));
        assert_eq!(out, "9999-9999\n  not found in Medline or CrossRef\n");
    }

    #[test]
    fn plain_warning() {
        let out = render(|w| print_warning(w, "stale", PLAIN));
        assert_eq!(out, "warning: stale\n");
    }
}
