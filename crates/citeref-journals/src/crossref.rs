//! Parser for the CrossRef title list (`titleFile.csv`).

use std::io::Read;

use serde::Deserialize;

use crate::{CrossRefJournal, JournalsError};

#[derive(Debug, Deserialize)]
struct TitleRow {
    #[serde(rename = "JournalTitle")]
    title: String,
    pissn: Option<String>,
    eissn: Option<String>,
    doi: Option<String>,
}

/// Parse the CrossRef title list, calling `on_record` for each row with a
/// title. Malformed rows are logged and skipped. Returns the number of
/// records emitted.
pub fn parse_crossref<R: Read>(
    reader: R,
    mut on_record: impl FnMut(CrossRefJournal),
) -> Result<u64, JournalsError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if !headers.iter().any(|h| h == "JournalTitle") {
        return Err(JournalsError::Parse(
            "CrossRef title list has no JournalTitle column".into(),
        ));
    }

    let mut emitted = 0u64;
    let mut skipped = 0u64;
    for (index, row) in reader.deserialize::<TitleRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(line = index + 2, error = %e, "skipping malformed CrossRef row");
                skipped += 1;
                continue;
            }
        };
        if row.title.is_empty() {
            continue;
        }
        emitted += 1;
        on_record(CrossRefJournal {
            title: row.title,
            issn_print: non_empty(row.pissn),
            issn_online: non_empty(row.eissn),
            doi: non_empty(row.doi),
        });
    }

    tracing::debug!(records = emitted, skipped, "parsed CrossRef title list");
    Ok(emitted)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
JournalTitle,JournalID,Publisher,pissn,eissn,additionalIssns,doi,(year1)[volume1]issue1
\"Nature\",1,\"Springer Nature\",00280836,14764687,,10.1038/nature,\"(1869)[1]1\"
\"Journal of Stuff, Letters\",2,\"Acme\",,2049372X,,,
,3,\"Nobody\",12345678,,,,
\"Print Only\",4,\"Acme\",03785974,,,10.1000/po,
";

    fn parse(text: &str) -> Vec<CrossRefJournal> {
        let mut records = Vec::new();
        parse_crossref(text.as_bytes(), |r| records.push(r)).unwrap();
        records
    }

    #[test]
    fn test_parse_rows() {
        let records = parse(SAMPLE);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].title, "Nature");
        assert_eq!(records[0].issn_print.as_deref(), Some("00280836"));
        assert_eq!(records[0].issn_online.as_deref(), Some("14764687"));
        assert_eq!(records[0].doi.as_deref(), Some("10.1038/nature"));
    }

    #[test]
    fn test_quoted_commas_and_empty_fields() {
        let records = parse(SAMPLE);
        assert_eq!(records[1].title, "Journal of Stuff, Letters");
        assert_eq!(records[1].issn_print, None);
        assert_eq!(records[1].doi, None);
    }

    #[test]
    fn test_missing_title_column() {
        let result = parse_crossref("a,b\n1,2\n".as_bytes(), |_| {});
        assert!(matches!(result, Err(JournalsError::Parse(_))));
    }
}
