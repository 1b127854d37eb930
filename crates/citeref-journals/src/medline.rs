//! Streaming parser for the NLM `J_Medline.txt` journal list.
//!
//! Records are blocks of `Key: value` lines between dashed separators:
//!
//! ```text
//! --------------------------------------------------------
//! JrId: 1
//! JournalTitle: AADE editors' journal
//! MedAbbr: AADE Ed J
//! ISSN (Print): 0160-6999
//! ISSN (Online):
//! IsoAbbr: AADE Ed J
//! NlmId: 7708172
//! --------------------------------------------------------
//! ```

use std::io::BufRead;

use crate::{JournalsError, MedlineJournal};

/// Parse a Medline journal list, calling `on_record` for every record that
/// has a journal title. Returns the number of records emitted.
pub fn parse_medline<R: BufRead>(
    reader: R,
    mut on_record: impl FnMut(MedlineJournal),
) -> Result<u64, JournalsError> {
    let mut current = MedlineJournal::default();
    let mut emitted = 0u64;

    let mut flush = |record: &mut MedlineJournal| {
        let record = std::mem::take(record);
        if !record.title.is_empty() {
            emitted += 1;
            on_record(record);
        }
    };

    for line in reader.lines() {
        let line = line?;
        if line.contains("----") {
            flush(&mut current);
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let value = value.to_string();
        match key.trim() {
            "JournalTitle" => current.title = value,
            "MedAbbr" => current.medline_abbreviation = Some(value),
            "IsoAbbr" => current.iso_abbreviation = Some(value),
            "ISSN (Print)" => current.issn_print = Some(value),
            "ISSN (Online)" => current.issn_online = Some(value),
            "NlmId" => current.nlm_id = Some(value),
            _ => {}
        }
    }
    flush(&mut current);

    tracing::debug!(records = emitted, "parsed Medline journal list");
    Ok(emitted)
}
