//! Reader for the ISSN LTWA export.
//!
//! The ISSN publishes the list as a tab-separated text file encoded in
//! UTF-16LE with columns `WORD`, `ABBREVIATIONS`, `LANGUAGES`. Fields are
//! never quoted, and titles like `"Lancet"` contain bare quote characters.

use std::borrow::Cow;

use crate::LtwaError;

const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Decode and split the raw LTWA file into rows of fields.
///
/// A leading `WORD` header row and blank lines are skipped; rows keep
/// whatever number of fields they have so the table builder can report
/// malformed ones.
pub fn read_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, LtwaError> {
    let text = decode(bytes)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let fields: Vec<String> = record
            .iter()
            .map(|field| field.trim_end_matches('\r').to_string())
            .collect();
        if fields.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if index == 0 && fields[0].trim().eq_ignore_ascii_case("word") {
            continue;
        }
        rows.push(fields);
    }
    tracing::debug!(rows = rows.len(), "read LTWA source rows");
    Ok(rows)
}

/// UTF-16LE (with or without BOM) or UTF-8 (with or without BOM).
fn decode(bytes: &[u8]) -> Result<Cow<'_, str>, LtwaError> {
    if let Some(rest) = bytes.strip_prefix(&UTF16LE_BOM) {
        return decode_utf16le(rest).map(Cow::Owned);
    }
    if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
        return utf8(rest);
    }
    if looks_like_utf16le(bytes) {
        return decode_utf16le(bytes).map(Cow::Owned);
    }
    utf8(bytes)
}

/// ASCII-heavy UTF-16LE text has a zero high byte on most code units.
fn looks_like_utf16le(bytes: &[u8]) -> bool {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return false;
    }
    let units = bytes.len() / 2;
    let zero_high = bytes.chunks_exact(2).filter(|unit| unit[1] == 0).count();
    zero_high * 2 > units
}

fn decode_utf16le(bytes: &[u8]) -> Result<String, LtwaError> {
    if bytes.len() % 2 != 0 {
        return Err(LtwaError::Parse("odd number of bytes in UTF-16 input".into()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|unit| u16::from_le_bytes([unit[0], unit[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| LtwaError::Parse(format!("invalid UTF-16: {e}")))
}

fn utf8(bytes: &[u8]) -> Result<Cow<'_, str>, LtwaError> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|e| LtwaError::Parse(format!("invalid UTF-8: {e}")))
}

/// Encode text the way the ISSN distributes the list. Used to write fixtures.
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut bytes = UTF16LE_BOM.to_vec();
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}
