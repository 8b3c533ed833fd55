//! Metadata sequence decoding.
//!
//! Accepts either a JSON array of records or JSON Lines (one record per
//! line). Record order is row order.

use rag_core::MetadataRecord;

use crate::error::{Result, VectorDbError};

/// Decode a metadata artifact into its ordered record sequence.
pub fn decode(bytes: &[u8]) -> Result<Vec<MetadataRecord>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| VectorDbError::Metadata(format!("not valid UTF-8: {e}")))?;
    let text = text.trim_start_matches('\u{feff}');

    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text)
            .map_err(|e| VectorDbError::Metadata(format!("JSON array: {e}")));
    }

    let mut records = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let rec: MetadataRecord = serde_json::from_str(line)
            .map_err(|e| VectorDbError::Metadata(format!("line {}: {e}", lineno + 1)))?;
        records.push(rec);
    }
    Ok(records)
}

/// Encode records as a JSON array.
pub fn encode(records: &[MetadataRecord]) -> Result<Vec<u8>> {
    serde_json::to_vec(records).map_err(|e| VectorDbError::Metadata(e.to_string()))
}
