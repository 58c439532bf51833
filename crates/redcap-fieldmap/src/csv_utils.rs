//! Shared CSV helpers for the policy and reference tables.

use crate::error::{FieldMapError, Result};

/// Parsed CSV table: normalized headers plus raw rows.
pub(crate) struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<csv::StringRecord>,
}

impl CsvTable {
    /// Reads all rows. Headers are trimmed and a leading BOM is stripped.
    pub fn parse(bytes: &[u8], origin: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);
        let headers = reader
            .headers()
            .map_err(|e| FieldMapError::csv(origin, &e))?
            .iter()
            .map(|h| h.trim_matches('\u{feff}').trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for row in reader.records() {
            rows.push(row.map_err(|e| FieldMapError::csv(origin, &e))?);
        }
        Ok(Self { headers, rows })
    }

    pub fn header_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require(&self, name: &str, origin: &str) -> Result<usize> {
        self.header_index(name)
            .ok_or_else(|| FieldMapError::MissingColumn {
                origin: origin.to_string(),
                column: name.to_string(),
            })
    }
}

/// Cell value with null-like content (empty, whitespace) normalized to `None`.
pub(crate) fn get_string(row: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| row.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Splits a list cell on commas, semicolons, or whitespace.
pub(crate) fn split_list(s: &str) -> Vec<String> {
    s.split([';', ',', ' ', '\t', '\n'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
