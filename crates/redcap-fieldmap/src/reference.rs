//! De-identified reference table joined by the calculated-variable transform.
//!
//! The table is a CSV keyed by either the study id or the secondary id. Its
//! header must match the configured schema exactly: the key column, every
//! expected value column, and nothing else. Any mismatch is fatal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::csv_utils::{CsvTable, get_string};
use crate::error::{FieldMapError, Result};
use crate::hash::sha256_hex;

/// Which identifier the reference table is keyed by.
///
/// The variant fixes only the key column. The value columns a table must
/// carry are the `expected_columns` of its [`ReferenceSchema`], the same for
/// both variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSchemaVariant {
    /// Keyed by the REDCap record id, column `study_id`.
    #[default]
    StudyId,
    /// Keyed by the secondary id assigned earlier in the run, column
    /// `secondary_id`.
    SecondaryId,
}

impl ReferenceSchemaVariant {
    pub fn key_column(&self) -> &'static str {
        match self {
            Self::StudyId => "study_id",
            Self::SecondaryId => "secondary_id",
        }
    }
}

impl fmt::Display for ReferenceSchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_column())
    }
}

/// Expected shape of a reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSchema {
    pub variant: ReferenceSchemaVariant,
    pub expected_columns: Vec<String>,
}

impl ReferenceSchema {
    pub fn new<I, S>(variant: ReferenceSchemaVariant, expected_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variant,
            expected_columns: expected_columns.into_iter().map(Into::into).collect(),
        }
    }

    fn validate(&self, headers: &[String], origin: &str) -> Result<()> {
        let schema_error = |message: String| FieldMapError::ReferenceSchema {
            origin: origin.to_string(),
            message,
        };

        if self.expected_columns.is_empty() {
            return Err(schema_error("no expected columns configured".to_string()));
        }
        let mut seen = BTreeSet::new();
        for header in headers {
            if !seen.insert(header.as_str()) {
                return Err(schema_error(format!("duplicate column {header:?}")));
            }
        }

        let key = self.variant.key_column();
        if !seen.contains(key) {
            return Err(schema_error(format!("missing key column {key:?}")));
        }
        let missing: Vec<&str> = self
            .expected_columns
            .iter()
            .map(String::as_str)
            .filter(|column| !seen.contains(column))
            .collect();
        if !missing.is_empty() {
            return Err(schema_error(format!(
                "missing expected columns: {}",
                missing.join(", ")
            )));
        }
        let unexpected: Vec<&str> = headers
            .iter()
            .map(String::as_str)
            .filter(|h| *h != key && !self.expected_columns.iter().any(|c| c == h))
            .collect();
        if !unexpected.is_empty() {
            return Err(schema_error(format!(
                "unexpected columns: {}",
                unexpected.join(", ")
            )));
        }
        Ok(())
    }
}

/// Validated reference table.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    variant: ReferenceSchemaVariant,
    columns: Vec<String>,
    rows: BTreeMap<String, Vec<Option<String>>>,
    sha256: String,
}

impl ReferenceTable {
    pub fn from_path(path: &Path, schema: &ReferenceSchema) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| FieldMapError::io(path, e))?;
        Self::from_bytes(&bytes, &path.display().to_string(), schema)
    }

    pub fn from_bytes(bytes: &[u8], origin: &str, schema: &ReferenceSchema) -> Result<Self> {
        let table = CsvTable::parse(bytes, origin)?;
        schema.validate(&table.headers, origin)?;

        let key_idx = table.require(schema.variant.key_column(), origin)?;
        let value_columns: Vec<(usize, String)> = table
            .headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != key_idx)
            .map(|(idx, name)| (idx, name.clone()))
            .collect();

        let mut rows = BTreeMap::new();
        for (row_number, row) in table.rows.iter().enumerate() {
            let key = get_string(row, Some(key_idx)).ok_or_else(|| FieldMapError::EmptyKey {
                origin: origin.to_string(),
                row: row_number + 2,
                column: schema.variant.key_column().to_string(),
            })?;
            let values = value_columns
                .iter()
                .map(|(idx, _)| get_string(row, Some(*idx)))
                .collect();
            if rows.insert(key.clone(), values).is_some() {
                return Err(FieldMapError::ReferenceSchema {
                    origin: origin.to_string(),
                    message: format!("duplicate key {key:?}"),
                });
            }
        }

        debug!(origin, rows = rows.len(), key = %schema.variant, "reference table loaded");
        Ok(Self {
            variant: schema.variant,
            columns: value_columns.into_iter().map(|(_, name)| name).collect(),
            rows,
            sha256: sha256_hex(bytes),
        })
    }

    pub fn variant(&self) -> ReferenceSchemaVariant {
        self.variant
    }

    /// Value columns (everything except the key), in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Non-blank `(column, value)` pairs for `key`, or `None` when the key is
    /// not in the table.
    pub fn row<'a>(
        &'a self,
        key: &str,
    ) -> Option<impl Iterator<Item = (&'a str, &'a str)> + use<'a>> {
        let values = self.rows.get(key)?;
        Some(
            self.columns
                .iter()
                .zip(values)
                .filter_map(|(column, value)| Some((column.as_str(), value.as_deref()?))),
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }
}
