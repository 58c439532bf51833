//! Secondary-id sources: a pre-shuffled pool, or a fixed subject mapping.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::csv_utils::{CsvTable, get_string};
use crate::error::{FieldMapError, Result};

const POOL_HEADER: &str = "secondary_id";

/// Ordered list of unissued secondary ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIdPool {
    ids: Vec<u64>,
}

impl SecondaryIdPool {
    pub fn new(ids: Vec<u64>) -> Self {
        Self { ids }
    }

    /// Reads one id per line. Blank lines, `#` comments and an optional
    /// `secondary_id` header line are ignored.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FieldMapError::io(path, e))?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let mut ids = Vec::new();
        let mut seen = BTreeSet::new();
        for (line_number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line == POOL_HEADER {
                continue;
            }
            let id: u64 = line.parse().map_err(|_| FieldMapError::InvalidSecondaryId {
                origin: origin.to_string(),
                row: line_number + 1,
                value: line.to_string(),
            })?;
            if !seen.insert(id) {
                return Err(FieldMapError::DuplicateSecondaryId {
                    origin: origin.to_string(),
                    id,
                });
            }
            ids.push(id);
        }
        debug!(origin, size = ids.len(), "secondary id pool loaded");
        Ok(Self { ids })
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Fixed `record_id -> secondary_id` assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecondaryIdMapping {
    ids: BTreeMap<String, u64>,
}

impl SecondaryIdMapping {
    pub fn new(ids: BTreeMap<String, u64>) -> Self {
        Self { ids }
    }

    /// Reads a CSV with `record_id` and `secondary_id` columns.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| FieldMapError::io(path, e))?;
        Self::from_bytes(&bytes, &path.display().to_string())
    }

    pub fn from_bytes(bytes: &[u8], origin: &str) -> Result<Self> {
        let table = CsvTable::parse(bytes, origin)?;
        let idx_record = table.require("record_id", origin)?;
        let idx_secondary = table.require(POOL_HEADER, origin)?;

        let mut ids = BTreeMap::new();
        let mut issued = BTreeSet::new();
        for (row_number, row) in table.rows.iter().enumerate() {
            let row_number = row_number + 2;
            let record_id =
                get_string(row, Some(idx_record)).ok_or_else(|| FieldMapError::EmptyKey {
                    origin: origin.to_string(),
                    row: row_number,
                    column: "record_id".to_string(),
                })?;
            let raw = get_string(row, Some(idx_secondary)).unwrap_or_default();
            let id: u64 = raw.parse().map_err(|_| FieldMapError::InvalidSecondaryId {
                origin: origin.to_string(),
                row: row_number,
                value: raw.clone(),
            })?;
            if !issued.insert(id) {
                return Err(FieldMapError::DuplicateSecondaryId {
                    origin: origin.to_string(),
                    id,
                });
            }
            if ids.insert(record_id.clone(), id).is_some() {
                return Err(FieldMapError::DuplicateField {
                    origin: origin.to_string(),
                    field_name: record_id,
                });
            }
        }
        debug!(origin, subjects = ids.len(), "secondary id mapping loaded");
        Ok(Self { ids })
    }

    pub fn get(&self, record_id: &str) -> Option<u64> {
        self.ids.get(record_id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Generates `count` consecutive ids starting at `start`, shuffled.
///
/// With a seed the order is reproducible; without one the RNG is seeded from
/// the operating system.
pub fn generate_pool(start: u64, count: u64, seed: Option<u64>) -> Result<Vec<u64>> {
    let end = start
        .checked_add(count)
        .ok_or(FieldMapError::PoolRange { start, count })?;
    let mut ids: Vec<u64> = (start..end).collect();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    ids.shuffle(&mut rng);
    Ok(ids)
}

/// Writes a pool file, one id per line. Refuses to overwrite an existing file.
pub fn write_pool(path: &Path, ids: &[u64]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| FieldMapError::io(path, e))?;
    let mut contents = String::with_capacity(ids.len() * 8);
    contents.push_str(POOL_HEADER);
    contents.push('\n');
    for id in ids {
        contents.push_str(&id.to_string());
        contents.push('\n');
    }
    file.write_all(contents.as_bytes())
        .map_err(|e| FieldMapError::io(path, e))
}
