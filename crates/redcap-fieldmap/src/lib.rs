#![deny(unsafe_code)]

//! Loaders for the static tables a run depends on.
//!
//! - **field_map**: per-field release policy
//! - **reference**: de-identified reference table for calculated variables
//! - **secondary_ids**: secondary-id pool and mapping files, pool generation

mod csv_utils;
pub mod error;
pub mod field_map;
pub mod hash;
pub mod reference;
pub mod secondary_ids;

pub use crate::error::FieldMapError;
pub use crate::field_map::FieldMap;
pub use crate::reference::{ReferenceSchema, ReferenceSchemaVariant, ReferenceTable};
pub use crate::secondary_ids::{SecondaryIdMapping, SecondaryIdPool, generate_pool, write_pool};
