//! Per-field transforms applied to extracted records before filtering.
//!
//! - **stage**: the [`Transform`] capability and the ordered [`TransformStage`]
//! - **date**: date de-identification (`DateVars`)
//! - **calc_variables**: reference-table join (`CalcVars`)
//! - **secondary_id**: pseudonymous subject ids (`SecondaryID`)
//! - **datetime**: date parsing, formatting, and offsets

pub mod calc_variables;
pub mod date;
pub mod datetime;
pub mod error;
pub mod result;
pub mod secondary_id;
pub mod stage;

pub use calc_variables::CalcVariableTransform;
pub use date::{DateTransform, DateTransformConfig};
pub use error::{Result, TransformError};
pub use result::{Diagnostic, DiagnosticLevel, TransformResult, TransformStats};
pub use secondary_id::{SecondaryIdSource, SecondaryIdTransform};
pub use stage::{StageOutput, Transform, TransformStage};
