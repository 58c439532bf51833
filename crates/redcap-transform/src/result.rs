//! Per-transform results and diagnostics.

use redcap_model::TransformRecord;

/// Output of one transform pass.
#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    /// Derived records produced in side-channel mode.
    pub transform_records: Vec<TransformRecord>,

    /// Execution counters.
    pub stats: TransformStats,

    /// Non-fatal problems encountered during the pass.
    pub diagnostics: Vec<Diagnostic>,
}

impl TransformResult {
    pub fn push_record(&mut self, record: TransformRecord) {
        self.transform_records.push(record);
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Count errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .count()
    }
}

/// Counters for a single transform pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    /// Records the transform applied to.
    pub records_scanned: usize,

    /// Records rewritten in place or turned into a transform record.
    pub records_mutated: usize,

    /// Records left untouched because of a per-record data problem.
    pub records_skipped: usize,
}

/// A diagnostic message from a transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub record_id: Option<String>,
    pub field_name: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message: message.into(),
            record_id: None,
            field_name: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            ..Self::error(message)
        }
    }

    pub fn with_record(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_field(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// Worth a look, nothing was dropped.
    Warning,
    /// A record was skipped.
    Error,
}
