//! The transform capability and the ordered stage that runs it.

use redcap_fieldmap::FieldMap;
use redcap_model::{FieldDescriptor, Record, RunContext, TransformMetadata, TransformRecord};
use tracing::{info, info_span};

use crate::error::Result;
use crate::result::{TransformResult, TransformStats};

/// A pluggable per-field transform.
///
/// Each implementation owns its configuration and any loaded tables. Shared
/// run state lives in the [`RunContext`] passed to [`Transform::process`].
pub trait Transform {
    /// Namespace of the transform records this transform produces.
    fn namespace(&self) -> &str;

    /// Processes the full record set. In-place transforms mutate `records`;
    /// side-channel transforms return transform records in the result.
    fn process(
        &mut self,
        records: &mut [Record],
        field_map: &FieldMap,
        ctx: &mut RunContext,
    ) -> Result<TransformResult>;

    /// Fields this transform can produce, independent of what a pass emitted.
    fn metadata(&self) -> Vec<FieldDescriptor>;
}

/// Ordered list of transforms applied before filtering.
#[derive(Default)]
pub struct TransformStage {
    transforms: Vec<Box<dyn Transform>>,
}

/// Everything a stage run produced.
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    pub transform_records: Vec<TransformRecord>,
    pub metadata: TransformMetadata,
    /// `(namespace, stats)` in execution order.
    pub stats: Vec<(String, TransformStats)>,
    pub error_count: usize,
}

impl TransformStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transform; transforms run in insertion order.
    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    pub fn with(mut self, transform: impl Transform + 'static) -> Self {
        self.push(Box::new(transform));
        self
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.transforms.iter().map(|t| t.namespace())
    }

    /// Runs every transform in order. The first error aborts the stage.
    pub fn run(
        &mut self,
        records: &mut [Record],
        field_map: &FieldMap,
        ctx: &mut RunContext,
    ) -> Result<StageOutput> {
        let mut output = StageOutput::default();
        for transform in &mut self.transforms {
            let namespace = transform.namespace().to_string();
            let span = info_span!("transform", namespace = %namespace);
            let _guard = span.enter();

            let result = transform.process(records, field_map, ctx)?;
            info!(
                scanned = result.stats.records_scanned,
                mutated = result.stats.records_mutated,
                skipped = result.stats.records_skipped,
                emitted = result.transform_records.len(),
                "transform complete"
            );
            output.error_count += result.error_count();
            output.stats.push((namespace.clone(), result.stats));
            output.transform_records.extend(result.transform_records);
            output.metadata.insert(namespace, transform.metadata());
        }
        Ok(output)
    }
}
