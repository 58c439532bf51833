use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tracing::{info, info_span, warn};

use redcap_cli::config::{CalcVariableConfig, Config, SecondaryIdFile, TransformConfig};
use redcap_client::{DatalakeSink, RedcapSettings, RedcapSource};
use redcap_core::{
    BatchEmitter, BatchSink, DryRunSink, EtlRun, PhiFilter, ProjectSettings, RunReport,
};
use redcap_fieldmap::{
    FieldMap, ReferenceSchema, ReferenceTable, SecondaryIdMapping, SecondaryIdPool,
    generate_pool, write_pool,
};
use redcap_model::{OutputMode, RunContext};
use redcap_transform::{
    CalcVariableTransform, DateTransform, DateTransformConfig, SecondaryIdTransform,
    TransformStage,
};

use crate::cli::{GeneratePoolArgs, RunArgs};
use crate::summary::print_status_counts;

/// Run id derived from the start time; unique per project and second.
pub fn run_id(project_id: u64, started_at: NaiveDateTime) -> String {
    format!("{project_id}-{}", started_at.format("%Y%m%dT%H%M%S%.6f"))
}

pub fn run(args: &RunArgs, config: &Config, started_at: NaiveDateTime) -> Result<RunReport> {
    let run_id = run_id(config.redcap.project_id, started_at);
    let span = info_span!("etl", project_id = config.redcap.project_id, fake = args.fake);
    let _guard = span.enter();

    // =========================================================================
    // Stage 0: Load static tables (fatal before any request)
    // =========================================================================
    let field_map = load_field_map(&config.field_map.path)?;
    let stage = build_stage(config)?;
    let emitter = BatchEmitter::new(config.datalake.chunk_size, config.redcap.include_metadata)?;

    // =========================================================================
    // Stage 1: Connect source and sink
    // =========================================================================
    let mut source = RedcapSource::new(RedcapSettings {
        api_url: config.redcap.api_url.clone(),
        api_token: config.redcap.api_token.clone(),
        id_field: config.redcap.id_field.clone(),
        screening_event: config.redcap.screening_event.clone(),
        filter_logic: config.redcap.api_filter.clone(),
        record_chunk_size: config.redcap.record_chunk_size,
    })?;
    let mut sink: Box<dyn BatchSink> = if args.fake {
        match &args.writeout {
            Some(path) => Box::new(
                DryRunSink::with_output(path)
                    .with_context(|| format!("open payload file {}", path.display()))?,
            ),
            None => Box::new(DryRunSink::new()),
        }
    } else {
        let endpoint = config
            .datalake
            .api_endpoint
            .clone()
            .context("[datalake] api_endpoint is not set")?;
        Box::new(DatalakeSink::new(endpoint)?)
    };

    // =========================================================================
    // Stage 2: Extract, transform, filter, emit
    // =========================================================================
    let mut etl = EtlRun {
        project: ProjectSettings {
            project_id: config.redcap.project_id,
            project_type: config.redcap.project_type.clone(),
        },
        field_map: &field_map,
        stage,
        filter: PhiFilter::new(config.filter.log_restricted_events),
        emitter,
    };
    let mut ctx = RunContext::new(run_id);
    let report = etl
        .execute(&mut source, sink.as_mut(), &mut ctx, started_at)
        .context("run failed")?;

    if !report.field_map_errors.is_empty() {
        warn!(
            fields = report.field_map_errors.len(),
            "fields missing from the field map were dropped"
        );
    }
    info!(
        run_id = %report.run_id,
        released = report.filter.released,
        chunks = report.emit.chunks_sent,
        "run complete"
    );
    Ok(report)
}

/// Loads every local table the configuration names and prints the field-map
/// status counts. Sends no requests.
pub fn check(config: &Config) -> Result<()> {
    let field_map = load_field_map(&config.field_map.path)?;
    println!(
        "Field map: {} ({} fields, sha256 {})",
        config.field_map.path.display(),
        field_map.len(),
        field_map.sha256()
    );
    print_status_counts(&field_map.status_counts());

    let stage = build_stage(config)?;
    let namespaces: Vec<&str> = stage.namespaces().collect();
    if namespaces.is_empty() {
        println!("Transforms: none");
    } else {
        println!("Transforms: {}", namespaces.join(" -> "));
    }
    Ok(())
}

pub fn generate(args: &GeneratePoolArgs) -> Result<()> {
    let ids = generate_pool(args.start, args.count, args.seed)?;
    write_pool(&args.output, &ids)
        .with_context(|| format!("write pool {}", args.output.display()))?;
    info!(
        path = %args.output.display(),
        count = ids.len(),
        seeded = args.seed.is_some(),
        "secondary id pool written"
    );
    println!("Wrote {} ids to {}", ids.len(), args.output.display());
    Ok(())
}

fn load_field_map(path: &Path) -> Result<FieldMap> {
    let field_map = FieldMap::from_path(path)
        .with_context(|| format!("load field map {}", path.display()))?;
    info!(
        path = %path.display(),
        fields = field_map.len(),
        sha256 = field_map.sha256(),
        "field map loaded"
    );
    Ok(field_map)
}

/// Transforms run SecondaryId, then Date, then CalcVariable. A transform
/// whose section is absent is not constructed.
fn build_stage(config: &Config) -> Result<TransformStage> {
    let mut stage = TransformStage::new();
    if let Some(ids) = &config.secondary_ids {
        let transform = match ids.source()? {
            SecondaryIdFile::Pool(path) => {
                let pool = SecondaryIdPool::from_path(path)
                    .with_context(|| format!("load secondary id pool {}", path.display()))?;
                info!(path = %path.display(), ids = pool.len(), "secondary id pool loaded");
                SecondaryIdTransform::from_pool(pool)
            }
            SecondaryIdFile::Mapping(path) => {
                let mapping = SecondaryIdMapping::from_path(path).with_context(|| {
                    format!("load secondary id mapping {}", path.display())
                })?;
                info!(path = %path.display(), subjects = mapping.len(), "secondary id mapping loaded");
                SecondaryIdTransform::from_mapping(mapping)
            }
        };
        stage.push(Box::new(transform));
    }
    if let Some(transform) = &config.transform {
        stage.push(Box::new(date_transform(transform)?));
    }
    if let Some(calc) = &config.calc_variables {
        stage.push(Box::new(calc_transform(calc)?));
    }
    Ok(stage)
}

fn date_transform(config: &TransformConfig) -> Result<DateTransform> {
    let date_config = DateTransformConfig::new(
        config.mode,
        OutputMode::from_in_place(config.in_place),
        config.anchor_date,
    )
    .with_shift_seconds(config.shift_seconds.unwrap_or_default())
    .with_dob_field(config.dob_field.clone());
    let transform = DateTransform::new(date_config).context("configure date transform")?;
    Ok(transform)
}

fn calc_transform(config: &CalcVariableConfig) -> Result<CalcVariableTransform> {
    let schema = ReferenceSchema::new(config.schema_variant, config.expected_columns.iter().cloned());
    let path = &config.reference_file;
    let table = ReferenceTable::from_path(path, &schema)
        .with_context(|| format!("load reference table {}", path.display()))?;
    info!(
        path = %path.display(),
        key = %config.schema_variant,
        rows = table.len(),
        sha256 = table.sha256(),
        "reference table loaded"
    );
    Ok(CalcVariableTransform::new(table).with_descriptions(config.descriptions.clone()))
}
