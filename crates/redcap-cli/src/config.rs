//! TOML run configuration.
//!
//! The configuration file is read once at startup and validated before any
//! table is loaded or any request is sent. Optional sections switch the
//! matching transform off when absent.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use redcap_core::DEFAULT_CHUNK_SIZE;
use redcap_fieldmap::ReferenceSchemaVariant;
use redcap_model::TransformMode;
use serde::Deserialize;
use thiserror::Error;
use tracing::error;

/// Environment variable that overrides `[redcap] api_token`.
pub const API_TOKEN_ENV: &str = "REDCAP_API_TOKEN";

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("[{section}] {message}")]
    Invalid {
        section: &'static str,
        message: String,
    },
}

fn invalid(section: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        section,
        message: message.into(),
    }
}

/// What the configuration is about to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Local table checks only; no credentials needed.
    Check,
    /// Extraction without delivery.
    FakeRun,
    Run,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub redcap: RedcapConfig,
    #[serde(default)]
    pub datalake: DatalakeConfig,
    pub field_map: FieldMapConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    pub transform: Option<TransformConfig>,
    pub secondary_ids: Option<SecondaryIdConfig>,
    pub calc_variables: Option<CalcVariableConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedcapConfig {
    pub api_url: String,
    #[serde(default)]
    pub api_token: String,
    pub project_id: u64,
    pub project_type: String,
    pub api_filter: Option<String>,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_screening_event")]
    pub screening_event: String,
    #[serde(default = "default_record_chunk_size")]
    pub record_chunk_size: usize,
    #[serde(default)]
    pub include_metadata: bool,
}

fn default_id_field() -> String {
    "study_id".to_string()
}

fn default_screening_event() -> String {
    "screening_arm_1".to_string()
}

fn default_record_chunk_size() -> usize {
    redcap_client::DEFAULT_RECORD_CHUNK_SIZE
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatalakeConfig {
    pub api_endpoint: Option<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for DatalakeConfig {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldMapConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub log_restricted_events: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformConfig {
    pub mode: TransformMode,
    #[serde(default)]
    pub in_place: bool,
    pub anchor_date: NaiveDate,
    /// Required, and non-zero, for `date_shifting`.
    pub shift_seconds: Option<i64>,
    #[serde(default = "default_dob_field")]
    pub dob_field: String,
}

fn default_dob_field() -> String {
    redcap_transform::date::DEFAULT_DOB_FIELD.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecondaryIdConfig {
    pub pool_file: Option<PathBuf>,
    pub mapping_file: Option<PathBuf>,
}

/// The validated secondary-id source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryIdFile<'a> {
    Pool(&'a Path),
    Mapping(&'a Path),
}

impl SecondaryIdConfig {
    pub fn source(&self) -> Result<SecondaryIdFile<'_>, ConfigError> {
        match (&self.pool_file, &self.mapping_file) {
            (Some(pool), None) => Ok(SecondaryIdFile::Pool(pool)),
            (None, Some(mapping)) => Ok(SecondaryIdFile::Mapping(mapping)),
            _ => Err(invalid(
                "secondary_ids",
                "exactly one of pool_file or mapping_file must be set",
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalcVariableConfig {
    pub reference_file: PathBuf,
    #[serde(default)]
    pub schema_variant: ReferenceSchemaVariant,
    pub expected_columns: Vec<String>,
    #[serde(default)]
    pub descriptions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Reads and parses the file at `path`, applying the token override from
    /// the environment. Relative table paths are resolved against the config
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&text, path)?;
        if let Ok(token) = std::env::var(API_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            config.redcap.api_token = token;
        }
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parses TOML text without touching the environment or the filesystem.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.field_map.path);
        if let Some(ids) = &mut self.secondary_ids {
            if let Some(pool) = &mut ids.pool_file {
                resolve(pool);
            }
            if let Some(mapping) = &mut ids.mapping_file {
                resolve(mapping);
            }
        }
        if let Some(calc) = &mut self.calc_variables {
            resolve(&mut calc.reference_file);
        }
        if let Some(dir) = &mut self.logging.log_dir {
            resolve(dir);
        }
    }

    /// Checks the settings that only make sense together. A rejection is
    /// logged before it is returned.
    pub fn validate(&self, purpose: Purpose) -> Result<(), ConfigError> {
        let result = self.check_rules(purpose);
        if let Err(error) = &result {
            error!(purpose = ?purpose, %error, "configuration rejected");
        }
        result
    }

    fn check_rules(&self, purpose: Purpose) -> Result<(), ConfigError> {
        if self.redcap.record_chunk_size == 0 {
            return Err(invalid("redcap", "record_chunk_size must be greater than 0"));
        }
        if self.datalake.chunk_size == 0 {
            return Err(invalid("datalake", "chunk_size must be greater than 0"));
        }
        if self.redcap.id_field.trim().is_empty() {
            return Err(invalid("redcap", "id_field must not be empty"));
        }
        if let Some(ids) = &self.secondary_ids {
            ids.source()?;
        }
        if let Some(transform) = &self.transform {
            match transform.mode {
                TransformMode::DateShifting if transform.shift_seconds.unwrap_or(0) == 0 => {
                    return Err(invalid(
                        "transform",
                        "shift_seconds must be set to a non-zero value for date_shifting",
                    ));
                }
                TransformMode::DobShifting if transform.dob_field.trim().is_empty() => {
                    return Err(invalid("transform", "dob_field is required for dob_shifting"));
                }
                _ => {}
            }
        }
        if let Some(calc) = &self.calc_variables {
            if calc.expected_columns.is_empty() {
                return Err(invalid("calc_variables", "expected_columns must not be empty"));
            }
            if calc.schema_variant == ReferenceSchemaVariant::SecondaryId
                && self.secondary_ids.is_none()
            {
                return Err(invalid(
                    "calc_variables",
                    "schema_variant = \"secondary_id\" requires a [secondary_ids] section",
                ));
            }
        }
        if purpose != Purpose::Check && self.redcap.api_token.trim().is_empty() {
            return Err(invalid(
                "redcap",
                format!("api_token must be set (or {API_TOKEN_ENV})"),
            ));
        }
        if purpose == Purpose::Run
            && self
                .datalake
                .api_endpoint
                .as_deref()
                .is_none_or(|endpoint| endpoint.trim().is_empty())
        {
            return Err(invalid(
                "datalake",
                "api_endpoint is required unless --fake is given",
            ));
        }
        Ok(())
    }
}
