//! REDCap API record source.

use std::collections::BTreeMap;
use std::time::Duration;

use redcap_core::{Extraction, RecordSource, TransportError};
use redcap_model::{DictionaryEntry, ProjectInfo};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::decode;
use crate::params::{self, FormParams};

/// Large EAV exports take a while on busy servers.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Number of study ids per record export request.
pub const DEFAULT_RECORD_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedcapSettings {
    pub api_url: String,
    pub api_token: String,
    pub id_field: String,
    pub screening_event: String,
    pub filter_logic: Option<String>,
    pub record_chunk_size: usize,
}

/// Reads project info, the data dictionary, and records over the REDCap API.
pub struct RedcapSource {
    client: Client,
    settings: RedcapSettings,
}

impl RedcapSource {
    pub fn new(settings: RedcapSettings) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Request {
                url: settings.api_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { client, settings })
    }

    fn post(&self, params: &FormParams) -> Result<String, TransportError> {
        let url = &self.settings.api_url;
        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .map_err(|e| TransportError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| TransportError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.clone(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn post_json<T: DeserializeOwned>(&self, params: &FormParams) -> Result<T, TransportError> {
        let body = self.post(params)?;
        serde_json::from_str(&body).map_err(|e| TransportError::Decode {
            url: self.settings.api_url.clone(),
            message: e.to_string(),
        })
    }

    fn study_ids(&self) -> Result<Vec<redcap_model::AccessGroupTag>, TransportError> {
        let settings = &self.settings;
        let rows: Vec<BTreeMap<String, Value>> = self.post_json(&params::study_ids(
            &settings.api_token,
            &settings.id_field,
            &settings.screening_event,
            settings.filter_logic.as_deref(),
        ))?;
        Ok(decode::study_ids(&rows, &settings.id_field))
    }
}

impl RecordSource for RedcapSource {
    fn project_info(&mut self) -> Result<ProjectInfo, TransportError> {
        self.post_json(&params::project(&self.settings.api_token))
    }

    fn metadata(&mut self) -> Result<Vec<DictionaryEntry>, TransportError> {
        let entries: Vec<DictionaryEntry> =
            self.post_json(&params::metadata(&self.settings.api_token))?;
        debug!(fields = entries.len(), "data dictionary loaded");
        Ok(entries)
    }

    fn extract(&mut self) -> Result<Extraction, TransportError> {
        let access_groups = self.study_ids()?;
        info!(subjects = access_groups.len(), "consented study ids loaded");

        let ids: Vec<String> = access_groups.iter().map(|t| t.record_id.clone()).collect();
        let chunk_size = self.settings.record_chunk_size.max(1);
        let mut records = Vec::new();
        for (index, chunk) in ids.chunks(chunk_size).enumerate() {
            debug!(chunk = index + 1, subjects = chunk.len(), "exporting records");
            let body = self.post(&params::records(&self.settings.api_token, chunk))?;
            let batch = decode::eav_records(&body).map_err(|message| TransportError::Decode {
                url: self.settings.api_url.clone(),
                message,
            })?;
            records.extend(batch);
        }

        Ok(Extraction {
            records,
            access_groups,
        })
    }
}
