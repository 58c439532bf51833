//! Data lake ingest endpoint.

use std::time::Duration;

use redcap_core::{BatchSink, Payload, TransportError};
use reqwest::blocking::Client;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// POSTs each payload as JSON. Any non-2xx response fails the chunk.
pub struct DatalakeSink {
    client: Client,
    endpoint: String,
}

impl DatalakeSink {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Request {
                url: endpoint.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { client, endpoint })
    }
}

impl BatchSink for DatalakeSink {
    fn send(&mut self, payload: &Payload<'_>) -> Result<(), TransportError> {
        debug!(chunk = payload.chunk_number, "posting payload");
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .map_err(|e| TransportError::Request {
                url: self.endpoint.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::Status {
                url: self.endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
