// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Cloud upload sink over a REST realtime-database API

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use super::payload::{MinimalRecord, UploadKey};
use super::{DeliveryError, Payload, Sink, SinkKind, StreamingConfig};

/// Asks the database to stamp the record with its own clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerTimestamp {
    #[serde(rename = ".sv")]
    sv: &'static str,
}

impl ServerTimestamp {
    pub const NOW: ServerTimestamp = ServerTimestamp { sv: "timestamp" };
}

/// Body written under `data_NNNN` / `avg_NNNN`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadRecord {
    #[serde(flatten)]
    pub values: MinimalRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
    pub ts: ServerTimestamp,
}

impl UploadRecord {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            values: payload.record(),
            samples: match payload {
                Payload::Aggregate(record) => Some(record.sample_count),
                Payload::Reading { .. } => None,
            },
            ts: ServerTimestamp::NOW,
        }
    }
}

/// PUTs every record to `<base>/<path>/<key>.json`
pub struct HttpUploadSink {
    client: reqwest::Client,
    base_url: String,
    path: String,
    auth_token: Option<String>,
    readings: UploadKey,
    averages: UploadKey,
}

impl HttpUploadSink {
    pub fn new(config: &StreamingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upload_timeout_secs.max(1)))
            .build()
            .context("building upload HTTP client")?;

        info!("Upload sink targeting {}/{}", config.upload_url, config.upload_path);
        Ok(Self {
            client,
            base_url: config.upload_url.trim_end_matches('/').to_string(),
            path: config.upload_path.trim_matches('/').to_string(),
            auth_token: config.upload_auth_token.clone(),
            readings: UploadKey::new("data"),
            averages: UploadKey::new("avg"),
        })
    }

    fn url(&self, key: &str) -> String {
        if self.path.is_empty() {
            format!("{}/{}.json", self.base_url, key)
        } else {
            format!("{}/{}/{}.json", self.base_url, self.path, key)
        }
    }

    /// Next key for this payload. Advances on every attempt, successful or not.
    fn next_key(&mut self, payload: &Payload) -> String {
        if payload.is_aggregate() {
            self.averages.next_key()
        } else {
            self.readings.next_key()
        }
    }
}

#[async_trait]
impl Sink for HttpUploadSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Upload
    }

    fn name(&self) -> &str {
        "http-upload"
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn deliver(&mut self, payload: &Payload) -> Result<(), DeliveryError> {
        let key = self.next_key(payload);
        let url = self.url(&key);
        let body = UploadRecord::from_payload(payload);

        let mut request = self.client.put(&url).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected(format!("{} -> {}", key, status)));
        }

        debug!("Send to {} -> ok", key);
        Ok(())
    }
}
