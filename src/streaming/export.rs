// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Local JSON-lines export, an upload sink for offline deployments

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::payload::{MinimalRecord, UploadKey};
use super::{DeliveryError, Payload, Sink, SinkKind};

const READINGS_FILE: &str = "readings.jsonl";
const AVERAGES_FILE: &str = "averages.jsonl";

#[derive(Debug, Serialize)]
struct ExportLine {
    key: String,
    #[serde(flatten)]
    values: MinimalRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<u32>,
    hazard: Option<bool>,
    recorded_at: DateTime<Utc>,
}

/// Appends every record to `readings.jsonl` / `averages.jsonl`
pub struct FileExportSink {
    path: PathBuf,
    readings_file: Option<BufWriter<File>>,
    averages_file: Option<BufWriter<File>>,
    readings: UploadKey,
    averages: UploadKey,
}

impl FileExportSink {
    pub fn new(path: &Path) -> Result<Self> {
        // Create directory if it doesn't exist
        std::fs::create_dir_all(path)?;
        info!("Exporting records to {:?}", path);

        Ok(Self {
            path: path.to_path_buf(),
            readings_file: None,
            averages_file: None,
            readings: UploadKey::new("data"),
            averages: UploadKey::new("avg"),
        })
    }

    pub fn readings_path(&self) -> PathBuf {
        self.path.join(READINGS_FILE)
    }

    pub fn averages_path(&self) -> PathBuf {
        self.path.join(AVERAGES_FILE)
    }

    fn open(path: &Path) -> std::io::Result<BufWriter<File>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }

    fn line(&mut self, payload: &Payload) -> ExportLine {
        let (key, samples, hazard) = match payload {
            Payload::Reading { hazard, .. } => (self.readings.next_key(), None, Some(hazard.active)),
            Payload::Aggregate(record) => (self.averages.next_key(), Some(record.sample_count), None),
        };
        ExportLine {
            key,
            values: payload.record(),
            samples,
            hazard,
            recorded_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Sink for FileExportSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Upload
    }

    fn name(&self) -> &str {
        "file-export"
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn deliver(&mut self, payload: &Payload) -> Result<(), DeliveryError> {
        let line = self.line(payload);
        let json = serde_json::to_string(&line)?;

        let (slot, path) = if payload.is_aggregate() {
            (&mut self.averages_file, self.path.join(AVERAGES_FILE))
        } else {
            (&mut self.readings_file, self.path.join(READINGS_FILE))
        };

        if slot.is_none() {
            *slot = Some(Self::open(&path)?);
        }
        if let Some(writer) = slot.as_mut() {
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }

        debug!("Exported {}", line.key);
        Ok(())
    }
}
