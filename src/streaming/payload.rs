// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Delivery payloads and their wire forms

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::AggregateRecord;
use crate::detection::HazardState;
use crate::sensors::Reading;

/// What the router hands to sinks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    /// One fresh reading together with the hazard level it produced
    Reading { reading: Reading, hazard: HazardState },
    /// Averages of a closed window
    Aggregate(AggregateRecord),
}

impl Payload {
    /// The sink-agnostic `{pm25, pm10}` record
    pub fn record(&self) -> MinimalRecord {
        match self {
            Payload::Reading { reading, .. } => {
                MinimalRecord::new(f64::from(reading.pm2_5()), f64::from(reading.pm10()))
            }
            Payload::Aggregate(record) => MinimalRecord::new(record.avg_pm2_5, record.avg_pm10),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Payload::Aggregate(_))
    }
}

/// Minimal delivery record, both values rounded to two decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinimalRecord {
    pub pm25: f64,
    pub pm10: f64,
}

impl MinimalRecord {
    pub fn new(pm25: f64, pm10: f64) -> Self {
        Self {
            pm25: round2(pm25),
            pm10: round2(pm10),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("missing '#' separator")]
    MissingSeparator,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// Notify wire form: `"<pm25>#<pm10>"` with two decimals
pub fn notify_wire(record: &MinimalRecord) -> String {
    format!("{:.2}#{:.2}", record.pm25, record.pm10)
}

pub fn parse_notify_wire(wire: &str) -> Result<MinimalRecord, WireError> {
    let (pm25, pm10) = wire.trim().split_once('#').ok_or(WireError::MissingSeparator)?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| WireError::InvalidNumber(s.to_string()))
    };
    Ok(MinimalRecord::new(parse(pm25)?, parse(pm10)?))
}

/// Display label: `"<value:1 decimal> ug/m3"`
pub fn render_label(value: f64) -> String {
    format!("{:.1} ug/m3", value)
}

/// In-memory counter producing `data_0001`, `data_0002`, ...
///
/// Starts at 1 on every process start. Keys keep growing past 9999.
#[derive(Debug, Clone)]
pub struct UploadKey {
    prefix: &'static str,
    next: u32,
}

impl UploadKey {
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix, next: 1 }
    }

    pub fn next_key(&mut self) -> String {
        let key = format!("{}_{:04}", self.prefix, self.next);
        self.next = self.next.saturating_add(1);
        key
    }

    /// Number of keys handed out so far
    pub fn issued(&self) -> u32 {
        self.next - 1
    }
}
