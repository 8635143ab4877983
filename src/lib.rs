// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! pmwatch - Particulate Matter Monitor
//!
//! Reads PM2.5 / PM10 mass concentrations from a Sensirion SPS30 and:
//! - raises a hazard indicator when either value crosses its threshold
//! - publishes every reading to MQTT, a realtime-database REST API and local files
//! - averages readings over a fixed window and uploads the averages
//! - keeps a display model with labels and chart history
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Acquisition Loop                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ SensorChannel│ → │AlertEvaluator│ → │    SinkRouter    │  │
//! │  │   (SPS30)    │   │ → Indicator  │   │ Notify/Upload/   │  │
//! │  └──────────────┘   └──────────────┘   │ Render           │  │
//! │          ↓                              └──────────────────┘  │
//! │  ┌──────────────────┐     averages ↗          ↑              │
//! │  │AggregationWindow │ ───────────┘   readiness events        │
//! │  └──────────────────┘                 (ReadinessBus)         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod analysis;
pub mod config;
pub mod core;
pub mod detection;
pub mod sensors;
pub mod streaming;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use config::Config;
pub use self::core::{AcquisitionLoop, Engine};
pub use sensors::{ParticleSensor, Reading, SensorChannel};
pub use streaming::{Payload, SinkKind, SinkRouter};

/// pmwatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// pmwatch name
pub const NAME: &str = "pmwatch";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        rust_version: env!("CARGO_PKG_RUST_VERSION").to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        features: enabled_features(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Version string
    pub version: String,
    /// Minimum Rust version
    pub rust_version: String,
    /// Target architecture
    pub target: String,
    /// Operating system
    pub os: String,
    /// Enabled features
    pub features: Vec<String>,
}

fn enabled_features() -> Vec<String> {
    [("hardware", cfg!(feature = "hardware"))]
        .iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(name, _)| name.to_string())
        .collect()
}
