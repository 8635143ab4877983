// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Configuration module

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::WindowConfig;
use crate::core::LoopConfig;
use crate::detection::AlertConfig;
use crate::sensors::ChannelConfig;
use crate::streaming::StreamingConfig;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Data directory
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Enable demo mode (simulated sensor)
    pub demo_mode: bool,

    /// Sensor configuration
    pub sensor: SensorConfig,

    /// Loop cadence
    pub acquisition: AcquisitionConfig,

    /// Windowed averaging
    pub aggregation: AggregationConfig,

    /// Hazard thresholds
    pub alert: AlertConfig,

    /// Sinks
    pub streaming: StreamingConfig,

    /// Local display
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "pmwatch".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            demo_mode: false,
            sensor: SensorConfig::default(),
            acquisition: AcquisitionConfig::default(),
            aggregation: AggregationConfig::default(),
            alert: AlertConfig::default(),
            streaming: StreamingConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {:?}", path))?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("pmwatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Reject settings the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.acquisition.tick_period_ms == 0 {
            bail!("acquisition.tick_period_ms must be greater than zero");
        }
        if self.acquisition.read_interval_ms == 0 {
            bail!("acquisition.read_interval_ms must be greater than zero");
        }
        if self.aggregation.period_secs == 0 {
            bail!("aggregation.period_secs must be greater than zero");
        }
        if self.aggregation.min_samples == 0 {
            bail!("aggregation.min_samples must be at least 1");
        }
        if self.sensor.probe_attempts == 0 {
            bail!("sensor.probe_attempts must be at least 1");
        }
        if self.sensor.max_ready_polls == 0 {
            bail!("sensor.max_ready_polls must be at least 1");
        }
        for (name, value) in [
            ("alert.pm2_5_threshold", self.alert.pm2_5_threshold),
            ("alert.pm10_threshold", self.alert.pm10_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{} must be a non-negative number, got {}", name, value);
            }
        }
        if !(0.0..=1.0).contains(&self.sensor.demo_spike_probability) {
            bail!(
                "sensor.demo_spike_probability must be within 0..=1, got {}",
                self.sensor.demo_spike_probability
            );
        }
        if self.streaming.upload_enabled && self.streaming.upload_url.is_empty() {
            bail!("streaming.upload_url is required when upload is enabled");
        }
        if self.display.chart_points == 0 {
            bail!("display.chart_points must be at least 1");
        }
        Ok(())
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            auto_clean_days: self.sensor.auto_clean_days,
            probe_attempts: self.sensor.probe_attempts,
            probe_retry_interval: Duration::from_millis(self.sensor.probe_retry_ms),
            max_ready_polls: self.sensor.max_ready_polls,
            ready_poll_interval: Duration::from_millis(self.sensor.ready_poll_ms),
        }
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            tick_period: Duration::from_millis(self.acquisition.tick_period_ms),
            read_interval: Duration::from_millis(self.acquisition.read_interval_ms),
        }
    }

    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            period: Duration::from_secs(self.aggregation.period_secs),
            min_samples: self.aggregation.min_samples,
        }
    }
}

/// Sensor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// I2C bus device path
    pub i2c_bus: String,

    /// Fan auto-cleaning interval in days
    pub auto_clean_days: u8,

    pub probe_attempts: u32,
    pub probe_retry_ms: u64,
    pub max_ready_polls: u32,
    pub ready_poll_ms: u64,

    /// Chance of a pollution spike per simulated reading (demo mode only)
    pub demo_spike_probability: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c_bus: "/dev/i2c-1".to_string(),
            auto_clean_days: 4,
            probe_attempts: 20,
            probe_retry_ms: 500,
            max_ready_polls: 50,
            ready_poll_ms: 100,
            demo_spike_probability: 0.03,
        }
    }
}

/// Acquisition loop cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub tick_period_ms: u64,
    pub read_interval_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 100,
            read_interval_ms: 10_000,
        }
    }
}

/// Aggregation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub period_secs: u64,
    pub min_samples: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            period_secs: 60,
            min_samples: 12,
        }
    }
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub enabled: bool,

    /// Chart history length
    pub chart_points: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chart_points: 60,
        }
    }
}
