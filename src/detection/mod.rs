// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Detection module - hazard thresholds and the hazard indicator

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::sensors::Reading;

/// Binary hazard signal derived from the latest reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardState {
    pub active: bool,
}

/// Alert thresholds in ug/m3
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub pm2_5_threshold: f32,
    pub pm10_threshold: f32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            pm2_5_threshold: 55.0,
            pm10_threshold: 75.0,
        }
    }
}

/// Level-triggered threshold check, no hysteresis
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator {
    config: AlertConfig,
}

impl AlertEvaluator {
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, reading: &Reading) -> HazardState {
        HazardState {
            active: reading.pm2_5() >= self.config.pm2_5_threshold
                || reading.pm10() >= self.config.pm10_threshold,
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }
}

/// Output driven by the hazard level (buzzer, LED, relay...)
pub trait HazardIndicator: Send {
    fn set(&mut self, state: HazardState);
}

/// Indicator that reports hazard level changes in the log
#[derive(Debug, Default)]
pub struct LogIndicator {
    active: bool,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl HazardIndicator for LogIndicator {
    fn set(&mut self, state: HazardState) {
        match (self.active, state.active) {
            (false, true) => warn!("⚠ Particulate hazard: thresholds exceeded"),
            (true, false) => info!("Particulate hazard cleared"),
            _ => {}
        }
        self.active = state.active;
    }
}
