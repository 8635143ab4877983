// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Rolling aggregation window

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::sensors::Reading;

/// Window closing rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    /// Minimum time between window start and close
    pub period: Duration,
    /// Minimum number of samples needed to close
    pub min_samples: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(60),
            min_samples: 12,
        }
    }
}

/// Averages over one closed window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateRecord {
    pub avg_pm2_5: f64,
    pub avg_pm10: f64,
    pub sample_count: u32,
    pub window_start: Instant,
    pub window_end: Instant,
}

/// Accumulates readings until both the period and the sample minimum are met
#[derive(Debug, Clone)]
pub struct AggregationWindow {
    config: WindowConfig,
    sum_pm2_5: f64,
    sum_pm10: f64,
    sample_count: u32,
    window_start: Instant,
}

impl AggregationWindow {
    pub fn new(config: WindowConfig, start: Instant) -> Self {
        Self {
            config: WindowConfig {
                min_samples: config.min_samples.max(1),
                ..config
            },
            sum_pm2_5: 0.0,
            sum_pm10: 0.0,
            sample_count: 0,
            window_start: start,
        }
    }

    pub fn accumulate(&mut self, reading: &Reading) {
        self.sum_pm2_5 += f64::from(reading.pm2_5());
        self.sum_pm10 += f64::from(reading.pm10());
        self.sample_count = self.sample_count.saturating_add(1);
        trace!("window holds {} samples", self.sample_count);
    }

    /// Close the window if it is old enough and full enough
    ///
    /// Leaves the window untouched and returns `None` otherwise.
    pub fn try_close(&mut self, now: Instant) -> Option<AggregateRecord> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.config.period || self.sample_count < self.config.min_samples {
            return None;
        }

        let count = f64::from(self.sample_count);
        let record = AggregateRecord {
            avg_pm2_5: self.sum_pm2_5 / count,
            avg_pm10: self.sum_pm10 / count,
            sample_count: self.sample_count,
            window_start: self.window_start,
            window_end: now,
        };

        self.sum_pm2_5 = 0.0;
        self.sum_pm10 = 0.0;
        self.sample_count = 0;
        self.window_start = now;

        debug!(
            "Window closed: avg PM2.5 {:.2}, avg PM10 {:.2} over {} samples",
            record.avg_pm2_5, record.avg_pm10, record.sample_count
        );
        Some(record)
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }
}
