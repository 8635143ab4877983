// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Cadence bookkeeping for timed operations

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Fires once per `interval` measured from its last run
#[derive(Debug, Clone)]
pub struct PeriodicTask {
    name: &'static str,
    interval: Duration,
    last_run: Instant,
    enabled: bool,
}

impl PeriodicTask {
    /// The first run is due one full interval after `start`
    pub fn new(name: &'static str, interval: Duration, start: Instant) -> Self {
        debug!("Scheduled task '{}' with interval {:?}", name, interval);
        Self {
            name,
            interval,
            last_run: start,
            enabled: true,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.enabled && now.saturating_duration_since(self.last_run) >= self.interval
    }

    /// Check and, when due, record `now` as the last run
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.last_run = now;
            true
        } else {
            false
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
