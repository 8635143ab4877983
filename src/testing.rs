// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::sensors::{BusError, Measurement, ParticleBus};
use crate::streaming::{DeliveryError, Payload, Sink, SinkKind};

/// Failure script for [`ScriptedBus`]
#[derive(Debug, Clone, Default)]
pub struct BusScript {
    pub probe_failures: u32,
    pub reject_auto_clean: bool,
    pub reject_start: bool,
    /// Data-ready polls answering "not ready" before the flag goes up
    pub not_ready_polls: u32,
    /// Data-ready polls failing on the bus before the flag goes up
    pub ready_flag_errors: u32,
}

/// Bus that follows a script and replays queued measurements
#[derive(Debug, Default)]
pub struct ScriptedBus {
    script: BusScript,
    measurements: VecDeque<Measurement>,
    probes: u32,
    ready_polls: u32,
    auto_clean_days: Option<u8>,
    measuring: bool,
}

impl ScriptedBus {
    pub fn new(script: BusScript) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    pub fn push_measurement(&mut self, pm2_5: f32, pm10: f32) {
        self.measurements.push_back(Measurement {
            mc_2p5: pm2_5,
            mc_10p0: pm10,
            ..Measurement::default()
        });
    }

    pub fn probes(&self) -> u32 {
        self.probes
    }

    pub fn ready_polls(&self) -> u32 {
        self.ready_polls
    }

    pub fn auto_clean_days(&self) -> Option<u8> {
        self.auto_clean_days
    }

    pub fn measuring(&self) -> bool {
        self.measuring
    }
}

impl ParticleBus for ScriptedBus {
    fn probe(&mut self) -> Result<String, BusError> {
        self.probes += 1;
        if self.script.probe_failures > 0 {
            self.script.probe_failures -= 1;
            return Err(BusError::Nack);
        }
        Ok("TEST-SERIAL".to_string())
    }

    fn set_auto_cleaning_interval(&mut self, days: u8) -> Result<(), BusError> {
        if self.script.reject_auto_clean {
            return Err(BusError::Nack);
        }
        self.auto_clean_days = Some(days);
        Ok(())
    }

    fn start_measurement(&mut self) -> Result<(), BusError> {
        if self.script.reject_start {
            return Err(BusError::Nack);
        }
        self.measuring = true;
        Ok(())
    }

    fn stop_measurement(&mut self) -> Result<(), BusError> {
        self.measuring = false;
        Ok(())
    }

    fn read_data_ready(&mut self) -> Result<bool, BusError> {
        self.ready_polls += 1;
        if self.script.ready_flag_errors > 0 {
            self.script.ready_flag_errors -= 1;
            return Err(BusError::Io("flag read failed".to_string()));
        }
        if self.script.not_ready_polls > 0 {
            self.script.not_ready_polls -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    fn read_measurement(&mut self) -> Result<Measurement, BusError> {
        self.measurements.pop_front().ok_or(BusError::Nack)
    }
}

#[derive(Debug, Default)]
struct LogInner {
    payloads: Vec<Payload>,
    reannounces: u32,
}

/// Handle onto what a [`RecordingSink`] received
#[derive(Debug, Clone, Default)]
pub struct SinkLog(Arc<Mutex<LogInner>>);

impl SinkLog {
    pub fn payloads(&self) -> Vec<Payload> {
        self.0.lock().payloads.clone()
    }

    /// Per-reading deliveries
    pub fn deliveries(&self) -> usize {
        self.0.lock().payloads.iter().filter(|p| !p.is_aggregate()).count()
    }

    pub fn aggregates(&self) -> usize {
        self.0.lock().payloads.iter().filter(|p| p.is_aggregate()).count()
    }

    pub fn reannounces(&self) -> u32 {
        self.0.lock().reannounces
    }
}

pub struct RecordingSink {
    kind: SinkKind,
    ready: bool,
    log: SinkLog,
}

impl RecordingSink {
    pub fn new(kind: SinkKind, ready: bool) -> Self {
        Self {
            kind,
            ready,
            log: SinkLog::default(),
        }
    }

    pub fn log(&self) -> SinkLog {
        self.log.clone()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn deliver(&mut self, payload: &Payload) -> Result<(), DeliveryError> {
        self.log.0.lock().payloads.push(*payload);
        Ok(())
    }

    async fn on_disconnect(&mut self) {
        self.log.0.lock().reannounces += 1;
    }
}

/// Ready sink whose every delivery fails
pub struct FailingSink {
    kind: SinkKind,
}

impl FailingSink {
    pub fn new(kind: SinkKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Sink for FailingSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn deliver(&mut self, _payload: &Payload) -> Result<(), DeliveryError> {
        Err(DeliveryError::Transport("link down".to_string()))
    }
}
