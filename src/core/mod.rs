// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Core module - acquisition loop, cadence, readiness events and wiring

mod acquisition;
mod engine;
mod event_bus;
mod scheduler;

pub use acquisition::{AcquisitionLoop, LoopConfig, LoopStats, TickReport};
pub use engine::Engine;
pub use event_bus::{ReadinessBus, ReadinessEvent, ReadinessSender};
pub use scheduler::PeriodicTask;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// System-wide state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub running: bool,
    pub sensor_serial: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub sinks: usize,
}
