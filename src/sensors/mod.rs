// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor module - SPS30 driver, simulation and the acquisition channel

mod channel;
mod simulator;
pub mod sps30;
mod traits;

pub use channel::{ChannelConfig, ChannelState, SensorChannel};
pub use simulator::SimulatedSps30;
pub use sps30::Sps30;
pub use traits::{BusError, Measurement, ParticleBus, ParticleSensor, Reading, SensorError};
