// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor traits and common types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

/// Low-level failure on the sensor bus
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Device did not acknowledge the transfer
    #[error("device did not acknowledge")]
    Nack,

    /// Checksum mismatch on a received word
    #[error("crc mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Crc { expected: u8, actual: u8 },

    /// Response was shorter or malformed
    #[error("malformed response: {0}")]
    Malformed(&'static str),

    /// Transport level I/O failure
    #[error("bus i/o: {0}")]
    Io(String),
}

/// Sensor acquisition errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// The sensor never acknowledged the probe
    #[error("sensor probe failed after {attempts} attempts")]
    ProbeFailed { attempts: u32 },

    /// The sensor rejected a configuration command
    #[error("sensor rejected {command}: {source}")]
    ConfigError {
        command: &'static str,
        #[source]
        source: BusError,
    },

    /// No new measurement available yet. Absorbed by the channel.
    #[error("data not ready")]
    DataNotReady,

    /// The data-ready flag stayed low for the whole poll budget
    #[error("data not ready after {polls} polls")]
    ReadyTimeout { polls: u32 },

    /// Fetching the measurement failed after data was reported ready
    #[error("measurement read failed: {0}")]
    ReadError(#[from] BusError),

    /// Measurement decoded but carries impossible mass concentrations
    #[error("invalid measurement: pm2.5={pm2_5}, pm10={pm10}")]
    InvalidMeasurement { pm2_5: f32, pm10: f32 },
}

/// Full measurement record as reported by the sensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Mass concentrations in ug/m3
    pub mc_1p0: f32,
    pub mc_2p5: f32,
    pub mc_4p0: f32,
    pub mc_10p0: f32,
    /// Number concentrations in #/cm3
    pub nc_0p5: f32,
    pub nc_1p0: f32,
    pub nc_2p5: f32,
    pub nc_4p0: f32,
    pub nc_10p0: f32,
    /// Typical particle size in um
    pub typical_particle_size: f32,
}

/// A validated particulate reading
///
/// Only constructed through [`Reading::new`], so `pm2_5` and `pm10` are always
/// finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pm2_5: f32,
    pm10: f32,
    timestamp: Instant,
}

impl Reading {
    pub fn new(pm2_5: f32, pm10: f32, timestamp: Instant) -> Option<Self> {
        let valid = |v: f32| v.is_finite() && v >= 0.0;
        if valid(pm2_5) && valid(pm10) {
            Some(Self { pm2_5, pm10, timestamp })
        } else {
            None
        }
    }

    /// Build a reading from a measurement, rejecting impossible values
    pub fn from_measurement(m: &Measurement, timestamp: Instant) -> Result<Self, SensorError> {
        Self::new(m.mc_2p5, m.mc_10p0, timestamp).ok_or(SensorError::InvalidMeasurement {
            pm2_5: m.mc_2p5,
            pm10: m.mc_10p0,
        })
    }

    pub fn pm2_5(&self) -> f32 {
        self.pm2_5
    }

    pub fn pm10(&self) -> f32 {
        self.pm10
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }
}

/// Register-level command set of the particle sensor
///
/// Every call is a blocking bus transaction.
pub trait ParticleBus: Send {
    /// Check the device answers (reads its serial number)
    fn probe(&mut self) -> Result<String, BusError>;

    /// Configure the fan auto-cleaning interval
    fn set_auto_cleaning_interval(&mut self, days: u8) -> Result<(), BusError>;

    fn start_measurement(&mut self) -> Result<(), BusError>;

    fn stop_measurement(&mut self) -> Result<(), BusError>;

    /// Returns true when a new measurement can be fetched
    fn read_data_ready(&mut self) -> Result<bool, BusError>;

    fn read_measurement(&mut self) -> Result<Measurement, BusError>;
}

/// Acquisition contract used by the loop
#[async_trait]
pub trait ParticleSensor: Send {
    /// Probe the sensor, configure auto-cleaning and start measuring
    async fn initialize(&mut self) -> Result<(), SensorError>;

    /// Wait for the next measurement and return it as a reading
    async fn read_one(&mut self) -> Result<Reading, SensorError>;

    /// Stop measuring. Best effort.
    async fn shutdown(&mut self) -> Result<(), SensorError>;

    /// Serial number, once known
    fn serial(&self) -> Option<&str> {
        None
    }
}

#[async_trait]
impl<S: ParticleSensor + ?Sized> ParticleSensor for Box<S> {
    async fn initialize(&mut self) -> Result<(), SensorError> {
        (**self).initialize().await
    }

    async fn read_one(&mut self) -> Result<Reading, SensorError> {
        (**self).read_one().await
    }

    async fn shutdown(&mut self) -> Result<(), SensorError> {
        (**self).shutdown().await
    }

    fn serial(&self) -> Option<&str> {
        (**self).serial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_rejects_invalid_values() {
        let now = Instant::now();
        assert!(Reading::new(12.0, 20.0, now).is_some());
        assert!(Reading::new(0.0, 0.0, now).is_some());
        assert!(Reading::new(-0.1, 20.0, now).is_none());
        assert!(Reading::new(12.0, f32::NAN, now).is_none());
        assert!(Reading::new(f32::INFINITY, 1.0, now).is_none());
    }

    #[test]
    fn test_reading_from_measurement_uses_mass_concentrations() {
        let m = Measurement {
            mc_1p0: 1.0,
            mc_2p5: 2.5,
            mc_4p0: 4.0,
            mc_10p0: 10.0,
            ..Measurement::default()
        };
        let reading = Reading::from_measurement(&m, Instant::now()).unwrap();
        assert_eq!(reading.pm2_5(), 2.5);
        assert_eq!(reading.pm10(), 10.0);

        let bad = Measurement { mc_2p5: -1.0, ..m };
        assert!(matches!(
            Reading::from_measurement(&bad, Instant::now()),
            Err(SensorError::InvalidMeasurement { .. })
        ));
    }
}
