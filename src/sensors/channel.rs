// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor channel - drives the acquisition protocol against a [`ParticleBus`]
//!
//! ```text
//!   Idle ──read_one──▶ AwaitingReady{polls} ──ready──▶ Fetching ──▶ Idle
//!                          │    ▲
//!                          └────┘ not ready / flag error (sleep poll interval)
//! ```
//!
//! Both the probe loop in `initialize` and the data-ready loop in `read_one`
//! are bounded. `read_one` holds the caller until it returns.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, trace, warn};

use super::{BusError, ParticleBus, ParticleSensor, Reading, SensorError};

/// Retry and cleaning parameters of the channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub auto_clean_days: u8,
    pub probe_attempts: u32,
    pub probe_retry_interval: Duration,
    pub max_ready_polls: u32,
    pub ready_poll_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            auto_clean_days: 4,
            probe_attempts: 20,
            probe_retry_interval: Duration::from_millis(500),
            max_ready_polls: 50,
            ready_poll_interval: Duration::from_millis(100),
        }
    }
}

/// Protocol state of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    AwaitingReady { polls: u32 },
    Fetching,
}

pub struct SensorChannel<B> {
    bus: B,
    config: ChannelConfig,
    state: ChannelState,
    serial: Option<String>,
}

impl<B: ParticleBus> SensorChannel<B> {
    pub fn new(bus: B, config: ChannelConfig) -> Self {
        Self {
            bus,
            config,
            state: ChannelState::Idle,
            serial: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    async fn probe(&mut self) -> Result<String, SensorError> {
        let attempts = self.config.probe_attempts.max(1);
        for attempt in 1..=attempts {
            match self.bus.probe() {
                Ok(serial) => return Ok(serial),
                Err(e) => {
                    warn!("Sensor probing failed ({}/{}): {}", attempt, attempts, e);
                    if attempt < attempts {
                        sleep(self.config.probe_retry_interval).await;
                    }
                }
            }
        }
        error!("Sensor did not answer after {} probe attempts", attempts);
        Err(SensorError::ProbeFailed { attempts })
    }

    /// One data-ready poll. `DataNotReady` never leaves this channel.
    fn poll_ready(&mut self) -> Result<(), SensorError> {
        match self.bus.read_data_ready() {
            Ok(true) => Ok(()),
            Ok(false) => {
                trace!("data not ready, no new measurement available");
                Err(SensorError::DataNotReady)
            }
            Err(e) => {
                warn!("Error reading data-ready flag: {}", e);
                Err(SensorError::DataNotReady)
            }
        }
    }

    async fn await_ready(&mut self) -> Result<(), SensorError> {
        let max_polls = self.config.max_ready_polls.max(1);
        let mut polls = 0;
        loop {
            polls += 1;
            self.state = ChannelState::AwaitingReady { polls };
            match self.poll_ready() {
                Ok(()) => return Ok(()),
                Err(SensorError::DataNotReady) if polls < max_polls => {
                    sleep(self.config.ready_poll_interval).await;
                }
                Err(SensorError::DataNotReady) => {
                    return Err(SensorError::ReadyTimeout { polls });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn fetch(&mut self) -> Result<Reading, SensorError> {
        self.state = ChannelState::Fetching;
        let measurement = self.bus.read_measurement().map_err(SensorError::ReadError)?;
        let reading = Reading::from_measurement(&measurement, Instant::now())?;
        debug!("PM 2.5: {:.2}  PM 10: {:.2}", reading.pm2_5(), reading.pm10());
        Ok(reading)
    }

    fn configure(&mut self, command: &'static str, result: Result<(), BusError>) -> Option<SensorError> {
        match result {
            Ok(()) => None,
            Err(source) => {
                error!("Error sending {}: {}", command, source);
                Some(SensorError::ConfigError { command, source })
            }
        }
    }
}

#[async_trait]
impl<B: ParticleBus> ParticleSensor for SensorChannel<B> {
    async fn initialize(&mut self) -> Result<(), SensorError> {
        self.state = ChannelState::Idle;
        let serial = self.probe().await?;
        info!("Sensor probing successful (serial {})", serial);
        self.serial = Some(serial);

        // Measurement start is attempted even when the cleaning interval is rejected
        let days = self.config.auto_clean_days;
        let clean = self.bus.set_auto_cleaning_interval(days);
        let clean_err = self.configure("auto-clean interval", clean);
        let start = self.bus.start_measurement();
        let start_err = self.configure("start measurement", start);

        match clean_err.or(start_err) {
            Some(e) => Err(e),
            None => {
                info!("Measurements started (auto-clean every {} days)", days);
                Ok(())
            }
        }
    }

    async fn read_one(&mut self) -> Result<Reading, SensorError> {
        let result = match self.await_ready().await {
            Ok(()) => self.fetch(),
            Err(e) => Err(e),
        };
        self.state = ChannelState::Idle;
        result
    }

    async fn shutdown(&mut self) -> Result<(), SensorError> {
        self.state = ChannelState::Idle;
        let stop = self.bus.stop_measurement();
        match self.configure("stop measurement", stop) {
            Some(e) => Err(e),
            None => {
                info!("Measurements stopped");
                Ok(())
            }
        }
    }

    /// Serial number reported by the last successful probe
    fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BusScript, ScriptedBus};

    fn config() -> ChannelConfig {
        ChannelConfig {
            probe_attempts: 3,
            max_ready_polls: 5,
            ..ChannelConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_probes_then_configures() {
        let bus = ScriptedBus::new(BusScript {
            probe_failures: 2,
            ..BusScript::default()
        });
        let mut channel = SensorChannel::new(bus, config());

        let started = Instant::now();
        channel.initialize().await.unwrap();

        assert_eq!(channel.serial(), Some("TEST-SERIAL"));
        assert_eq!(channel.bus().probes(), 3);
        assert_eq!(channel.bus().auto_clean_days(), Some(4));
        assert!(channel.bus().measuring());
        // two failed probes, 500ms apart
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_gives_up_after_probe_budget() {
        let bus = ScriptedBus::new(BusScript {
            probe_failures: u32::MAX,
            ..BusScript::default()
        });
        let mut channel = SensorChannel::new(bus, config());

        let err = channel.initialize().await.unwrap_err();
        assert_eq!(err, SensorError::ProbeFailed { attempts: 3 });
        assert_eq!(channel.bus().probes(), 3);
        assert!(!channel.bus().measuring());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_clean_interval_still_starts_measurement() {
        let bus = ScriptedBus::new(BusScript {
            reject_auto_clean: true,
            ..BusScript::default()
        });
        let mut channel = SensorChannel::new(bus, config());

        let err = channel.initialize().await.unwrap_err();
        assert!(matches!(
            err,
            SensorError::ConfigError { command: "auto-clean interval", .. }
        ));
        assert!(channel.bus().measuring());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_start_reports_config_error() {
        let bus = ScriptedBus::new(BusScript {
            reject_start: true,
            ..BusScript::default()
        });
        let mut channel = SensorChannel::new(bus, config());

        let err = channel.initialize().await.unwrap_err();
        assert_eq!(
            err,
            SensorError::ConfigError {
                command: "start measurement",
                source: BusError::Nack,
            }
        );
        // cleaning interval was still configured
        assert_eq!(channel.bus().auto_clean_days(), Some(4));
        assert!(!channel.bus().measuring());
        assert_eq!(channel.serial(), Some("TEST-SERIAL"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_one_retries_until_ready() {
        let mut bus = ScriptedBus::new(BusScript {
            not_ready_polls: 3,
            ..BusScript::default()
        });
        bus.push_measurement(14.5, 22.0);
        let mut channel = SensorChannel::new(bus, config());
        channel.initialize().await.unwrap();

        let started = Instant::now();
        let reading = channel.read_one().await.unwrap();

        assert_eq!(reading.pm2_5(), 14.5);
        assert_eq!(reading.pm10(), 22.0);
        assert_eq!(channel.bus().ready_polls(), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(300));
        assert_eq!(channel.state(), ChannelState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_errors_count_as_polls() {
        let mut bus = ScriptedBus::new(BusScript {
            ready_flag_errors: 2,
            ..BusScript::default()
        });
        bus.push_measurement(5.0, 6.0);
        let mut channel = SensorChannel::new(bus, config());
        channel.initialize().await.unwrap();

        assert!(channel.read_one().await.is_ok());
        assert_eq!(channel.bus().ready_polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_one_times_out_when_never_ready() {
        let bus = ScriptedBus::new(BusScript {
            not_ready_polls: u32::MAX,
            ..BusScript::default()
        });
        let mut channel = SensorChannel::new(bus, config());
        channel.initialize().await.unwrap();

        let err = channel.read_one().await.unwrap_err();
        assert_eq!(err, SensorError::ReadyTimeout { polls: 5 });
        assert_eq!(channel.state(), ChannelState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_surfaces_read_error() {
        let bus = ScriptedBus::new(BusScript::default());
        let mut channel = SensorChannel::new(bus, config());
        channel.initialize().await.unwrap();

        // nothing queued: the fetch NACKs
        let err = channel.read_one().await.unwrap_err();
        assert_eq!(err, SensorError::ReadError(BusError::Nack));
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_measurement_is_not_a_reading() {
        let mut bus = ScriptedBus::new(BusScript::default());
        bus.push_measurement(-3.0, 10.0);
        let mut channel = SensorChannel::new(bus, config());
        channel.initialize().await.unwrap();

        assert!(matches!(
            channel.read_one().await,
            Err(SensorError::InvalidMeasurement { .. })
        ));
    }
}
