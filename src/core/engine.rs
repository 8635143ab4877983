// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Engine - builds the sensor and sinks from configuration and drives the loop

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{info, warn};

use super::{AcquisitionLoop, LoopStats, ReadinessBus, SystemState};
use crate::analysis::AggregationWindow;
use crate::config::Config;
use crate::detection::{AlertEvaluator, LogIndicator};
use crate::sensors::{ChannelConfig, ParticleSensor, SensorChannel, SensorError, SimulatedSps30};
use crate::streaming::{
    DisplaySink, FileExportSink, HttpUploadSink, MqttNotifySink, SharedDisplay, SinkRouter, SinkStatus,
};

/// Main pmwatch engine
pub struct Engine {
    pub config: Arc<Config>,
    acquisition: AcquisitionLoop<Box<dyn ParticleSensor>>,
    display: Option<SharedDisplay>,
    state: SystemState,
}

impl Engine {
    /// Build with the sensor selected by configuration
    pub async fn new(config: Config) -> Result<Self> {
        let sensor = build_sensor(&config)?;
        Self::with_sensor(config, sensor).await
    }

    /// Build around an already constructed sensor
    ///
    /// Async because the MQTT sink spawns its event loop on the current runtime.
    pub async fn with_sensor(config: Config, sensor: Box<dyn ParticleSensor>) -> Result<Self> {
        config.validate()?;

        let readiness = ReadinessBus::new();
        let mut router = SinkRouter::new();
        let streaming = &config.streaming;

        if streaming.mqtt_enabled {
            let sink = MqttNotifySink::connect(streaming, readiness.sender());
            router.register(Box::new(sink));
        }
        if streaming.upload_enabled {
            router.register(Box::new(HttpUploadSink::new(streaming)?));
        }
        if streaming.export_enabled {
            let path = config.data_dir.join(&streaming.export_path);
            let sink = FileExportSink::new(&path)
                .with_context(|| format!("preparing export directory {:?}", path))?;
            router.register(Box::new(sink));
        }

        let display = if config.display.enabled {
            let sink = DisplaySink::new(config.display.chart_points);
            let model = sink.model();
            router.register(Box::new(sink));
            Some(model)
        } else {
            None
        };

        if router.is_empty() {
            warn!("No sinks configured, readings will only be logged");
        }

        let start = Instant::now();
        let acquisition = AcquisitionLoop::new(
            sensor,
            AlertEvaluator::new(config.alert),
            AggregationWindow::new(config.window_config(), start),
            router,
            Box::new(LogIndicator::new()),
            readiness,
            config.loop_config(),
            start,
        );

        let state = SystemState {
            sinks: acquisition.router().len(),
            ..SystemState::default()
        };

        Ok(Self {
            config: Arc::new(config),
            acquisition,
            display,
            state,
        })
    }

    /// Bring the sensor up
    ///
    /// A sensor that never answers is fatal. A rejected configuration command
    /// is logged and acquisition goes ahead.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting pmwatch engine...");

        match self.acquisition.sensor_mut().initialize().await {
            Ok(()) => {}
            Err(e @ SensorError::ProbeFailed { .. }) => {
                return Err(e).context("particle sensor did not respond");
            }
            Err(e) => warn!("Sensor configuration incomplete, continuing: {}", e),
        }

        self.acquisition.restart_clock(Instant::now());
        self.state.running = true;
        self.state.started_at = Some(Utc::now());
        self.state.sensor_serial = self.acquisition.sensor().serial().map(str::to_string);

        info!("pmwatch engine started");
        Ok(())
    }

    /// Run the acquisition loop until shutdown, then stop measuring
    pub async fn run(&mut self, shutdown: broadcast::Receiver<()>) -> Result<()> {
        self.acquisition.run(shutdown).await;
        self.stop().await;
        Ok(())
    }

    pub async fn stop(&mut self) {
        info!("Stopping pmwatch engine...");
        if let Err(e) = self.acquisition.sensor_mut().shutdown().await {
            warn!("Could not stop measurement: {}", e);
        }
        self.state.running = false;
        self.state.stopped_at = Some(Utc::now());

        for status in self.sink_status() {
            info!(
                "Sink '{}': {} delivered, {} failed, {} skipped",
                status.name, status.stats.delivered, status.stats.failed, status.stats.skipped
            );
        }
        info!("pmwatch engine stopped");
    }

    pub fn state(&self) -> SystemState {
        self.state.clone()
    }

    pub fn stats(&self) -> LoopStats {
        self.acquisition.stats()
    }

    pub fn sink_status(&self) -> Vec<SinkStatus> {
        self.acquisition.router().status()
    }

    /// Display model, when the display sink is enabled
    pub fn display(&self) -> Option<SharedDisplay> {
        self.display.clone()
    }
}

fn build_sensor(config: &Config) -> Result<Box<dyn ParticleSensor>> {
    let channel = config.channel_config();
    if config.demo_mode {
        info!("Demo mode: using a simulated SPS30");
        let simulator = SimulatedSps30::new().with_spike_probability(config.sensor.demo_spike_probability);
        return Ok(Box::new(SensorChannel::new(simulator, channel)));
    }
    open_hardware(config, channel)
}

#[cfg(feature = "hardware")]
fn open_hardware(config: &Config, channel: ChannelConfig) -> Result<Box<dyn ParticleSensor>> {
    let bus = crate::sensors::sps30::linux::open(&config.sensor.i2c_bus)
        .with_context(|| format!("opening I2C bus {}", config.sensor.i2c_bus))?;
    info!("SPS30 on {}", config.sensor.i2c_bus);
    Ok(Box::new(SensorChannel::new(bus, channel)))
}

#[cfg(not(feature = "hardware"))]
fn open_hardware(config: &Config, _channel: ChannelConfig) -> Result<Box<dyn ParticleSensor>> {
    anyhow::bail!(
        "built without the `hardware` feature, cannot open {}; use --demo",
        config.sensor.i2c_bus
    )
}
