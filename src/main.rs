// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! pmwatch - Particulate Matter Monitor
//!
//! Headless acquisition daemon: reads the SPS30, alerts on hazardous air and
//! forwards readings and window averages to the configured sinks.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use pmwatch::{build_info, Config, Engine, VERSION};

/// pmwatch - Particulate Matter Monitor
#[derive(Parser, Debug)]
#[command(name = "pmwatch")]
#[command(author = "bad-antics")]
#[command(version = VERSION)]
#[command(about = "SPS30 particulate matter monitor with hazard alerting and multi-sink delivery")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with a simulated sensor
    #[arg(long)]
    demo: bool,

    /// MQTT broker address (enables MQTT notifications)
    #[arg(long)]
    mqtt_broker: Option<String>,

    /// Realtime-database base URL (enables upload)
    #[arg(long)]
    upload_url: Option<String>,

    /// I2C bus device, e.g. /dev/i2c-1
    #[arg(long)]
    i2c_bus: Option<String>,

    /// Data output directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let build = build_info();
    info!("pmwatch v{} - Particulate Matter Monitor", VERSION);
    info!("   {} / {} features: {:?}", build.os, build.target, build.features);

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(mqtt) = args.mqtt_broker {
        config.streaming.mqtt_enabled = true;
        config.streaming.mqtt_broker = mqtt;
    }
    if let Some(url) = args.upload_url {
        config.streaming.upload_enabled = true;
        config.streaming.upload_url = url;
    }
    if let Some(bus) = args.i2c_bus {
        config.sensor.i2c_bus = bus;
    }
    config.validate()?;

    info!("Configuration loaded from {:?}", config_path);
    info!("Demo mode: {}", config.demo_mode);

    // One cooperative context: loop, sensor and sink transports share a thread
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let result = rt.block_on(run(config));
    if let Err(e) = &result {
        error!("pmwatch stopped: {:#}", e);
    }
    result
}

async fn run(config: Config) -> Result<()> {
    let mut engine = Engine::new(config).await?;
    engine.start().await?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, cleaning up..."),
            Err(e) => error!("Could not listen for Ctrl+C: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    info!("pmwatch running, press Ctrl+C to shutdown");
    engine.run(shutdown_rx).await?;

    let stats = engine.stats();
    info!(
        "{} readings, {} averages, {} failed reads",
        stats.readings, stats.aggregates, stats.read_failures
    );
    info!("pmwatch shutdown complete");
    Ok(())
}
