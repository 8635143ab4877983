// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Acquisition loop - reads, alerts, dispatches and averages on a fixed cadence

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::event_bus::ReadinessBus;
use super::scheduler::PeriodicTask;
use crate::analysis::{AggregateRecord, AggregationWindow};
use crate::detection::{AlertEvaluator, HazardIndicator, HazardState};
use crate::sensors::{ParticleSensor, Reading};
use crate::streaming::{DispatchReport, Payload, SinkRouter};

/// Loop cadence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopConfig {
    /// Outer tick period
    pub tick_period: Duration,
    /// Time between sensor reads
    pub read_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(100),
            read_interval: Duration::from_secs(10),
        }
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub reading: Option<Reading>,
    pub hazard: Option<HazardState>,
    pub reading_dispatch: Option<DispatchReport>,
    pub aggregate: Option<AggregateRecord>,
    pub aggregate_dispatch: Option<DispatchReport>,
    pub read_failed: bool,
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub readings: u64,
    pub read_failures: u64,
    pub aggregates: u64,
    pub hazard_readings: u64,
}

/// Single-context scheduler tying sensor, evaluator, window and router together
pub struct AcquisitionLoop<S> {
    sensor: S,
    evaluator: AlertEvaluator,
    window: AggregationWindow,
    router: SinkRouter,
    indicator: Box<dyn HazardIndicator>,
    readiness: ReadinessBus,
    read_task: PeriodicTask,
    tick_period: Duration,
    stats: LoopStats,
}

impl<S: ParticleSensor> AcquisitionLoop<S> {
    /// `start` anchors both the read cadence and the first aggregation window
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sensor: S,
        evaluator: AlertEvaluator,
        window: AggregationWindow,
        router: SinkRouter,
        indicator: Box<dyn HazardIndicator>,
        readiness: ReadinessBus,
        config: LoopConfig,
        start: Instant,
    ) -> Self {
        Self {
            sensor,
            evaluator,
            window,
            router,
            indicator,
            readiness,
            read_task: PeriodicTask::new("sensor-read", config.read_interval, start),
            tick_period: config.tick_period,
            stats: LoopStats::default(),
        }
    }

    /// Re-anchor the read cadence and the open window, dropping its samples
    pub fn restart_clock(&mut self, start: Instant) {
        self.read_task = PeriodicTask::new("sensor-read", self.read_task.interval(), start);
        self.window = AggregationWindow::new(*self.window.config(), start);
    }

    /// One pass of the loop
    ///
    /// Readiness events are applied first. When the read is due the reading
    /// goes to the evaluator, the router and the window, in that order. The
    /// window is then offered a chance to close. Sensor failures skip the
    /// read for this tick only.
    ///
    /// `now` must come from the tokio clock that stamps readings. A reading
    /// stamped after `now` (the data-ready wait can take several polls) moves
    /// the close time forward so it never falls outside its window.
    pub async fn tick(&mut self, now: Instant) -> TickReport {
        self.stats.ticks += 1;
        let mut report = TickReport::default();

        for event in self.readiness.drain() {
            self.router.set_ready(event.kind, event.ready).await;
        }

        if self.read_task.poll(now) {
            match self.sensor.read_one().await {
                Ok(reading) => {
                    let hazard = self.evaluator.evaluate(&reading);
                    self.indicator.set(hazard);
                    if hazard.active {
                        self.stats.hazard_readings += 1;
                    }

                    let dispatch = self.router.dispatch(&Payload::Reading { reading, hazard }).await;
                    self.window.accumulate(&reading);
                    self.stats.readings += 1;

                    report.reading = Some(reading);
                    report.hazard = Some(hazard);
                    report.reading_dispatch = Some(dispatch);
                }
                Err(e) => {
                    warn!("Sensor read failed, skipping this cycle: {}", e);
                    self.stats.read_failures += 1;
                    report.read_failed = true;
                }
            }
        }

        let close_at = report.reading.map_or(now, |r| r.timestamp().max(now));
        if let Some(record) = self.window.try_close(close_at) {
            info!(
                "Average over {} samples: PM2.5 {:.2} ug/m3, PM10 {:.2} ug/m3",
                record.sample_count, record.avg_pm2_5, record.avg_pm10
            );
            let dispatch = self.router.dispatch(&Payload::Aggregate(record)).await;
            self.stats.aggregates += 1;
            report.aggregate = Some(record);
            report.aggregate_dispatch = Some(dispatch);
        }

        report
    }

    /// Tick on the configured cadence until shutdown is signalled
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            "Acquisition loop running (tick {:?}, '{}' every {:?})",
            self.tick_period,
            self.read_task.name(),
            self.read_task.interval()
        );

        let mut ticker = interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Instant::now()).await;
                }
                _ = shutdown.recv() => {
                    info!("Acquisition loop shutting down...");
                    break;
                }
            }
        }

        debug!("Loop stats: {:?}", self.stats);
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn router(&self) -> &SinkRouter {
        &self.router
    }

    pub fn window(&self) -> &AggregationWindow {
        &self.window
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::WindowConfig;
    use crate::detection::{AlertConfig, LogIndicator};
    use crate::sensors::{ChannelConfig, SensorChannel};
    use crate::streaming::SinkKind;
    use crate::testing::{BusScript, RecordingSink, ScriptedBus, SinkLog};

    struct Rig {
        acquisition: AcquisitionLoop<SensorChannel<ScriptedBus>>,
        notify: SinkLog,
        upload: SinkLog,
        readiness: crate::core::ReadinessSender,
        t0: Instant,
    }

    async fn rig(bus: ScriptedBus, read_interval: Duration) -> Rig {
        let t0 = Instant::now();
        let mut channel = SensorChannel::new(bus, ChannelConfig::default());
        channel.initialize().await.unwrap();

        let notify = RecordingSink::new(SinkKind::Notify, true);
        let upload = RecordingSink::new(SinkKind::Upload, true);
        let (notify_log, upload_log) = (notify.log(), upload.log());
        let mut router = SinkRouter::new();
        router.register(Box::new(notify));
        router.register(Box::new(upload));

        let readiness = ReadinessBus::new();
        let sender = readiness.sender();
        let acquisition = AcquisitionLoop::new(
            channel,
            AlertEvaluator::new(AlertConfig::default()),
            AggregationWindow::new(WindowConfig::default(), t0),
            router,
            Box::new(LogIndicator::new()),
            readiness,
            LoopConfig {
                tick_period: Duration::from_millis(100),
                read_interval,
            },
            t0,
        );

        Rig {
            acquisition,
            notify: notify_log,
            upload: upload_log,
            readiness: sender,
            t0,
        }
    }

    impl Rig {
        /// Advance the paused clock to `t0 + offset` and tick there
        async fn tick_at(&mut self, offset: Duration) -> TickReport {
            let target = self.t0 + offset;
            tokio::time::advance(target.saturating_duration_since(Instant::now())).await;
            self.acquisition.tick(Instant::now()).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_twelve_readings_then_one_average() {
        let mut bus = ScriptedBus::new(BusScript::default());
        for _ in 0..12 {
            bus.push_measurement(20.0, 30.0);
        }
        let mut rig = rig(bus, Duration::from_secs(5)).await;

        let mut aggregates = Vec::new();
        let mut readings = Vec::new();
        for step in 1..=600u64 {
            let report = rig.tick_at(Duration::from_millis(step * 100)).await;
            readings.extend(report.reading);
            aggregates.extend(report.aggregate);
        }

        assert_eq!(aggregates.len(), 1);
        let record = aggregates[0];
        assert_eq!(record.avg_pm2_5, 20.0);
        assert_eq!(record.avg_pm10, 30.0);
        assert_eq!(record.sample_count, 12);
        assert_eq!(record.window_start, rig.t0);
        assert_eq!(record.window_end, rig.t0 + Duration::from_secs(60));

        // readings and window bounds share one clock
        assert_eq!(readings.len(), 12);
        assert!(readings
            .iter()
            .all(|r| r.timestamp() >= record.window_start && r.timestamp() <= record.window_end));
        assert_eq!(readings[11].timestamp(), record.window_end);

        assert_eq!(rig.notify.deliveries(), 12);
        assert_eq!(rig.upload.deliveries(), 12);
        assert_eq!(rig.upload.aggregates(), 1);
        assert_eq!(rig.notify.aggregates(), 0);

        let stats = rig.acquisition.stats();
        assert_eq!(stats.readings, 12);
        assert_eq!(stats.aggregates, 1);
        assert_eq!(stats.read_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_average_delivered_after_its_readings() {
        let mut bus = ScriptedBus::new(BusScript::default());
        for _ in 0..12 {
            bus.push_measurement(8.0, 9.0);
        }
        let mut rig = rig(bus, Duration::from_secs(5)).await;

        for step in 1..=12u64 {
            rig.acquisition.tick(rig.t0 + Duration::from_secs(step * 5)).await;
        }

        let payloads = rig.upload.payloads();
        assert_eq!(payloads.len(), 13);
        assert!(payloads[..12].iter().all(|p| !p.is_aggregate()));
        assert!(payloads[12].is_aggregate());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_only_when_interval_elapsed() {
        let mut bus = ScriptedBus::new(BusScript::default());
        bus.push_measurement(1.0, 2.0);
        let mut rig = rig(bus, Duration::from_secs(10)).await;

        let report = rig.tick_at(Duration::from_secs(5)).await;
        assert!(report.reading.is_none());
        let report = rig.tick_at(Duration::from_secs(10)).await;
        assert_eq!(report.reading.map(|r| r.timestamp()), Some(rig.t0 + Duration::from_secs(10)));
        let report = rig.tick_at(Duration::from_millis(10_100)).await;
        assert!(report.reading.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_ready_wait_closes_window_after_reading() {
        let mut bus = ScriptedBus::new(BusScript {
            not_ready_polls: 3,
            ..BusScript::default()
        });
        bus.push_measurement(7.0, 9.0);
        let mut rig = rig(bus, Duration::from_secs(60)).await;
        let mut window = WindowConfig::default();
        window.min_samples = 1;
        rig.acquisition.window = AggregationWindow::new(window, rig.t0);

        let report = rig.tick_at(Duration::from_secs(60)).await;
        let reading = report.reading.unwrap();
        let record = report.aggregate.unwrap();
        // three 100ms polls before the flag went up
        assert_eq!(reading.timestamp(), rig.t0 + Duration::from_millis(60_300));
        assert_eq!(record.window_end, reading.timestamp());
        assert_eq!(rig.acquisition.window().window_start(), reading.timestamp());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_read_skips_tick_and_loop_continues() {
        let bus = ScriptedBus::new(BusScript::default());
        let mut rig = rig(bus, Duration::from_secs(10)).await;

        // no measurement queued: fetch fails
        let report = rig.acquisition.tick(rig.t0 + Duration::from_secs(10)).await;
        assert!(report.read_failed);
        assert!(report.reading.is_none());
        assert_eq!(rig.acquisition.window().sample_count(), 0);
        assert_eq!(rig.notify.deliveries(), 0);

        // not retried before the next scheduled read
        let report = rig.acquisition.tick(rig.t0 + Duration::from_millis(10_100)).await;
        assert!(!report.read_failed);

        rig.acquisition.sensor_mut().bus_mut().push_measurement(3.0, 4.0);
        let report = rig.acquisition.tick(rig.t0 + Duration::from_secs(20)).await;
        assert!(report.reading.is_some());
        assert_eq!(rig.acquisition.stats().read_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hazard_follows_each_reading() {
        let mut bus = ScriptedBus::new(BusScript::default());
        bus.push_measurement(60.0, 10.0);
        bus.push_measurement(10.0, 10.0);
        let mut rig = rig(bus, Duration::from_secs(10)).await;

        let first = rig.acquisition.tick(rig.t0 + Duration::from_secs(10)).await;
        assert_eq!(first.hazard, Some(HazardState { active: true }));
        let second = rig.acquisition.tick(rig.t0 + Duration::from_secs(20)).await;
        assert_eq!(second.hazard, Some(HazardState { active: false }));

        let payloads = rig.notify.payloads();
        assert!(matches!(payloads[0], Payload::Reading { hazard: HazardState { active: true }, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_events_are_forwarded() {
        let mut bus = ScriptedBus::new(BusScript::default());
        bus.push_measurement(1.0, 1.0);
        bus.push_measurement(1.0, 1.0);
        let mut rig = rig(bus, Duration::from_secs(10)).await;

        rig.readiness.notify(SinkKind::Notify, false);
        rig.readiness.notify(SinkKind::Notify, false);
        let report = rig.acquisition.tick(rig.t0 + Duration::from_secs(10)).await;

        assert_eq!(report.reading_dispatch.map(|d| d.skipped), Some(1));
        assert_eq!(rig.notify.deliveries(), 0);
        assert_eq!(rig.notify.reannounces(), 1);

        rig.readiness.notify(SinkKind::Notify, true);
        rig.acquisition.tick(rig.t0 + Duration::from_secs(20)).await;
        assert_eq!(rig.notify.deliveries(), 1);
        assert_eq!(rig.notify.reannounces(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let mut bus = ScriptedBus::new(BusScript::default());
        for _ in 0..3 {
            bus.push_measurement(5.0, 5.0);
        }
        let mut rig = rig(bus, Duration::from_secs(1)).await;
        let (tx, rx) = broadcast::channel(1);

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3_050)).await;
            let _ = tx.send(());
        });
        rig.acquisition.run(rx).await;
        stopper.await.unwrap();

        assert_eq!(rig.acquisition.stats().readings, 3);
        assert!(rig.acquisition.stats().ticks >= 30);
    }
}
