// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sink router - readiness tracking and per-sink isolated dispatch

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::Payload;

/// Delivery destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SinkKind {
    /// Wireless notification channel
    Notify,
    /// Cloud data store
    Upload,
    /// Local display
    Render,
}

impl SinkKind {
    /// Whether window averages are delivered to this kind of sink
    pub fn accepts_aggregates(self) -> bool {
        match self {
            SinkKind::Notify => false,
            SinkKind::Upload | SinkKind::Render => true,
        }
    }
}

/// Delivery failure of one sink
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("sink not ready")]
    NotReady,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected by remote: {0}")]
    Rejected(String),

    #[error("encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A delivery destination
#[async_trait]
pub trait Sink: Send {
    fn kind(&self) -> SinkKind;

    fn name(&self) -> &str;

    /// Readiness at registration time. Later changes arrive as readiness events.
    fn is_ready(&self) -> bool {
        false
    }

    async fn deliver(&mut self, payload: &Payload) -> Result<(), DeliveryError>;

    /// Called once each time the sink drops from ready to not ready
    async fn on_disconnect(&mut self) {}
}

/// Per-sink delivery counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkStats {
    pub delivered: u64,
    pub failed: u64,
    pub skipped: u64,
    pub reannounced: u64,
    pub last_error: Option<String>,
}

/// Snapshot of one registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkStatus {
    pub name: String,
    pub kind: SinkKind,
    pub ready: bool,
    pub stats: SinkStats,
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

struct SinkRegistration {
    sink: Box<dyn Sink>,
    ready: bool,
    stats: SinkStats,
}

/// Owns the sinks and decides who gets a payload
#[derive(Default)]
pub struct SinkRouter {
    sinks: Vec<SinkRegistration>,
}

impl SinkRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sink: Box<dyn Sink>) {
        let ready = sink.is_ready();
        info!("Registered {:?} sink '{}' (ready: {})", sink.kind(), sink.name(), ready);
        self.sinks.push(SinkRegistration {
            sink,
            ready,
            stats: SinkStats::default(),
        });
    }

    /// Update readiness of every sink of `kind`
    ///
    /// A ready to not-ready transition triggers the sink's re-announce hook
    /// exactly once; repeated not-ready reports are no-ops.
    pub async fn set_ready(&mut self, kind: SinkKind, ready: bool) {
        for reg in self.sinks.iter_mut().filter(|r| r.sink.kind() == kind) {
            match (reg.ready, ready) {
                (true, false) => {
                    reg.ready = false;
                    info!("Sink '{}' disconnected, re-announcing", reg.sink.name());
                    reg.sink.on_disconnect().await;
                    reg.stats.reannounced += 1;
                }
                (false, true) => {
                    reg.ready = true;
                    info!("Sink '{}' ready", reg.sink.name());
                }
                _ => {}
            }
        }
    }

    pub fn is_ready(&self, kind: SinkKind) -> bool {
        self.sinks.iter().any(|r| r.sink.kind() == kind && r.ready)
    }

    /// Deliver to every ready sink that takes this payload
    ///
    /// A failing sink is logged and counted; the remaining sinks still receive
    /// the payload.
    pub async fn dispatch(&mut self, payload: &Payload) -> DispatchReport {
        let mut report = DispatchReport::default();

        for reg in self.sinks.iter_mut() {
            let kind = reg.sink.kind();
            if payload.is_aggregate() && !kind.accepts_aggregates() {
                continue;
            }
            if !reg.ready {
                reg.stats.skipped += 1;
                report.skipped += 1;
                continue;
            }

            match reg.sink.deliver(payload).await {
                Ok(()) => {
                    reg.stats.delivered += 1;
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!("Delivery to '{}' failed: {}", reg.sink.name(), e);
                    reg.stats.failed += 1;
                    reg.stats.last_error = Some(e.to_string());
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Dispatched: {} delivered, {} skipped, {} failed",
            report.delivered, report.skipped, report.failed
        );
        report
    }

    pub fn status(&self) -> Vec<SinkStatus> {
        self.sinks
            .iter()
            .map(|r| SinkStatus {
                name: r.sink.name().to_string(),
                kind: r.sink.kind(),
                ready: r.ready,
                stats: r.stats.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}
