// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Readiness events from transport collaborators to the acquisition loop

use tokio::sync::mpsc;
use tracing::trace;

use crate::streaming::SinkKind;

/// A sink's transport became ready or lost its link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessEvent {
    pub kind: SinkKind,
    pub ready: bool,
}

/// Cloneable handle given to collaborators (connection managers)
#[derive(Debug, Clone)]
pub struct ReadinessSender {
    tx: mpsc::UnboundedSender<ReadinessEvent>,
}

impl ReadinessSender {
    pub fn notify(&self, kind: SinkKind, ready: bool) {
        trace!("readiness event: {:?} ready={}", kind, ready);
        // Receiver is gone only during shutdown
        let _ = self.tx.send(ReadinessEvent { kind, ready });
    }
}

/// Receiving end, drained by the loop once per tick
#[derive(Debug)]
pub struct ReadinessBus {
    tx: mpsc::UnboundedSender<ReadinessEvent>,
    rx: mpsc::UnboundedReceiver<ReadinessEvent>,
}

impl ReadinessBus {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> ReadinessSender {
        ReadinessSender { tx: self.tx.clone() }
    }

    /// Take every pending event without waiting
    pub fn drain(&mut self) -> Vec<ReadinessEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Default for ReadinessBus {
    fn default() -> Self {
        Self::new()
    }
}
