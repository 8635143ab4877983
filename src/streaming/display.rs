// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Local display sink
//!
//! Keeps a [`DisplayModel`] with labels, the hazard flag and a bounded
//! chart series per pollutant. A frontend reads the model through the
//! shared handle; the sink itself only logs a status line.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use super::payload::render_label;
use super::{DeliveryError, Payload, Sink, SinkKind};

/// What the screen shows
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayModel {
    pub pm2_5_label: String,
    pub pm10_label: String,
    pub hazard: bool,
    pub average_label: Option<String>,
    pub pm2_5_series: VecDeque<f32>,
    pub pm10_series: VecDeque<f32>,
    pub updates: u64,
    capacity: usize,
}

impl DisplayModel {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pm2_5_label: render_label(0.0),
            pm10_label: render_label(0.0),
            hazard: false,
            average_label: None,
            pm2_5_series: VecDeque::with_capacity(capacity),
            pm10_series: VecDeque::with_capacity(capacity),
            updates: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn push_point(&mut self, pm2_5: f32, pm10: f32) {
        if self.pm2_5_series.len() == self.capacity {
            self.pm2_5_series.pop_front();
            self.pm10_series.pop_front();
        }
        self.pm2_5_series.push_back(pm2_5);
        self.pm10_series.push_back(pm10);
    }

    pub fn apply(&mut self, payload: &Payload) {
        match payload {
            Payload::Reading { reading, hazard } => {
                self.pm2_5_label = render_label(f64::from(reading.pm2_5()));
                self.pm10_label = render_label(f64::from(reading.pm10()));
                self.hazard = hazard.active;
                self.push_point(reading.pm2_5(), reading.pm10());
            }
            Payload::Aggregate(record) => {
                self.average_label = Some(format!(
                    "avg {} / {} ({} samples)",
                    render_label(record.avg_pm2_5),
                    render_label(record.avg_pm10),
                    record.sample_count
                ));
            }
        }
        self.updates += 1;
    }
}

impl Default for DisplayModel {
    fn default() -> Self {
        Self::new(60)
    }
}

pub type SharedDisplay = Arc<RwLock<DisplayModel>>;

pub struct DisplaySink {
    model: SharedDisplay,
}

impl DisplaySink {
    pub fn new(chart_points: usize) -> Self {
        Self {
            model: Arc::new(RwLock::new(DisplayModel::new(chart_points))),
        }
    }

    /// Handle for whoever paints the screen
    pub fn model(&self) -> SharedDisplay {
        Arc::clone(&self.model)
    }
}

#[async_trait]
impl Sink for DisplaySink {
    fn kind(&self) -> SinkKind {
        SinkKind::Render
    }

    fn name(&self) -> &str {
        "display"
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn deliver(&mut self, payload: &Payload) -> Result<(), DeliveryError> {
        let mut model = self.model.write();
        model.apply(payload);

        match payload {
            Payload::Reading { .. } => info!(
                "PM2.5 {}  PM10 {}{}",
                model.pm2_5_label,
                model.pm10_label,
                if model.hazard { "  [HAZARD]" } else { "" }
            ),
            Payload::Aggregate(_) => {
                if let Some(label) = &model.average_label {
                    info!("{}", label);
                }
            }
        }
        Ok(())
    }
}
