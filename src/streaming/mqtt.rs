// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! MQTT notification sink

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectionError, Event, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::payload::notify_wire;
use super::{DeliveryError, Payload, Sink, SinkKind, StreamingConfig};
use crate::core::ReadinessSender;

/// Retained message published on `<topic>/status` to re-announce the channel
pub const ANNOUNCE_PAYLOAD: &str = "online";

/// Pushes `"<pm25>#<pm10>"` notifications to a broker topic
pub struct MqttNotifySink {
    client: AsyncClient,
    topic: String,
    status_topic: String,
    event_task: JoinHandle<()>,
}

impl MqttNotifySink {
    /// Create the client and spawn its event loop
    ///
    /// The event loop reports connection state changes through `readiness`.
    pub fn connect(config: &StreamingConfig, readiness: ReadinessSender) -> Self {
        let mut options = MqttOptions::new(&config.mqtt_client_id, &config.mqtt_broker, config.mqtt_port);
        options.set_keep_alive(Duration::from_secs(config.mqtt_keep_alive_secs.max(5)));

        if let (Some(username), Some(password)) = (&config.mqtt_username, &config.mqtt_password) {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 100);
        let reconnect = Duration::from_millis(config.mqtt_reconnect_ms);
        let broker = format!("{}:{}", config.mqtt_broker, config.mqtt_port);

        let event_task = tokio::spawn(async move {
            loop {
                let event = eventloop.poll().await;
                let Some(ready) = link_state(&event) else {
                    continue;
                };
                if ready {
                    info!("MQTT connected to {}", broker);
                } else {
                    warn!("MQTT link to {} lost: {:?}", broker, event);
                }
                readiness.notify(SinkKind::Notify, ready);
                if event.is_err() {
                    tokio::time::sleep(reconnect).await;
                }
            }
        });

        let topic = config.mqtt_topic.clone();
        Self {
            status_topic: status_topic(&topic),
            client,
            topic,
            event_task,
        }
    }
}

/// Link state implied by one event loop result, `None` when it says nothing
fn link_state(event: &Result<Event, ConnectionError>) -> Option<bool> {
    match event {
        Ok(Event::Incoming(Packet::ConnAck(_))) => Some(true),
        Ok(Event::Incoming(Packet::Disconnect)) => Some(false),
        Ok(_) => None,
        Err(_) => Some(false),
    }
}

fn status_topic(topic: &str) -> String {
    format!("{}/status", topic.trim_end_matches('/'))
}

impl Drop for MqttNotifySink {
    fn drop(&mut self) {
        self.event_task.abort();
    }
}

#[async_trait]
impl Sink for MqttNotifySink {
    fn kind(&self) -> SinkKind {
        SinkKind::Notify
    }

    fn name(&self) -> &str {
        "mqtt-notify"
    }

    async fn deliver(&mut self, payload: &Payload) -> Result<(), DeliveryError> {
        let wire = notify_wire(&payload.record());
        self.client
            .publish(&self.topic, QoS::AtLeastOnce, false, wire.clone().into_bytes())
            .await
            .map_err(|e| DeliveryError::Transport(format!("MQTT publish failed: {}", e)))?;
        debug!("Sent: {}", wire);
        Ok(())
    }

    async fn on_disconnect(&mut self) {
        // Queued now, flushed by the event loop once the link is back
        match self
            .client
            .try_publish(&self.status_topic, QoS::AtLeastOnce, true, ANNOUNCE_PAYLOAD)
        {
            Ok(()) => info!("Re-announcing on {} after disconnection", self.status_topic),
            Err(e) => warn!("Could not queue announcement: {}", e),
        }
    }
}
