// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Streaming module - payloads, sink router and the concrete sinks

mod display;
mod export;
mod mqtt;
pub mod payload;
mod router;
mod upload;

pub use display::*;
pub use export::*;
pub use mqtt::*;
pub use payload::{MinimalRecord, Payload};
pub use router::*;
pub use upload::*;

use serde::{Deserialize, Serialize};

/// Streaming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Enable MQTT notifications
    pub mqtt_enabled: bool,
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic: String,
    pub mqtt_keep_alive_secs: u64,
    pub mqtt_reconnect_ms: u64,

    /// Enable cloud upload
    pub upload_enabled: bool,
    pub upload_url: String,
    pub upload_path: String,
    pub upload_auth_token: Option<String>,
    pub upload_timeout_secs: u64,

    /// Enable JSON-lines export. A relative path is resolved under `data_dir`.
    pub export_enabled: bool,
    pub export_path: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            mqtt_enabled: false,
            mqtt_broker: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_client_id: "pmwatch".to_string(),
            mqtt_username: None,
            mqtt_password: None,
            mqtt_topic: "pmwatch/notify".to_string(),
            mqtt_keep_alive_secs: 30,
            mqtt_reconnect_ms: 5000,

            upload_enabled: false,
            upload_url: String::new(),
            upload_path: "test".to_string(),
            upload_auth_token: None,
            upload_timeout_secs: 10,

            export_enabled: false,
            export_path: "exports".to_string(),
        }
    }
}
