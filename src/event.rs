//! Detection event boundary.
//!
//! Two event kinds per processed frame: one per matched target and one per
//! label reported without a localized instance. Delivery is best-effort; the
//! façade logs sink errors and keeps going.

use anyhow::{anyhow, Context, Result};
use rumqttc::v5::{mqttbytes::QoS, Client, Connection, Event, MqttOptions};
use serde::Serialize;
use std::time::Duration;

use crate::detect::result::BoundingBox;

pub const EVENT_OBJECT_DETECTED: &str = "object_detected";
pub const EVENT_LABEL_DETECTED: &str = "label_detected";

const DEFAULT_MQTT_PORT: u16 = 1883;
const MQTT_CHANNEL_CAPACITY: usize = 10;

/// A single notification, with a flat payload.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum SentryEvent {
    Object(ObjectDetected),
    Label(LabelDetected),
}

#[derive(Clone, Debug, Serialize)]
pub struct ObjectDetected {
    pub entity_id: String,
    pub name: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_file: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LabelDetected {
    pub entity_id: String,
    pub name: String,
    pub confidence: f64,
}

impl SentryEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SentryEvent::Object(_) => EVENT_OBJECT_DETECTED,
            SentryEvent::Label(_) => EVENT_LABEL_DETECTED,
        }
    }
}

/// Event delivery boundary.
pub trait EventSink: Send {
    fn emit(&mut self, event: &SentryEvent) -> Result<()>;
}

/// Sink that writes events to the process log.
#[derive(Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &SentryEvent) -> Result<()> {
        let payload = serde_json::to_string(event).context("serialize event")?;
        log::info!("{}: {}", event.kind(), payload);
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct MqttSinkConfig {
    /// `host` or `host:port`; port defaults to 1883.
    pub broker_addr: String,
    pub topic_prefix: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Sink publishing event JSON to `<prefix>/<kind>` at QoS 1.
///
/// The connection is drained on a background thread so publishes make
/// progress without an async runtime.
pub struct MqttEventSink {
    client: Client,
    topic_prefix: String,
    connection_handle: Option<std::thread::JoinHandle<()>>,
}

impl MqttEventSink {
    pub fn connect(config: &MqttSinkConfig) -> Result<Self> {
        let (host, port) = split_host_port(&config.broker_addr)?;
        let mut options = MqttOptions::new(config.client_id.clone(), host, port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, connection) = Client::new(options, MQTT_CHANNEL_CAPACITY);
        Ok(Self {
            client,
            topic_prefix: config.topic_prefix.clone(),
            connection_handle: Some(drain_connection(connection)),
        })
    }

    pub fn disconnect(mut self) -> Result<()> {
        self.client.disconnect().context("mqtt disconnect")?;
        if let Some(handle) = self.connection_handle.take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl EventSink for MqttEventSink {
    fn emit(&mut self, event: &SentryEvent) -> Result<()> {
        let topic = format!("{}/{}", self.topic_prefix, event.kind());
        let payload = serde_json::to_vec(event).context("serialize event")?;
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .context("publish event")?;
        Ok(())
    }
}

fn drain_connection(mut connection: Connection) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(_)) | Ok(Event::Outgoing(_)) => {}
                Err(e) => {
                    log::warn!("mqtt connection error: {}", e);
                    break;
                }
            }
        }
    })
}

fn split_host_port(addr: &str) -> Result<(String, u16)> {
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port: u16 = port
                .parse()
                .map_err(|_| anyhow!("invalid mqtt broker port in '{}'", addr))?;
            Ok((host.to_string(), port))
        }
        _ if !addr.is_empty() => Ok((addr.to_string(), DEFAULT_MQTT_PORT)),
        _ => Err(anyhow!("mqtt broker address must not be empty")),
    }
}
