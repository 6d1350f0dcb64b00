//! Push events
//!
//! Every message is a JSON envelope `{ "module": "<id>", "data": <any> }`.
//! The envelope picks the receiving module; `data` is handed over untouched.
//! Payloads that are not valid envelopes are dropped without a word beyond
//! a debug log.
//!
//! `MqttSource` subscribes to a broker topic and forwards raw payloads from a
//! background thread to the main loop.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use rumqttc::{Client, ClientError, Connection, ConnectionError, Event, MqttOptions, Packet, QoS};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::modules::ModuleManager;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TOPIC: &str = "overlay";

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const REQUEST_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    pub module: String,
    #[serde(default)]
    pub data: Value,
}

/// Parse one payload; `None` for anything that is not an envelope
pub fn parse_envelope(payload: &str) -> Option<Envelope> {
    match serde_json::from_str::<Envelope>(payload) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            debug!(error = %e, "dropping malformed payload");
            None
        },
    }
}

/// Route one raw payload to the module it names.
/// Returns true when a loaded module received it.
pub fn dispatch_payload(manager: &ModuleManager, payload: &str) -> bool {
    let Some(Envelope { module, data }) = parse_envelope(payload) else {
        return false;
    };
    trace!(%module, "dispatching envelope");
    manager.dispatch(&module, data)
}

#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("failed to subscribe to topic '{topic}'")]
    Subscribe {
        topic: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to connect to MQTT broker at {host}:{port}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: ConnectionError,
    },
    #[error("connection to MQTT broker at {host}:{port} closed")]
    Closed { host: String, port: u16 },
}

/// MQTT subscription drained by the main loop
pub struct MqttSource {
    receiver: Receiver<String>,
    // Dropping the client would end the event loop
    _client: Client,
    _thread: thread::JoinHandle<()>,
}

impl MqttSource {
    /// Connect and subscribe. Fails immediately if the broker cannot be reached.
    pub fn connect(host: &str, port: u16, topic: &str) -> Result<Self, EventSourceError> {
        let client_id = format!("pyrocast-{}", std::process::id());
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut connection) = Client::new(options, REQUEST_CAPACITY);

        client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|source| EventSourceError::Subscribe {
                topic: topic.to_string(),
                source,
            })?;

        // Poll once so an unreachable broker fails fast
        match connection.iter().next() {
            Some(Ok(_)) => {},
            Some(Err(source)) => {
                return Err(EventSourceError::Connect {
                    host: host.to_string(),
                    port,
                    source,
                });
            },
            None => {
                return Err(EventSourceError::Closed {
                    host: host.to_string(),
                    port,
                });
            },
        }

        let (sender, receiver) = mpsc::channel();
        let topic_owned = topic.to_string();
        let handle = thread::spawn(move || {
            Self::message_loop(connection, sender, &topic_owned);
        });

        info!(host, port, topic, "connected to MQTT broker");

        Ok(Self {
            receiver,
            _client: client,
            _thread: handle,
        })
    }

    fn message_loop(mut connection: Connection, sender: Sender<String>, topic: &str) {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if publish.topic != topic {
                        continue;
                    }
                    let Ok(text) = String::from_utf8(publish.payload.to_vec()) else {
                        debug!("dropping non UTF-8 payload");
                        continue;
                    };
                    if sender.send(text).is_err() {
                        // Main loop gone
                        break;
                    }
                },
                Ok(_) => {},
                Err(e) => {
                    // rumqttc reconnects on the next poll
                    warn!(error = %e, "MQTT error");
                    thread::sleep(Duration::from_secs(1));
                },
            }
        }
    }

    /// Every payload received since the last poll, oldest first (non-blocking)
    pub fn poll(&self) -> Vec<String> {
        self.receiver.try_iter().collect()
    }
}
