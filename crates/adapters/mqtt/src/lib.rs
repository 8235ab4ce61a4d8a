//! MQTT adapter for the device-management gateway API.
//!
//! [`MqttPublisher`] implements the
//! [`GatewayPublisher`](thingbridge_app::ports::GatewayPublisher) port over a
//! single long-lived rumqttc session, with PUBACK tracking for publishes that
//! must be acknowledged before the caller proceeds. [`probe`] validates the
//! configured broker and token before the bridge starts.

mod acks;
mod config;
mod error;
mod probe;
mod publisher;
mod tls;

pub use config::MqttConfig;
pub use error::MqttError;
pub use probe::{ProbeError, ProbeFailure, probe};
pub use publisher::MqttPublisher;
