//! Gateway payload builder.
//!
//! The platform's gateway API multiplexes many devices over one connection:
//! every payload is keyed by the [`DeviceKey`] it concerns and published to
//! one of three fixed topics. Builders are pure and never fail; missing
//! attributes turn into `null` fields.

use serde_json::{Map, Value, json};

use crate::device_class::DeviceClass;
use crate::identity::{DeviceIdentity, DeviceKey};
use crate::snapshot::{StateSnapshot, attr};
use crate::time::epoch_millis;

/// Fixed gateway topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Connect,
    Telemetry,
    Attributes,
}

impl Topic {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "v1/gateway/connect",
            Self::Telemetry => "v1/gateway/telemetry",
            Self::Attributes => "v1/gateway/attributes",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload ready to be published.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayMessage {
    pub topic: Topic,
    pub body: Value,
}

impl GatewayMessage {
    /// Serialize the body to JSON bytes.
    ///
    /// # Errors
    ///
    /// Propagates [`serde_json::Error`]; cannot happen for bodies built here.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.body)
    }
}

/// Announce a device on the gateway.
///
/// `{"device": <key>, "type": <class>}`
#[must_use]
pub fn build_connect(key: &DeviceKey, class: &DeviceClass) -> GatewayMessage {
    GatewayMessage {
        topic: Topic::Connect,
        body: json!({
            "device": key,
            "type": class,
        }),
    }
}

/// Telemetry for a single reading, or `None` when the state carries no
/// measurement and nothing must be published.
///
/// `{<key>: [{"ts": <epoch ms>, "values": {<class>: <state>}}]}`
#[must_use]
pub fn build_telemetry(
    key: &DeviceKey,
    snapshot: &StateSnapshot,
    class: &DeviceClass,
) -> Option<GatewayMessage> {
    if !snapshot.has_measurement() {
        return None;
    }

    let mut values = Map::new();
    values.insert(class.as_str().to_string(), Value::String(snapshot.state.clone()));

    let reading = json!({
        "ts": epoch_millis(snapshot.observed_at()),
        "values": values,
    });

    Some(GatewayMessage {
        topic: Topic::Telemetry,
        body: keyed(key, json!([reading])),
    })
}

/// Thing metadata and model reference for a device.
///
/// `thing_model_url` is the base of the model repository; the document is
/// `<thing_model_url>/<class>.json`.
#[must_use]
pub fn build_attributes(
    identity: &DeviceIdentity,
    snapshot: &StateSnapshot,
    class: &DeviceClass,
    thing_model_url: &str,
) -> GatewayMessage {
    let parents: Vec<Value> = identity
        .parent_uuid()
        .map(|uuid| Value::String(uuid.to_string()))
        .into_iter()
        .collect();

    let mut metadata = Map::new();
    metadata.insert("parents".to_string(), Value::Array(parents));
    metadata.insert("model".to_string(), attribute_or_null(snapshot, attr::MODEL));
    metadata.insert("icon".to_string(), attribute_or_null(snapshot, attr::ICON));
    metadata.insert(
        class.as_str().to_string(),
        json!({ "unit": attribute_or_null(snapshot, attr::UNIT_OF_MEASUREMENT) }),
    );

    let body = json!({
        "thing-metadata": metadata,
        "thing-model": format!("{thing_model_url}/{class}.json"),
    });

    GatewayMessage {
        topic: Topic::Attributes,
        body: keyed(&identity.key, body),
    }
}

fn keyed(key: &DeviceKey, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.as_str().to_string(), value);
    Value::Object(map)
}

fn attribute_or_null(snapshot: &StateSnapshot, key: &str) -> Value {
    snapshot
        .attribute(key)
        .and_then(|value| serde_json::to_value(value).ok())
        .unwrap_or(Value::Null)
}
