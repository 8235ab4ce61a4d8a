//! State snapshot: a point-in-time read of a hub entity.

mod attribute_value;

pub use attribute_value::AttributeValue;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::device_class::DeviceClass;
use crate::time::Timestamp;

/// State reported when the hub has never seen a value.
pub const STATE_UNKNOWN: &str = "unknown";
/// State reported when the source is unreachable.
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// Well-known attribute keys.
pub mod attr {
    pub const DEVICE_CLASS: &str = "device_class";
    pub const UNIT_OF_MEASUREMENT: &str = "unit_of_measurement";
    pub const ICON: &str = "icon";
    pub const MODEL: &str = "model";
    pub const FRIENDLY_NAME: &str = "friendly_name";
}

/// Snapshot of an entity's state and attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
    pub last_changed: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reported: Option<Timestamp>,
}

impl StateSnapshot {
    /// Create a snapshot without attributes.
    #[must_use]
    pub fn new(state: impl Into<String>, last_changed: Timestamp) -> Self {
        Self {
            state: state.into(),
            attributes: HashMap::new(),
            last_changed,
            last_reported: None,
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether the state carries an actual measurement.
    #[must_use]
    pub fn has_measurement(&self) -> bool {
        self.state != STATE_UNKNOWN && self.state != STATE_UNAVAILABLE
    }

    /// When the reading was taken: `last_reported` if the hub carries it,
    /// otherwise `last_changed`.
    #[must_use]
    pub fn observed_at(&self) -> Timestamp {
        self.last_reported.unwrap_or(self.last_changed)
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Raw `device_class` attribute, if it is a string.
    #[must_use]
    pub fn raw_device_class(&self) -> Option<&str> {
        self.attribute(attr::DEVICE_CLASS).and_then(AttributeValue::as_str)
    }

    /// Device class with the generic fallback applied.
    #[must_use]
    pub fn device_class(&self) -> DeviceClass {
        DeviceClass::from_attribute(self.raw_device_class())
    }
}
