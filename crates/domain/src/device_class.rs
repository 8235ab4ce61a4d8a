//! Device class: the semantic category of a sensor reading.

use std::fmt;

use serde::Serialize;

/// Category used when the hub reports no device class.
pub const GENERIC: &str = "generic";

/// Device class as reported by the hub; never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceClass(String);

impl DeviceClass {
    /// Take a raw `device_class` attribute as is, falling back to
    /// [`GENERIC`] when it is missing or empty.
    #[must_use]
    pub fn from_attribute(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if !value.is_empty() => Self(value.to_string()),
            _ => Self(GENERIC.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the fallback category.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.0 == GENERIC
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
