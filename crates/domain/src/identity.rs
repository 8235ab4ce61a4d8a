//! External device identity derived from hub entity references.
//!
//! The platform never sees raw entity references. Each entity is announced
//! under a [`DeviceKey`] (SHA-1 of the reference) and, when the hub groups it
//! under a physical device, a [`DeviceGrouping`] whose parent UUID is a
//! version-5 UUID of the hub's grouping id.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::ValidationError;

/// Hashed, external-facing device key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceKey(String);

impl DeviceKey {
    /// Hash an entity reference into its device key (lowercase hex SHA-1).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyEntityId`] for an empty reference.
    pub fn for_entity(entity_id: &str) -> Result<Self, ValidationError> {
        if entity_id.is_empty() {
            return Err(ValidationError::EmptyEntityId);
        }
        let digest = Sha1::digest(entity_id.as_bytes());
        Ok(Self(hex::encode(digest)))
    }

    /// The hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hub-level physical device that owns the entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGrouping {
    /// Raw grouping id as assigned by the hub.
    pub hub_device_id: String,
    /// Namespace-derived UUID announced as the parent on the platform.
    pub parent_uuid: uuid::Uuid,
}

impl DeviceGrouping {
    /// Derive the grouping from the hub's device id.
    #[must_use]
    pub fn from_hub_device_id(hub_device_id: impl Into<String>) -> Self {
        let hub_device_id = hub_device_id.into();
        let parent_uuid = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, hub_device_id.as_bytes());
        Self {
            hub_device_id,
            parent_uuid,
        }
    }
}

/// Full identity of a logical device for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub key: DeviceKey,
    pub grouping: Option<DeviceGrouping>,
}

impl DeviceIdentity {
    /// Parent UUID, if the entity belongs to a hub device.
    #[must_use]
    pub fn parent_uuid(&self) -> Option<uuid::Uuid> {
        self.grouping.as_ref().map(|g| g.parent_uuid)
    }
}
