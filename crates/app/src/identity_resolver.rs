//! Identity resolver: maps hub entities to external device identities.

use thingbridge_domain::error::BridgeError;
use thingbridge_domain::identity::{DeviceGrouping, DeviceIdentity, DeviceKey};

use crate::ports::DeviceRegistry;

/// Resolves entity references into [`DeviceIdentity`] values.
///
/// Grouping lookups fail soft: an unknown entity, an entity without a
/// device, or a registry error all produce an identity without parent.
pub struct IdentityResolver<R> {
    registry: R,
}

impl<R: DeviceRegistry> IdentityResolver<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Hash the entity reference and look up its device grouping.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] only for an empty entity reference.
    pub async fn resolve(&self, entity_id: &str) -> Result<DeviceIdentity, BridgeError> {
        let key = DeviceKey::for_entity(entity_id)?;
        let grouping = self
            .lookup_grouping(entity_id)
            .await
            .map(DeviceGrouping::from_hub_device_id);
        Ok(DeviceIdentity { key, grouping })
    }

    async fn lookup_grouping(&self, entity_id: &str) -> Option<String> {
        match self.registry.device_id_for(entity_id).await {
            Ok(device_id) => device_id,
            Err(err) => {
                tracing::warn!(
                    %entity_id,
                    error = %err,
                    "device registry lookup failed, announcing without parent"
                );
                None
            }
        }
    }
}
