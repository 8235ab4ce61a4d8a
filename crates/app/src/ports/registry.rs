//! Registry port: the hub's entity/device registry.

use std::future::Future;

use thingbridge_domain::error::BridgeError;

/// Read-only view of the hub's entity registry.
pub trait DeviceRegistry {
    /// Hub device grouping owning `entity_id`, if any.
    ///
    /// Unknown entities and entities without a device both return `Ok(None)`.
    fn device_id_for(
        &self,
        entity_id: &str,
    ) -> impl Future<Output = Result<Option<String>, BridgeError>> + Send;

    /// Every device class declared by a registered entity, sorted and
    /// deduplicated. Used to present allow-list options to operators.
    fn device_classes(&self) -> impl Future<Output = Result<Vec<String>, BridgeError>> + Send;
}

impl<T: DeviceRegistry + Send + Sync> DeviceRegistry for std::sync::Arc<T> {
    fn device_id_for(
        &self,
        entity_id: &str,
    ) -> impl Future<Output = Result<Option<String>, BridgeError>> + Send {
        (**self).device_id_for(entity_id)
    }

    fn device_classes(&self) -> impl Future<Output = Result<Vec<String>, BridgeError>> + Send {
        (**self).device_classes()
    }
}
