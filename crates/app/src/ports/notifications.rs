//! Notification port: how hub adapters feed state changes into the bridge.

use std::future::Future;

use thingbridge_domain::error::BridgeError;
use thingbridge_domain::notification::StateChanged;

/// Publishes hub notifications to interested subscribers.
pub trait NotificationPublisher {
    /// Publish a notification to all current subscribers.
    fn publish(
        &self,
        notification: StateChanged,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

impl<T: NotificationPublisher + Send + Sync> NotificationPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        notification: StateChanged,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).publish(notification)
    }
}
