//! Gateway port: publishing payloads to the device-management platform.

use std::future::Future;

use thingbridge_domain::error::BridgeError;
use thingbridge_domain::payload::Topic;

/// Delivery guarantee requested for a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce,
    /// The broker acknowledges receipt.
    AtLeastOnce,
}

/// Publishes serialized payloads on gateway topics.
///
/// When `wait_for_ack` is set and `qos` is [`QoS::AtLeastOnce`], the
/// returned future resolves only once the broker acknowledged the message.
/// Retries and reconnects are the implementation's business.
pub trait GatewayPublisher {
    fn publish(
        &self,
        topic: Topic,
        payload: Vec<u8>,
        qos: QoS,
        wait_for_ack: bool,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

impl<T: GatewayPublisher + Send + Sync> GatewayPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        topic: Topic,
        payload: Vec<u8>,
        qos: QoS,
        wait_for_ack: bool,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).publish(topic, payload, qos, wait_for_ack)
    }
}
