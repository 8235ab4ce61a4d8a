//! MQTT adapter error types.

use thingbridge_domain::error::BridgeError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The session ended before the broker acknowledged the publish.
    #[error("MQTT session closed before acknowledgement")]
    NotConnected,

    /// The broker did not acknowledge the publish in time.
    #[error("MQTT publish not acknowledged within {0:?}")]
    AckTimeout(std::time::Duration),

    /// The rumqttc client returned an error.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl MqttError {
    /// Convert into a [`BridgeError::Transport`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> BridgeError {
        BridgeError::Transport(Box::new(self))
    }
}

impl From<MqttError> for BridgeError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}
