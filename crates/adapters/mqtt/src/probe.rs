//! One-shot connection check used before the bridge starts forwarding.

use rumqttc::{AsyncClient, ConnectReturnCode, ConnectionError, Event, Packet};

use crate::config::MqttConfig;

/// Why the probe could not establish a session.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The broker could not be reached or the transport failed.
    #[error("cannot connect to MQTT broker")]
    CannotConnect(#[source] ConnectionError),

    /// No CONNACK within the configured connect timeout.
    #[error("MQTT broker did not answer in time")]
    TimedOut,

    /// The broker rejected the access token.
    #[error("MQTT broker rejected the access token")]
    InvalidAuth,

    /// Anything else, including refusals unrelated to credentials.
    #[error("unexpected MQTT connection failure")]
    Unknown(#[source] ConnectionError),
}

/// Coarse failure category, as reported to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    CannotConnect,
    InvalidAuth,
    Unknown,
}

impl ProbeFailure {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CannotConnect => "cannot_connect",
            Self::InvalidAuth => "invalid_auth",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProbeError {
    #[must_use]
    pub fn kind(&self) -> ProbeFailure {
        match self {
            Self::CannotConnect(_) | Self::TimedOut => ProbeFailure::CannotConnect,
            Self::InvalidAuth => ProbeFailure::InvalidAuth,
            Self::Unknown(_) => ProbeFailure::Unknown,
        }
    }
}

fn classify(err: ConnectionError) -> ProbeError {
    match err {
        ConnectionError::ConnectionRefused(
            ConnectReturnCode::BadUserNamePassword | ConnectReturnCode::NotAuthorized,
        ) => ProbeError::InvalidAuth,
        ConnectionError::ConnectionRefused(_)
        | ConnectionError::Io(_)
        | ConnectionError::NetworkTimeout
        | ConnectionError::FlushTimeout
        | ConnectionError::Tls(_) => ProbeError::CannotConnect(err),
        other => ProbeError::Unknown(other),
    }
}

/// Open a throw-away session with the configured credentials.
///
/// Uses a distinct client id so the probe does not kick the long-lived
/// publisher session off the broker.
///
/// # Errors
///
/// See [`ProbeError`].
pub async fn probe(config: &MqttConfig) -> Result<(), ProbeError> {
    let client_id = format!("{}-probe", config.client_id);
    let (client, mut eventloop) = AsyncClient::new(config.options_with_client_id(&client_id), 1);

    let handshake = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                Ok(_) => {}
                Err(err) => return Err(classify(err)),
            }
        }
    };

    let result = match tokio::time::timeout(config.connect_timeout(), handshake).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::TimedOut),
    };

    match &result {
        Ok(()) => {
            tracing::debug!(host = %config.host, port = config.port, "MQTT probe succeeded");
            // best effort, the session is dropped with the event loop anyway
            let _ = client.try_disconnect();
            let _ = tokio::time::timeout(config.connect_timeout(), eventloop.poll()).await;
        }
        Err(err) => {
            tracing::debug!(
                host = %config.host,
                port = config.port,
                error = %err,
                "MQTT probe failed"
            );
        }
    }
    result
}
