//! MQTT transport configuration.

use std::time::Duration;

use rumqttc::MqttOptions;
use serde::Deserialize;

use crate::tls;

/// Configuration for the gateway connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub host: String,
    /// MQTT broker port.
    pub port: u16,
    /// Connect over TLS.
    pub tls: bool,
    /// Accept any server certificate. Only meaningful with `tls`.
    pub tls_insecure: bool,
    /// Gateway access token, sent as the MQTT username.
    pub access_token: String,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// First reconnect delay, in seconds.
    pub reconnect_min_delay_secs: u64,
    /// Upper bound for the reconnect delay, in seconds.
    pub reconnect_max_delay_secs: u64,
    /// How long a blocking publish waits for its PUBACK, in seconds.
    pub ack_timeout_secs: u64,
    /// How long the connection probe waits for CONNACK, in seconds.
    pub connect_timeout_secs: u64,
    /// Capacity of the client request channel.
    pub request_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "mqtt.example.local".to_string(),
            port: 8883,
            tls: true,
            tls_insecure: false,
            access_token: String::new(),
            client_id: "home-assistant".to_string(),
            keep_alive_secs: 60,
            reconnect_min_delay_secs: 1,
            reconnect_max_delay_secs: 120,
            ack_timeout_secs: 5,
            connect_timeout_secs: 5,
            request_capacity: 64,
        }
    }
}

impl MqttConfig {
    /// Build the rumqttc options: credentials, keep-alive and transport.
    #[must_use]
    pub fn mqtt_options(&self) -> MqttOptions {
        self.options_with_client_id(&self.client_id)
    }

    pub(crate) fn options_with_client_id(&self, client_id: &str) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, &self.host, self.port);
        // the platform authenticates gateways by token alone
        options.set_credentials(&self.access_token, "");
        let keep_alive = u64::from(self.keep_alive_secs.max(1));
        options.set_keep_alive(Duration::from_secs(keep_alive));
        if self.tls {
            options.set_transport(tls::transport(self.tls_insecure));
        }
        options
    }

    #[must_use]
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
