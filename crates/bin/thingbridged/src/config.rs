//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `thingbridge.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;

use thingbridge_adapter_mqtt::MqttConfig;
use thingbridge_app::dispatcher::DispatcherConfig;
use thingbridge_domain::filter::RelevanceFilter;

pub const DEFAULT_THING_MODEL_URL: &str =
    "https://raw.githubusercontent.com/connected-intelligent-systems/thing-models/main/home_assistant";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gateway connection.
    pub mqtt: MqttConfig,
    /// What gets forwarded and how it is described.
    pub forwarding: ForwardingConfig,
    /// Simulated hub settings.
    pub hub: HubConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Forwarding rules.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Base URL of the thing-model repository.
    pub thing_model_url: String,
    /// Entities forwarded regardless of their device class.
    pub entities: BTreeSet<String>,
    /// Device classes whose entities are forwarded.
    pub device_classes: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Seconds between two simulated readings.
    pub simulation_interval_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `thingbridge.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("thingbridge.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("THINGBRIDGE_HOST") {
            self.mqtt.host = val;
        }
        if let Some(port) = var("THINGBRIDGE_PORT").and_then(|val| val.parse().ok()) {
            self.mqtt.port = port;
        }
        if let Some(val) = var("THINGBRIDGE_ACCESS_TOKEN") {
            self.mqtt.access_token = val;
        }
        if let Some(tls) = var("THINGBRIDGE_TLS").and_then(|val| parse_flag(&val)) {
            self.mqtt.tls = tls;
        }
        if let Some(val) = var("THINGBRIDGE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::Validation("host must not be empty".to_string()));
        }
        if self.mqtt.access_token.is_empty() {
            return Err(ConfigError::Validation(
                "access token must not be empty".to_string(),
            ));
        }
        if self.forwarding.thing_model_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "thing model URL must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings for the event dispatcher.
    #[must_use]
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            filter: RelevanceFilter::new(
                self.forwarding.entities.iter().cloned(),
                self.forwarding.device_classes.iter().cloned(),
            ),
            thing_model_url: self
                .forwarding
                .thing_model_url
                .trim_end_matches('/')
                .to_string(),
        }
    }

    #[must_use]
    pub fn simulation_interval(&self) -> Duration {
        Duration::from_secs(self.hub.simulation_interval_secs.max(1))
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            thing_model_url: DEFAULT_THING_MODEL_URL.to_string(),
            entities: BTreeSet::new(),
            device_classes: BTreeSet::new(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            simulation_interval_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "thingbridged=info,thingbridge=info,rumqttc=warn".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> Config {
        let mut config = Config::default();
        config.mqtt.access_token = "secret".to_string();
        config
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.mqtt.host, "mqtt.example.local");
        assert_eq!(config.mqtt.port, 8883);
        assert!(config.mqtt.tls);
        assert_eq!(config.forwarding.thing_model_url, DEFAULT_THING_MODEL_URL);
        assert!(config.forwarding.entities.is_empty());
        assert_eq!(config.hub.simulation_interval_secs, 10);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.mqtt.port, 8883);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [mqtt]
            host = 'broker.local'
            port = 1883
            tls = false
            access_token = 'abc'

            [forwarding]
            thing_model_url = 'https://models.local/ha'
            entities = ['sensor.outside']
            device_classes = ['temperature', 'humidity']

            [hub]
            simulation_interval_secs = 3

            [logging]
            filter = 'debug'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 1883);
        assert!(!config.mqtt.tls);
        assert_eq!(config.mqtt.access_token, "abc");
        assert_eq!(config.forwarding.thing_model_url, "https://models.local/ha");
        assert!(config.forwarding.entities.contains("sensor.outside"));
        assert_eq!(config.forwarding.device_classes.len(), 2);
        assert_eq!(config.simulation_interval(), Duration::from_secs(3));
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.mqtt.port, 8883);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }

    #[test]
    fn should_apply_environment_overrides() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("THINGBRIDGE_HOST", "10.0.0.2"),
            ("THINGBRIDGE_PORT", "1883"),
            ("THINGBRIDGE_ACCESS_TOKEN", "token"),
            ("THINGBRIDGE_TLS", "false"),
            ("THINGBRIDGE_LOG", "trace"),
        ]));
        assert_eq!(config.mqtt.host, "10.0.0.2");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.access_token, "token");
        assert!(!config.mqtt.tls);
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_prefer_rust_log_over_own_variable() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("THINGBRIDGE_LOG", "trace"), ("RUST_LOG", "warn")]));
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn should_ignore_unparsable_overrides() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("THINGBRIDGE_PORT", "abc"), ("THINGBRIDGE_TLS", "maybe")]));
        assert_eq!(config.mqtt.port, 8883);
        assert!(config.mqtt.tls);
    }

    #[test]
    fn should_accept_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = valid();
        config.mqtt.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_missing_access_token() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_blank_host() {
        let mut config = valid();
        config.mqtt.host = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_empty_thing_model_url() {
        let mut config = valid();
        config.forwarding.thing_model_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_build_dispatcher_config_from_forwarding_rules() {
        let mut config = valid();
        config.forwarding.thing_model_url = "https://models.local/ha/".to_string();
        config.forwarding.device_classes.insert("temperature".to_string());

        let dispatcher = config.dispatcher_config();
        assert_eq!(dispatcher.thing_model_url, "https://models.local/ha");
        assert!(dispatcher.filter.device_classes.contains("temperature"));
        assert!(dispatcher.filter.entities.is_empty());
    }

    #[test]
    fn should_never_use_zero_simulation_interval() {
        let mut config = valid();
        config.hub.simulation_interval_secs = 0;
        assert_eq!(config.simulation_interval(), Duration::from_secs(1));
    }
}
