//! # thingbridged: thingbridge daemon
//!
//! Composition root that wires the hub, the bridging core and the gateway
//! adapter together.
//!
//! ## Responsibilities
//! - Load configuration (`thingbridge.toml` + environment)
//! - Initialize logging
//! - Validate the broker and access token with a one-shot probe
//! - Connect the MQTT publisher and start the simulated hub
//! - Run the event dispatcher until SIGINT, then shut everything down
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer. No bridging logic belongs here.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use thingbridge_adapter_mqtt::{MqttPublisher, ProbeError, ProbeFailure, probe};
use thingbridge_adapter_virtual::VirtualHub;
use thingbridge_app::dispatcher::EventDispatcher;
use thingbridge_app::event_bus::InProcessEventBus;
use thingbridge_app::ports::DeviceRegistry;
use thingbridge_app::registration_cache::RegistrationCache;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging.filter);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.mqtt.host,
        port = config.mqtt.port,
        "starting thingbridged"
    );

    if let Err(err) = probe(&config.mqtt).await {
        report_probe_failure(&err);
        return Err(err.into());
    }

    let publisher = Arc::new(MqttPublisher::connect(&config.mqtt));
    let hub = Arc::new(VirtualHub::default());
    let bus = Arc::new(InProcessEventBus::new(256));

    let dispatcher_config = config.dispatcher_config();
    if dispatcher_config.filter.is_empty() {
        let available = hub.device_classes().await.unwrap_or_default();
        tracing::warn!(
            ?available,
            "no entities or device classes configured, nothing will be forwarded"
        );
    }

    let dispatcher = Arc::new(EventDispatcher::new(
        Arc::clone(&publisher),
        Arc::clone(&hub),
        RegistrationCache::new(),
        dispatcher_config,
    ));
    let subscription = dispatcher.spawn(bus.subscribe());
    hub.start(Arc::clone(&bus), config.simulation_interval());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    subscription.cancel();
    hub.stop();
    publisher.disconnect().await;

    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?}: {err}, falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn report_probe_failure(err: &ProbeError) {
    match err.kind() {
        ProbeFailure::InvalidAuth => {
            tracing::error!(reason = %err.kind(), "the broker rejected the access token");
        }
        ProbeFailure::CannotConnect => {
            tracing::error!(reason = %err.kind(), error = %err, "cannot reach the MQTT broker");
        }
        ProbeFailure::Unknown => {
            tracing::error!(
                reason = %err.kind(),
                error = ?err,
                "unexpected error while connecting"
            );
        }
    }
}
