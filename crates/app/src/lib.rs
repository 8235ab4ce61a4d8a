//! # thingbridge-app
//!
//! Application layer: the bridging core and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `GatewayPublisher`: publish a payload on a gateway topic
//!   - `DeviceRegistry`: look up the hub device owning an entity
//!   - `NotificationPublisher`: push hub notifications into the bridge
//! - Resolve hub entities into device identities (`IdentityResolver`)
//! - Track which devices were announced this session (`RegistrationCache`)
//! - Filter notifications and drive the connect → attributes → telemetry
//!   sequence (`EventDispatcher`)
//! - Provide the in-process notification bus
//!
//! ## Dependency rule
//! Depends on `thingbridge-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod dispatcher;
pub mod event_bus;
pub mod identity_resolver;
pub mod ports;
pub mod registration_cache;
