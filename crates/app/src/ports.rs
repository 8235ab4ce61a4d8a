//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the bridging core and the outside world.
//! They are defined here (in `app`) so that both the core and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod gateway;
pub mod notifications;
pub mod registry;

pub use gateway::{GatewayPublisher, QoS};
pub use notifications::NotificationPublisher;
pub use registry::DeviceRegistry;
