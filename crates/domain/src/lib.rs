//! # thingbridge-domain
//!
//! Pure domain model for the thingbridge gateway bridge.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps
//! - Define **device identity** (hashed device key + optional parent grouping)
//! - Define **state snapshots** as delivered by the hub, and the sentinel
//!   states that carry no measurement
//! - Define **device classes** and their `"generic"` fallback
//! - Define the **relevance filter** (entity and device-class allow-lists)
//! - Build the three **gateway payloads** (connect, telemetry, attributes)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod device_class;
pub mod filter;
pub mod identity;
pub mod notification;
pub mod payload;
pub mod snapshot;
