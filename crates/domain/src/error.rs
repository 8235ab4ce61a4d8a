//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`BridgeError`]
//! when crossing a port boundary.

/// Boxed error coming from an adapter.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The transport failed to publish or lost its session.
    #[error("transport error")]
    Transport(#[source] BoxError),

    /// The hub registry could not be queried.
    #[error("registry error")]
    Registry(#[source] BoxError),

    /// A payload could not be serialized.
    #[error("failed to serialize payload")]
    Serialize(#[from] serde_json::Error),
}

/// Domain validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Entity references must not be empty.
    #[error("entity reference must not be empty")]
    EmptyEntityId,
}
