//! State-changed notifications as emitted by the hub.

use serde::{Deserialize, Serialize};

use crate::snapshot::StateSnapshot;

/// A single "state changed" notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChanged {
    pub entity_id: String,
    #[serde(default)]
    pub new_state: Option<StateSnapshot>,
    #[serde(default)]
    pub old_state: Option<StateSnapshot>,
}

/// What a notification means for the bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Change<'a> {
    /// The entity has a new state.
    Updated(&'a StateSnapshot),
    /// The entity was removed from the hub (old state only).
    Removed,
    /// Nothing usable: no entity reference or no state at all.
    Ignored,
}

impl StateChanged {
    /// Notification carrying a new state.
    #[must_use]
    pub fn updated(entity_id: impl Into<String>, new_state: StateSnapshot) -> Self {
        Self {
            entity_id: entity_id.into(),
            new_state: Some(new_state),
            old_state: None,
        }
    }

    /// Notification for an entity removed from the hub.
    #[must_use]
    pub fn removed(entity_id: impl Into<String>, old_state: StateSnapshot) -> Self {
        Self {
            entity_id: entity_id.into(),
            new_state: None,
            old_state: Some(old_state),
        }
    }

    #[must_use]
    pub fn change(&self) -> Change<'_> {
        if self.entity_id.is_empty() {
            return Change::Ignored;
        }
        match (&self.new_state, &self.old_state) {
            (Some(state), _) => Change::Updated(state),
            (None, Some(_)) => Change::Removed,
            (None, None) => Change::Ignored,
        }
    }
}
