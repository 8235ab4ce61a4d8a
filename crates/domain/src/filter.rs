//! Relevance filter: decides which entities are forwarded.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::snapshot::StateSnapshot;

/// Allow-lists of explicit entity references and device classes.
///
/// An event is relevant iff its entity is listed in `entities` **or** its
/// `device_class` attribute is listed in `device_classes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelevanceFilter {
    pub entities: BTreeSet<String>,
    pub device_classes: BTreeSet<String>,
}

impl RelevanceFilter {
    #[must_use]
    pub fn new(
        entities: impl IntoIterator<Item = impl Into<String>>,
        device_classes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            entities: entities.into_iter().map(Into::into).collect(),
            device_classes: device_classes.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn is_relevant(&self, entity_id: &str, snapshot: &StateSnapshot) -> bool {
        if self.entities.contains(entity_id) {
            return true;
        }
        snapshot
            .raw_device_class()
            .is_some_and(|class| self.device_classes.contains(class))
    }

    /// Whether nothing at all would be forwarded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.device_classes.is_empty()
    }
}
