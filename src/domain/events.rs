//! Domain events for the application.
//!
//! These events are pushed to connected realtime clients so the front end can
//! refresh the views affected by a change.

use serde::Serialize;

/// Events sent to connected clients over the realtime channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    /// A catalog entity (`categories`, `employees`, ...) was created or changed.
    DataChanged { entity: String },

    /// Movements were appended or deleted for these equipment items.
    LocationsChanged { equipment_ids: Vec<i64> },
}

impl NotificationEvent {
    #[must_use]
    pub fn data_changed(entity: &str) -> Self {
        Self::DataChanged {
            entity: entity.to_string(),
        }
    }
}
