//! Container lifecycle events

use crate::name::ServiceName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Installed,
    Starting,
    Started,
    StartFailed { message: String },
    Stopping,
    Stopped,
    Removed,
}

/// A lifecycle transition, broadcast to every subscriber.
///
/// Events are emitted in the order transitions are applied, so a subscriber
/// sees a consistent history per service (barring lag, which receivers must
/// handle by re-reading current state).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerEvent {
    pub service: ServiceName,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

impl ContainerEvent {
    pub(crate) fn now(service: ServiceName, kind: EventKind) -> Self {
        Self {
            service,
            kind,
            timestamp: Utc::now(),
        }
    }
}
