//! Property notifications delivered on the "changing" and "changed" channels

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Identity of the model that raised an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModelId(u64);

impl ModelId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Why a notification was raised
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeCause {
    /// The property itself was set
    Set,
    /// Raised explicitly through `notify_changed`
    Notify,
    /// The property depends on `trigger`, which changed
    Cascade { trigger: Arc<str> },
}

/// A "changing" or "changed" notification for one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyEvent {
    /// Model that raised the event (cascaded events keep the original sender)
    pub sender: ModelId,
    pub property: Arc<str>,
    pub cause: ChangeCause,
}

impl PropertyEvent {
    pub fn is_cascade(&self) -> bool {
        matches!(self.cause, ChangeCause::Cascade { .. })
    }

    /// Trigger property for cascaded events
    pub fn trigger(&self) -> Option<&str> {
        match &self.cause {
            ChangeCause::Cascade { trigger } => Some(trigger),
            ChangeCause::Set | ChangeCause::Notify => None,
        }
    }
}
