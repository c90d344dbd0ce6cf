//! Lifecycle notifications
//!
//! The manager reports every session transition to a [`NotificationSink`]
//! and records authenticated sessions through an optional [`StatusRecorder`].

mod recorder;
mod sink;
mod types;

pub use recorder::{HttpStatusRecorder, StatusRecorder, StatusUpdate};
pub use sink::{BroadcastNotifier, NotificationSink, TracingNotifier};
pub use types::LifecycleEvent;
