//! Session model and registry

pub mod state;
pub mod store;

pub use state::{FailureReason, PairingArtifact, Session, SessionId, SessionState};
pub use store::{SessionList, SessionStore};
