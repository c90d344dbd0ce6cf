//! Error types for wapair-core

use thiserror::Error;

use crate::session::SessionId;

/// Errors returned by a [`GatewayClient`](crate::gateway::GatewayClient)
///
/// These never reach callers of the lifecycle manager directly; the manager
/// translates them into [`LifecycleError`] or a `Failed` session state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unexpected gateway response: {0}")]
    UnexpectedResponse(String),

    #[error("Pairing artifact unavailable: {0}")]
    PairingUnavailable(String),

    #[error("Poll failed: {0}")]
    Poll(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Errors from the session store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Session already exists: {0}")]
    DuplicateId(SessionId),

    #[error("Session not found: {0}")]
    NotFound(SessionId),
}

/// Errors surfaced by the lifecycle manager
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Unexpected gateway response: {0}")]
    UnexpectedResponse(String),

    #[error("Pairing unavailable: {0}")]
    PairingUnavailable(String),

    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session already exists: {0}")]
    DuplicateId(SessionId),

    #[error("Lifecycle manager is shut down")]
    ShutDown,
}

impl From<GatewayError> for LifecycleError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::InvalidRequest(message) => Self::Validation(message),
            GatewayError::UnexpectedResponse(message) => Self::UnexpectedResponse(message),
            GatewayError::PairingUnavailable(message) => Self::PairingUnavailable(message),
            GatewayError::Unavailable(message)
            | GatewayError::Poll(message)
            | GatewayError::Client(message) => Self::GatewayUnavailable(message),
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateId(id) => Self::DuplicateId(id),
            StoreError::NotFound(id) => Self::NotFound(id),
        }
    }
}

/// Errors from the downstream status recorder
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Failed to reach status endpoint: {0}")]
    Request(String),

    #[error("Status endpoint rejected update with status {0}")]
    Rejected(u16),
}

/// Configuration values that cannot be used
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
