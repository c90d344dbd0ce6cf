//! Lifecycle events reported to notification sinks

use serde::{Deserialize, Serialize};

use crate::session::{FailureReason, SessionId};

/// Event emitted by the lifecycle manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Instance created on the gateway
    Created {
        id: SessionId,
        gateway_endpoint: String,
    },
    /// Pairing artifact available, waiting for the user to scan it
    AwaitingScan { id: SessionId },
    /// Gateway reported the session open
    Authenticated {
        id: SessionId,
        status: String,
        gateway_endpoint: String,
    },
    /// Pairing or polling failed
    Failed { id: SessionId, reason: FailureReason },
    /// Cancelled by the user and removed
    Cancelled { id: SessionId },
    /// Terminal session removed on request
    Removed { id: SessionId },
    /// Open status stored by the downstream recorder
    Recorded { id: SessionId },
    /// Downstream status recording failed; the session stays authenticated
    RecordFailed { id: SessionId, error: String },
}

impl LifecycleEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Created { id, .. }
            | Self::AwaitingScan { id }
            | Self::Authenticated { id, .. }
            | Self::Failed { id, .. }
            | Self::Cancelled { id }
            | Self::Removed { id }
            | Self::Recorded { id }
            | Self::RecordFailed { id, .. } => *id,
        }
    }

    /// Whether the event ends the pairing attempt
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Authenticated { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }

    /// Human readable summary for message banners
    pub fn message(&self) -> String {
        match self {
            Self::Created { id, gateway_endpoint } => {
                format!("Connection {id} created on {gateway_endpoint}")
            }
            Self::AwaitingScan { id } => {
                format!("Scan the QR code with WhatsApp to authenticate connection {id}")
            }
            Self::Authenticated { id, .. } => format!("Connection {id} opened successfully"),
            Self::Failed { id, reason } => format!("Connection {id} failed: {reason}"),
            Self::Cancelled { id } => format!("Connection {id} cancelled"),
            Self::Removed { id } => format!("Connection {id} removed"),
            Self::Recorded { id } => format!("Connection {id} status recorded"),
            Self::RecordFailed { id, error } => {
                format!("Connection {id} is open but its status could not be recorded: {error}")
            }
        }
    }
}
