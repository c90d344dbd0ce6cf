//! Session struct and state machine
//!
//! A session is one pairing attempt against a gateway instance. It moves
//! through `Created → PairingRequested → AwaitingScan` and ends in one of the
//! terminal states `Authenticated`, `Cancelled` or `Failed`.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;

/// Gateway-assigned session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Why a session ended up in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    /// The gateway could not produce a pairing artifact
    PairingUnavailable(String),
    /// State polling failed too many times in a row
    PollError(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PairingUnavailable(message) => write!(f, "pairing unavailable: {message}"),
            Self::PollError(message) => write!(f, "poll error: {message}"),
        }
    }
}

/// State of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    /// Instance created on the gateway, pairing not started
    Created,
    /// Pairing artifact requested from the gateway
    PairingRequested,
    /// Artifact shown, waiting for the user to scan it
    AwaitingScan,
    /// Gateway reported the session open
    Authenticated,
    /// Cancelled by the user before reaching a terminal state
    Cancelled,
    /// Pairing or polling failed
    Failed { reason: FailureReason },
}

impl SessionState {
    /// Short name used in errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::PairingRequested => "PairingRequested",
            Self::AwaitingScan => "AwaitingScan",
            Self::Authenticated => "Authenticated",
            Self::Cancelled => "Cancelled",
            Self::Failed { .. } => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Authenticated | Self::Cancelled | Self::Failed { .. }
        )
    }

    /// States in which the session may hold a pairing artifact
    pub fn holds_artifact(&self) -> bool {
        matches!(self, Self::PairingRequested | Self::AwaitingScan)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Created, PairingRequested)
                | (Created, Cancelled)
                | (PairingRequested, AwaitingScan)
                | (PairingRequested, Failed { .. })
                | (PairingRequested, Cancelled)
                | (AwaitingScan, Authenticated)
                | (AwaitingScan, Failed { .. })
                | (AwaitingScan, Cancelled)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "Failed ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Scannable pairing payload returned by the gateway
///
/// Usually a `data:image/png;base64,...` URI holding a QR code image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairingArtifact(String);

impl PairingArtifact {
    pub fn new(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Decode the image bytes, stripping a data URI prefix if present
    pub fn decode_image(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let encoded = match self.0.split_once(";base64,") {
            Some((_, data)) => data,
            None => self.0.as_str(),
        };
        STANDARD.decode(encoded.trim())
    }
}

/// Snapshot of a managed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    name: String,
    gateway_endpoint: String,
    state: SessionState,
    pairing_artifact: Option<PairingArtifact>,
    created_at: DateTime<Utc>,
    polling: bool,
}

impl Session {
    /// Create a session in the `Created` state
    pub fn new(id: SessionId, name: impl Into<String>, gateway_endpoint: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            gateway_endpoint: gateway_endpoint.into(),
            state: SessionState::Created,
            pairing_artifact: None,
            created_at: Utc::now(),
            polling: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gateway_endpoint(&self) -> &str {
        &self.gateway_endpoint
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn pairing_artifact(&self) -> Option<&PairingArtifact> {
        self.pairing_artifact.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether a poll loop is attached to this session
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Move to `next`, clearing the artifact when leaving the pairing states
    pub(crate) fn transition(&mut self, next: SessionState) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(&next) {
            return Err(LifecycleError::InvalidState {
                expected: format!("a state that can move to {}", next.name()),
                actual: self.state.name().to_string(),
            });
        }

        self.state = next;
        if !self.state.holds_artifact() {
            self.pairing_artifact = None;
        }
        Ok(())
    }

    pub(crate) fn set_pairing_artifact(&mut self, artifact: PairingArtifact) {
        if self.state.holds_artifact() {
            self.pairing_artifact = Some(artifact);
        }
    }

    pub(crate) fn set_polling(&mut self, polling: bool) {
        self.polling = polling;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(SessionId::new(7), "shop1", "http://h1")
    }

    #[test]
    fn new_session_starts_created_without_artifact() {
        let session = session();
        assert_eq!(session.state(), &SessionState::Created);
        assert!(session.pairing_artifact().is_none());
        assert!(!session.is_polling());
        assert_eq!(session.gateway_endpoint(), "http://h1");
    }

    #[test]
    fn happy_path_transitions_are_allowed() {
        let mut session = session();
        session.transition(SessionState::PairingRequested).unwrap();
        session.set_pairing_artifact(PairingArtifact::new("AAA"));
        session.transition(SessionState::AwaitingScan).unwrap();
        assert_eq!(session.pairing_artifact().unwrap().as_str(), "AAA");

        session.transition(SessionState::Authenticated).unwrap();
        assert!(session.pairing_artifact().is_none());
    }

    #[test]
    fn leaving_awaiting_scan_by_failure_clears_artifact() {
        let mut session = session();
        session.transition(SessionState::PairingRequested).unwrap();
        session.set_pairing_artifact(PairingArtifact::new("AAA"));
        session.transition(SessionState::AwaitingScan).unwrap();

        session
            .transition(SessionState::Failed {
                reason: FailureReason::PollError("timeout".into()),
            })
            .unwrap();
        assert!(session.pairing_artifact().is_none());
    }

    #[test]
    fn terminal_states_never_transition() {
        let terminals = [
            SessionState::Authenticated,
            SessionState::Cancelled,
            SessionState::Failed {
                reason: FailureReason::PollError("x".into()),
            },
        ];
        let all = [
            SessionState::Created,
            SessionState::PairingRequested,
            SessionState::AwaitingScan,
            SessionState::Authenticated,
            SessionState::Cancelled,
        ];

        for terminal in &terminals {
            assert!(terminal.is_terminal());
            for next in &all {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn awaiting_scan_cannot_reenter_created() {
        assert!(!SessionState::AwaitingScan.can_transition_to(&SessionState::Created));
        assert!(!SessionState::AwaitingScan.can_transition_to(&SessionState::PairingRequested));
    }

    #[test]
    fn invalid_transition_reports_states() {
        let mut session = session();
        let err = session.transition(SessionState::Authenticated).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidState { ref actual, .. } if actual == "Created"
        ));
        assert_eq!(session.state(), &SessionState::Created);
    }

    #[test]
    fn artifact_is_ignored_outside_pairing_states() {
        let mut session = session();
        session.set_pairing_artifact(PairingArtifact::new("AAA"));
        assert!(session.pairing_artifact().is_none());
    }

    #[test]
    fn decode_image_strips_data_uri() {
        let artifact = PairingArtifact::new("data:image/png;base64,aGVsbG8=");
        assert_eq!(artifact.decode_image().unwrap(), b"hello");

        let bare = PairingArtifact::new("aGVsbG8=");
        assert_eq!(bare.decode_image().unwrap(), b"hello");
    }

    #[test]
    fn state_serializes_with_status_tag() {
        let state = SessionState::Failed {
            reason: FailureReason::PollError("boom".into()),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"]["kind"], "poll_error");
        assert_eq!(json["reason"]["message"], "boom");
    }

    #[test]
    fn session_id_displays_as_integer() {
        assert_eq!(SessionId::new(7).to_string(), "7");
        assert_eq!(serde_json::to_string(&SessionId::new(7)).unwrap(), "7");
    }
}
