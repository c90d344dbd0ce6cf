//! GatewayClient trait
//!
//! The gateway is consumed as a black box over three calls. Implementations
//! are stateless with respect to sessions and never retry; retry policy
//! belongs to the poll loop.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::session::{PairingArtifact, SessionId};

/// Instance freshly created on the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedInstance {
    pub id: SessionId,
    /// Initial status reported by the gateway, e.g. `"created"`
    pub status: String,
}

/// Client for a WhatsApp-compatible gateway
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Create an instance named `name` on the gateway at `endpoint`
    async fn create_instance(
        &self,
        endpoint: &str,
        name: &str,
    ) -> Result<CreatedInstance, GatewayError>;

    /// Ask the gateway for the pairing artifact (QR code) of instance `id`
    async fn request_pairing(
        &self,
        endpoint: &str,
        id: SessionId,
    ) -> Result<PairingArtifact, GatewayError>;

    /// Fetch the raw connection state token of instance `id`
    async fn poll_state(&self, endpoint: &str, id: SessionId) -> Result<String, GatewayError>;
}
