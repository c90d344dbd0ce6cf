//! Downstream recording of authenticated sessions

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::RecordError;
use crate::session::SessionId;

/// Records a session's authenticated state in an external system
#[async_trait]
pub trait StatusRecorder: Send + Sync {
    /// `status` is the gateway state token that authenticated the session
    async fn record_open(
        &self,
        id: SessionId,
        gateway_endpoint: &str,
        status: &str,
    ) -> Result<(), RecordError>;
}

/// Body of `POST /updateStatusConnection`
#[derive(Debug, Serialize)]
pub struct StatusUpdate<'a> {
    pub nome: SessionId,
    pub status: &'a str,
    pub host: &'a str,
}

/// Posts status updates to `{endpoint}/updateStatusConnection`
pub struct HttpStatusRecorder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpStatusRecorder {
    /// Build a recorder sharing the gateway request timeout
    pub fn new(endpoint: impl Into<String>, gateway: &GatewayConfig) -> Result<Self, RecordError> {
        let client = reqwest::Client::builder()
            .timeout(gateway.request_timeout())
            .build()
            .map_err(|e| RecordError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl StatusRecorder for HttpStatusRecorder {
    async fn record_open(
        &self,
        id: SessionId,
        gateway_endpoint: &str,
        status: &str,
    ) -> Result<(), RecordError> {
        let url = format!(
            "{}/updateStatusConnection",
            self.endpoint.trim_end_matches('/')
        );
        debug!(%url, session_id = %id, status, "Recording open session");

        let response = self
            .client
            .post(&url)
            .json(&StatusUpdate {
                nome: id,
                status,
                host: gateway_endpoint,
            })
            .send()
            .await
            .map_err(|e| RecordError::Request(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(RecordError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}
