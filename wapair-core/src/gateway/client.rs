//! HTTP implementation of [`GatewayClient`]

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::traits::{CreatedInstance, GatewayClient};
use super::types::{
    ConnectResponse, ConnectionStateResponse, CreateData, CreateInstanceRequest,
    CreateInstanceResponse,
};
use crate::config::{GatewayConfig, GatewayPaths};
use crate::error::GatewayError;
use crate::session::{PairingArtifact, SessionId};

/// Gateway client speaking the instance HTTP API
pub struct HttpGateway {
    client: reqwest::Client,
    paths: GatewayPaths,
}

impl HttpGateway {
    /// Build a client with the timeout and paths from `config`
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            client,
            paths: config.paths.clone(),
        })
    }

    fn url(endpoint: &str, path: &str) -> String {
        format!("{}{}", endpoint.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl GatewayClient for HttpGateway {
    async fn create_instance(
        &self,
        endpoint: &str,
        name: &str,
    ) -> Result<CreatedInstance, GatewayError> {
        if name.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "instance name must not be empty".to_string(),
            ));
        }

        let url = Self::url(endpoint, &self.paths.create);
        debug!(%url, instance = name, "Creating gateway instance");

        let response = self
            .client
            .post(&url)
            .json(&CreateInstanceRequest {
                instance_name: name,
            })
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(GatewayError::UnexpectedResponse(format!(
                "create returned status {}",
                response.status()
            )));
        }

        let body: CreateInstanceResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::UnexpectedResponse(format!("invalid create body: {e}")))?;

        match body.data {
            CreateData::Instance(instance) if instance.id != 0 => Ok(CreatedInstance {
                id: SessionId::new(instance.id),
                status: instance.status,
            }),
            CreateData::Instance(_) => Err(GatewayError::UnexpectedResponse(
                "gateway returned instance id 0".to_string(),
            )),
            CreateData::Code(code) => Err(GatewayError::UnexpectedResponse(format!(
                "gateway returned data {code}"
            ))),
        }
    }

    async fn request_pairing(
        &self,
        endpoint: &str,
        id: SessionId,
    ) -> Result<PairingArtifact, GatewayError> {
        let url = format!("{}/{}", Self::url(endpoint, &self.paths.connect), id);
        debug!(%url, session_id = %id, "Requesting pairing artifact");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(GatewayError::PairingUnavailable(format!(
                "connect returned status {}",
                response.status()
            )));
        }

        let body: ConnectResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::PairingUnavailable(format!("invalid connect body: {e}")))?;

        if body.is_refusal() {
            return Err(GatewayError::PairingUnavailable(
                "gateway refused to pair".to_string(),
            ));
        }

        match body.base64.map(PairingArtifact::new) {
            Some(artifact) if !artifact.is_empty() => Ok(artifact),
            _ => {
                warn!(session_id = %id, "Gateway returned no pairing artifact");
                Err(GatewayError::PairingUnavailable(
                    "empty pairing artifact".to_string(),
                ))
            }
        }
    }

    async fn poll_state(&self, endpoint: &str, id: SessionId) -> Result<String, GatewayError> {
        let url = format!("{}/{}", Self::url(endpoint, &self.paths.connection_state), id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Poll(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(GatewayError::Poll(format!(
                "connectionState returned status {}",
                response.status()
            )));
        }

        let body: ConnectionStateResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Poll(format!("invalid connectionState body: {e}")))?;

        Ok(body.state)
    }
}
