//! Gateway wire types

use serde::{Deserialize, Serialize};

/// Body of `POST /instance/create`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest<'a> {
    pub instance_name: &'a str,
}

/// Response of `POST /instance/create`
///
/// The gateway signals failure with `{"data": 0}` instead of an object.
#[derive(Debug, Deserialize)]
pub struct CreateInstanceResponse {
    pub data: CreateData,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateData {
    Instance(InstanceData),
    Code(i64),
}

/// Instance description inside a create response
#[derive(Debug, Deserialize)]
pub struct InstanceData {
    pub id: u64,
    #[serde(default)]
    pub status: String,
}

/// Response of `GET /instance/connect/{id}`
#[derive(Debug, Default, Deserialize)]
pub struct ConnectResponse {
    #[serde(default)]
    pub base64: Option<String>,
    /// Present as `0` when the gateway refuses to pair
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ConnectResponse {
    pub fn is_refusal(&self) -> bool {
        self.data.as_ref().and_then(serde_json::Value::as_i64) == Some(0)
    }
}

/// Response of `GET /instance/connectionState/{id}`
#[derive(Debug, Deserialize)]
pub struct ConnectionStateResponse {
    pub state: String,
}
