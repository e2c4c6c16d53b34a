//! Response document and error record.

use serde::{Deserialize, Serialize};

use crate::codec::{MsgPackCodec, Value};
use crate::error::Result;

/// Serializable description of a failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Fully-qualified failure category, e.g. `zrpc.dispatch.MethodNotFound`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Single-line description.
    pub message: String,
    /// Auxiliary failure data, only present when it encoded on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

/// An RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Mirrors the request id; omitted when the request had none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Return value, nil on failure.
    pub result: Value,
    /// Failure description, nil on success.
    #[serde(default)]
    pub error: Option<ErrorRecord>,
}

impl Response {
    /// A successful response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            id,
            result,
            error: None,
        }
    }

    /// A failed response.
    pub fn failure(id: Option<Value>, error: ErrorRecord) -> Self {
        Self {
            id,
            result: Value::Nil,
            error: Some(error),
        }
    }

    /// Encode the response for sending.
    pub fn encode(&self) -> Result<Vec<u8>> {
        MsgPackCodec::encode(self)
    }

    /// Decode a response received from a server.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        MsgPackCodec::decode(bytes)
    }
}
