//! Request document.

use serde::Serialize;

use crate::codec::{MsgPackCodec, Value};
use crate::error::{Result, ZrpcError};

/// A decoded RPC request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    /// Correlation token, mirrored into the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Name of the method to invoke.
    pub method: String,
    /// Positional arguments.
    pub params: Vec<Value>,
}

impl Request {
    /// Create a request without a correlation id.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Attach a correlation id.
    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Encode the request for sending.
    pub fn encode(&self) -> Result<Vec<u8>> {
        MsgPackCodec::encode(self)
    }

    /// Extract a request from a decoded document.
    ///
    /// `method` must be a string and `params` an array; a nil `id` counts as
    /// no id at all.
    ///
    /// # Errors
    ///
    /// Returns [`ZrpcError::MalformedRequest`] if the document is not a map
    /// or either required field is missing or mistyped.
    pub fn from_document(document: Value) -> Result<Self> {
        let Value::Map(entries) = document else {
            return Err(ZrpcError::MalformedRequest(format!(
                "expected a map, got {}",
                kind_of(&document)
            )));
        };

        let mut id = None;
        let mut method = None;
        let mut params = None;

        for (key, value) in entries {
            match key.as_str() {
                Some("id") => id = Some(value),
                Some("method") => method = Some(value),
                Some("params") => params = Some(value),
                _ => {}
            }
        }

        let method = match method {
            Some(Value::String(name)) => name.into_str().ok_or_else(|| {
                ZrpcError::MalformedRequest("`method` is not valid UTF-8".to_string())
            })?,
            Some(other) => {
                return Err(ZrpcError::MalformedRequest(format!(
                    "`method` must be a string, got {}",
                    kind_of(&other)
                )))
            }
            None => return Err(ZrpcError::MalformedRequest("missing `method`".to_string())),
        };

        let params = match params {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ZrpcError::MalformedRequest(format!(
                    "`params` must be an array, got {}",
                    kind_of(&other)
                )))
            }
            None => return Err(ZrpcError::MalformedRequest("missing `params`".to_string())),
        };

        Ok(Self {
            id: id.filter(|value| !value.is_nil()),
            method,
            params,
        })
    }

    /// Best-effort read of the correlation id from a document that may not
    /// be a valid request.
    pub fn peek_id(document: &Value) -> Option<Value> {
        document
            .as_map()?
            .iter()
            .find(|(key, _)| key.as_str() == Some("id"))
            .map(|(_, value)| value.clone())
            .filter(|value| !value.is_nil())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Nil => "nil",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::F32(_) | Value::F64(_) => "float",
        Value::String(_) => "string",
        Value::Binary(_) => "binary",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Ext(..) => "extension",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::from(k), v))
                .collect(),
        )
    }

    #[test]
    fn test_from_document_with_id() {
        let doc = document(vec![
            ("method", Value::from("add")),
            ("params", Value::Array(vec![2.into(), 3.into()])),
            ("id", Value::from(7)),
        ]);

        let request = Request::from_document(doc).unwrap();
        assert_eq!(request.method, "add");
        assert_eq!(request.params, vec![Value::from(2), Value::from(3)]);
        assert_eq!(request.id, Some(Value::from(7)));
    }

    #[test]
    fn test_nil_id_counts_as_absent() {
        let doc = document(vec![
            ("id", Value::Nil),
            ("method", Value::from("ping")),
            ("params", Value::Array(vec![])),
        ]);

        assert_eq!(Request::from_document(doc).unwrap().id, None);
    }

    #[test]
    fn test_missing_method_is_malformed() {
        let doc = document(vec![("params", Value::Array(vec![]))]);
        let err = Request::from_document(doc).unwrap_err();
        assert!(matches!(err, ZrpcError::MalformedRequest(ref m) if m.contains("method")));
    }

    #[test]
    fn test_missing_params_is_malformed() {
        let doc = document(vec![("method", Value::from("ping"))]);
        let err = Request::from_document(doc).unwrap_err();
        assert!(matches!(err, ZrpcError::MalformedRequest(ref m) if m.contains("params")));
    }

    #[test]
    fn test_non_map_document_is_malformed() {
        let err = Request::from_document(Value::from("hello")).unwrap_err();
        assert!(matches!(err, ZrpcError::MalformedRequest(ref m) if m.contains("string")));
    }

    #[test]
    fn test_params_must_be_array() {
        let doc = document(vec![
            ("method", Value::from("ping")),
            ("params", Value::from(1)),
        ]);
        assert!(Request::from_document(doc).is_err());
    }

    #[test]
    fn test_peek_id() {
        let doc = document(vec![("id", Value::from("abc"))]);
        assert_eq!(Request::peek_id(&doc), Some(Value::from("abc")));
        assert_eq!(Request::peek_id(&Value::from(1)), None);
    }

    #[test]
    fn test_encode_omits_missing_id() {
        let bytes = Request::new("ping", vec![]).encode().unwrap();
        let doc = MsgPackCodec::decode_value(&bytes).unwrap();
        assert_eq!(Request::peek_id(&doc), None);
        assert_eq!(doc.as_map().unwrap().len(), 2);

        let bytes = Request::new("ping", vec![]).with_id(1).encode().unwrap();
        let request = Request::from_document(MsgPackCodec::decode_value(&bytes).unwrap()).unwrap();
        assert_eq!(request.id, Some(Value::from(1)));
    }
}
