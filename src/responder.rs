//! Turning one request into one encoded response.
//!
//! [`process_message`] reads the request out of a raw frame and hands it to
//! [`build_response`], which runs the call and encodes whatever came back.
//! Once a request has been dispatched, a response is always produced: handler
//! failures become error records, and a reply that can't be encoded is
//! replaced by an error describing the encode failure.

use bytes::Bytes;

use crate::capture::{capture_dispatch_error, capture_encode_error, capture_protocol_error};
use crate::codec::{Encodable, MsgPackCodec, Value};
use crate::error::Result;
use crate::handler::Registry;
use crate::protocol::{ErrorRecord, Request, Response};
use crate::ZrpcError;

/// Decode a raw frame and answer it.
///
/// # Errors
///
/// Returns [`ZrpcError::ValueDecode`] or [`ZrpcError::TrailingBytes`] if the
/// frame is not exactly one MsgPack document and
/// [`ZrpcError::MalformedRequest`] if it lacks `method` or `params`. None of
/// these produces a response; the caller decides whether that is fatal.
pub async fn process_message(registry: &Registry, frame: &[u8]) -> Result<Bytes> {
    let document = MsgPackCodec::decode_value(frame)?;
    let request = Request::from_document(document)?;
    handle_request(registry, request).await
}

/// Answer an already-decoded request.
pub async fn handle_request(registry: &Registry, request: Request) -> Result<Bytes> {
    match &request.id {
        Some(id) => tracing::debug!("Processing message {}: {:?}", id, request.method),
        None => tracing::debug!("Processing method {:?}", request.method),
    }

    build_response(request.id, registry, &request.method, request.params).await
}

/// Call `method` and encode the outcome as a response document.
///
/// The response carries `id` only if one was given. If the reply can't be
/// encoded, the response is re-encoded with a nil result and an
/// `zrpc.codec.EncodeError` record instead.
///
/// # Errors
///
/// Only if the fallback document itself fails to encode, which holds nothing
/// but strings and the already-decoded id.
pub async fn build_response(
    id: Option<Value>,
    registry: &Registry,
    method: &str,
    params: Vec<Value>,
) -> Result<Bytes> {
    let (reply, error) = match registry.call(method, params).await {
        Ok(reply) => (Some(reply), None),
        Err(err) => (None, Some(capture_dispatch_error(&err))),
    };

    match encode_response(id.clone(), reply.as_deref(), error) {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            let fallback = Response::failure(id, capture_encode_error(&err));
            Ok(Bytes::from(fallback.encode()?))
        }
    }
}

/// Answer a frame that could not be read as a request.
///
/// The id is recovered when the frame decodes far enough to contain one.
pub fn reject_message(frame: &[u8], err: &ZrpcError) -> Result<Bytes> {
    let id = MsgPackCodec::decode_value(frame)
        .ok()
        .as_ref()
        .and_then(Request::peek_id);
    let response = Response::failure(id, capture_protocol_error(err));
    Ok(Bytes::from(response.encode()?))
}

fn encode_response(
    id: Option<Value>,
    reply: Option<&dyn Encodable>,
    error: Option<ErrorRecord>,
) -> Result<Bytes> {
    let result = match reply {
        Some(reply) => reply.to_wire()?,
        None => Value::Nil,
    };

    let response = Response { id, result, error };
    Ok(Bytes::from(response.encode()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use serde::{Serialize, Serializer};

    /// Like a live resource handle: has no wire representation.
    struct Socketish;

    impl Serialize for Socketish {
        fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("socket handles cannot be serialized"))
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register("add", |(a, b): (i64, i64)| async move {
                Ok::<_, HandlerError>(a + b)
            })
            .unwrap()
            .register("fail", |_: Vec<Value>| async {
                Err::<(), _>(HandlerError::new("app.errors", "ValueError", "boom"))
            })
            .unwrap()
            .register("nothing", |_: Vec<Value>| async { Ok::<_, HandlerError>(()) })
            .unwrap()
            .register("handle", |_: Vec<Value>| async { Ok::<_, HandlerError>(Socketish) })
            .unwrap()
            .register("fail_with_args", |(opaque,): (bool,)| async move {
                let err = HandlerError::new("app.errors", "KeyError", "missing");
                Err::<(), _>(if opaque {
                    err.with_args(Socketish)
                } else {
                    err.with_args(("missing", 404))
                })
            })
            .unwrap();
        registry
    }

    fn decode_map(bytes: &[u8]) -> Vec<(String, Value)> {
        MsgPackCodec::decode_value(bytes)
            .unwrap()
            .as_map()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.as_str().unwrap().to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_add_with_id() {
        let bytes = build_response(
            Some(Value::from(7)),
            &registry(),
            "add",
            vec![2.into(), 3.into()],
        )
        .await
        .unwrap();

        assert_eq!(
            decode_map(&bytes),
            vec![
                ("id".to_string(), Value::from(7)),
                ("result".to_string(), Value::from(5)),
                ("error".to_string(), Value::Nil),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_without_id() {
        let bytes = build_response(None, &registry(), "fail", vec![])
            .await
            .unwrap();

        let response = Response::decode(&bytes).unwrap();
        assert_eq!(response.id, None);
        assert_eq!(response.result, Value::Nil);
        let error = response.error.unwrap();
        assert_eq!(error.kind, "app.errors.ValueError");
        assert_eq!(error.message, "ValueError: boom");
        assert!(decode_map(&bytes).iter().all(|(k, _)| k != "id"));
    }

    #[tokio::test]
    async fn test_nil_success_is_indistinguishable_by_result() {
        let bytes = build_response(None, &registry(), "nothing", vec![])
            .await
            .unwrap();
        let response = Response::decode(&bytes).unwrap();
        assert_eq!(response.result, Value::Nil);
        assert_eq!(response.error, None);
    }

    #[tokio::test]
    async fn test_unencodable_result_falls_back() {
        let bytes = build_response(Some(Value::from("r1")), &registry(), "handle", vec![])
            .await
            .unwrap();

        let response = Response::decode(&bytes).unwrap();
        assert_eq!(response.id, Some(Value::from("r1")));
        assert_eq!(response.result, Value::Nil);
        let error = response.error.unwrap();
        assert_eq!(error.kind, "zrpc.codec.EncodeError");
        assert!(error.message.contains("socket handles cannot be serialized"));
    }

    #[tokio::test]
    async fn test_error_args_present_only_when_encodable() {
        let registry = registry();

        let bytes = build_response(None, &registry, "fail_with_args", vec![false.into()])
            .await
            .unwrap();
        let error = Response::decode(&bytes).unwrap().error.unwrap();
        assert_eq!(
            error.args,
            Some(Value::Array(vec![Value::from("missing"), Value::from(404)]))
        );

        let bytes = build_response(None, &registry, "fail_with_args", vec![true.into()])
            .await
            .unwrap();
        let error = Response::decode(&bytes).unwrap().error.unwrap();
        assert_eq!(error.args, None);
        assert_eq!(error.kind, "app.errors.KeyError");
        assert_eq!(error.message, "KeyError: missing");
    }

    #[tokio::test]
    async fn test_unknown_method_gets_error_response() {
        let bytes = build_response(Some(Value::from(1)), &registry(), "frob", vec![])
            .await
            .unwrap();
        let response = Response::decode(&bytes).unwrap();
        assert_eq!(response.id, Some(Value::from(1)));
        assert_eq!(response.error.unwrap().kind, "zrpc.dispatch.MethodNotFound");
    }

    #[tokio::test]
    async fn test_process_message_round_trip() {
        let frame = Request::new("add", vec![2.into(), 3.into()])
            .with_id(7)
            .encode()
            .unwrap();
        let bytes = process_message(&registry(), &frame).await.unwrap();
        let response = Response::decode(&bytes).unwrap();
        assert_eq!(response.id, Some(Value::from(7)));
        assert_eq!(response.result, Value::from(5));
    }

    #[tokio::test]
    async fn test_process_message_rejects_garbage_and_malformed() {
        let registry = registry();

        let err = process_message(&registry, &[0x81]).await.unwrap_err();
        assert!(matches!(err, ZrpcError::ValueDecode(_)));

        let frame = MsgPackCodec::encode(&request_without_params()).unwrap();
        let err = process_message(&registry, &frame).await.unwrap_err();
        assert!(matches!(err, ZrpcError::MalformedRequest(_)));
    }

    #[tokio::test]
    async fn test_request_followed_by_junk_is_rejected() {
        let mut frame = Request::new("add", vec![2.into(), 3.into()])
            .with_id(7)
            .encode()
            .unwrap();
        frame.push(0xc0);

        let err = process_message(&registry(), &frame).await.unwrap_err();
        assert!(matches!(err, ZrpcError::TrailingBytes(1)));

        let response = Response::decode(&reject_message(&frame, &err).unwrap()).unwrap();
        assert_eq!(response.error.unwrap().kind, "zrpc.protocol.DecodeError");
    }

    #[test]
    fn test_reject_message_keeps_id() {
        let frame = MsgPackCodec::encode(&request_without_params()).unwrap();
        let err = ZrpcError::MalformedRequest("missing `params`".to_string());

        let response = Response::decode(&reject_message(&frame, &err).unwrap()).unwrap();
        assert_eq!(response.id, Some(Value::from(9)));
        assert_eq!(response.error.unwrap().kind, "zrpc.protocol.MalformedRequest");
    }

    /// `{"id": 9, "method": "add"}` - no params.
    fn request_without_params() -> Value {
        Value::Map(vec![
            (Value::from("id"), Value::from(9)),
            (Value::from("method"), Value::from("add")),
        ])
    }
}
