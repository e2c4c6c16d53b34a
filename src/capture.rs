//! Error capture - failures in, wire-safe error records out.
//!
//! Every record has a dot-qualified `type` and a one-line `message` of the
//! form `Name: detail`. Optional `args` are probed in isolation and dropped if
//! they can't be encoded, so the record itself always encodes.

use crate::codec::{Encodable, Value};
use crate::error::ZrpcError;
use crate::handler::{DispatchError, HandlerError, DISPATCH_NAMESPACE};
use crate::protocol::ErrorRecord;

/// Namespace for wire codec failures.
pub const CODEC_NAMESPACE: &str = "zrpc.codec";

/// Namespace for requests that could not be read.
pub const PROTOCOL_NAMESPACE: &str = "zrpc.protocol";

/// Capture a dispatch failure.
///
/// Logs the failure (with its source chain, if any) at error level.
pub fn capture_dispatch_error(err: &DispatchError) -> ErrorRecord {
    let record = match err {
        DispatchError::Handler(handler_err) => capture_handler_error(handler_err),
        DispatchError::MethodNotFound(method) => build_record(
            DISPATCH_NAMESPACE,
            err.name(),
            &err.to_string(),
            Some(&vec![method.clone()]),
        ),
        DispatchError::InvalidParams(reason) | DispatchError::HandlerPanicked(reason) => {
            build_record(DISPATCH_NAMESPACE, err.name(), reason, None)
        }
    };

    tracing::error!(
        error_type = %record.kind,
        "Dispatch failed: {}",
        record.message
    );
    record
}

/// Capture a failure raised by a handler.
pub fn capture_handler_error(err: &HandlerError) -> ErrorRecord {
    if let Some(source) = err.source() {
        let mut chain = vec![source.to_string()];
        let mut cause = source.source();
        while let Some(next) = cause {
            chain.push(next.to_string());
            cause = next.source();
        }
        tracing::debug!(error_type = %err.qualified_name(), chain = ?chain, "Handler error chain");
    }

    build_record(err.namespace(), err.name(), err.detail(), err.args())
}

/// Capture a failure to encode a response.
pub fn capture_encode_error(err: &ZrpcError) -> ErrorRecord {
    let record = build_record(CODEC_NAMESPACE, "EncodeError", &err.to_string(), None);
    tracing::error!(error_type = %record.kind, "Response encode failed: {}", err);
    record
}

/// Capture a request that could not be decoded or was missing fields.
pub fn capture_protocol_error(err: &ZrpcError) -> ErrorRecord {
    let record = match err {
        ZrpcError::MalformedRequest(reason) => {
            build_record(PROTOCOL_NAMESPACE, "MalformedRequest", reason, None)
        }
        other => build_record(PROTOCOL_NAMESPACE, "DecodeError", &other.to_string(), None),
    };
    tracing::error!(error_type = %record.kind, "Rejected request: {}", record.message);
    record
}

fn build_record(
    namespace: &str,
    name: &str,
    detail: &str,
    args: Option<&dyn Encodable>,
) -> ErrorRecord {
    let kind = if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    };

    ErrorRecord {
        kind,
        message: summary_line(name, detail),
        args: args.and_then(probe_args),
    }
}

/// Last non-blank line of `Name: detail`, trimmed.
fn summary_line(name: &str, detail: &str) -> String {
    let full = if detail.trim().is_empty() {
        name.to_string()
    } else {
        format!("{name}: {detail}")
    };

    full.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or(name)
        .to_string()
}

fn probe_args(args: &dyn Encodable) -> Option<Value> {
    match args.to_wire() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Dropping error args that cannot be encoded: {}", e);
            None
        }
    }
}
