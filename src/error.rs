//! Error types for zrpc-server.

use thiserror::Error;

use crate::transport::Role;

/// Main error type for all zrpc operations.
///
/// Dispatch failures are not represented here: a failing handler produces a
/// [`HandlerError`](crate::handler::HandlerError) that is turned into an error
/// record on the wire. Everything in this enum is fatal to the operation that
/// returned it.
#[derive(Debug, Error)]
pub enum ZrpcError {
    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Error writing a dynamic value.
    #[error("MsgPack value encode error: {0}")]
    ValueEncode(#[from] rmpv::encode::Error),

    /// Error reading a dynamic value.
    #[error("MsgPack value decode error: {0}")]
    ValueDecode(#[from] rmpv::decode::Error),

    /// A frame held more than one document.
    #[error("{0} trailing bytes after the document")]
    TrailingBytes(usize),

    /// The request decoded but is missing `method`/`params` or has the wrong shape.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// A method with this name is already registered.
    #[error("Method already registered: {0}")]
    DuplicateMethod(String),

    /// The method name cannot be registered.
    #[error("Invalid method name: {0:?}")]
    InvalidMethodName(String),

    /// ZeroMQ transport failure.
    #[error("ZeroMQ error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    /// Transport failure outside ZeroMQ (in-process channels, misuse).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport context was terminated.
    #[error("Transport context terminated")]
    Terminated,

    /// Bind or connect failed.
    #[error(transparent)]
    Attach(#[from] AttachError),
}

impl ZrpcError {
    /// Whether this error is the transport's deliberate shutdown signal.
    pub fn is_termination(&self) -> bool {
        matches!(self, ZrpcError::Terminated)
    }
}

/// Failure to attach a socket to its address.
///
/// Cloneable so the same failure can be handed to the readiness waiter and
/// returned from [`Server::run`](crate::Server::run).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttachError {
    /// The transport refused the bind/connect.
    #[error("failed to {role} {address}: {reason}")]
    Refused {
        /// Whether we tried to bind or connect.
        role: Role,
        /// The address that was attempted.
        address: String,
        /// Transport-supplied reason.
        reason: String,
    },

    /// The server went away without reporting readiness.
    #[error("server dropped the readiness notifier before attaching")]
    Abandoned,
}

/// Result type alias using ZrpcError.
pub type Result<T> = std::result::Result<T, ZrpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_is_recognised() {
        assert!(ZrpcError::Terminated.is_termination());
        assert!(!ZrpcError::Transport("boom".into()).is_termination());
    }

    #[test]
    fn test_attach_error_display() {
        let err = AttachError::Refused {
            role: Role::Bind,
            address: "tcp://127.0.0.1:1".to_string(),
            reason: "address in use".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to bind tcp://127.0.0.1:1: address in use"
        );

        let wrapped: ZrpcError = err.clone().into();
        assert_eq!(wrapped.to_string(), err.to_string());
    }
}
