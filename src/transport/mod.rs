//! Transport module - reply sockets and the context that creates them.
//!
//! A [`Transport`] is the explicit, caller-owned context every server is
//! built with. It creates [`ReplySocket`]s bound or connected to an address
//! and carries a termination signal shared by everything it created.
//!
//! Implementations:
//! - [`ZmqTransport`] - ZeroMQ REP sockets (`tcp://`, `ipc://`)
//! - [`InprocTransport`] - in-process request/reply channels (`inproc://`)
//!
//! # Example
//!
//! ```ignore
//! use zrpc_server::transport::{Role, Transport, ZmqTransport};
//!
//! let transport = ZmqTransport::new();
//! let (socket, endpoint) = transport.attach("tcp://127.0.0.1:0", Role::Bind).await?;
//! println!("listening on {endpoint}");
//! ```

mod inproc;
mod zmq;

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use tokio::sync::watch;

use crate::error::{Result, ZrpcError};
use crate::handler::BoxFuture;

pub use inproc::{InprocClient, InprocTransport};
pub use zmq::{ZmqReplySocket, ZmqTransport};

/// Whether a server listens on its address or dials out to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    /// Listen for clients on the address.
    #[default]
    Bind,
    /// Dial the address, typically a broker's backend.
    Connect,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Bind => f.write_str("bind"),
            Role::Connect => f.write_str("connect"),
        }
    }
}

impl FromStr for Role {
    type Err = ZrpcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bind" => Ok(Role::Bind),
            "connect" => Ok(Role::Connect),
            other => Err(ZrpcError::Transport(format!("unknown role {other:?}"))),
        }
    }
}

/// The reply side of a request/reply socket.
///
/// Calls must alternate: `recv`, `send`, `recv`, ... Implementations reject
/// out-of-order use.
pub trait ReplySocket: Send + 'static {
    /// Wait for the next request frame.
    fn recv(&mut self) -> BoxFuture<'_, Result<Bytes>>;

    /// Send the reply to the request last received.
    fn send(&mut self, reply: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Release the socket.
    fn close(self) -> BoxFuture<'static, ()>
    where
        Self: Sized;
}

/// A transport context: creates sockets and owns their termination signal.
pub trait Transport: Send + Sync + 'static {
    /// Socket type produced by this transport.
    type Socket: ReplySocket;

    /// Create a reply socket and bind or connect it to `address`.
    ///
    /// Returns the socket and the endpoint it ended up on (bind may resolve
    /// wildcards, e.g. port 0).
    fn attach<'a>(&'a self, address: &'a str, role: Role)
        -> BoxFuture<'a, Result<(Self::Socket, String)>>;

    /// Subscribe to the termination signal.
    fn shutdown(&self) -> Shutdown;

    /// Signal every server using this context to stop.
    fn terminate(&self);
}

/// Sender side of a termination signal. Owned by a transport.
#[derive(Debug)]
pub struct TerminationSignal {
    tx: watch::Sender<bool>,
}

impl TerminationSignal {
    /// Create an untriggered signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Trigger the signal. Idempotent.
    pub fn terminate(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the signal has fired.
    pub fn is_terminated(&self) -> bool {
        *self.tx.borrow()
    }

    /// A receiver for the signal.
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for TerminationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of a termination signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Resolve once the transport has been terminated.
    ///
    /// Never resolves if the transport is dropped without terminating.
    pub async fn terminated(&mut self) {
        if self.rx.wait_for(|terminated| *terminated).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Whether termination has been signalled.
    pub fn is_terminated(&self) -> bool {
        *self.rx.borrow()
    }
}
