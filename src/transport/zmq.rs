//! ZeroMQ REP sockets via the pure-Rust `zeromq` crate.
//!
//! Supports `tcp://` and `ipc://` addresses. A bound server accepts REQ
//! clients directly; a connected server typically dials the DEALER side of a
//! broker that fans requests out to many workers.

use bytes::Bytes;
use zeromq::{RepSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use super::{BoxFuture, ReplySocket, Role, Shutdown, TerminationSignal, Transport};
use crate::error::Result;

/// Transport context for ZeroMQ sockets.
///
/// Share one instance (behind an `Arc`) between every server that should
/// stop together; [`Transport::terminate`] stops them all.
#[derive(Debug, Default)]
pub struct ZmqTransport {
    signal: TerminationSignal,
}

impl ZmqTransport {
    /// Create a new transport context.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for ZmqTransport {
    type Socket = ZmqReplySocket;

    fn attach<'a>(
        &'a self,
        address: &'a str,
        role: Role,
    ) -> BoxFuture<'a, Result<(Self::Socket, String)>> {
        Box::pin(async move {
            let mut socket = RepSocket::new();
            let endpoint = match role {
                Role::Bind => socket.bind(address).await?.to_string(),
                Role::Connect => {
                    socket.connect(address).await?;
                    address.to_string()
                }
            };
            Ok((ZmqReplySocket { socket }, endpoint))
        })
    }

    fn shutdown(&self) -> Shutdown {
        self.signal.subscribe()
    }

    fn terminate(&self) {
        self.signal.terminate();
    }
}

/// A bound or connected REP socket.
pub struct ZmqReplySocket {
    socket: RepSocket,
}

impl ReplySocket for ZmqReplySocket {
    fn recv(&mut self) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(async move {
            let message = self.socket.recv().await?;
            // A request is a single document; join frames if a peer split it.
            let mut frames = message.into_vec();
            if frames.len() == 1 {
                if let Some(frame) = frames.pop() {
                    return Ok(frame);
                }
            }
            Ok(Bytes::from(frames.concat()))
        })
    }

    fn send(&mut self, reply: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.socket.send(ZmqMessage::from(reply)).await?;
            Ok(())
        })
    }

    fn close(self) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            for err in self.socket.close().await {
                tracing::warn!("Error while closing socket: {}", err);
            }
        })
    }
}
