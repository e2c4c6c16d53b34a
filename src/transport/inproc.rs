//! In-process request/reply channels.
//!
//! `inproc://name` endpoints live inside one [`InprocTransport`]. A server
//! binds a name; callers in the same process obtain an [`InprocClient`] for
//! that name and exchange frames with it. Requests from several clients queue
//! up and are answered one at a time, in arrival order.
//!
//! # Example
//!
//! ```ignore
//! let transport = InprocTransport::new();
//! let (mut socket, _) = transport.attach("inproc://tasks", Role::Bind).await?;
//! let client = transport.client("inproc://tasks")?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use super::{BoxFuture, ReplySocket, Role, Shutdown, TerminationSignal, Transport};
use crate::error::{Result, ZrpcError};

/// Address scheme handled by this transport.
pub const INPROC_SCHEME: &str = "inproc://";

/// Requests that may wait for a busy server before clients block.
const QUEUE_DEPTH: usize = 64;

type Envelope = (Bytes, oneshot::Sender<Bytes>);

#[derive(Debug, Default)]
struct Shared {
    endpoints: Mutex<HashMap<String, mpsc::Sender<Envelope>>>,
    signal: TerminationSignal,
}

impl Shared {
    fn endpoints(&self) -> MutexGuard<'_, HashMap<String, mpsc::Sender<Envelope>>> {
        self.endpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Transport context for in-process endpoints.
///
/// Cheap to clone; clones share the same endpoint namespace and termination
/// signal.
#[derive(Debug, Clone, Default)]
pub struct InprocTransport {
    shared: Arc<Shared>,
}

impl InprocTransport {
    /// Create an empty endpoint namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// A client for a bound endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ZrpcError::Transport`] if nothing is bound at `address`.
    pub fn client(&self, address: &str) -> Result<InprocClient> {
        let name = endpoint_name(address)?;
        let tx = self
            .shared
            .endpoints()
            .get(name)
            .cloned()
            .ok_or_else(|| ZrpcError::Transport(format!("nothing bound at {address}")))?;
        Ok(InprocClient { tx })
    }

    /// Whether a socket is currently bound at `address`.
    pub fn is_bound(&self, address: &str) -> bool {
        endpoint_name(address)
            .map(|name| self.shared.endpoints().contains_key(name))
            .unwrap_or(false)
    }
}

impl Transport for InprocTransport {
    type Socket = InprocSocket;

    fn attach<'a>(
        &'a self,
        address: &'a str,
        role: Role,
    ) -> BoxFuture<'a, Result<(Self::Socket, String)>> {
        Box::pin(async move {
            if role == Role::Connect {
                return Err(ZrpcError::Transport(
                    "inproc endpoints can only be bound".to_string(),
                ));
            }

            let name = endpoint_name(address)?.to_string();
            let mut endpoints = self.shared.endpoints();
            if endpoints.contains_key(&name) {
                return Err(ZrpcError::Transport(format!(
                    "address already in use: {address}"
                )));
            }

            let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
            endpoints.insert(name.clone(), tx);
            drop(endpoints);

            let socket = InprocSocket {
                name,
                rx,
                pending: None,
                shared: Arc::clone(&self.shared),
            };
            Ok((socket, address.to_string()))
        })
    }

    fn shutdown(&self) -> Shutdown {
        self.shared.signal.subscribe()
    }

    fn terminate(&self) {
        self.shared.signal.terminate();
    }
}

/// The bound side of an `inproc://` endpoint.
///
/// The name is released when the socket is closed or dropped.
pub struct InprocSocket {
    name: String,
    rx: mpsc::Receiver<Envelope>,
    pending: Option<oneshot::Sender<Bytes>>,
    shared: Arc<Shared>,
}

impl ReplySocket for InprocSocket {
    fn recv(&mut self) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(async move {
            if self.pending.is_some() {
                return Err(ZrpcError::Transport(
                    "cannot receive: previous request has not been answered".to_string(),
                ));
            }

            match self.rx.recv().await {
                Some((frame, reply_to)) => {
                    self.pending = Some(reply_to);
                    Ok(frame)
                }
                None => Err(ZrpcError::Terminated),
            }
        })
    }

    fn send(&mut self, reply: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let reply_to = self.pending.take().ok_or_else(|| {
                ZrpcError::Transport("cannot send: no request is waiting for a reply".to_string())
            })?;

            if reply_to.send(reply).is_err() {
                tracing::debug!("Requester on inproc://{} went away before the reply", self.name);
            }
            Ok(())
        })
    }

    fn close(self) -> BoxFuture<'static, ()> {
        Box::pin(async move { drop(self) })
    }
}

impl Drop for InprocSocket {
    fn drop(&mut self) {
        // Binding refuses taken names, so this name is ours until now.
        self.shared.endpoints().remove(&self.name);
    }
}

/// A caller of an `inproc://` endpoint.
#[derive(Debug, Clone)]
pub struct InprocClient {
    tx: mpsc::Sender<Envelope>,
}

impl InprocClient {
    /// Send one request frame and wait for its reply.
    ///
    /// # Errors
    ///
    /// Returns [`ZrpcError::Transport`] if the endpoint is gone or the server
    /// stopped without answering.
    pub async fn request(&self, frame: impl Into<Bytes>) -> Result<Bytes> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((frame.into(), reply_tx))
            .await
            .map_err(|_| ZrpcError::Transport("endpoint closed".to_string()))?;

        reply_rx.await.map_err(|_| {
            ZrpcError::Transport("server stopped before replying".to_string())
        })
    }
}

fn endpoint_name(address: &str) -> Result<&str> {
    match address.strip_prefix(INPROC_SCHEME) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ZrpcError::Transport(format!(
            "not an inproc address: {address:?}"
        ))),
    }
}
