//! Server builder and runtime loop.
//!
//! The [`ServerBuilder`] provides a fluent API for configuring a server. The
//! [`Server`] manages the lifecycle:
//! 1. Create a reply socket from the transport
//! 2. Bind or connect it, and report readiness
//! 3. Receive, process and reply, one request at a time
//! 4. Close the socket on termination, interrupt, budget exhaustion or error
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zrpc_server::{HandlerError, ReadyNotifier, Registry, ServerBuilder};
//! use zrpc_server::transport::ZmqTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = Registry::new();
//!     registry.register("add", |(a, b): (i64, i64)| async move {
//!         Ok::<_, HandlerError>(a + b)
//!     })?;
//!
//!     let server = ServerBuilder::new("tcp://*:7341")
//!         .die_after(1000)
//!         .build(Arc::new(registry), Arc::new(ZmqTransport::new()));
//!
//!     server.run(ReadyNotifier::none()).await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::{MalformedPolicy, ServerConfig};
use crate::error::{AttachError, Result, ZrpcError};
use crate::handler::Registry;
use crate::ready::{Attached, ReadyNotifier};
use crate::responder::{process_message, reject_message};
use crate::transport::{ReplySocket, Role, Shutdown, TerminationSignal, Transport};

/// Builder for configuring and creating a [`Server`].
#[derive(Debug, Clone)]
pub struct ServerBuilder {
    address: String,
    role: Role,
    die_after: Option<u64>,
    malformed: MalformedPolicy,
    handle_interrupt: bool,
    interrupt: Option<Shutdown>,
}

impl ServerBuilder {
    /// Create a builder that binds `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            role: Role::Bind,
            die_after: None,
            malformed: MalformedPolicy::default(),
            handle_interrupt: true,
            interrupt: None,
        }
    }

    /// Start from a loaded [`ServerConfig`].
    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            address: config.address,
            role: config.role,
            die_after: config.die_after,
            malformed: config.malformed,
            handle_interrupt: true,
            interrupt: None,
        }
    }

    /// Bind or connect.
    ///
    /// Default: [`Role::Bind`]
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Connect to the address instead of binding it, e.g. to sit behind a
    /// broker.
    pub fn connect(self) -> Self {
        self.role(Role::Connect)
    }

    /// Stop after answering exactly `count` requests.
    ///
    /// Default: unbounded. `0` means zero requests: `run` returns as soon as
    /// the socket is attached. Leave it unset to serve forever.
    pub fn die_after(mut self, count: u64) -> Self {
        self.die_after = Some(count);
        self
    }

    /// What to do with frames that are not valid requests.
    ///
    /// Default: [`MalformedPolicy::Terminate`]
    pub fn malformed_requests(mut self, policy: MalformedPolicy) -> Self {
        self.malformed = policy;
        self
    }

    /// Whether SIGINT (Ctrl-C) stops the server cleanly.
    ///
    /// The listener is installed once, when `run` has attached. An interrupt
    /// that arrives while a request is being handled takes effect after its
    /// reply is sent.
    ///
    /// Default: true
    pub fn handle_interrupt(mut self, enabled: bool) -> Self {
        self.handle_interrupt = enabled;
        self
    }

    /// Treat `source` firing as the interrupt, in place of listening for
    /// SIGINT.
    pub fn interrupt_on(mut self, source: Shutdown) -> Self {
        self.interrupt = Some(source);
        self
    }

    /// Build the server. Nothing is attached until [`Server::run`].
    pub fn build<T: Transport>(self, registry: Arc<Registry>, transport: Arc<T>) -> Server<T> {
        Server {
            address: self.address,
            role: self.role,
            die_after: self.die_after,
            malformed: self.malformed,
            handle_interrupt: self.handle_interrupt,
            interrupt: self.interrupt,
            registry,
            transport,
        }
    }
}

/// A request/reply server.
///
/// Each server owns one socket and answers one request at a time. Run more
/// servers against the same registry and transport to serve concurrently.
pub struct Server<T: Transport> {
    address: String,
    role: Role,
    die_after: Option<u64>,
    malformed: MalformedPolicy,
    handle_interrupt: bool,
    interrupt: Option<Shutdown>,
    registry: Arc<Registry>,
    transport: Arc<T>,
}

impl<T: Transport> Server<T> {
    /// A server that binds `address` and serves until terminated.
    pub fn new(address: impl Into<String>, registry: Arc<Registry>, transport: Arc<T>) -> Self {
        ServerBuilder::new(address).build(registry, transport)
    }

    /// The configured address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the server binds or connects.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The request budget, if any.
    pub fn die_after(&self) -> Option<u64> {
        self.die_after
    }

    /// Attach the socket and serve until done.
    ///
    /// `ready` fires once, after the socket attaches or fails to.
    ///
    /// Returns `Ok(())` when the budget is used up, the transport is
    /// terminated or the process is interrupted. A handler that fails or
    /// panics only fails its own request.
    ///
    /// # Errors
    ///
    /// - [`ZrpcError::Attach`] if the socket could not bind or connect
    /// - a decode or malformed-request error under
    ///   [`MalformedPolicy::Terminate`]
    /// - any other transport failure while receiving or sending
    pub async fn run(&self, ready: ReadyNotifier) -> Result<()> {
        let mut shutdown = self.transport.shutdown();

        let (mut socket, endpoint) = match self.transport.attach(&self.address, self.role).await {
            Ok(attached) => attached,
            Err(e) => {
                let failure = AttachError::Refused {
                    role: self.role,
                    address: self.address.clone(),
                    reason: e.to_string(),
                };
                tracing::error!("{}", failure);
                ready.notify(Err(failure.clone()));
                return Err(failure.into());
            }
        };

        match self.role {
            Role::Bind => tracing::debug!("Listening for requests on {:?}", endpoint),
            Role::Connect => tracing::debug!("Replying to requests from {:?}", endpoint),
        }
        let (mut interrupt, listener) = self.interrupt_source();
        ready.notify(Ok(Attached {
            endpoint,
            role: self.role,
        }));

        let outcome = self.serve(&mut socket, &mut shutdown, &mut interrupt).await;
        socket.close().await;
        drop(listener);
        outcome
    }

    fn interrupt_source(&self) -> (Shutdown, Option<InterruptListener>) {
        if let Some(source) = &self.interrupt {
            return (source.clone(), None);
        }
        if !self.handle_interrupt {
            // Sender dropped at once: never fires.
            return (TerminationSignal::new().subscribe(), None);
        }
        let (source, listener) = InterruptListener::spawn();
        (source, Some(listener))
    }

    /// Main serve loop - one receive, process, send cycle per request.
    async fn serve<S: ReplySocket>(
        &self,
        socket: &mut S,
        shutdown: &mut Shutdown,
        interrupt: &mut Shutdown,
    ) -> Result<()> {
        let mut served: u64 = 0;

        loop {
            if let Some(limit) = self.die_after {
                if served >= limit {
                    tracing::debug!("Served {} requests, shutting down", served);
                    return Ok(());
                }
            }

            let frame = tokio::select! {
                biased;

                _ = shutdown.terminated() => {
                    tracing::info!("Context was terminated, shutting down");
                    return Ok(());
                }
                _ = interrupt.terminated() => {
                    tracing::info!("SIGINT received, shutting down");
                    return Ok(());
                }
                received = socket.recv() => match received {
                    Ok(frame) => frame,
                    Err(ZrpcError::Terminated) => {
                        tracing::info!("Context was terminated, shutting down");
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::error!("Receive failed: {}", e);
                        return Err(e);
                    }
                },
            };

            let reply = match process_message(&self.registry, &frame).await {
                Ok(reply) => reply,
                Err(e) if self.malformed == MalformedPolicy::Reply && is_request_error(&e) => {
                    reject_message(&frame, &e)?
                }
                Err(e) => {
                    tracing::error!("Failed to process request: {}", e);
                    return Err(e);
                }
            };

            match socket.send(reply).await {
                Ok(()) => {}
                Err(ZrpcError::Terminated) => {
                    tracing::info!("Context was terminated, shutting down");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!("Send failed: {}", e);
                    return Err(e);
                }
            }

            served += 1;
        }
    }
}

/// Errors caused by the frame itself rather than the server.
fn is_request_error(err: &ZrpcError) -> bool {
    matches!(
        err,
        ZrpcError::ValueDecode(_)
            | ZrpcError::MsgPackDecode(_)
            | ZrpcError::TrailingBytes(_)
            | ZrpcError::MalformedRequest(_)
    )
}

/// SIGINT listener that lives for one `run`.
///
/// The first SIGINT latches the flag, so an interrupt received mid-request is
/// still seen at the next receive. The task is aborted on drop.
struct InterruptListener {
    task: JoinHandle<()>,
}

impl InterruptListener {
    fn spawn() -> (Shutdown, Self) {
        let flag = TerminationSignal::new();
        let source = flag.subscribe();

        // Register before readiness is reported.
        #[cfg(unix)]
        let sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt());

        let task = tokio::spawn(async move {
            #[cfg(unix)]
            let received = match sigint {
                Ok(mut sigint) => sigint.recv().await.is_some(),
                Err(e) => {
                    tracing::warn!("Cannot listen for SIGINT: {}", e);
                    false
                }
            };
            #[cfg(not(unix))]
            let received = tokio::signal::ctrl_c().await.is_ok();

            if received {
                flag.terminate();
            }
        });

        (source, Self { task })
    }
}

impl Drop for InterruptListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}
