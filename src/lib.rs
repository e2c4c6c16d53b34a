//! # zrpc-server
//!
//! Server core for the zrpc request/reply RPC protocol.
//!
//! A client sends a MessagePack request document naming a method and its
//! positional params; the server dispatches it against a [`Registry`] and
//! replies with a response document carrying either the result or an error
//! record. Every dispatched request gets exactly one well-formed reply.
//!
//! ## Architecture
//!
//! - **Codec** ([`codec`]): MessagePack, structs written as named maps
//! - **Protocol** ([`protocol`]): request, response and error record documents
//! - **Dispatch** ([`handler`], [`capture`], [`responder`]): method lookup,
//!   error capture, response assembly with an encode fallback
//! - **Runtime** ([`Server`], [`transport`], [`ready`]): socket lifecycle over
//!   an explicitly injected transport context
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zrpc_server::{HandlerError, ReadyNotifier, Registry, Server};
//! use zrpc_server::transport::ZmqTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = Registry::new();
//!     registry.register("echo", |(text,): (String,)| async move {
//!         Ok::<_, HandlerError>(text)
//!     })?;
//!
//!     let transport = Arc::new(ZmqTransport::new());
//!     let server = Server::new("tcp://*:7341", Arc::new(registry), transport);
//!
//!     let (notifier, waiter) = ReadyNotifier::channel();
//!     let running = tokio::spawn(async move { server.run(notifier).await });
//!     println!("serving on {}", waiter.wait().await?.endpoint);
//!
//!     running.await??;
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod protocol;
pub mod ready;
pub mod responder;
pub mod transport;

mod server;

pub use config::{ConfigError, MalformedPolicy, ServerConfig};
pub use error::{AttachError, Result, ZrpcError};
pub use handler::{DispatchError, HandlerError, Registry};
pub use ready::{Attached, ReadyNotifier, ReadyWaiter};
pub use server::{Server, ServerBuilder};
pub use transport::{Role, Transport};
