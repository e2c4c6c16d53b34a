//! Handler module - method registration and dispatch.
//!
//! Provides:
//! - [`Registry`] - maps method names to handlers, validated at registration
//! - [`HandlerError`] - the failure a handler reports, in a tagged form that
//!   can be captured into an error record
//! - [`DispatchError`] - everything that can go wrong between a method name
//!   and a reply
//!
//! # Example
//!
//! ```
//! use zrpc_server::handler::{HandlerError, Registry};
//!
//! let mut registry = Registry::new();
//!
//! // Positional params bind to a tuple
//! registry
//!     .register("add", |(a, b): (i64, i64)| async move { Ok::<_, HandlerError>(a + b) })
//!     .unwrap()
//!     .register("parse", |(text,): (String,)| async move {
//!         // Any std error converts with `?`
//!         Ok::<_, HandlerError>(text.parse::<i64>()?)
//!     })
//!     .unwrap();
//!
//! assert!(registry.contains("add"));
//! ```

mod error;
mod registry;

pub use error::{DispatchError, HandlerError, DISPATCH_NAMESPACE};
pub use registry::{BoxFuture, Handler, HandlerResult, Registry, TypedHandler};
