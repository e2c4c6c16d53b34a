//! Handler registry for dispatching requests by method name.
//!
//! Names are validated when a handler is registered, so dispatch only has to
//! answer "is it there". Positional params are bound to the handler's argument
//! type (usually a tuple) before the handler runs.
//!
//! # Example
//!
//! ```
//! use zrpc_server::handler::{HandlerError, Registry};
//!
//! let mut registry = Registry::new();
//! registry
//!     .register("echo", |(text,): (String,)| async move { Ok::<_, HandlerError>(text) })
//!     .unwrap();
//!
//! assert!(registry.register("echo", |_: Vec<u8>| async { Ok::<_, HandlerError>(0) }).is_err());
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{DispatchError, HandlerError};
use crate::codec::{Encodable, MsgPackCodec, Value};
use crate::error::{Result, ZrpcError};

/// Result type for handler calls: an encodable reply or a dispatch failure.
pub type HandlerResult = std::result::Result<Box<dyn Encodable>, DispatchError>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for handler functions.
pub trait Handler: Send + Sync + 'static {
    /// Handle a call with its positional params.
    fn call(&self, params: Vec<Value>) -> BoxFuture<'static, HandlerResult>;
}

/// Wrapper that binds positional params before calling the handler.
pub struct TypedHandler<F, P, R, Fut>
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    Fut: Future<Output = std::result::Result<R, HandlerError>> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(P) -> Fut>,
}

impl<F, P, R, Fut> TypedHandler<F, P, R, Fut>
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    Fut: Future<Output = std::result::Result<R, HandlerError>> + Send + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, P, R, Fut> Handler for TypedHandler<F, P, R, Fut>
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    Fut: Future<Output = std::result::Result<R, HandlerError>> + Send + 'static,
{
    fn call(&self, params: Vec<Value>) -> BoxFuture<'static, HandlerResult> {
        let bound: P = match MsgPackCodec::from_value(&Value::Array(params)) {
            Ok(v) => v,
            Err(e) => {
                let reason = e.to_string();
                return Box::pin(async move { Err(DispatchError::InvalidParams(reason)) });
            }
        };

        let fut = (self.handler)(bound);
        Box::pin(async move {
            match fut.await {
                Ok(reply) => Ok(Box::new(reply) as Box<dyn Encodable>),
                Err(e) => Err(DispatchError::Handler(e)),
            }
        })
    }
}

/// Registry mapping method names to handlers.
///
/// Built once, then shared read-only (usually behind an `Arc`) by every
/// server that dispatches against it.
#[derive(Default)]
pub struct Registry {
    methods: HashMap<String, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method handler.
    ///
    /// The handler receives the request params bound to `P` (a tuple for
    /// positional arguments, or `Vec<Value>` to take them raw) and returns
    /// any serializable reply.
    ///
    /// # Errors
    ///
    /// - [`ZrpcError::InvalidMethodName`] if `name` is empty or has
    ///   surrounding whitespace
    /// - [`ZrpcError::DuplicateMethod`] if `name` is already taken
    pub fn register<F, P, R, Fut>(&mut self, name: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = std::result::Result<R, HandlerError>> + Send + 'static,
    {
        self.register_handler(name, TypedHandler::new(handler))
    }

    /// Register a pre-built [`Handler`].
    pub fn register_handler<H: Handler>(&mut self, name: &str, handler: H) -> Result<&mut Self> {
        if name.is_empty() || name.trim() != name {
            return Err(ZrpcError::InvalidMethodName(name.to_string()));
        }
        if self.methods.contains_key(name) {
            return Err(ZrpcError::DuplicateMethod(name.to_string()));
        }

        self.methods.insert(name.to_string(), Box::new(handler));
        Ok(self)
    }

    /// Whether a method is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether no methods are registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Invoke `method` with `params`.
    ///
    /// A handler that panics, either while building its future or while it
    /// runs, yields [`DispatchError::HandlerPanicked`]. No timeout is
    /// applied: a handler that never finishes blocks the caller.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> HandlerResult {
        let handler = self
            .methods
            .get(method)
            .ok_or_else(|| DispatchError::MethodNotFound(method.to_string()))?;

        let fut = panic::catch_unwind(AssertUnwindSafe(|| handler.call(params)))
            .map_err(|payload| DispatchError::HandlerPanicked(panic_message(payload.as_ref())))?;

        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(DispatchError::HandlerPanicked(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
