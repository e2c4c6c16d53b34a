//! Handler failures.

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

use crate::codec::Encodable;

/// Namespace for failures raised by the dispatch layer itself.
pub const DISPATCH_NAMESPACE: &str = "zrpc.dispatch";

/// A failure reported by a handler.
///
/// Carries a category (`namespace` + `name`), a human-readable detail and
/// optional auxiliary `args`. Any [`std::error::Error`] converts into it, so
/// handlers can use `?` freely; the category is then derived from the error's
/// Rust type path (`core::num::error::ParseIntError` becomes
/// `core.num.error` / `ParseIntError`).
///
/// `HandlerError` intentionally does not implement `std::error::Error`,
/// otherwise the blanket conversion would overlap with `From<T> for T`.
pub struct HandlerError {
    namespace: Cow<'static, str>,
    name: Cow<'static, str>,
    detail: String,
    args: Option<Box<dyn Encodable>>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    /// Create a failure with an explicit category.
    pub fn new(
        namespace: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            detail: detail.into(),
            args: None,
            source: None,
        }
    }

    /// Attach auxiliary data.
    ///
    /// Only sent to the client if it encodes on its own; otherwise dropped.
    pub fn with_args<A: Encodable + 'static>(mut self, args: A) -> Self {
        self.args = Some(Box::new(args));
        self
    }

    /// Namespace part of the category.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name part of the category.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Detail text as given.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Auxiliary data, if any.
    pub fn args(&self) -> Option<&dyn Encodable> {
        self.args.as_deref()
    }

    /// The error this failure was converted from, if any.
    pub fn source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// `namespace.name`.
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.to_string()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        let (namespace, name) = split_type_path(std::any::type_name::<E>());
        Self {
            namespace: Cow::Owned(namespace),
            name: Cow::Owned(name),
            detail: err.to_string(),
            args: None,
            source: Some(Box::new(err)),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.detail)
        }
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("detail", &self.detail)
            .field("has_args", &self.args.is_some())
            .field("source", &self.source)
            .finish()
    }
}

/// Turn `a::b::C<T>` into (`a.b`, `C`).
fn split_type_path(path: &str) -> (String, String) {
    let path = path.split('<').next().unwrap_or(path);
    match path.rsplit_once("::") {
        Some((module, name)) => (module.replace("::", "."), name.to_string()),
        None => (String::new(), path.to_string()),
    }
}

/// Everything that can go wrong between a method name and a reply.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler is registered under this name.
    #[error("no method named {0:?}")]
    MethodNotFound(String),

    /// The positional params could not be bound to the handler's arguments.
    #[error("{0}")]
    InvalidParams(String),

    /// The handler ran and failed.
    #[error("{0}")]
    Handler(HandlerError),

    /// The handler panicked. Carries the panic message.
    #[error("{0}")]
    HandlerPanicked(String),
}

impl DispatchError {
    /// Category name of this failure.
    pub fn name(&self) -> &str {
        match self {
            DispatchError::MethodNotFound(_) => "MethodNotFound",
            DispatchError::InvalidParams(_) => "InvalidParams",
            DispatchError::HandlerPanicked(_) => "HandlerPanicked",
            DispatchError::Handler(err) => err.name(),
        }
    }
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        DispatchError::Handler(err)
    }
}
