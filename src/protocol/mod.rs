//! Protocol module - request and response documents.
//!
//! Every message on the socket is one MsgPack map:
//!
//! ```text
//! request:  { id?: any, method: str, params: [any, ...] }
//! response: { id?: any, result: any | nil, error: { type, message, args? } | nil }
//! ```
//!
//! The response carries `id` exactly when the request did.

mod request;
mod response;

pub use request::Request;
pub use response::{ErrorRecord, Response};
