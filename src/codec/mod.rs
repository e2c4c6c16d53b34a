//! Codec module - the binary document wire format.
//!
//! Request and response documents travel as MessagePack maps:
//!
//! - [`MsgPackCodec`] - typed encode/decode using `rmp-serde` (`to_vec_named`)
//! - [`Value`] - dynamic document value used for ids, params and results
//! - [`Encodable`] - type-erased "can be turned into a [`Value`]" capability
//!
//! # Design
//!
//! Handler replies and error args are kept as [`Encodable`] trait objects
//! until the response is assembled. Converting them to a [`Value`] is the
//! encode step that may fail, and it happens in isolation so a bad value never
//! poisons the rest of the document.
//!
//! # Example
//!
//! ```
//! use zrpc_server::codec::{MsgPackCodec, Value};
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//!
//! let value = MsgPackCodec::to_value(&(2, 3)).unwrap();
//! assert_eq!(value, Value::Array(vec![2.into(), 3.into()]));
//! ```

mod msgpack;

pub use msgpack::{Encodable, MsgPackCodec};
pub use rmpv::Value;
