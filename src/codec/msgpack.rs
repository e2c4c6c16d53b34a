//! MsgPack codec using `rmp-serde` and `rmpv`.
//!
//! Always encode with `to_vec_named`: structs must land on the wire as maps
//! keyed by field name, because request and response documents are read by
//! key on the other side.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Value;
use crate::error::{Result, ZrpcError};

/// MessagePack codec for wire documents.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map format).
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Decode MsgPack bytes into a dynamic [`Value`].
    ///
    /// # Errors
    ///
    /// Returns [`ZrpcError::ValueDecode`] if the bytes don't start with a
    /// complete document and [`ZrpcError::TrailingBytes`] if anything follows
    /// it.
    pub fn decode_value(bytes: &[u8]) -> Result<Value> {
        let mut reader = bytes;
        let value = rmpv::decode::read_value(&mut reader)?;
        if !reader.is_empty() {
            return Err(ZrpcError::TrailingBytes(reader.len()));
        }
        Ok(value)
    }

    /// Serialize any value into a dynamic [`Value`].
    ///
    /// Goes through a full named encode, so this doubles as the isolated
    /// encode probe: if it succeeds, the value is representable on the wire.
    pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
        let bytes = Self::encode(value)?;
        Self::decode_value(&bytes)
    }

    /// Build a typed view of a dynamic [`Value`].
    pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
        let mut bytes = Vec::new();
        rmpv::encode::write_value(&mut bytes, value)?;
        Self::decode(&bytes)
    }
}

/// A value that can be turned into a wire [`Value`].
///
/// Implemented for every `Serialize + Send` type. Used to keep handler replies
/// and error args type-erased until the response is assembled.
pub trait Encodable: Send {
    /// Convert to a wire value.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be represented in MsgPack.
    fn to_wire(&self) -> Result<Value>;
}

impl<T: Serialize + Send> Encodable for T {
    fn to_wire(&self) -> Result<Value> {
        MsgPackCodec::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serializer};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TestStruct {
        id: u32,
        name: String,
        active: bool,
    }

    /// Serializes to an error, like a type whose state can't be captured.
    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot encode Unencodable"))
        }
    }

    #[test]
    fn test_encode_decode_struct() {
        let original = TestStruct {
            id: 42,
            name: "test".to_string(),
            active: true,
        };

        let encoded = MsgPackCodec::encode(&original).unwrap();
        let decoded: TestStruct = MsgPackCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_structs_are_written_as_maps() {
        let test = TestStruct {
            id: 1,
            name: "x".to_string(),
            active: false,
        };

        let encoded = MsgPackCodec::encode(&test).unwrap();

        // fixmap with 3 entries, not fixarray (0x93)
        assert_eq!(encoded[0], 0x83, "Expected fixmap, got {:02X}", encoded[0]);
    }

    #[test]
    fn test_to_value_keeps_field_names() {
        let value = MsgPackCodec::to_value(&TestStruct {
            id: 7,
            name: "seven".to_string(),
            active: true,
        })
        .unwrap();

        let map = value.as_map().expect("struct should become a map");
        let keys: Vec<&str> = map.iter().filter_map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["id", "name", "active"]);
    }

    #[test]
    fn test_from_value_binds_positional_params() {
        let params = Value::Array(vec![Value::from(2), Value::from("three")]);
        let (a, b): (i64, String) = MsgPackCodec::from_value(&params).unwrap();
        assert_eq!(a, 2);
        assert_eq!(b, "three");
    }

    #[test]
    fn test_from_value_rejects_wrong_shape() {
        let params = Value::Array(vec![Value::from("not a number")]);
        let result: Result<(i64,)> = MsgPackCodec::from_value(&params);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_value_rejects_truncated_input() {
        // fixmap with one entry, then nothing
        assert!(MsgPackCodec::decode_value(&[0x81]).is_err());
        assert!(MsgPackCodec::decode_value(&[]).is_err());
    }

    #[test]
    fn test_decode_value_rejects_trailing_bytes() {
        let mut bytes = MsgPackCodec::encode(&"hello").unwrap();
        assert_eq!(MsgPackCodec::decode_value(&bytes).unwrap(), Value::from("hello"));

        bytes.extend_from_slice(&[0xc0, 0xc0]);
        let err = MsgPackCodec::decode_value(&bytes).unwrap_err();
        assert!(matches!(err, ZrpcError::TrailingBytes(2)));
    }

    #[test]
    fn test_encodable_probe_fails_for_unencodable_values() {
        assert!(Unencodable.to_wire().is_err());
        assert!(MsgPackCodec::encode(&Unencodable).is_err());
        assert_eq!(42u8.to_wire().unwrap(), Value::from(42u8));
    }

    #[test]
    fn test_binary_values_survive() {
        let data: Vec<u8> = vec![0x01, 0x02, 0x03];
        let value = MsgPackCodec::to_value(&serde_bytes::Bytes::new(&data)).unwrap();
        assert_eq!(value, Value::Binary(data));
    }
}
