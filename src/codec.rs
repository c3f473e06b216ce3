//! Serialization Codec Module
//!
//! Byte-encodes arbitrary application values so that backends only ever
//! deal in opaque byte sequences. Pure functions, no I/O, no backend
//! knowledge.
//!
//! JSON is the wire format: every value shape the catalog caches
//! (primitives, nested maps, sequences, derived domain records) round-trips
//! losslessly through serde_json.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

// == Encode ==
/// Serializes a value into storage bytes.
///
/// # Arguments
/// * `value` - Any serde-serializable value
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

// == Decode ==
/// Deserializes storage bytes back into a value.
///
/// Fails with [`crate::CacheError::Serialization`] on corrupt or foreign
/// bytes; callers treat that as a cache miss, never as an operation
/// failure.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Book {
        id: u64,
        title: String,
        authors: Vec<String>,
        rating: Option<f64>,
    }

    #[test]
    fn test_roundtrip_primitives() {
        let encoded = encode(&42u64).unwrap();
        assert_eq!(decode::<u64>(&encoded).unwrap(), 42);

        let encoded = encode(&"hello").unwrap();
        assert_eq!(decode::<String>(&encoded).unwrap(), "hello");

        let encoded = encode(&true).unwrap();
        assert!(decode::<bool>(&encoded).unwrap());
    }

    #[test]
    fn test_roundtrip_collections() {
        let list = vec![1, 2, 3];
        assert_eq!(decode::<Vec<i32>>(&encode(&list).unwrap()).unwrap(), list);

        let mut map = HashMap::new();
        map.insert("page".to_string(), 1);
        map.insert("per".to_string(), 20);
        assert_eq!(
            decode::<HashMap<String, i32>>(&encode(&map).unwrap()).unwrap(),
            map
        );
    }

    #[test]
    fn test_roundtrip_domain_record() {
        let book = Book {
            id: 42,
            title: "The Name of the Wind".to_string(),
            authors: vec!["Patrick Rothfuss".to_string()],
            rating: Some(4.5),
        };

        let encoded = encode(&book).unwrap();
        assert_eq!(decode::<Book>(&encoded).unwrap(), book);
    }

    #[test]
    fn test_decode_corrupt_bytes_fails() {
        let result = decode::<Book>(b"not valid json at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_foreign_shape_fails() {
        // Valid JSON, wrong shape for the target type
        let bytes = encode(&vec![1, 2, 3]).unwrap();
        let result = decode::<Book>(&bytes);
        assert!(result.is_err());
    }
}
