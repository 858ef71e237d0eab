use bytes::Bytes;

/// An immutable, length-bearing byte blob.
///
/// Cheaply cloneable (backed by [`Bytes`]); the cache never hands out a
/// mutable view, and every crossing of the cache boundary — load, get,
/// wire decode — goes through [`Value::copy_from_slice`] or
/// [`Value::as_bytes`] so caller-owned buffers and cache-owned buffers
/// never alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value(Bytes);

impl Value {
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Value(Bytes::copy_from_slice(bytes))
    }

    pub fn from_bytes(bytes: Bytes) -> Self {
        Value(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Defensive copy for external exposure.
    pub fn as_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::copy_from_slice(s.as_bytes())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value(Bytes::from(s.into_bytes()))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value(Bytes::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn defensive_copy_on_construction() {
        let mut raw = vec![1, 2, 3];
        let value = Value::copy_from_slice(&raw);
        raw[0] = 9;
        assert_eq!(value.as_slice(), &[1, 2, 3]);
    }

    #[test_log::test]
    fn defensive_copy_on_export() {
        let value = Value::from("hello");
        let mut exported = value.as_bytes();
        exported[0] = b'H';
        assert_eq!(value.as_slice(), b"hello");
    }

    #[test_log::test]
    fn len_matches_byte_length() {
        assert_eq!(Value::from("abcd").len(), 4);
        assert!(Value::from("").is_empty());
    }
}
