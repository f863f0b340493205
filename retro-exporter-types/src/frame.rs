//! Frame - the record carried on the wire.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::Value;

/// A mapped frame: the subset of a sample's fields that were registered for
/// output, renamed to their output keys.
///
/// Serialized as a named map `{"t": timestamp, "v": {key: value}}`. Each
/// encoded frame is self-delimiting, so a datagram is simply a concatenation
/// of frames with no outer length prefix.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    /// Timestamp copied from the originating sample.
    #[cfg_attr(feature = "serde", serde(rename = "t"))]
    pub timestamp: i64,

    /// Values keyed by output name.
    #[cfg_attr(feature = "serde", serde(rename = "v"))]
    pub values: BTreeMap<String, Value>,
}

impl Frame {
    /// Create an empty frame.
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Reset for reuse with a new timestamp, keeping the allocation.
    pub fn reset(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
        self.values.clear();
    }

    /// Insert a value under its output name.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Get a value by output name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Number of values in the frame.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// A frame with no values is never put on the wire.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_values() {
        let mut frame = Frame::new(1);
        frame.insert("a", Value::Bool(true));
        assert_eq!(frame.len(), 1);

        frame.reset(2);
        assert_eq!(frame.timestamp, 2);
        assert!(frame.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_uses_short_keys() {
        let mut frame = Frame::new(5);
        frame.insert("st", Value::Bool(false));

        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"t":5,"v":{"st":false}}"#);

        let parsed: Frame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, frame);
    }
}
