//! Sample - one polled snapshot of input state.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::Value;

/// One timestamped snapshot of input field values from the producer.
///
/// The timestamp epoch is chosen by the producer (monotonic counter or wall
/// clock); it is carried through to the wire unchanged.
///
/// # Example
///
/// ```rust
/// use retro_exporter_types::{Sample, Value};
///
/// let sample = Sample::builder()
///     .timestamp(1_000)
///     .field("a", true)
///     .field("lstick_x_raw", 128i64)
///     .field("lstick_x", 0.5)
///     .build();
///
/// assert_eq!(sample.len(), 3);
/// assert_eq!(sample.get("a"), Some(&Value::Bool(true)));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Producer-defined timestamp.
    #[cfg_attr(feature = "serde", serde(rename = "t"))]
    pub timestamp: i64,

    /// Field values keyed by source field name.
    #[cfg_attr(feature = "serde", serde(rename = "v", default))]
    pub fields: BTreeMap<String, Value>,
}

impl Sample {
    /// Create an empty sample with the given timestamp.
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    /// Create a builder for constructing samples.
    pub fn builder() -> SampleBuilder {
        SampleBuilder::default()
    }

    /// Get a field value by source name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Number of fields in the sample.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the sample carries no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for constructing `Sample` instances.
#[derive(Debug, Default)]
pub struct SampleBuilder {
    timestamp: i64,
    fields: BTreeMap<String, Value>,
}

impl SampleBuilder {
    /// Set the timestamp.
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Build the sample.
    pub fn build(self) -> Sample {
        Sample {
            timestamp: self.timestamp,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_builder() {
        let sample = Sample::builder()
            .timestamp(42)
            .field("start", false)
            .field("start", true)
            .build();

        assert_eq!(sample.timestamp, 42);
        assert_eq!(sample.len(), 1);
        assert_eq!(sample.get("start"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_empty_sample() {
        let sample = Sample::new(7);
        assert!(sample.is_empty());
        assert_eq!(sample.get("a"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_sample_from_json_line() {
        let sample: Sample = serde_json::from_str(r#"{"t":10,"v":{"a":true,"x":3,"y":0.5}}"#).unwrap();
        assert_eq!(sample.timestamp, 10);
        assert_eq!(sample.get("a"), Some(&Value::Bool(true)));
        assert_eq!(sample.get("x"), Some(&Value::Int(3)));
        assert_eq!(sample.get("y"), Some(&Value::Float(0.5)));
    }
}
