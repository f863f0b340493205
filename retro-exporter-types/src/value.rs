//! Field values carried by samples and frames.

/// A single field value: a button, an analog axis, or a raw axis reading.
///
/// The set of kinds is closed. Serialized untagged, so a bool becomes a
/// plain boolean, an integer a plain integer, and a float a plain float in
/// any self-describing format.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// Digital input (button pressed or not).
    Bool(bool),
    /// Raw integer reading (e.g. an unscaled stick axis).
    Int(i64),
    /// Normalized analog reading.
    Float(f64),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(12i32), Value::Int(12));
        assert_eq!(Value::from(0.5f32), Value::Float(0.5));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_untagged() {
        assert_eq!(serde_json::to_string(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&Value::Int(-5)).unwrap(), "-5");

        let parsed: Value = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, Value::Int(42));
        let parsed: Value = serde_json::from_str("0.25").unwrap();
        assert_eq!(parsed, Value::Float(0.25));
        let parsed: Value = serde_json::from_str("false").unwrap();
        assert_eq!(parsed, Value::Bool(false));
    }
}
