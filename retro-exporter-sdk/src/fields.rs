//! Field mapping: which producer fields are emitted, and under what key.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use retro_exporter_types::{Frame, Sample, Value};

/// Anything the producer can hand over as a set of named field values.
///
/// Lookup is by source name only. Implemented for the usual map types, for
/// [`Sample`], and for [`SplitFields`] (the three typed maps an input poller
/// produces).
pub trait FieldSource {
    /// Look up a field by source name.
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl FieldSource for BTreeMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).copied()
    }
}

impl<S: BuildHasher> FieldSource for HashMap<String, Value, S> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).copied()
    }
}

impl FieldSource for Sample {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).copied()
    }
}

/// Buttons, analog axes and raw axes as separate typed maps.
///
/// When a name appears in more than one map, buttons win over analogs and
/// analogs win over raw values.
#[derive(Debug, Clone, Copy)]
pub struct SplitFields<'a> {
    pub buttons: &'a HashMap<String, bool>,
    pub analogs: &'a HashMap<String, f64>,
    pub raw: &'a HashMap<String, i64>,
}

impl FieldSource for SplitFields<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(b) = self.buttons.get(name) {
            return Some(Value::Bool(*b));
        }
        if let Some(f) = self.analogs.get(name) {
            return Some(Value::Float(*f));
        }
        self.raw.get(name).map(|i| Value::Int(*i))
    }
}

/// Maps source field names to the key they are emitted under.
///
/// A source name absent from the table is never emitted, even if the
/// producer supplies it.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    outputs: BTreeMap<String, String>,
}

impl FieldMap {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source field. `output` defaults to the source name.
    ///
    /// The last registration for a given source name wins.
    pub fn register(&mut self, source: impl Into<String>, output: Option<&str>) {
        let source = source.into();
        let output = output.map(str::to_string).unwrap_or_else(|| source.clone());
        self.outputs.insert(source, output);
    }

    /// Output key for a source name, if registered.
    pub fn output_for(&self, source: &str) -> Option<&str> {
        self.outputs.get(source).map(String::as_str)
    }

    /// Number of registered source fields.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Fill `frame` with the registered fields present in `source`.
    ///
    /// Values already in the frame are kept; callers reset it first.
    pub fn project<S: FieldSource + ?Sized>(&self, source: &S, frame: &mut Frame) {
        for (name, output) in &self.outputs {
            if let Some(value) = source.lookup(name) {
                frame.insert(output.as_str(), value);
            }
        }
    }
}
