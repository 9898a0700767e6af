//! Per-run engine outputs and the records handed to sinks.

use serde::Serialize;

use super::{Assignment, Value};

/// A single computed output: the raw value plus its display rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputValue {
    pub raw: Value,
    /// The value as it should appear in a dataset
    pub display: String,
    /// Units of `display` (e.g. "ft/min"); empty when dimensionless
    pub units: String,
}

impl OutputValue {
    #[must_use]
    pub fn new(raw: impl Into<Value>, display: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            display: display.into(),
            units: units.into(),
        }
    }

    /// An output whose display text is the raw value's own rendering
    #[must_use]
    pub fn plain(raw: impl Into<Value>, units: impl Into<String>) -> Self {
        let raw = raw.into();
        let display = raw.to_string();
        Self {
            raw,
            display,
            units: units.into(),
        }
    }
}

/// Ordered mapping from output key to computed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outputs {
    entries: Vec<(String, OutputValue)>,
}

impl Outputs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an output. Keys keep insertion order; the engine is expected to
    /// insert them in its declared output order.
    pub fn insert(&mut self, key: impl Into<String>, value: OutputValue) {
        self.entries.push((key.into(), value));
    }

    /// Builder form of [`Outputs::insert`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: OutputValue) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OutputValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for Outputs {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// The stored result of one assignment's computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    /// Position in generation order (0-based)
    pub index: u64,
    pub assignment: Assignment,
    pub outputs: Outputs,
}
