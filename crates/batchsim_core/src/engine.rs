//! Capability traits for the external computation engine.
//!
//! The engine is a black box reached through two traits. [`Engine::configure`]
//! applies a fixed set of modeling options and an output selection, producing
//! an immutable [`Model`]. The model then answers which inputs it needs and
//! computes runs through `&self`, so a configured model holds no mutable state
//! shared between runs and can be driven from several threads at once.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{Assignment, Outputs};
use crate::schema::OutputField;

/// Enumerated key/value modeling options, in declaration order.
///
/// Setting a key again replaces its value in place. The options are opaque to
/// the batch driver; only the engine interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, String)>", into = "Vec<(String, String)>")]
pub struct EngineOptions {
    pairs: Vec<(String, String)>,
}

impl EngineOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Builder form of [`EngineOptions::set`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EngineOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Self::new();
        for (k, v) in iter {
            options.set(k, v);
        }
        options
    }
}

impl From<Vec<(String, String)>> for EngineOptions {
    /// Routes deserialized pairs through [`EngineOptions::set`]
    fn from(pairs: Vec<(String, String)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<EngineOptions> for Vec<(String, String)> {
    fn from(options: EngineOptions) -> Self {
        options.pairs
    }
}

/// Which outputs the engine should retain per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, bool)>", into = "Vec<(String, bool)>")]
pub struct OutputSelection {
    entries: Vec<(String, bool)>,
}

impl OutputSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as selected or not. Re-selecting keeps the original position.
    pub fn select(&mut self, key: impl Into<String>, selected: bool) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = selected,
            None => self.entries.push((key, selected)),
        }
    }

    /// Builder form of [`OutputSelection::select`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, selected: bool) -> Self {
        self.select(key, selected);
        self
    }

    /// Selected keys in declaration order
    pub fn selected_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, selected)| *selected)
            .map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn is_selected(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, s)| k == key && *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), *s))
    }
}

impl<K: Into<String>> FromIterator<K> for OutputSelection {
    /// Every key in the iterator is selected
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut selection = Self::new();
        for key in iter {
            selection.select(key, true);
        }
        selection
    }
}

impl From<Vec<(String, bool)>> for OutputSelection {
    fn from(entries: Vec<(String, bool)>) -> Self {
        let mut selection = Self::new();
        for (key, selected) in entries {
            selection.select(key, selected);
        }
        selection
    }
}

impl From<OutputSelection> for Vec<(String, bool)> {
    fn from(selection: OutputSelection) -> Self {
        selection.entries
    }
}

/// An external computation engine.
pub trait Engine {
    type Model: Model;

    /// Fix modeling options and the output selection for a batch.
    ///
    /// Called once per batch, before the engine's required inputs are queried
    /// and before any run.
    fn configure(
        &self,
        options: &EngineOptions,
        selection: &OutputSelection,
    ) -> Result<Self::Model, EngineError>;
}

/// An engine with its configuration fixed.
pub trait Model: Sync {
    /// The minimal set of input keys every assignment must supply
    fn required_inputs(&self) -> Vec<String>;

    /// The selected outputs in the order `compute` returns them
    fn output_fields(&self) -> Vec<OutputField>;

    /// Compute one run. Must be deterministic in `assignment`.
    fn compute(&self, assignment: &Assignment) -> Result<Outputs, EngineError>;
}
