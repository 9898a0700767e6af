//! Self-description of a batch's output dataset.

use serde::{Deserialize, Serialize};

/// One output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputField {
    pub key: String,
    /// Human-readable name of the output
    pub label: String,
    pub units: String,
}

impl OutputField {
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            units: units.into(),
        }
    }
}

/// Column layout of every record a batch delivered.
///
/// `inputs` lists the design's dimension keys in declaration order; `outputs`
/// lists the engine's selected outputs in the engine's declared order, which
/// is the order of every record's `outputs` mapping. Output order never
/// depends on the order dimensions were declared in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub inputs: Vec<String>,
    pub outputs: Vec<OutputField>,
}

impl Schema {
    #[must_use]
    pub fn new(inputs: Vec<String>, outputs: Vec<OutputField>) -> Self {
        Self { inputs, outputs }
    }

    /// Output keys in column order
    pub fn output_keys(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|f| f.key.as_str())
    }

    /// Every column name: inputs first, then outputs
    #[must_use]
    pub fn header(&self) -> Vec<String> {
        self.inputs
            .iter()
            .cloned()
            .chain(self.outputs.iter().map(|f| f.key.clone()))
            .collect()
    }

    /// Numbered field listing, one line per output: `"1: key (units)"`
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.outputs
            .iter()
            .enumerate()
            .map(|(i, field)| format!("{}: {} ({})", i + 1, field.key, field.units))
            .collect()
    }
}
