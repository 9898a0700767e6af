//! Deterministic engine shared by the runner, sink and plan tests
//!
//! `TestEngine` understands three options:
//! - `required`: comma-separated input keys the model demands (default `fuel,wind`)
//! - `fail_below`: any numeric input below this value fails the run
//! - `scramble`: `true` makes every run return its outputs in reverse order

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::{Engine, EngineOptions, Model, OutputSelection};
use crate::error::{EngineError, SinkError};
use crate::model::{Assignment, OutputValue, Outputs, RunRecord};
use crate::schema::OutputField;
use crate::sink::ResultSink;

pub const SPREAD_RATE: &str = "spreadRate";
pub const FLAME_LENGTH: &str = "flameLength";
pub const INPUT_COUNT: &str = "inputCount";

#[derive(Debug, Default)]
pub struct TestEngine {
    calls: Arc<AtomicU64>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `compute` calls made by every model this engine produced
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct TestModel {
    required: Vec<String>,
    fields: Vec<OutputField>,
    calls: Arc<AtomicU64>,
    fail_below: Option<f64>,
    scramble: bool,
}

fn catalog() -> Vec<OutputField> {
    vec![
        OutputField::new(SPREAD_RATE, "Spread rate", "ft/min"),
        OutputField::new(FLAME_LENGTH, "Flame length", "ft"),
        OutputField::new(INPUT_COUNT, "Input count", ""),
    ]
}

impl Engine for TestEngine {
    type Model = TestModel;

    fn configure(
        &self,
        options: &EngineOptions,
        selection: &OutputSelection,
    ) -> Result<TestModel, EngineError> {
        let catalog = catalog();
        if let Some(unknown) = selection
            .selected_keys()
            .find(|key| !catalog.iter().any(|f| f.key == *key))
        {
            return Err(EngineError::Configuration(format!(
                "unknown output '{unknown}'"
            )));
        }

        let required = options
            .get("required")
            .unwrap_or("fuel,wind")
            .split(',')
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect();
        let fail_below = options
            .get("fail_below")
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|e| EngineError::Configuration(e.to_string()))
            })
            .transpose()?;

        Ok(TestModel {
            required,
            fields: catalog
                .into_iter()
                .filter(|f| selection.is_selected(&f.key))
                .collect(),
            calls: Arc::clone(&self.calls),
            fail_below,
            scramble: options.get("scramble") == Some("true"),
        })
    }
}

impl Model for TestModel {
    fn required_inputs(&self) -> Vec<String> {
        self.required.clone()
    }

    fn output_fields(&self) -> Vec<OutputField> {
        self.fields.clone()
    }

    fn compute(&self, assignment: &Assignment) -> Result<Outputs, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let numbers: Vec<(&str, f64)> = assignment
            .iter()
            .filter_map(|(key, value)| value.as_f64().map(|x| (key, x)))
            .collect();
        if let Some(limit) = self.fail_below
            && let Some((key, x)) = numbers.iter().find(|(_, x)| *x < limit)
        {
            return Err(EngineError::InvalidInput {
                key: key.to_string(),
                reason: format!("{x} is below {limit}"),
            });
        }

        let total: f64 = numbers.iter().map(|(_, x)| x).sum();
        let mut entries = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = match field.key.as_str() {
                SPREAD_RATE => {
                    let rate = total * 1.5;
                    OutputValue::new(rate, format!("{rate:.2}"), field.units.as_str())
                }
                FLAME_LENGTH => {
                    let length = total.abs().sqrt();
                    OutputValue::new(length, format!("{length:.3}"), field.units.as_str())
                }
                _ => OutputValue::plain(assignment.len() as i64, ""),
            };
            entries.push((field.key.clone(), value));
        }
        if self.scramble {
            entries.reverse();
        }

        let mut outputs = Outputs::new();
        for (key, value) in entries {
            outputs.insert(key, value);
        }
        Ok(outputs)
    }
}

/// Selects every output the test engine knows, in catalog order
pub fn all_outputs() -> OutputSelection {
    [SPREAD_RATE, FLAME_LENGTH, INPUT_COUNT].into_iter().collect()
}

/// Sink that records what it was given and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub records: Vec<RunRecord>,
    pub accepts: u64,
    pub finishes: u64,
    /// Reject the record with this index
    pub reject_at: Option<u64>,
    pub fail_finish: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(index: u64) -> Self {
        Self {
            reject_at: Some(index),
            ..Self::default()
        }
    }
}

impl ResultSink for RecordingSink {
    fn accept(&mut self, record: RunRecord) -> Result<(), SinkError> {
        if self.reject_at == Some(record.index) {
            return Err(SinkError::Rejected(format!("record {}", record.index)));
        }
        self.accepts += 1;
        self.records.push(record);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finishes += 1;
        if self.fail_finish {
            return Err(SinkError::Closed);
        }
        Ok(())
    }
}
