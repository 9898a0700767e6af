//! Integration tests for the batch driver
//!
//! Tests are organized by topic:
//! - `support` - Deterministic test engine and recording sink
//! - `runner` - Batch execution, validation, aborts and cancellation
//! - `sinks` - CSV and JSON-lines output on disk
//! - `plan` - YAML batch plans
//! - `properties` - Property tests for sweep coverage and sampling bounds

mod plan;
mod support;
