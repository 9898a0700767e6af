//! Tests for YAML batch plans
//!
//! These tests verify:
//! - Orthogonal and random plans load and build designs
//! - Plan options, selection and run limit flow into a batch
//! - Invalid plans report parse or space errors
//! - Repeated option keys keep one entry holding the last value

use super::support::{INPUT_COUNT, SPREAD_RATE, TestEngine};
use crate::error::{PlanError, SpaceError};
use crate::model::Value;
use crate::plan::BatchPlan;
use crate::runner::{DEFAULT_RUN_LIMIT, Design, SimulationRunner};
use crate::sink::MemorySink;

const ORTHOGONAL: &str = r#"
name: example1
run_limit: 100
parallel_batches: 1
options:
  - [required, "fuel,wind"]
  - [configure.wind.speed, at20ft]
outputs: [spreadRate, inputCount]
strategy:
  type: orthogonal
  dimensions:
    - type: list
      key: fuel
      values: [gr1, gs1]
    - type: stepped
      key: wind
      start: 0
      stop: 10
      step: 5
      scale: 88
    - type: linspace
      key: moisDead
      min: 0.0
      max: 0.2
      steps: 3
"#;

const RANDOM: &str = r#"
name: sampled
outputs: [spreadRate]
strategy:
  type: random
  count: 25
  seed: 7
  dimensions:
    - { type: choice, key: fuel, values: [gr1, gr2] }
    - { type: continuous, key: wind, min: 0.0, max: 20.0 }
    - { type: offset, key: gust, base: wind, min: 0.0, max: 5.0 }
"#;

#[test]
fn test_orthogonal_plan_builds_design() {
    let plan = BatchPlan::from_yaml(ORTHOGONAL).unwrap();
    assert_eq!(plan.name, "example1");
    assert_eq!(plan.engine_options().get("configure.wind.speed"), Some("at20ft"));
    assert_eq!(
        plan.selection().selected_keys().collect::<Vec<_>>(),
        [SPREAD_RATE, INPUT_COUNT]
    );

    let options = plan.run_options();
    assert_eq!(options.run_limit, 100);
    assert_eq!(options.parallel_batches, 1);

    let Design::Orthogonal(space) = plan.design().unwrap() else {
        panic!("expected an orthogonal design");
    };
    assert_eq!(space.shape(), [2, 3, 3]);
    let wind: Vec<f64> = space
        .dimension("wind")
        .unwrap()
        .domain()
        .iter()
        .filter_map(Value::as_f64)
        .collect();
    assert_eq!(wind, [0.0, 440.0, 880.0]);
    assert_eq!(
        space.dimension("fuel").unwrap().domain(),
        [Value::from("gr1"), Value::from("gs1")]
    );
}

#[test]
fn test_plan_runs_end_to_end() {
    let plan = BatchPlan::from_yaml(ORTHOGONAL).unwrap();
    let engine = TestEngine::new();
    let runner = SimulationRunner::new(&engine).with_options(plan.run_options());
    let mut sink = MemorySink::new();

    let report = runner
        .run(
            &plan.design().unwrap(),
            plan.engine_options(),
            &plan.selection(),
            &mut sink,
        )
        .unwrap();

    assert_eq!(report.statistics.total_runs, 18);
    assert_eq!(report.schema.inputs, ["fuel", "wind", "moisDead"]);
    assert_eq!(
        report.schema.describe(),
        ["1: spreadRate (ft/min)", "2: inputCount ()"]
    );
}

#[test]
fn test_random_plan_builds_seeded_design() {
    let plan = BatchPlan::from_yaml(RANDOM).unwrap();
    assert_eq!(plan.run_options().run_limit, DEFAULT_RUN_LIMIT);

    let Design::Random { space, count, seed } = plan.design().unwrap() else {
        panic!("expected a random design");
    };
    assert_eq!(count, 25);
    assert_eq!(seed, Some(7));
    assert_eq!(space.keys().collect::<Vec<_>>(), ["fuel", "wind", "gust"]);
}

#[test]
fn test_invalid_step_is_a_space_error() {
    let yaml = ORTHOGONAL.replace("step: 5", "step: 0");
    let plan = BatchPlan::from_yaml(&yaml).unwrap();
    assert!(matches!(
        plan.design(),
        Err(PlanError::Space(SpaceError::InvalidRange { .. }))
    ));
}

#[test]
fn test_offset_needs_earlier_base() {
    let yaml = RANDOM.replace("base: wind", "base: slope");
    let plan = BatchPlan::from_yaml(&yaml).unwrap();
    assert!(matches!(
        plan.design(),
        Err(PlanError::Space(SpaceError::UnknownBase { .. }))
    ));
}

#[test]
fn test_duplicate_dimension_in_plan() {
    let yaml = ORTHOGONAL.replace("key: moisDead", "key: fuel");
    let plan = BatchPlan::from_yaml(&yaml).unwrap();
    assert!(matches!(
        plan.design(),
        Err(PlanError::Space(SpaceError::DuplicateDimension { .. }))
    ));
}

#[test]
fn test_unknown_strategy_is_a_parse_error() {
    let yaml = ORTHOGONAL.replace("type: orthogonal", "type: latin_hypercube");
    assert!(matches!(
        BatchPlan::from_yaml(&yaml),
        Err(PlanError::Parse(_))
    ));
}

#[test]
fn test_generator_larger_than_run_limit_is_refused() {
    let yaml = ORTHOGONAL.replace("step: 5", "step: 0.00001");
    let plan = BatchPlan::from_yaml(&yaml).unwrap();
    assert!(matches!(
        plan.design(),
        Err(PlanError::Space(SpaceError::InvalidRange {
            reason: "too many values",
            ..
        }))
    ));

    let yaml = ORTHOGONAL.replace("steps: 3", "steps: 1000000000000");
    let plan = BatchPlan::from_yaml(&yaml).unwrap();
    assert!(matches!(
        plan.design(),
        Err(PlanError::Space(SpaceError::InvalidRange {
            reason: "too many values",
            ..
        }))
    ));
}

#[test]
fn test_repeated_option_key_keeps_last_value() {
    let yaml = ORTHOGONAL.replace(
        "  - [configure.wind.speed, at20ft]",
        "  - [configure.wind.speed, at20ft]\n  - [configure.wind.speed, at10m]",
    );
    let plan = BatchPlan::from_yaml(&yaml).unwrap();
    let options = plan.engine_options();
    assert_eq!(options.get("configure.wind.speed"), Some("at10m"));
    assert_eq!(options.len(), 2);
    assert_eq!(
        options.iter().map(|(k, _)| k).collect::<Vec<_>>(),
        ["required", "configure.wind.speed"]
    );
}
