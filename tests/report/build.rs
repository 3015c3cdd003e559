// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tdm::report::{
    decode, encode, CompOp, Measure, MeasurementMode, NumericMeasurement, NumericTest, Report,
    ReportKind, StepId, StepKind, StepSetters, StepStatus, StringTest, WsjfError,
};

fn report() -> Report {
    Report::builder(ReportKind::Test, "PN-100", "SN-0001", "A", 10).build()
}

#[test]
fn test_ids_and_indices_follow_creation_order() -> Result<()> {
    let mut report = report();
    let mut root = report.root_sequence_mut();

    let vdd = root.add_numeric_limit_step("vdd").id();
    let mut leds = root.add_sequence_call("Leds", "leds.seq", "1.0.0");
    let leds_id = leds.id();
    let red = leds.add_pass_fail_step("red").id();
    let vcc = root.add_numeric_limit_step("vcc").id();

    assert_eq!((vdd, leds_id, red, vcc), (2, 3, 4, 5));

    let idx = |id: StepId| report.step(id).map(|n| n.index());
    assert_eq!(idx(vdd), Some(0));
    assert_eq!(idx(leds_id), Some(1));
    assert_eq!(idx(red), Some(0));
    assert_eq!(idx(vcc), Some(2));

    assert_eq!(report.parent_of(red).map(|n| n.id()), Some(leds_id));
    assert_eq!(report.parent_of(vcc).map(|n| n.id()), Some(1));
    assert!(report.parent_of(1).is_none());
    assert_eq!(report.steps().allocator().peek_step_id(), 6);
    Ok(())
}

#[test]
fn test_random_builds_keep_tree_invariants() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..20 {
        let mut report = report();
        let mut sequences = vec![1];
        let mut created = vec![1];

        for _ in 0..rng.gen_range(1..60) {
            let target = sequences[rng.gen_range(0..sequences.len())];
            let mut seq = report
                .sequence_mut(target)
                .ok_or(anyhow!("sequence {target} missing"))?;

            let id = match rng.gen_range(0..5) {
                0 => {
                    let id = seq.add_sequence_call("sub", "sub.seq", "1").id();
                    sequences.push(id);
                    id
                }
                1 => seq.add_numeric_limit_step("n").id(),
                2 => seq.add_pass_fail_step("pf").id(),
                3 => seq.add_string_value_step("s").id(),
                _ => seq.add_generic_step("Action", "g")?.id(),
            };
            created.push(id);
        }

        let expected: Vec<StepId> = (1..=created.len() as StepId).collect();
        assert_eq!(created, expected);

        let mut seen_parents: HashMap<StepId, usize> = HashMap::new();
        for seq_id in &sequences {
            let seq = report
                .steps()
                .sequence(*seq_id)
                .ok_or(anyhow!("sequence {seq_id} missing"))?;
            for (pos, child) in seq.children().enumerate() {
                assert_eq!(child.index(), pos);
                assert_eq!(child.parent(), Some(*seq_id));
                *seen_parents.entry(child.id()).or_default() += 1;
            }
        }

        assert_eq!(seen_parents.len(), created.len() - 1);
        assert!(seen_parents.values().all(|count| *count == 1));
        assert_eq!(report.root_sequence().walk().len(), created.len());
    }
    Ok(())
}

#[test]
fn test_single_mode_takes_one_measurement() -> Result<()> {
    let mut report = report();
    let mut root = report.root_sequence_mut();
    let mut step = root.add_numeric_limit_step("vdd");

    step.add_single_test(NumericTest::new(3.3, CompOp::GeLe).limits(3.0, 3.6))?;
    assert_eq!(step.mode(), Some(MeasurementMode::Single));

    let second = step.add_single_test(NumericTest::log(1.0));
    assert!(matches!(
        second,
        Err(WsjfError::ModeConflict {
            attempted: MeasurementMode::Single,
            current: MeasurementMode::Single,
            ..
        })
    ));

    let named = step.add_named_test("x", NumericTest::log(1.0));
    assert!(matches!(named, Err(WsjfError::ModeConflict { .. })));
    assert_eq!(step.measurements().len(), 1);
    Ok(())
}

#[test]
fn test_multiple_mode_rejects_single() -> Result<()> {
    let mut report = report();
    let mut root = report.root_sequence_mut();
    let mut step = root.add_string_value_step("fw");

    step.add_named_test("main", StringTest::new("1.2", CompOp::Eq).limit("1.2"))?
        .add_named_test("boot", StringTest::new("0.9", CompOp::Eq).limit("1.0"))?;

    let single = step.add_single_test(StringTest::log("x"));
    assert!(matches!(
        single,
        Err(WsjfError::ModeConflict {
            attempted: MeasurementMode::Single,
            current: MeasurementMode::Multiple,
            ..
        })
    ));

    let indices: Vec<_> = step.measurements().iter().map(|m| m.index()).collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(step.status(), StepStatus::Failed);
    Ok(())
}

#[test]
fn test_limit_boundaries() -> Result<()> {
    let mut report = report();
    let mut root = report.root_sequence_mut();

    let cases = [
        (3.0, CompOp::GeLe, StepStatus::Passed),
        (2.99, CompOp::GeLe, StepStatus::Failed),
        (3.6, CompOp::GeLe, StepStatus::Passed),
        (3.0, CompOp::GtLt, StepStatus::Failed),
        (3.6, CompOp::GtLt, StepStatus::Failed),
        (3.3, CompOp::GtLt, StepStatus::Passed),
    ];

    let mut step = root.add_numeric_limit_step("rails");
    for (i, (value, op, _)) in cases.iter().enumerate() {
        step.add_named_test(&format!("r{i}"), NumericTest::new(*value, *op).limits(3.0, 3.6))?;
    }

    let statuses: Vec<_> = step
        .measurements()
        .iter()
        .map(NumericMeasurement::status)
        .collect();
    let expected: Vec<_> = cases.iter().map(|(_, _, s)| *s).collect();
    assert_eq!(statuses, expected);
    assert_eq!(step.status(), StepStatus::Failed);
    Ok(())
}

#[test]
fn test_missing_limit_is_rejected() {
    let mut report = report();
    let mut root = report.root_sequence_mut();
    let mut step = root.add_numeric_limit_step("vdd");

    let res = step.add_single_test(NumericTest::new(3.3, CompOp::GeLe).low_limit(3.0));
    assert!(matches!(res, Err(WsjfError::MissingLimit { bound: "high", .. })));
    assert!(step.measurements().is_empty());
    assert_eq!(step.mode(), None);
}

#[test]
fn test_status_override_and_defaults() -> Result<()> {
    let mut report = report();
    let mut root = report.root_sequence_mut();

    let seq = root.add_sequence_call("Sub", "sub.seq", "1").id();
    let label = root.add_generic_step("Label", "marker")?.id();
    let skipped = root
        .add_pass_fail_step("skipped")
        .set_status(StepStatus::Skipped)
        .id();

    let status = |id| report.step(id).map(|n| n.status());
    assert_eq!(status(1), Some(StepStatus::Done));
    assert_eq!(status(seq), Some(StepStatus::Done));
    assert_eq!(status(label), Some(StepStatus::Done));
    assert_eq!(status(skipped), Some(StepStatus::Skipped));
    assert_eq!(report.root_sequence().find_step("marker").map(|n| n.id()), Some(label));
    Ok(())
}

#[test]
fn test_generic_steps_cannot_take_reserved_types() -> Result<()> {
    let mut report = report();
    let mut root = report.root_sequence_mut();

    let err = root.add_generic_step("SequenceCall", "call").map(|s| s.id());
    assert!(matches!(err, Err(WsjfError::ReservedStepType(_))));
    let err = root.add_generic_step("ET_MNLT", "rails").map(|s| s.id());
    assert!(matches!(err, Err(WsjfError::ReservedStepType(_))));

    let flow = root.add_generic_step("NI_Flow_If", "if ready")?.id();
    assert_eq!(report.steps().len(), 2);

    let payload = encode(&report)?;
    let decoded = decode(&payload)?.report;
    assert_eq!(
        decoded.step(flow).map(|n| n.kind().clone()),
        Some(StepKind::Generic("NI_Flow_If".to_owned()))
    );
    assert_eq!(encode(&decoded)?, payload);
    Ok(())
}
