use googletest::prelude::*;

use super::*;
use crate::obs::ObservationContext;
use crate::testutil::{ntsc_parameters, pal_parameters, record_value, SyntheticRepresentation};

fn run(
    repr: &SyntheticRepresentation,
    field: u64,
    context: &ObservationContext,
) -> Vec<ObservationRecord> {
    PulldownObserver.process_field(repr, FieldId::new(field), &context.history())
}

#[googletest::test]
fn test_classic_cadence_phase_stream() {
    // NTSC CAV fields with phase stream 1,2,2,3,4,4,1,2,2,3: the repeated phases at indices
    // 2, 5 and 8 are the pulldown fields.
    let phases = [1, 2, 2, 3, 4, 4, 1, 2, 2, 3];
    let mut repr = SyntheticRepresentation::new(ntsc_parameters(), phases.len());
    let mut context = ObservationContext::new();
    for (i, &phase) in phases.iter().enumerate() {
        repr.set_phase_hint(i as u64, phase);
        let id = FieldId::new(i as u64);
        context.set(id, "biphase", "confidence", "high").unwrap();
        context.set(id, "biphase", "picture_number", 101 + i as i32).unwrap();
    }

    let detected: Vec<bool> = (0..phases.len() as u64)
        .map(|i| {
            let records = run(&repr, i, &context);
            record_value(&records, "is_pulldown").unwrap().as_bool().unwrap()
        })
        .collect();
    expect_that!(
        detected,
        eq(&vec![false, false, true, false, false, true, false, false, true, false])
    );
}

#[googletest::test]
fn test_pattern_position_is_picture_number_mod_5() {
    let mut repr = SyntheticRepresentation::new(ntsc_parameters(), 2);
    repr.set_phase_hint(0, 1);
    repr.set_phase_hint(1, 1);
    let mut context = ObservationContext::new();
    for field in 0..2 {
        let id = FieldId::new(field);
        context.set(id, "biphase", "confidence", "high").unwrap();
        context.set(id, "biphase", "picture_number", 123).unwrap();
    }

    let records = run(&repr, 1, &context);
    expect_that!(record_value(&records, "pattern_position").unwrap().as_i32(), some(eq(3)));
    // Phase repeats and the picture number repeats: both lines of evidence agree.
    expect_that!(record_value(&records, "is_pulldown").unwrap().as_bool(), some(eq(true)));
    expect_that!(record_value(&records, "confidence").unwrap().as_str(), some(eq("high")));
    expect_that!(record_value(&records, "pattern_break"), none());
}

#[googletest::test]
fn test_phase_only_evidence_is_a_pattern_break() {
    let mut repr = SyntheticRepresentation::new(ntsc_parameters(), 2);
    repr.set_phase_hint(0, 2);
    repr.set_phase_hint(1, 2);
    let mut context = ObservationContext::new();
    for (field, picture) in [(0u64, 200), (1u64, 201)] {
        let id = FieldId::new(field);
        context.set(id, "biphase", "confidence", "high").unwrap();
        context.set(id, "biphase", "picture_number", picture).unwrap();
    }

    let records = run(&repr, 1, &context);
    expect_that!(record_value(&records, "is_pulldown").unwrap().as_bool(), some(eq(true)));
    expect_that!(record_value(&records, "confidence").unwrap().as_str(), some(eq("medium")));
    expect_that!(record_value(&records, "pattern_break").unwrap().as_bool(), some(eq(true)));
}

#[googletest::test]
fn test_clv_field_is_not_pulldown() {
    let repr = SyntheticRepresentation::new(ntsc_parameters(), 1);
    let mut context = ObservationContext::new();
    context.set(FieldId::new(0), "biphase", "confidence", "high").unwrap();

    let records = run(&repr, 0, &context);
    expect_that!(record_value(&records, "is_pulldown").unwrap().as_bool(), some(eq(false)));
    expect_that!(record_value(&records, "confidence").unwrap().as_str(), some(eq("high")));
}

#[googletest::test]
fn test_missing_biphase_results_give_low_confidence() {
    let repr = SyntheticRepresentation::new(ntsc_parameters(), 1);
    let records = run(&repr, 0, &ObservationContext::new());
    expect_that!(record_value(&records, "is_pulldown").unwrap().as_bool(), some(eq(false)));
    expect_that!(record_value(&records, "confidence").unwrap().as_str(), some(eq("low")));
}

#[googletest::test]
fn test_pal_stages_nothing() {
    let repr = SyntheticRepresentation::new(pal_parameters(), 1);
    let records = run(&repr, 0, &ObservationContext::new());
    expect_that!(records, empty());
}
