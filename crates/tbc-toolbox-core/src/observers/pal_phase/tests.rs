use googletest::prelude::*;

use super::*;
use crate::obs::ObservationContext;
use crate::testutil::{ntsc_parameters, pal_parameters, record_value, SyntheticRepresentation};

const AMPLITUDE: f64 = 7_000.0;

/// Paints the reference burst on every active line the median scan covers.
fn paint_reference_bursts(repr: &mut SyntheticRepresentation) {
    for line in 11..288 {
        repr.paint_burst_sine(0, line, AMPLITUDE);
    }
}

fn parity_context(is_first_field: bool) -> ObservationContext {
    let mut context = ObservationContext::new();
    context.set(FieldId::new(0), "field_parity", "is_first_field", is_first_field).unwrap();
    context.set(FieldId::new(0), "field_parity", "confidence_pct", 100).unwrap();
    context
}

fn run(repr: &SyntheticRepresentation, context: &ObservationContext) -> Vec<ObservationRecord> {
    PalPhaseObserver.process_field(repr, FieldId::new(0), &context.history())
}

fn phase_of(records: &[ObservationRecord]) -> Option<i32> {
    record_value(records, "phase_id")?.as_i32()
}

#[googletest::test]
fn test_phase_1_first_field_no_line6_burst_rising() {
    let mut repr = SyntheticRepresentation::new(pal_parameters(), 1);
    paint_reference_bursts(&mut repr);
    // First field: line offset 2.  Line 6+2 stays blank (no burst), decision lines rising.
    repr.fill_line(0, 8, pal_parameters().black_16b_ire);
    for line in [9, 13, 17, 21] {
        repr.paint_burst_square(0, line, AMPLITUDE, true);
    }

    let records = run(&repr, &parity_context(true));
    expect_that!(phase_of(&records), some(eq(1)));
    expect_that!(record_value(&records, "confidence").unwrap().as_str(), some(eq("high")));
}

#[googletest::test]
fn test_phase_7_first_field_line6_burst_falling() {
    let mut repr = SyntheticRepresentation::new(pal_parameters(), 1);
    paint_reference_bursts(&mut repr);
    // Burst present on line 6+2: four-field phase 3; falling majority puts it in the second
    // four, so phase 7.
    repr.paint_burst_sine(0, 8, AMPLITUDE);
    for line in [9, 13, 17, 21] {
        repr.paint_burst_square(0, line, AMPLITUDE, false);
    }

    let records = run(&repr, &parity_context(true));
    expect_that!(phase_of(&records), some(eq(7)));
}

#[googletest::test]
fn test_phase_6_second_field_inverts_the_rising_majority() {
    let mut repr = SyntheticRepresentation::new(pal_parameters(), 1);
    paint_reference_bursts(&mut repr);
    // Second field: line offset 3.  Burst on line 6+3: four-field phase 2, whose
    // first-vs-second-four determination is inverted, so a rising majority lands on phase 6.
    repr.paint_burst_sine(0, 9, AMPLITUDE);
    for line in [10, 14, 18, 22] {
        repr.paint_burst_square(0, line, AMPLITUDE, true);
    }

    let records = run(&repr, &parity_context(false));
    expect_that!(phase_of(&records), some(eq(6)));
}

#[googletest::test]
fn test_tie_reports_four_field_phase_with_low_confidence() {
    let mut repr = SyntheticRepresentation::new(pal_parameters(), 1);
    paint_reference_bursts(&mut repr);
    let black = pal_parameters().black_16b_ire;
    // No usable decision lines: the four-field half is still reported.
    for line in [9, 13, 17, 21] {
        repr.fill_line(0, line, black);
    }
    repr.fill_line(0, 8, black);

    let records = run(&repr, &parity_context(true));
    expect_that!(phase_of(&records), some(eq(1)));
    expect_that!(record_value(&records, "confidence").unwrap().as_str(), some(eq("low")));
}

#[googletest::test]
fn test_ambiguous_line6_burst_stages_nothing() {
    let mut repr = SyntheticRepresentation::new(pal_parameters(), 1);
    paint_reference_bursts(&mut repr);
    // Half the reference level: neither clearly present nor clearly absent.
    repr.paint_burst_sine(0, 8, AMPLITUDE * 0.5);

    let records = run(&repr, &parity_context(true));
    expect_that!(records, empty());
}

#[googletest::test]
fn test_non_pal_stages_nothing() {
    let repr = SyntheticRepresentation::new(ntsc_parameters(), 1);
    let records = run(&repr, &parity_context(true));
    expect_that!(records, empty());
}

#[googletest::test]
fn test_unreliable_parity_stages_nothing() {
    let mut repr = SyntheticRepresentation::new(pal_parameters(), 1);
    paint_reference_bursts(&mut repr);

    let mut context = ObservationContext::new();
    context.set(FieldId::new(0), "field_parity", "is_first_field", true).unwrap();
    context.set(FieldId::new(0), "field_parity", "confidence_pct", 0).unwrap();

    let records = run(&repr, &context);
    expect_that!(records, empty());
}
