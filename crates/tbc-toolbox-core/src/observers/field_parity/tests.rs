use googletest::prelude::*;

use super::*;
use crate::obs::ObservationContext;
use crate::testutil::{ntsc_parameters, pal_parameters, record_value, SyntheticRepresentation};

fn run_with_history(
    repr: &SyntheticRepresentation,
    field: u64,
    context: &ObservationContext,
) -> (bool, i32) {
    let records =
        FieldParityObserver.process_field(repr, FieldId::new(field), &context.history());
    let is_first = record_value(&records, "is_first_field").unwrap().as_bool().unwrap();
    let confidence = record_value(&records, "confidence_pct").unwrap().as_i32().unwrap();
    (is_first, confidence)
}

fn run(repr: &SyntheticRepresentation, field: u64) -> (bool, i32) {
    run_with_history(repr, field, &ObservationContext::new())
}

/// Paints a vblank pulse train: `lead_lines` of horizontal sync, a 14-pulse equalizing/vsync
/// run at half-line spacing whose leading gap is `gap1_lines`, then horizontal sync again.
fn paint_vblank(repr: &mut SyntheticRepresentation, field: usize, pal: bool, gap1_lines: f64) {
    let (width, spu) = if pal { (1135usize, 17.734) } else { (910usize, 14.318) };
    let hsync = (4.7 * spu) as usize;
    let eq = (2.3 * spu) as usize;
    let vsync = (27.2 * spu) as usize;
    let half_line = width / 2;

    repr.lift_to_grey(field);
    for line in 0..12 {
        repr.paint_pulse(field, line * width, hsync);
    }
    // The blank run starts gap1 lines after the last hsync pulse.
    let blank_start = 11 * width + (gap1_lines * width as f64) as usize;
    for k in 0..14 {
        let pulse_width = if (6..9).contains(&k) { vsync } else { eq };
        repr.paint_pulse(field, blank_start + k * half_line, pulse_width);
    }
    // Hsync resumes; together the bracketing gaps must sum to ~1.5 lines (NTSC) or match
    // (PAL), so the trailing gap is the complement of the leading one.
    let gap2_lines = if pal { gap1_lines } else { 1.5 - gap1_lines };
    let resume = blank_start + 13 * half_line + (gap2_lines * width as f64) as usize;
    for line in 0..3 {
        repr.paint_pulse(field, resume + line * width, hsync);
    }
}

#[googletest::test]
fn test_ntsc_first_field_from_pulses() {
    let mut repr = SyntheticRepresentation::new(ntsc_parameters(), 1);
    paint_vblank(&mut repr, 0, false, 1.0);
    let (is_first, confidence) = run(&repr, 0);
    expect_that!(is_first, eq(true));
    expect_that!(confidence, eq(50));
}

#[googletest::test]
fn test_ntsc_second_field_from_pulses() {
    let mut repr = SyntheticRepresentation::new(ntsc_parameters(), 1);
    paint_vblank(&mut repr, 0, false, 0.5);
    let (is_first, confidence) = run(&repr, 0);
    expect_that!(is_first, eq(false));
    expect_that!(confidence, eq(50));
}

#[googletest::test]
fn test_pal_first_field_from_pulses() {
    let mut repr = SyntheticRepresentation::new(pal_parameters(), 1);
    paint_vblank(&mut repr, 0, true, 0.5);
    let (is_first, confidence) = run(&repr, 0);
    expect_that!(is_first, eq(true));
    expect_that!(confidence, eq(50));
}

#[googletest::test]
fn test_pal_second_field_from_pulses() {
    let mut repr = SyntheticRepresentation::new(pal_parameters(), 1);
    paint_vblank(&mut repr, 0, true, 1.0);
    let (is_first, confidence) = run(&repr, 0);
    expect_that!(is_first, eq(false));
    expect_that!(confidence, eq(50));
}

#[googletest::test]
fn test_too_few_pulses_falls_back_to_field_id() {
    // All-black fields slice as one endless pulse: nothing classifiable.
    let repr = SyntheticRepresentation::new(ntsc_parameters(), 2);
    expect_that!(run(&repr, 0), eq((true, 25)));
    expect_that!(run(&repr, 1), eq((false, 25)));
}

#[googletest::test]
fn test_inconclusive_analysis_flips_previous_field_parity() {
    let mut repr = SyntheticRepresentation::new(ntsc_parameters(), 2);
    // Plenty of hsync pulses but no vertical sync at all.
    repr.lift_to_grey(1);
    let hsync = (4.7 * 14.318) as usize;
    for line in 0..20 {
        repr.paint_pulse(1, line * 910, hsync);
    }

    let mut context = ObservationContext::new();
    context.set(FieldId::new(0), NAMESPACE, "is_first_field", true).unwrap();
    context.set(FieldId::new(0), NAMESPACE, "confidence_pct", 50).unwrap();

    let (is_first, confidence) = run_with_history(&repr, 1, &context);
    expect_that!(is_first, eq(false));
    expect_that!(confidence, eq(60));
}

#[googletest::test]
fn test_inconclusive_analysis_without_history_uses_field_id() {
    let mut repr = SyntheticRepresentation::new(ntsc_parameters(), 1);
    repr.lift_to_grey(0);
    let hsync = (4.7 * 14.318) as usize;
    for line in 0..20 {
        repr.paint_pulse(0, line * 910, hsync);
    }
    let (is_first, confidence) = run(&repr, 0);
    expect_that!(is_first, eq(true));
    expect_that!(confidence, eq(50));
}

#[googletest::test]
fn test_pulse_classification() {
    let mut repr = SyntheticRepresentation::new(ntsc_parameters(), 1);
    repr.lift_to_grey(0);
    let spu = 14.318;
    repr.paint_pulse(0, 100, (4.7 * spu) as usize);
    repr.paint_pulse(0, 400, (2.3 * spu) as usize);
    repr.paint_pulse(0, 800, (27.2 * spu) as usize);
    repr.paint_pulse(0, 1500, (10.0 * spu) as usize); // unclassifiable

    let field = repr.field(FieldId::new(0)).unwrap();
    let pulses = find_sync_pulses(&field, &ntsc_parameters());
    expect_that!(
        pulses.iter().map(|p| p.pulse_type).collect::<Vec<_>>(),
        elements_are![eq(&PulseType::Hsync), eq(&PulseType::Equalizing), eq(&PulseType::Vsync)]
    );
}
