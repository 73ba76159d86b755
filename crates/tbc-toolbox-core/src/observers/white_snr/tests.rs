use googletest::prelude::*;

use super::*;
use crate::obs::ObservationContext;
use crate::testutil::{ntsc_parameters, pal_parameters, record_value, SyntheticRepresentation};
use crate::video::VideoParameters;

fn ire_to_code(params: &VideoParameters, ire: f64) -> u16 {
    (f64::from(params.black_16b_ire) + ire / params.ire_per_code()) as u16
}

fn run(repr: &SyntheticRepresentation) -> Vec<ObservationRecord> {
    let context = ObservationContext::new();
    WhiteSnrObserver.process_field(repr, FieldId::new(0), &context.history())
}

#[googletest::test]
fn test_clean_white_reference_caps_at_80_db() {
    let params = ntsc_parameters();
    let mut repr = SyntheticRepresentation::new(params, 1);
    // NTSC white slice: line 20 (0-based 19).
    repr.fill_line(0, 19, ire_to_code(&params, 100.0));

    let records = run(&repr);
    let snr = record_value(&records, "snr_db").unwrap().as_f64().unwrap();
    expect_that!(snr, eq(80.0));
}

#[googletest::test]
fn test_noisy_white_reference_measures_snr() {
    let params = pal_parameters();
    let mut repr = SyntheticRepresentation::new(params, 1);
    // PAL white slice: line 19 (0-based 18).  Alternate +/-2 IRE around white: the mean stays
    // at 100 IRE and the standard deviation at 2, so SNR = 20*log10(100/2) ~ 34 dB.
    let high = ire_to_code(&params, 102.0);
    let low = ire_to_code(&params, 98.0);
    for (i, sample) in repr.line_mut(0, 18).iter_mut().enumerate() {
        *sample = if i % 2 == 0 { high } else { low };
    }

    let records = run(&repr);
    let snr = record_value(&records, "snr_db").unwrap().as_f64().unwrap();
    expect_that!(snr, near(33.98, 0.5));
}

#[googletest::test]
fn test_slice_outside_white_window_is_rejected() {
    let params = ntsc_parameters();
    let mut repr = SyntheticRepresentation::new(params, 1);
    // 50 IRE is not a white reference; no candidate slice qualifies.
    repr.fill_line(0, 19, ire_to_code(&params, 50.0));
    repr.fill_line(0, 12, ire_to_code(&params, 50.0));

    let records = run(&repr);
    expect_that!(records, empty());
}

#[googletest::test]
fn test_fallback_to_secondary_slice() {
    let params = ntsc_parameters();
    let mut repr = SyntheticRepresentation::new(params, 1);
    // Line 20 dark, but the line-13 slice carries the white flag.
    repr.fill_line(0, 12, ire_to_code(&params, 100.0));

    let records = run(&repr);
    expect_that!(record_value(&records, "snr_db").unwrap().as_f64(), some(eq(80.0)));
}
