use googletest::prelude::*;

use super::*;
use crate::obs::ObservationContext;
use crate::testutil::{ntsc_parameters, record_value, SyntheticRepresentation};

/// Paints an EIA-608 caption waveform: a start bit, then two 7-bit bytes each followed by a
/// parity bit, LSB first, clocked at `field_width / 32`.
fn paint_caption_line(
    repr: &mut SyntheticRepresentation,
    field: usize,
    byte0: u8,
    parity0: bool,
    byte1: u8,
    parity1: bool,
) {
    let params = ntsc_parameters();
    let samples_per_bit = f64::from(params.field_width) / 32.0;
    let start = 300.0;

    let mut bits = vec![true]; // start bit
    for (byte, parity) in [(byte0, parity0), (byte1, parity1)] {
        for i in 0..7 {
            bits.push((byte >> i) & 1 == 1);
        }
        bits.push(parity);
    }

    let line = repr.line_mut(field, 20);
    for (i, bit) in bits.iter().enumerate() {
        if !bit {
            continue;
        }
        let cell_start = (start + i as f64 * samples_per_bit) as usize;
        let cell_end = (start + (i + 1) as f64 * samples_per_bit) as usize;
        line[cell_start..cell_end].fill(params.white_16b_ire);
    }
}

fn run(repr: &SyntheticRepresentation, field: u64) -> Vec<ObservationRecord> {
    let context = ObservationContext::new();
    ClosedCaptionObserver.process_field(repr, FieldId::new(field), &context.history())
}

#[googletest::test]
fn test_decodes_caption_bytes_on_the_second_field() {
    let mut repr = SyntheticRepresentation::new(ntsc_parameters(), 2);
    // 0x31 has odd parity already (parity bit 1 keeps the check satisfied either way);
    // 0x33 has even parity, so its parity bit must be 1.
    paint_caption_line(&mut repr, 1, 0x31, true, 0x33, true);

    let records = run(&repr, 1);
    expect_that!(record_value(&records, "present").unwrap().as_bool(), some(eq(true)));
    expect_that!(record_value(&records, "data0").unwrap().as_i32(), some(eq(0x31)));
    expect_that!(record_value(&records, "data1").unwrap().as_i32(), some(eq(0x33)));
    expect_that!(record_value(&records, "parity0_valid").unwrap().as_bool(), some(eq(true)));
    expect_that!(record_value(&records, "parity1_valid").unwrap().as_bool(), some(eq(true)));
}

#[googletest::test]
fn test_even_byte_with_clear_parity_bit_is_flagged() {
    let mut repr = SyntheticRepresentation::new(ntsc_parameters(), 2);
    paint_caption_line(&mut repr, 1, 0x33, false, 0x31, true);

    let records = run(&repr, 1);
    expect_that!(record_value(&records, "present").unwrap().as_bool(), some(eq(true)));
    expect_that!(record_value(&records, "parity0_valid").unwrap().as_bool(), some(eq(false)));
    expect_that!(record_value(&records, "parity1_valid").unwrap().as_bool(), some(eq(true)));
}

#[googletest::test]
fn test_first_ntsc_field_carries_no_captions() {
    let mut repr = SyntheticRepresentation::new(ntsc_parameters(), 2);
    paint_caption_line(&mut repr, 0, 0x31, true, 0x33, true);

    let records = run(&repr, 0);
    expect_that!(record_value(&records, "present").unwrap().as_bool(), some(eq(false)));
    expect_that!(record_value(&records, "data0"), none());
}

#[googletest::test]
fn test_blank_line_reports_absence() {
    let repr = SyntheticRepresentation::new(ntsc_parameters(), 2);
    let records = run(&repr, 1);
    expect_that!(record_value(&records, "present").unwrap().as_bool(), some(eq(false)));
}
