//! EIA-608 closed caption decoding.
//!
//! Caption data rides on NTSC line 21 of the second field (PAL uses line 22) as two 7-bit
//! bytes with odd parity, clocked at 32 times the line rate.

use tracing::debug;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;
use crate::video::VideoFormat;

use super::vbi;
use super::Observer;

#[cfg(test)]
mod tests;

const NAMESPACE: &str = "closed_caption";

#[derive(Debug, Clone, Copy)]
struct DecodedCaption {
    data0: u8,
    data1: u8,
    parity_valid0: bool,
    parity_valid1: bool,
}

/// Decodes EIA-608 caption bytes.
#[derive(Debug, Default)]
pub struct ClosedCaptionObserver;

impl Observer for ClosedCaptionObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![
            ObservationKey::new(NAMESPACE, "present", ObservationType::Bool, "Caption data decoded", false),
            ObservationKey::new(NAMESPACE, "data0", ObservationType::I32, "First EIA-608 byte", true),
            ObservationKey::new(NAMESPACE, "data1", ObservationType::I32, "Second EIA-608 byte", true),
            ObservationKey::new(NAMESPACE, "parity0_valid", ObservationType::Bool, "Odd parity held for the first byte", true),
            ObservationKey::new(NAMESPACE, "parity1_valid", ObservationType::Bool, "Odd parity held for the second byte", true),
        ]
    }

    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        _history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord> {
        let absent = vec![ObservationRecord::new(NAMESPACE, "present", false)];

        let Some(descriptor) = repr.descriptor(field_id) else {
            return absent;
        };

        // Captions live on the second field for NTSC.
        if descriptor.format == VideoFormat::Ntsc && field_id.value() % 2 == 0 {
            return absent;
        }

        let line_num = match descriptor.format {
            VideoFormat::Ntsc => 20,
            _ => 21,
        };
        let Some(line) = repr.line(field_id, line_num) else {
            return absent;
        };
        let Some(params) = repr.video_parameters().filter(|p| p.is_valid()) else {
            return absent;
        };

        // Caption data slices at 25 IRE, not the usual 50.
        let zero_crossing =
            ((params.white_16b_ire - params.black_16b_ire) / 4) + params.black_16b_ire;
        let samples_per_bit = f64::from(descriptor.width) / 32.0;

        let Some(decoded) = decode_line(
            &line,
            zero_crossing,
            params.colour_burst_end as usize,
            samples_per_bit,
        ) else {
            return absent;
        };

        debug!(
            %field_id,
            data0 = format_args!("{:#04x}", decoded.data0),
            data1 = format_args!("{:#04x}", decoded.data1),
            "closed caption"
        );
        vec![
            ObservationRecord::new(NAMESPACE, "present", true),
            ObservationRecord::new(NAMESPACE, "data0", i32::from(decoded.data0)),
            ObservationRecord::new(NAMESPACE, "data1", i32::from(decoded.data1)),
            ObservationRecord::new(NAMESPACE, "parity0_valid", decoded.parity_valid0),
            ObservationRecord::new(NAMESPACE, "parity1_valid", decoded.parity_valid1),
        ]
    }
}

fn read_byte(map: &[bool], x: &mut f64, samples_per_bit: f64) -> Option<(u8, bool)> {
    let mut byte: u8 = 0;
    for _ in 0..7 {
        let index = *x as usize;
        if index >= map.len() {
            return None;
        }
        byte >>= 1;
        if map[index] {
            byte += 64;
        }
        *x += samples_per_bit;
    }
    let index = *x as usize;
    if index >= map.len() {
        return None;
    }
    let parity_bit = map[index];
    *x += samples_per_bit;

    // Odd parity: the parity bit must make the total count of ones odd.
    let parity_valid = !(vbi::is_even_parity(u32::from(byte)) && !parity_bit);
    Some((byte, parity_valid))
}

fn decode_line(
    line: &[u16],
    zero_crossing: u16,
    colorburst_end: usize,
    samples_per_bit: f64,
) -> Option<DecodedCaption> {
    if line.is_empty() || samples_per_bit <= 0.0 {
        return None;
    }
    let map = vbi::transition_map(line, zero_crossing);

    // Find the 00 start bits: a low period at least one and a half bits long.
    let mut x = colorburst_end as f64 + 2.0 * samples_per_bit;
    let x_limit = line.len() as f64 - 17.0 * samples_per_bit;
    let mut last_one = x;
    while (x - last_one) < (1.5 * samples_per_bit) {
        if x >= x_limit || x < 0.0 || x as usize >= map.len() {
            return None;
        }
        if map[x as usize] {
            last_one = x;
        }
        x += 1.0;
    }

    // The 1 start bit, then the first data bit half a cell later.
    if !vbi::find_transition(&map, true, &mut x, x_limit) {
        return None;
    }
    x += 1.5 * samples_per_bit;

    let (data0, parity_valid0) = read_byte(&map, &mut x, samples_per_bit)?;
    let (data1, parity_valid1) = read_byte(&map, &mut x, samples_per_bit)?;

    Some(DecodedCaption { data0, data1, parity_valid0, parity_valid1 })
}
