//! NTSC FM code decoding (line 10).
//!
//! Some NTSC discs carry a 40-bit FM-modulated code on line 10 with a 0.75 us bit period: a
//! clock sync, a field indicator, framing syncs around a 20-bit data value, and an overall odd
//! parity bit.

use arbitrary_int::{u20, u4, u7};
use bitbybit::bitfield;
use tracing::debug;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;
use crate::video::VideoFormat;

use super::vbi;
use super::Observer;


const NAMESPACE: &str = "fm_code";

/// Layout of the 40-bit FM code word.
#[bitfield(u64)]
struct RawFmCode {
    #[bits(0..=6, r)]
    trailing_sync: u7,
    #[bit(7, r)]
    parity: bool,
    #[bits(8..=27, r)]
    data: u20,
    #[bits(28..=34, r)]
    leading_sync: u7,
    #[bit(35, r)]
    field_indicator: bool,
    #[bits(36..=39, r)]
    clock_sync: u4,
}

/// Decodes the NTSC line-10 FM code.
#[derive(Debug, Default)]
pub struct FmCodeObserver;

impl Observer for FmCodeObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![
            ObservationKey::new(NAMESPACE, "present", ObservationType::Bool, "FM code decoded", true),
            ObservationKey::new(NAMESPACE, "data_value", ObservationType::I32, "20-bit FM code data", true),
            ObservationKey::new(NAMESPACE, "field_flag", ObservationType::Bool, "Field indicator bit", true),
        ]
    }

    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        _history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord> {
        let Some(descriptor) = repr.descriptor(field_id) else {
            return Vec::new();
        };
        if descriptor.format != VideoFormat::Ntsc {
            return Vec::new();
        }

        // Line 10, 0-based.
        let Some(line) = repr.line(field_id, 9) else {
            return Vec::new();
        };
        let Some(params) = repr.video_parameters().filter(|p| p.is_valid()) else {
            return Vec::new();
        };

        // 0.75 us per bit at the source sample rate.
        let jump_samples = params.samples_per_us() * 0.75;
        let Some(decoded) = decode_line(
            &line,
            params.vbi_slice_level(),
            params.active_video_start as usize,
            jump_samples,
        ) else {
            return Vec::new();
        };

        debug!(
            %field_id,
            data = format_args!("{:#07x}", decoded.data().value()),
            field_flag = decoded.field_indicator(),
            "FM code"
        );
        vec![
            ObservationRecord::new(NAMESPACE, "present", true),
            ObservationRecord::new(NAMESPACE, "data_value", decoded.data().value() as i32),
            ObservationRecord::new(NAMESPACE, "field_flag", decoded.field_indicator()),
        ]
    }
}

/// Decodes 40 FM bits from a line: a transition in the middle of a bit cell is a 1, a cell
/// boundary transition alone is a 0.  Validates the framing syncs and the overall parity.
fn decode_line(
    line: &[u16],
    zero_crossing: u16,
    active_start: usize,
    jump_samples: f64,
) -> Option<RawFmCode> {
    let map = vbi::transition_map(line, zero_crossing);

    let mut x = active_start;
    while x < map.len() && !map[x] {
        x += 1;
    }
    if x >= map.len() {
        return None;
    }

    let mut decoded_bits: u64 = 0;
    let mut decode_count = 0;
    let mut last_transition_x = x;
    let mut last_state = map[x];

    while x < map.len() && decode_count < 40 {
        while x < map.len() && map[x] == last_state {
            x += 1;
        }
        if x >= map.len() {
            break;
        }
        last_state = map[x];

        if x - last_transition_x < jump_samples as usize {
            // Mid-cell transition: 1.  Swallow the cell-boundary transition that follows.
            decoded_bits = (decoded_bits << 1) | 1;
            last_transition_x = x;
            decode_count += 1;

            while x < map.len() && map[x] == last_state {
                x += 1;
            }
            if x >= map.len() {
                break;
            }
            last_state = map[x];
            last_transition_x = x;
        } else {
            decoded_bits <<= 1;
            last_transition_x = x;
            decode_count += 1;
        }
        x += 1;
    }

    if decode_count != 40 {
        return None;
    }

    let word = RawFmCode::new_with_raw_value(decoded_bits);
    if word.clock_sync().value() != 3
        || word.leading_sync().value() != 114
        || word.trailing_sync().value() != 13
    {
        return None;
    }

    // Overall odd parity across the data value.
    let data_even = vbi::is_even_parity(word.data().value());
    let parity_set = word.parity();
    if (parity_set && !data_even) || (!parity_set && data_even) {
        return None;
    }

    Some(word)
}
