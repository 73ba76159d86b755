//! Vertical-interval timecode (VITC) decoding per SMPTE 12M.
//!
//! A VITC line carries nine 10-bit frames (eight data bytes plus a CRC byte), each framed by
//! `01` sync bits, at a bit rate of `field_width / 115`.  Lines are tried in a priority order
//! that avoids the LaserDisc VBI lines.

use tracing::debug;

use crate::field::FieldId;
use crate::obs::{
    CustomPayload, ObservationHistory, ObservationKey, ObservationRecord, ObservationType,
    VitcTimecode,
};
use crate::repr::FieldRepresentation;
use crate::video::VideoFormat;

use super::vbi;
use super::{Confidence, Observer};


const NAMESPACE: &str = "vitc";

/// Lines to try, best candidates first (0-based).  Chosen to avoid the LaserDisc biphase
/// lines 16..=18.
fn candidate_lines(format: VideoFormat) -> &'static [u32] {
    match format {
        VideoFormat::Pal => &[18, 17, 19, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 20, 21],
        _ => &[13, 14, 12, 15, 11, 16, 10, 17, 18, 19],
    }
}

/// Decodes VITC timecodes.
#[derive(Debug, Default)]
pub struct VitcObserver;

impl Observer for VitcObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![
            ObservationKey::new(NAMESPACE, "timecode", ObservationType::Custom, "Decoded VITC timecode", true),
            ObservationKey::new(NAMESPACE, "line_number", ObservationType::I32, "Line the timecode was found on (0-based)", true),
            ObservationKey::new(NAMESPACE, "confidence", ObservationType::Str, "Decode confidence level", true),
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
        let Some(params) = repr.video_parameters().filter(|p| p.is_valid()) else {
            return Vec::new();
        };

        // VITC slices at 40 IRE.
        let ire_step = f64::from(params.white_16b_ire - params.black_16b_ire) / 100.0;
        let zero_crossing = params.black_16b_ire + (40.0 * ire_step) as u16;

        let samples_per_bit = f64::from(descriptor.width) / 115.0;
        let colorburst_end = descriptor.width as usize / 10;
        let lines = candidate_lines(descriptor.format);

        for (priority, &line_num) in lines.iter().enumerate() {
            if line_num >= descriptor.height {
                continue;
            }
            let Some(line) = repr.line(field_id, line_num) else {
                continue;
            };
            let Some(bytes) =
                decode_line(&line, zero_crossing, colorburst_end, samples_per_bit)
            else {
                continue;
            };

            let timecode = parse_vitc(&bytes);
            let confidence =
                if priority == 0 { Confidence::High } else { Confidence::Medium };
            debug!(
                %field_id,
                line_num,
                hours = timecode.hours,
                minutes = timecode.minutes,
                seconds = timecode.seconds,
                frames = timecode.frames,
                "VITC"
            );
            return vec![
                ObservationRecord::new(
                    NAMESPACE,
                    "timecode",
                    CustomPayload::VitcTimecode(timecode),
                ),
                ObservationRecord::new(NAMESPACE, "line_number", line_num as i32),
                ObservationRecord::new(NAMESPACE, "confidence", confidence.to_string()),
            ];
        }
        Vec::new()
    }
}

/// Decodes the nine 10-bit VITC frames of one line.  Returns the eight data bytes when the
/// sync bits and the XOR CRC check out.
fn decode_line(
    line: &[u16],
    zero_crossing: u16,
    colorburst_end: usize,
    samples_per_bit: f64,
) -> Option<[u8; 8]> {
    let map = vbi::transition_map(line, zero_crossing);

    let mut byte_start = colorburst_end as f64;
    let mut byte_start_limit = line.len() as f64 - 90.0 * samples_per_bit;

    if !vbi::find_transition(&map, false, &mut byte_start, byte_start_limit) {
        return None;
    }
    if !vbi::find_transition(&map, true, &mut byte_start, byte_start_limit) {
        return None;
    }

    let mut vitc_bytes = [0i32; 9];
    let mut crc_bytes = [0i32; 12];
    let mut bit_count = 0usize;

    for byte in vitc_bytes.iter_mut() {
        // Resynchronize on the 1 -> 0 transition between frames.
        byte_start += samples_per_bit * 0.5;
        byte_start_limit += 10.0 * samples_per_bit;
        if !vbi::find_transition(&map, false, &mut byte_start, byte_start_limit) {
            return None;
        }
        byte_start -= samples_per_bit;

        // Ten bits per frame, LSB first.
        for i in 0..10 {
            let sample_pos = (byte_start + (i as f64 + 0.5) * samples_per_bit) as usize;
            if sample_pos >= map.len() {
                return None;
            }
            let bit = i32::from(map[sample_pos]);
            *byte |= bit << i;
            crc_bytes[bit_count / 8] |= bit << (bit_count % 8);
            bit_count += 1;
        }

        // The two sync bits must read 01.
        if (*byte & 3) != 1 {
            return None;
        }
        *byte >>= 2;

        byte_start += 10.0 * samples_per_bit;
    }

    // The CRC byte XORs the whole line to zero.
    if crc_bytes.iter().fold(0, |acc, &v| acc ^ v) != 0 {
        return None;
    }

    let mut data = [0u8; 8];
    for (out, value) in data.iter_mut().zip(vitc_bytes.iter()) {
        *out = *value as u8;
    }
    Some(data)
}

/// Interprets the eight VITC data bytes as SMPTE 12M BCD fields.
fn parse_vitc(bytes: &[u8; 8]) -> VitcTimecode {
    let mut user_bits = [0u8; 8];
    for (out, byte) in user_bits.iter_mut().zip(bytes.iter()) {
        *out = (byte & 0xF0) >> 4;
    }
    VitcTimecode {
        frames: (bytes[0] & 0x0F) + ((bytes[1] & 0x03) * 10),
        seconds: (bytes[2] & 0x0F) + ((bytes[3] & 0x07) * 10),
        minutes: (bytes[4] & 0x0F) + ((bytes[5] & 0x07) * 10),
        hours: (bytes[6] & 0x0F) + ((bytes[7] & 0x03) * 10),
        drop_frame: (bytes[1] & 0x04) != 0,
        color_frame: (bytes[1] & 0x08) != 0,
        user_bits,
    }
}
