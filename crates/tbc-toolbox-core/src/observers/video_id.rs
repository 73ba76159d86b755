//! IEC 61880 video ID decoding (NTSC line 20).
//!
//! The video ID is a 20-bit codeword (14 data bits plus a CRC-6) clocked at one eighth of the
//! colour subcarrier, carrying aspect-ratio and source flags.

use tracing::debug;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;
use crate::video::VideoFormat;

use super::vbi;
use super::Observer;


const NAMESPACE: &str = "video_id";

/// Decodes the NTSC line-20 video ID.
#[derive(Debug, Default)]
pub struct VideoIdObserver;

impl Observer for VideoIdObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![
            ObservationKey::new(NAMESPACE, "data", ObservationType::I32, "14-bit video ID message", true),
            ObservationKey::new(NAMESPACE, "word0", ObservationType::I32, "Aspect-ratio word", true),
            ObservationKey::new(NAMESPACE, "word1", ObservationType::I32, "Source-condition word", true),
            ObservationKey::new(NAMESPACE, "word2", ObservationType::I32, "Reserved word", true),
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

        // Line 20, 0-based.
        let Some(line) = repr.line(field_id, 19) else {
            return Vec::new();
        };
        let Some(params) = repr.video_parameters().filter(|p| p.is_valid()) else {
            return Vec::new();
        };

        // Slices at 35 IRE.
        let ire_step = f64::from(params.white_16b_ire - params.black_16b_ire) / 100.0;
        let zero_crossing = params.black_16b_ire + (35.0 * ire_step) as u16;

        // Bit clock is fsc / 8, which is field_width * 16 / 455 samples per bit.
        let samples_per_bit = f64::from(descriptor.width) * 16.0 / 455.0;
        let colorburst_end = descriptor.width as usize / 10;

        let Some((message, words)) =
            decode_line(&line, zero_crossing, colorburst_end, samples_per_bit)
        else {
            return Vec::new();
        };

        debug!(%field_id, data = format_args!("{message:#06x}"), "video ID");
        vec![
            ObservationRecord::new(NAMESPACE, "data", message as i32),
            ObservationRecord::new(NAMESPACE, "word0", words[0] as i32),
            ObservationRecord::new(NAMESPACE, "word1", words[1] as i32),
            ObservationRecord::new(NAMESPACE, "word2", words[2] as i32),
        ]
    }
}

fn decode_line(
    line: &[u16],
    zero_crossing: u16,
    colorburst_end: usize,
    samples_per_bit: f64,
) -> Option<(u32, [u32; 3])> {
    let map = vbi::transition_map(line, zero_crossing);

    let mut x = colorburst_end as f64;
    let x_limit = line.len() as f64 - 22.0 * samples_per_bit;

    // Start bits are 10.
    if !vbi::find_transition(&map, true, &mut x, x_limit) {
        return None;
    }
    x += samples_per_bit * 1.5;
    if map.get(x as usize).copied()? {
        return None;
    }

    // The 20-bit codeword, MSB first.
    let mut codeword: u32 = 0;
    x += samples_per_bit;
    for _ in 0..20 {
        codeword = (codeword << 1) + u32::from(map.get(x as usize).copied()?);
        x += samples_per_bit;
    }

    let word0 = (codeword & 0xC0000) >> 18;
    let word1 = (codeword & 0x3C000) >> 14;
    let word2 = (codeword & 0x03F80) >> 7;
    let crcc = codeword & 0x3F;
    let message = codeword >> 6;

    // CRC-6 over the 14 message bits: x^6 + x + 1, initialized to all ones.
    let mut crc: u32 = 0x3F;
    for i in 0..14 {
        let invert = ((message >> i) & 1) ^ ((crc >> 5) & 1);
        crc ^= invert;
        crc = ((crc << 1) | invert) & 0x3F;
    }
    if crc != crcc {
        return None;
    }

    Some((message, [word0, word1, word2]))
}
