//! Biphase (Manchester) VBI decoder and IEC 60857 interpretation.
//!
//! LaserDisc VBI data rides on lines 16, 17 and 18 (0-based 15..=17) as a 24-bit
//! Manchester-coded word per line with a 2 us cell.  The decoded words are interpreted per
//! IEC 60857-1986 section 10.1: CAV picture numbers, chapter numbers, CLV timecode halves,
//! lead-in/lead-out/stop codes, programme status and user codes.

use arbitrary_int::u4;
use bitbybit::bitfield;
use tracing::debug;

use crate::field::FieldId;
use crate::obs::{
    Amendment2Status, CustomPayload, ObservationHistory, ObservationKey, ObservationRecord,
    ObservationType, ProgrammeStatus, VbiSoundMode,
};
use crate::repr::FieldRepresentation;

use super::vbi;
use super::{Confidence, Observer};


const NAMESPACE: &str = "biphase";

/// Lead-in code (IEC 60857 10.1.1).
pub const LEAD_IN_CODE: i32 = 0x88FFFF;
/// Lead-out code (IEC 60857 10.1.2).
pub const LEAD_OUT_CODE: i32 = 0x80EEEE;
/// Picture stop code (IEC 60857 10.1.4).
pub const STOP_CODE: i32 = 0x82CFFF;
/// CLV indicator code (IEC 60857 10.1.7).
pub const CLV_CODE: i32 = 0x87FFFF;

/// Nibble layout of a line-16 status word (x1 x3 x4 x5 per IEC 60857 10.1.8/10.1.9).
#[bitfield(u32)]
struct RawStatusWord {
    #[bits(0..=3, r)]
    x5: u4,
    #[bits(4..=7, r)]
    x4: u4,
    #[bits(8..=11, r)]
    x3: u4,
    #[bits(16..=19, r)]
    x1: u4,
}

/// Decodes the three VBI lines of each field and interprets them per IEC 60857.
#[derive(Debug, Default)]
pub struct BiphaseObserver;

impl Observer for BiphaseObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![
            ObservationKey::new(NAMESPACE, "vbi16", ObservationType::I32, "Raw line-16 word (0 blank, -1 error)", false),
            ObservationKey::new(NAMESPACE, "vbi17", ObservationType::I32, "Raw line-17 word (0 blank, -1 error)", false),
            ObservationKey::new(NAMESPACE, "vbi18", ObservationType::I32, "Raw line-18 word (0 blank, -1 error)", false),
            ObservationKey::new(NAMESPACE, "picture_number", ObservationType::I32, "CAV picture number, 1..=79999", true),
            ObservationKey::new(NAMESPACE, "cav_picture_zero", ObservationType::Bool, "CAV pattern decoded to the illegal picture 0", true),
            ObservationKey::new(NAMESPACE, "chapter_number", ObservationType::I32, "Chapter number", true),
            ObservationKey::new(NAMESPACE, "clv_hours", ObservationType::I32, "CLV timecode hours", true),
            ObservationKey::new(NAMESPACE, "clv_minutes", ObservationType::I32, "CLV timecode minutes", true),
            ObservationKey::new(NAMESPACE, "clv_seconds", ObservationType::I32, "CLV timecode seconds", true),
            ObservationKey::new(NAMESPACE, "clv_picture", ObservationType::I32, "CLV picture within the second", true),
            ObservationKey::new(NAMESPACE, "lead_in", ObservationType::Bool, "Lead-in code present", true),
            ObservationKey::new(NAMESPACE, "lead_out", ObservationType::Bool, "Lead-out code present", true),
            ObservationKey::new(NAMESPACE, "stop_code", ObservationType::Bool, "Picture stop code present", true),
            ObservationKey::new(NAMESPACE, "clv_indicator", ObservationType::Bool, "CLV indicator code present", true),
            ObservationKey::new(NAMESPACE, "programme_status", ObservationType::Custom, "Decoded programme status", true),
            ObservationKey::new(NAMESPACE, "amendment2_status", ObservationType::Custom, "Programme status, Amendment 2 reading", true),
            ObservationKey::new(NAMESPACE, "user_code", ObservationType::Str, "User code", true),
            ObservationKey::new(NAMESPACE, "confidence", ObservationType::Str, "Decode confidence", false),
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

        let zero_crossing = params.vbi_slice_level();
        let mut words = [0i32; 3];
        let mut lines_decoded = 0;

        for (offset, word) in words.iter_mut().enumerate() {
            let line_num = 15 + offset as u32;
            if line_num >= descriptor.height {
                continue;
            }
            let Some(line) = repr.line(field_id, line_num) else {
                *word = -1;
                continue;
            };
            *word = decode_manchester(
                &line,
                zero_crossing,
                params.active_video_start as usize,
                params.sample_rate,
            );
            if *word != 0 && *word != -1 {
                lines_decoded += 1;
            }
        }

        let confidence = match lines_decoded {
            3 => Confidence::High,
            1 | 2 => Confidence::Medium,
            _ => Confidence::None,
        };

        let mut records = vec![
            ObservationRecord::new(NAMESPACE, "vbi16", words[0]),
            ObservationRecord::new(NAMESPACE, "vbi17", words[1]),
            ObservationRecord::new(NAMESPACE, "vbi18", words[2]),
            ObservationRecord::new(NAMESPACE, "confidence", confidence.to_string()),
        ];
        if lines_decoded > 0 {
            interpret_vbi(&words, &mut records);
        }

        debug!(
            %field_id,
            vbi16 = format_args!("{:#08x}", words[0]),
            vbi17 = format_args!("{:#08x}", words[1]),
            vbi18 = format_args!("{:#08x}", words[2]),
            "biphase decode"
        );
        records
    }
}

/// Decodes one line of Manchester-coded VBI data into a 24-bit word.
///
/// A transition map is built at the slicing level, the first transition after the active-video
/// start is taken as the leading 1, and subsequent bits are read by stepping 1.5 us and
/// classifying the next transition's direction.  Exactly 24 bits must decode; returns 0 for a
/// blank line (no transitions) and -1 for a partial decode.
pub(crate) fn decode_manchester(
    line: &[u16],
    zero_crossing: u16,
    active_start: usize,
    sample_rate: f64,
) -> i32 {
    let map = vbi::transition_map(line, zero_crossing);
    let jump_samples = (sample_rate / 1.0e6) * 1.5;

    let mut x = active_start;
    while x < map.len() && !map[x] {
        x += 1;
    }
    if x >= map.len() {
        return 0;
    }

    // The first transition is always 01 in Manchester code.
    let mut result: i32 = 1;
    let mut decode_count = 1;

    while x < map.len() && decode_count < 24 {
        x += jump_samples as usize;
        if x >= map.len() {
            break;
        }
        let start_state = map[x];
        while x < map.len() && map[x] == start_state {
            x += 1;
        }
        if x >= map.len() {
            break;
        }
        result = if !map[x - 1] && map[x] { (result << 1) | 1 } else { result << 1 };
        decode_count += 1;
    }

    if decode_count != 24 {
        return -1;
    }
    result
}

/// Even parity over the x4/x5 nibbles of a programme-status word (IEC 60857-1986).
fn status_parity_valid(x4: u4, x5: u4) -> bool {
    let combined = (u32::from(x4.value()) << 4) | u32::from(x5.value());
    vbi::is_even_parity(combined)
}

fn sound_mode(audio_status: u32) -> (VbiSoundMode, bool, bool) {
    // Returns (mode, is_fm_multiplex, is_programme_dump).
    match audio_status {
        0 => (VbiSoundMode::Stereo, false, false),
        1 => (VbiSoundMode::Mono, false, false),
        2 => (VbiSoundMode::AudioSubcarriersOff, false, false),
        3 => (VbiSoundMode::Bilingual, false, false),
        4 => (VbiSoundMode::StereoStereo, true, false),
        5 => (VbiSoundMode::StereoBilingual, true, false),
        6 => (VbiSoundMode::CrossChannelStereo, true, false),
        7 => (VbiSoundMode::BilingualBilingual, true, false),
        8 | 9 | 11 => (VbiSoundMode::MonoDump, false, true),
        10 => (VbiSoundMode::FutureUse, false, true),
        12 | 13 => (VbiSoundMode::StereoDump, true, true),
        _ => (VbiSoundMode::BilingualDump, true, true),
    }
}

fn interpret_vbi(words: &[i32; 3], records: &mut Vec<ObservationRecord>) {
    let (vbi16, vbi17, vbi18) = (words[0], words[1], words[2]);

    // IEC 60857 10.1.3 - Picture numbers (CAV).  The top data bit doubles as the stop-code
    // flag, so it is masked out; the legal range is 1..=79999, with a decoded zero surfaced as
    // its own flag (it marks lead-in, not a picture).
    let mut picture_number = None;
    for word in [vbi17, vbi18] {
        if (word & 0xF0_0000) == 0xF0_0000 {
            if let Some(number) = vbi::decode_bcd(word as u32 & 0x07_FFFF) {
                picture_number = Some(number);
            }
        }
    }
    match picture_number {
        Some(0) => records.push(ObservationRecord::new(NAMESPACE, "cav_picture_zero", true)),
        Some(number @ 1..=79_999) => {
            records.push(ObservationRecord::new(NAMESPACE, "picture_number", number));
        }
        _ => {}
    }

    // IEC 60857 10.1.5 - Chapter numbers.
    for word in [vbi17, vbi18] {
        if (word & 0xF0_0FFF) == 0x80_0DDD {
            if let Some(chapter) = vbi::decode_bcd((word as u32 & 0x07_F000) >> 12) {
                records.push(ObservationRecord::new(NAMESPACE, "chapter_number", chapter));
                break;
            }
        }
    }

    // IEC 60857 10.1.6 - Programme time code (CLV hours and minutes).
    for word in [vbi17, vbi18] {
        if (word & 0xF0_FF00) == 0xF0_DD00 {
            let hours = vbi::decode_bcd((word as u32 & 0x0F_0000) >> 16);
            let minutes = vbi::decode_bcd(word as u32 & 0x00_00FF);
            if let (Some(hours), Some(minutes)) = (hours, minutes) {
                records.push(ObservationRecord::new(NAMESPACE, "clv_hours", hours));
                records.push(ObservationRecord::new(NAMESPACE, "clv_minutes", minutes));
                break;
            }
        }
    }

    // IEC 60857 10.1.10 - CLV picture number (seconds and picture within the second).  The
    // tens-of-seconds digit is biased: 0xA..=0xF encodes 0..=5.
    if (vbi16 & 0xF0_F000) == 0x80_E000 {
        let tens = (vbi16 as u32 & 0x0F_0000) >> 16;
        let second_units = vbi::decode_bcd((vbi16 as u32 & 0x00_0F00) >> 8);
        let picture = vbi::decode_bcd(vbi16 as u32 & 0x00_00FF);
        if let (0xA.., Some(second_units), Some(picture)) = (tens, second_units, picture) {
            let seconds = 10 * (tens as i32 - 0xA) + second_units;
            records.push(ObservationRecord::new(NAMESPACE, "clv_seconds", seconds));
            records.push(ObservationRecord::new(NAMESPACE, "clv_picture", picture));
        }
    }

    // IEC 60857 10.1.1/10.1.2/10.1.4/10.1.7 - marker codes.
    if vbi17 == LEAD_IN_CODE || vbi18 == LEAD_IN_CODE {
        records.push(ObservationRecord::new(NAMESPACE, "lead_in", true));
    }
    if vbi17 == LEAD_OUT_CODE || vbi18 == LEAD_OUT_CODE {
        records.push(ObservationRecord::new(NAMESPACE, "lead_out", true));
    }
    if vbi16 == STOP_CODE || vbi17 == STOP_CODE {
        records.push(ObservationRecord::new(NAMESPACE, "stop_code", true));
    }
    if vbi17 == CLV_CODE {
        records.push(ObservationRecord::new(NAMESPACE, "clv_indicator", true));
    }

    // IEC 60857 10.1.8 - Programme status code (both the original and Amendment 2 readings).
    if (vbi16 & 0xFF_F000) == 0x8D_C000 || (vbi16 & 0xFF_F000) == 0x8B_A000 {
        let status = RawStatusWord::new_with_raw_value(vbi16 as u32);
        let (x3, x4, x5) = (status.x3(), status.x4(), status.x5());

        let audio_status = (u32::from(x4.value() & 0x8))
            + (u32::from(x3.value() & 0x1) << 2)
            + u32::from(x4.value() & 0x3);
        let (mode, fm_multiplex, programme_dump) = sound_mode(audio_status);
        records.push(ObservationRecord::new(
            NAMESPACE,
            "programme_status",
            CustomPayload::ProgrammeStatus(ProgrammeStatus {
                cx_enabled: (vbi16 as u32 & 0x0F_F000) == 0x0D_C000,
                parity_valid: status_parity_valid(x4, x5),
                is_12_inch: (x3.value() & 0x8) == 0,
                is_side_1: (x3.value() & 0x4) == 0,
                has_teletext: (x3.value() & 0x2) != 0,
                is_digital: (x4.value() & 0x4) != 0,
                is_fm_multiplex: fm_multiplex,
                is_programme_dump: programme_dump,
                sound_mode: mode,
            }),
        ));

        let audio_status_am2 = u32::from(x4.value());
        let (am2_mode, am2_standard) = match audio_status_am2 {
            0 => (VbiSoundMode::Stereo, true),
            1 => (VbiSoundMode::Mono, true),
            3 => (VbiSoundMode::Bilingual, true),
            8 => (VbiSoundMode::MonoDump, true),
            _ => (VbiSoundMode::FutureUse, false),
        };
        records.push(ObservationRecord::new(
            NAMESPACE,
            "amendment2_status",
            CustomPayload::Amendment2Status(Amendment2Status {
                copy_permitted: (x3.value() & 0x1) != 0,
                is_video_standard: am2_standard,
                sound_mode: am2_mode,
            }),
        ));
    }

    // IEC 60857 10.1.9 - Users code.
    if (vbi16 & 0xF0_F000) == 0x80_D000 {
        let status = RawStatusWord::new_with_raw_value(vbi16 as u32);
        let x1 = status.x1().value();
        if x1 <= 7 {
            let x3x4x5 = vbi16 as u32 & 0x00_0FFF;
            records.push(ObservationRecord::new(
                NAMESPACE,
                "user_code",
                format!("{x1:01X}{x3x4x5:03X}"),
            ));
        }
    }
}
