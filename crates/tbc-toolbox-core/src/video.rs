//! Static descriptors of the video signal: system, per-source parameters, and per-field
//! descriptors and sidecar metadata.

use derive_more::derive::Display;
use garde::Validate;
use num::rational::Ratio;
use serde::{Deserialize, Serialize};

use crate::field::FieldId;
use crate::hints::DropoutHint;


/// Colour system of the captured source.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum System {
    /// 525-line, ~59.94 fields/s, NTSC colour.
    #[display("NTSC")]
    Ntsc,
    /// 625-line, 50 fields/s, PAL colour.
    #[display("PAL")]
    Pal,
    /// 525-line scan with PAL colour (Brazil).
    #[display("PAL-M")]
    PalM,
    /// System could not be determined.
    #[display("unknown")]
    Unknown,
}

impl System {
    /// The broad line-standard family the system decodes as.
    pub fn format(self) -> VideoFormat {
        match self {
            System::Ntsc => VideoFormat::Ntsc,
            System::Pal | System::PalM => VideoFormat::Pal,
            System::Unknown => VideoFormat::Unknown,
        }
    }

    /// Nominal line period in microseconds.
    pub fn line_period_us(self) -> f64 {
        match self.scan_lines() {
            625 => 64.0,
            _ => 63.5,
        }
    }

    /// Total scan lines per frame (525 or 625).
    pub fn scan_lines(self) -> u32 {
        match self {
            System::Pal => 625,
            _ => 525,
        }
    }

    /// Integer frames per second used for CLV timecode arithmetic.
    pub fn timecode_fps(self) -> i32 {
        match self {
            System::Pal => 25,
            _ => 30,
        }
    }

    /// Exact nominal frame rate.
    pub fn frame_rate(self) -> Ratio<i32> {
        match self {
            System::Pal => Ratio::from_integer(25),
            _ => Ratio::new(30_000, 1_001),
        }
    }

    /// Length of the colour-sequence cycle in fields: 8 for PAL colour, 4 for NTSC colour.
    pub fn phase_modulus(self) -> i32 {
        match self.format() {
            VideoFormat::Pal => 8,
            _ => 4,
        }
    }

    /// Standards-defined colour subcarrier frequency in Hz, when the system defines one.
    pub fn default_subcarrier_hz(self) -> Option<f64> {
        match self {
            System::Pal => Some((283.75 * 15_625.0) + 25.0),
            System::Ntsc => Some(315.0e6 / 88.0),
            System::PalM => Some(5.0e6 * (63.0 / 88.0) * (909.0 / 910.0)),
            System::Unknown => None,
        }
    }
}

/// Line-standard family of a decoded field.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoFormat {
    /// 525-line family.
    #[display("NTSC")]
    Ntsc,
    /// 625-line family.
    #[display("PAL")]
    Pal,
    /// Family could not be determined.
    #[display("unknown")]
    Unknown,
}

/// Standards-compliant number of stored lines in one field, excluding any padding the capture
/// container may append.
///
/// Returns `stored_height` unchanged when the system is unknown: without a standard to consult
/// we cannot distinguish padding from picture.
pub fn standard_field_height(system: System, stored_height: u32) -> u32 {
    let standard = match system.format() {
        VideoFormat::Pal => 288,
        VideoFormat::Ntsc => 243,
        VideoFormat::Unknown => return stored_height,
    };
    standard.min(stored_height)
}

/// Immutable per-source description of the captured signal.
///
/// All sample positions are in samples from the start of a line.  Validity (checked with
/// [`garde`]) requires each span to be ordered and within the line, the blanking codes to be
/// ordered, and the rates to be positive.
#[derive(Debug, Clone, Copy, PartialEq, Validate, Serialize, Deserialize)]
pub struct VideoParameters {
    /// Colour system of the source.
    #[garde(skip)]
    pub system: System,

    /// Samples per stored line.
    #[garde(range(min = 1))]
    pub field_width: u32,

    /// Stored lines per field, including any container padding.
    #[garde(range(min = 1))]
    pub field_height: u32,

    /// Sample rate in Hz.
    #[garde(custom(is_positive_rate))]
    pub sample_rate: f64,

    /// Colour subcarrier frequency in Hz.
    #[garde(custom(is_positive_rate))]
    pub fsc: f64,

    /// Exact nominal frame rate of the source.
    #[garde(custom(is_positive_frame_rate))]
    pub frame_rate: Ratio<i32>,

    /// First sample of active video within a line.
    #[garde(skip)]
    pub active_video_start: u32,

    /// One past the last sample of active video within a line.
    #[garde(custom(check_span(&self, self.active_video_start, "active video")))]
    pub active_video_end: u32,

    /// First sample of the colour burst within a line.
    #[garde(skip)]
    pub colour_burst_start: u32,

    /// One past the last sample of the colour burst within a line.
    #[garde(custom(check_span(&self, self.colour_burst_start, "colour burst")))]
    pub colour_burst_end: u32,

    /// 16-bit code corresponding to 100 IRE (white).
    #[garde(custom(check_blanking_codes(&self)))]
    pub white_16b_ire: u16,

    /// 16-bit code corresponding to 0 IRE (black).
    #[garde(skip)]
    pub black_16b_ire: u16,
}

/// A [`VideoParameters`] that has passed validation.
pub type ValidVideoParameters = garde::Valid<VideoParameters>;

fn is_positive_rate(value: &f64, _context: &()) -> garde::Result {
    if value.is_finite() && *value > 0.0 {
        Ok(())
    } else {
        Err(garde::Error::new(format!("rate {value} is not a positive finite frequency")))
    }
}

fn is_positive_frame_rate(value: &Ratio<i32>, _context: &()) -> garde::Result {
    if *value.numer() > 0 && *value.denom() > 0 {
        Ok(())
    } else {
        Err(garde::Error::new("frame rate must be positive"))
    }
}

fn check_span<'a>(
    params: &'a VideoParameters,
    start: u32,
    what: &'static str,
) -> impl FnOnce(&u32, &()) -> garde::Result + 'a {
    move |end, _| {
        if start >= *end {
            return Err(garde::Error::new(format!(
                "{what} span is not ordered: start {start} must be less than end {end}"
            )));
        }
        if *end > params.field_width {
            return Err(garde::Error::new(format!(
                "{what} span end {end} exceeds the line width {}",
                params.field_width
            )));
        }
        Ok(())
    }
}

fn check_blanking_codes(
    params: &VideoParameters,
) -> impl FnOnce(&u16, &()) -> garde::Result + '_ {
    move |white, _| {
        if *white > params.black_16b_ire {
            Ok(())
        } else {
            Err(garde::Error::new(format!(
                "white code {white} must be greater than black code {}",
                params.black_16b_ire
            )))
        }
    }
}

impl VideoParameters {
    /// Whether the parameters satisfy the validity predicate.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// IRE units per 16-bit code step.
    pub fn ire_per_code(&self) -> f64 {
        100.0 / f64::from(self.white_16b_ire - self.black_16b_ire)
    }

    /// Converts a raw 16-bit sample to IRE.
    pub fn code_to_ire(&self, sample: u16) -> f64 {
        (f64::from(sample) - f64::from(self.black_16b_ire)) * self.ire_per_code()
    }

    /// The 16-bit code halfway between black and white, used as the slicing level for binary
    /// VBI data.
    pub fn vbi_slice_level(&self) -> u16 {
        (self.white_16b_ire / 2) + (self.black_16b_ire / 2)
    }

    /// Samples per microsecond at the source sample rate.
    pub fn samples_per_us(&self) -> f64 {
        self.sample_rate / 1.0e6
    }
}

/// Parity of a field within its interlaced frame.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldParity {
    /// The field carrying the top-most displayed line.
    Top,
    /// The field carrying the second displayed line.
    Bottom,
}

/// Per-field description derived from the source parameters and sidecar metadata.
///
/// `height` is the standards-compliant line count and may be smaller than the stored (padded)
/// height of the underlying container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// The field this descriptor describes.
    pub field_id: FieldId,
    /// Parity within the interlaced frame.
    pub parity: FieldParity,
    /// Line-standard family.
    pub format: VideoFormat,
    /// Samples per line.
    pub width: u32,
    /// Standards-compliant lines in the field.
    pub height: u32,
    /// Frame number, when one is known from metadata.
    pub frame_number: Option<i32>,
}

/// Per-field sidecar metadata written by the upstream time-base corrector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMetadata {
    /// Whether the upstream decoder judged this the first field of a pair.
    pub is_first_field: Option<bool>,
    /// Upstream sync-detection confidence, 0-100.
    pub sync_confidence: Option<u8>,
    /// Median colour-burst amplitude in IRE measured upstream.
    pub median_burst_ire: Option<f64>,
    /// Colour-sequence phase: 1..=8 (PAL) or 1..=4 (NTSC).
    pub field_phase_id: Option<i32>,
    /// Dropout regions detected upstream.
    pub dropouts: Vec<DropoutHint>,
    /// Number of decoded audio samples associated with this field.
    pub audio_samples: Option<u32>,
    /// NTSC: whether the line-20 video ID was decoded upstream.
    pub video_id_valid: Option<bool>,
    /// NTSC: raw video ID data, when valid.
    pub video_id_data: Option<u32>,
    /// NTSC: whether the line-10 FM code was decoded upstream.
    pub fm_code_valid: Option<bool>,
    /// NTSC: raw FM code data, when valid.
    pub fm_code_data: Option<u32>,
    /// NTSC: whether the line-11 white flag was present.
    pub white_flag: Option<bool>,
    /// Sequence number of the field within the capture file.
    pub seq_no: Option<u64>,
    /// Byte position of the field within the capture file.
    pub disk_loc: Option<u64>,
}

/// Parameters of the decoded PCM audio track, when one accompanies the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmAudioParameters {
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bits: u32,
    /// Interleaved channel count.
    pub channels: u32,
}
