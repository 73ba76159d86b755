//! Advisory hints attached to field representations.
//!
//! Hints carry information determined *outside* this crate's own signal analysis, most commonly
//! by the upstream time-base corrector that wrote the capture's sidecar metadata.  They are
//! plain copyable structs by convention, each carrying a [`HintSource`] and a confidence
//! percentage, so they can be passed by value without locking.
//!
//! Hints are distinct from observations: observations are produced by this crate's observers
//! from the samples themselves and live in the observation context.

use serde::{Deserialize, Serialize};

/// Where a hint's information originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintSource {
    /// From the capture's sidecar metadata database.
    Metadata,
    /// Manually specified by the user.
    UserOverride,
    /// Inherited from a source representation in the processing chain.
    Inherited,
    /// Derived from this crate's own signal analysis.
    SampleAnalysis,
    /// Multiple independent sources agree.
    Corroborated,
}

impl HintSource {
    /// Conventional confidence percentage for hints from this source.
    pub const fn default_confidence(self) -> u8 {
        match self {
            HintSource::Metadata => 100,
            HintSource::UserOverride => 100,
            HintSource::Inherited => 90,
            HintSource::SampleAnalysis => 75,
            HintSource::Corroborated => 100,
        }
    }
}

/// Field parity determined by an upstream processor.
///
/// The first field of an interlaced pair is the one whose vertical sync arrives on the
/// standards-defined half-line boundary for the system in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldParityHint {
    /// Whether this is the first field of an interlaced pair.
    pub is_first_field: bool,
    /// Where this hint came from.
    pub source: HintSource,
    /// Confidence in the hint, 0-100.
    pub confidence_pct: u8,
}

/// Colour-sequence phase of a field.
///
/// PAL uses an 8-field colour sequence, NTSC a 4-field sequence.  `-1` means the phase could not
/// be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPhaseHint {
    /// Phase within the colour sequence: 1..=8 (PAL) or 1..=4 (NTSC), or -1 when unknown.
    pub field_phase_id: i32,
    /// Where this hint came from.
    pub source: HintSource,
    /// Confidence in the hint, 0-100.
    pub confidence_pct: u8,
}

/// Vertical extent of the visible picture, excluding blanking and VBI lines.
///
/// Frame-based line numbers come from the sidecar metadata; the field-based numbers are derived
/// from them for convenience when working on a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLineHint {
    /// First active line of the full frame, or -1 when unknown.
    pub first_active_frame_line: i32,
    /// Last active line of the full frame, or -1 when unknown.
    pub last_active_frame_line: i32,
    /// First active line within one field, or -1 when unknown.
    pub first_active_field_line: i32,
    /// Last active line within one field, or -1 when unknown.
    pub last_active_field_line: i32,
    /// Where this hint came from.
    pub source: HintSource,
    /// Confidence in the hint, 0-100.
    pub confidence_pct: u8,
}

impl ActiveLineHint {
    /// Whether the frame-based line range is usable.
    pub fn is_valid(&self) -> bool {
        self.first_active_frame_line >= 0 && self.last_active_frame_line >= 0
    }
}

/// A dropout region detected by the upstream processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropoutHint {
    /// Field line the dropout occurs on (0-based).
    pub line: u32,
    /// First affected sample within the line.
    pub start_sample: u32,
    /// One past the last affected sample within the line.
    pub end_sample: u32,
    /// Where this hint came from.
    #[serde(default = "metadata_source")]
    pub source: HintSource,
    /// Confidence in the hint, 0-100.
    #[serde(default = "metadata_confidence")]
    pub confidence_pct: u8,
}

fn metadata_source() -> HintSource {
    HintSource::Metadata
}

fn metadata_confidence() -> u8 {
    HintSource::Metadata.default_confidence()
}
