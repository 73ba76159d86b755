use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::field::{FieldId, FieldIdRange};
use crate::obs::FieldObservations;
use crate::repr::FieldRepresentation;
use crate::video::VideoFormat;

use super::AnalyzerResult;

/// A parsed `H:MM:SS.FF` timecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTimecode {
    /// Hours (unbounded: captures can exceed a day of material in theory).
    pub hours: i32,
    /// Minutes, 0-59.
    pub minutes: i32,
    /// Seconds, 0-59.
    pub seconds: i32,
    /// Picture within the second.
    pub picture_number: i32,
}

impl ParsedTimecode {
    /// Whether the component ranges are sensible.
    pub fn is_valid(&self) -> bool {
        self.hours >= 0
            && (0..60).contains(&self.minutes)
            && (0..60).contains(&self.seconds)
            && self.picture_number >= 0
    }

    /// The frame number this timecode names at the given rate.
    pub fn frame_number(&self, fps: i32) -> i32 {
        ((self.hours * 3600 + self.minutes * 60 + self.seconds) * fps) + self.picture_number
    }
}

impl fmt::Display for ParsedTimecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{:02}:{:02}.{:02}",
            self.hours, self.minutes, self.seconds, self.picture_number
        )
    }
}

static TIMECODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(\d+):(\d+)\.(\d+)$").expect("timecode regex"));

/// Parses `H:MM:SS.FF`.
pub fn parse_timecode(text: &str) -> AnalyzerResult<ParsedTimecode> {
    let captures = TIMECODE_RE
        .captures(text.trim())
        .ok_or_else(|| super::TimecodeSyntaxSnafu { text: text.to_owned() }.build())?;
    let parse = |index: usize| -> AnalyzerResult<i32> {
        captures[index]
            .parse()
            .map_err(|_| super::TimecodeSyntaxSnafu { text: text.to_owned() }.build())
    };
    let timecode = ParsedTimecode {
        hours: parse(1)?,
        minutes: parse(2)?,
        seconds: parse(3)?,
        picture_number: parse(4)?,
    };
    snafu::ensure!(
        timecode.is_valid(),
        super::TimecodeSyntaxSnafu { text: text.to_owned() }
    );
    Ok(timecode)
}

/// Answer to a frame or timecode lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLookupResult {
    /// Half-open range covering the frame's fields.
    pub field_range: FieldIdRange,
    /// Number of fields in the range.
    pub field_count: u64,
    /// The picture number of the frame, when the disc carries them.
    pub picture_number: Option<i32>,
    /// Whether the source reads as CAV.
    pub is_cav: bool,
    /// Whether the source is a 625-line system.
    pub is_pal: bool,
}

#[derive(Debug, Clone, Copy)]
struct LookupFrame {
    first_field: FieldId,
    second_field: FieldId,
    picture_number: Option<i32>,
    clv_frame_number: Option<i32>,
}

/// Frame-number and timecode lookup over a representation whose observations have been
/// populated.
///
/// CAV sources are addressed by picture number; CLV sources by sequential frame (or by
/// timecode converted through the system frame rate).
#[derive(Debug)]
pub struct FieldMappingLookup {
    frames: Vec<LookupFrame>,
    picture_index: BTreeMap<i32, usize>,
    clv_index: BTreeMap<i32, usize>,
    is_cav: bool,
    is_pal: bool,
}

impl FieldMappingLookup {
    /// Builds the lookup tables by pairing consecutive fields.
    pub fn build(source: &dyn FieldRepresentation) -> AnalyzerResult<Self> {
        let field_range = source.field_range();
        snafu::ensure!(
            field_range.is_valid() && field_range.size() >= 2,
            super::UnusableSourceSnafu { reason: String::from("fewer than two fields") }
        );

        let is_pal = source
            .descriptor(field_range.start)
            .map(|d| d.format == VideoFormat::Pal)
            .unwrap_or(false);
        let fps = if is_pal { 25 } else { 30 };

        let observation_i32 = |observations: &FieldObservations, name: &str| {
            observations.get("biphase").and_then(|ns| ns.get(name)).and_then(|v| v.as_i32())
        };

        let mut frames = Vec::new();
        let mut picture_index = BTreeMap::new();
        let mut clv_index = BTreeMap::new();
        let mut has_pictures = false;
        let mut has_timecodes = false;

        let mut id = field_range.start;
        while id.saturating_add(1) < field_range.end {
            let second = id.saturating_add(1);
            let first_obs = source.observations(id);
            let second_obs = source.observations(second);

            let picture_number = observation_i32(&first_obs, "picture_number")
                .or_else(|| observation_i32(&second_obs, "picture_number"));
            has_pictures |= picture_number.is_some();

            let clv_frame_number = [&first_obs, &second_obs].into_iter().find_map(|obs| {
                let hours = observation_i32(obs, "clv_hours");
                let minutes = observation_i32(obs, "clv_minutes");
                let seconds = observation_i32(obs, "clv_seconds");
                let picture = observation_i32(obs, "clv_picture");
                if hours.is_none() && minutes.is_none() && seconds.is_none() && picture.is_none()
                {
                    return None;
                }
                Some(
                    (hours.unwrap_or(0) * 3600 + minutes.unwrap_or(0) * 60
                        + seconds.unwrap_or(0))
                        * fps
                        + picture.unwrap_or(0),
                )
            });
            has_timecodes |= clv_frame_number.is_some();

            let index = frames.len();
            if let Some(picture) = picture_number {
                picture_index.entry(picture).or_insert(index);
            }
            if let Some(clv) = clv_frame_number {
                clv_index.entry(clv).or_insert(index);
            }
            frames.push(LookupFrame {
                first_field: id,
                second_field: second,
                picture_number,
                clv_frame_number,
            });

            id = second.saturating_add(1);
        }

        snafu::ensure!(
            !frames.is_empty(),
            super::UnusableSourceSnafu { reason: String::from("no complete frames") }
        );

        let is_cav = has_pictures && !has_timecodes;
        debug!(frames = frames.len(), is_cav, is_pal, "built field mapping lookup");
        Ok(FieldMappingLookup { frames, picture_index, clv_index, is_cav, is_pal })
    }

    /// Whether the source reads as CAV.
    pub fn is_cav(&self) -> bool {
        self.is_cav
    }

    /// Whether the source is a 625-line system.
    pub fn is_pal(&self) -> bool {
        self.is_pal
    }

    /// Number of complete frames in the source.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn result_for(&self, frame: &LookupFrame) -> FieldLookupResult {
        FieldLookupResult {
            field_range: FieldIdRange::new(frame.first_field, frame.second_field.saturating_add(1)),
            field_count: 2,
            picture_number: frame.picture_number,
            is_cav: self.is_cav,
            is_pal: self.is_pal,
        }
    }

    /// Finds the fields of a frame.
    ///
    /// CAV sources are addressed by picture number (inherently 1-based); CLV sources by
    /// position in the capture, 1-based when `one_based` is set.
    pub fn fields_for_frame(
        &self,
        frame_number: i32,
        one_based: bool,
    ) -> AnalyzerResult<FieldLookupResult> {
        if self.is_cav {
            let picture = if one_based { frame_number } else { frame_number + 1 };
            let index = self
                .picture_index
                .get(&picture)
                .ok_or_else(|| super::FrameNotFoundSnafu { frame: frame_number }.build())?;
            Ok(self.result_for(&self.frames[*index]))
        } else {
            let position = if one_based { frame_number - 1 } else { frame_number };
            snafu::ensure!(
                position >= 0 && (position as usize) < self.frames.len(),
                super::FrameNotFoundSnafu { frame: frame_number }
            );
            Ok(self.result_for(&self.frames[position as usize]))
        }
    }

    /// Finds the fields of the frame a timecode names.
    pub fn fields_for_timecode(&self, text: &str) -> AnalyzerResult<FieldLookupResult> {
        let timecode = parse_timecode(text)?;
        let fps = if self.is_pal { 25 } else { 30 };
        let frame = timecode.frame_number(fps);

        if self.is_cav {
            // CAV discs number pictures from 1; a timecode is a frame offset from the start.
            return self.fields_for_frame(frame + 1, true);
        }

        let index = self
            .clv_index
            .get(&frame)
            .ok_or_else(|| super::FrameNotFoundSnafu { frame }.build())?;
        Ok(self.result_for(&self.frames[*index]))
    }
}
