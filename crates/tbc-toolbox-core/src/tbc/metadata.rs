use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use num::rational::Ratio;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::field::FieldId;
use crate::hints::{ActiveLineHint, DropoutHint, HintSource};
use crate::video::{FieldMetadata, PcmAudioParameters, System, VideoParameters};

use super::{MetadataOpenSnafu, MetadataParseSnafu, TbcResult};

/// On-disk form of the per-source video parameters.
///
/// The subcarrier frequency and frame rate are usually omitted by the upstream decoder and are
/// filled from the standards defaults for the system; the active line range rides along here
/// because the upstream decoder determines it per source, not per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct VideoParametersRecord {
    pub(crate) system: System,
    pub(crate) field_width: u32,
    pub(crate) field_height: u32,
    pub(crate) sample_rate: f64,
    #[serde(default)]
    pub(crate) fsc: Option<f64>,
    #[serde(default)]
    pub(crate) frame_rate: Option<Ratio<i32>>,
    pub(crate) active_video_start: u32,
    pub(crate) active_video_end: u32,
    pub(crate) colour_burst_start: u32,
    pub(crate) colour_burst_end: u32,
    pub(crate) white_16b_ire: u16,
    pub(crate) black_16b_ire: u16,
    #[serde(default)]
    pub(crate) first_active_frame_line: Option<i32>,
    #[serde(default)]
    pub(crate) last_active_frame_line: Option<i32>,
    #[serde(default)]
    pub(crate) first_active_field_line: Option<i32>,
    #[serde(default)]
    pub(crate) last_active_field_line: Option<i32>,
}

impl VideoParametersRecord {
    fn to_video_parameters(&self) -> VideoParameters {
        VideoParameters {
            system: self.system,
            field_width: self.field_width,
            field_height: self.field_height,
            sample_rate: self.sample_rate,
            // The subcarrier is not stored in the sidecar; fall back to the standards value.
            fsc: self
                .fsc
                .or_else(|| self.system.default_subcarrier_hz())
                .unwrap_or(0.0),
            frame_rate: self.frame_rate.unwrap_or_else(|| self.system.frame_rate()),
            active_video_start: self.active_video_start,
            active_video_end: self.active_video_end,
            colour_burst_start: self.colour_burst_start,
            colour_burst_end: self.colour_burst_end,
            white_16b_ire: self.white_16b_ire,
            black_16b_ire: self.black_16b_ire,
        }
    }

    fn active_line_hint(&self) -> Option<ActiveLineHint> {
        let hint = ActiveLineHint {
            first_active_frame_line: self.first_active_frame_line?,
            last_active_frame_line: self.last_active_frame_line?,
            first_active_field_line: self
                .first_active_field_line
                .unwrap_or(self.first_active_frame_line? / 2),
            last_active_field_line: self
                .last_active_field_line
                .unwrap_or(self.last_active_frame_line? / 2),
            source: HintSource::Metadata,
            confidence_pct: HintSource::Metadata.default_confidence(),
        };
        hint.is_valid().then_some(hint)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetadataRoot {
    #[serde(default)]
    video_parameters: Option<VideoParametersRecord>,
    #[serde(default)]
    pcm_audio_parameters: Option<PcmAudioParameters>,
    #[serde(default)]
    fields: Vec<FieldMetadata>,
}

/// The sidecar metadata database accompanying a TBC capture.
///
/// Fields are stored in capture order; the entry at position `n` describes field ID `n`.
#[derive(Debug)]
pub struct MetadataFile {
    path: PathBuf,
    root: MetadataRoot,
}

impl MetadataFile {
    /// Opens and parses a sidecar metadata file.
    pub fn open(path: &Path) -> TbcResult<Self> {
        let file = File::open(path).context(MetadataOpenSnafu { path: path.to_owned() })?;
        let root: MetadataRoot = serde_json::from_reader(BufReader::new(file))
            .context(MetadataParseSnafu { path: path.to_owned() })?;
        Ok(MetadataFile { path: path.to_owned(), root })
    }

    /// Path the metadata was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The per-source video parameters, with standards defaults applied, when present.
    pub fn video_parameters(&self) -> Option<VideoParameters> {
        self.root.video_parameters.as_ref().map(VideoParametersRecord::to_video_parameters)
    }

    /// The source's active-picture line range, when present.
    pub fn active_line_hint(&self) -> Option<ActiveLineHint> {
        self.root.video_parameters.as_ref().and_then(VideoParametersRecord::active_line_hint)
    }

    /// Metadata for one field, when present.
    pub fn field_metadata(&self, field_id: FieldId) -> Option<&FieldMetadata> {
        if !field_id.is_valid() {
            return None;
        }
        self.root.fields.get(field_id.value() as usize)
    }

    /// Metadata for every field, in capture order.
    pub fn all_field_metadata(&self) -> &[FieldMetadata] {
        &self.root.fields
    }

    /// Dropout regions recorded for one field.
    pub fn dropouts(&self, field_id: FieldId) -> Vec<DropoutHint> {
        self.field_metadata(field_id).map(|m| m.dropouts.clone()).unwrap_or_default()
    }

    /// Parameters of the decoded PCM audio track, when one accompanies the capture.
    pub fn pcm_audio_parameters(&self) -> Option<PcmAudioParameters> {
        self.root.pcm_audio_parameters
    }
}
