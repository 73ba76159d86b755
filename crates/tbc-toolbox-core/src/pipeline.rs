//! Pipeline description files.
//!
//! A pipeline file is a small YAML document naming the observers to run and, optionally, the
//! stage graph to execute:
//!
//! ```yaml
//! name: "capture analysis"
//! version: "1.0"
//! observers:
//!   - type: biphase
//!   - type: pulldown
//!     enabled: false
//! stages:
//!   - id: 1
//!     type: tbc_source
//!     parameters:
//!       tbc_path: "capture.tbc"
//!   - id: 2
//!     type: observers
//!     inputs: [1]
//! ```
//!
//! Unknown observer tags fail the load: a typo must not silently drop an analyzer.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::dag::{Dag, DagNode, NodeId};
use crate::observers::{
    BiphaseObserver, BlackPsnrObserver, BurstLevelObserver, ClosedCaptionObserver,
    FieldParityObserver, FieldQualityObserver, FmCodeObserver, LeadInOutObserver, Observer,
    PalPhaseObserver, PulldownObserver, VideoIdObserver, VitcObserver, WhiteFlagObserver,
    WhiteSnrObserver,
};
use crate::params::ParameterValue;
use crate::ErrorKind;


/// The observer tags a pipeline file may name.
pub const OBSERVER_TAGS: &[&str] = &[
    "biphase",
    "field_parity",
    "pal_phase",
    "pulldown",
    "lead_in_out",
    "field_quality",
    "burst_level",
    "white_snr",
    "black_psnr",
    "white_flag",
    "fm_code",
    "closed_caption",
    "vitc",
    "video_id",
];

/// Instantiates an observer by tag.
pub fn create_observer(tag: &str) -> PipelineResult<Box<dyn Observer>> {
    Ok(match tag {
        "biphase" => Box::new(BiphaseObserver) as Box<dyn Observer>,
        "field_parity" => Box::new(FieldParityObserver),
        "pal_phase" => Box::new(PalPhaseObserver),
        "pulldown" => Box::new(PulldownObserver),
        "lead_in_out" => Box::new(LeadInOutObserver),
        "field_quality" => Box::new(FieldQualityObserver),
        "burst_level" => Box::new(BurstLevelObserver),
        "white_snr" => Box::new(WhiteSnrObserver),
        "black_psnr" => Box::new(BlackPsnrObserver),
        "white_flag" => Box::new(WhiteFlagObserver),
        "fm_code" => Box::new(FmCodeObserver),
        "closed_caption" => Box::new(ClosedCaptionObserver),
        "vitc" => Box::new(VitcObserver),
        "video_id" => Box::new(VideoIdObserver),
        other => {
            return UnknownObserverSnafu { tag: other.to_owned() }.fail();
        }
    })
}

/// One observer entry of a pipeline file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverEntry {
    /// Observer tag; see [`OBSERVER_TAGS`].
    #[serde(rename = "type")]
    pub observer_type: String,
    /// Disabled entries stay in the file but are not instantiated.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// One stage entry of a pipeline file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEntry {
    /// Positive node ID, unique within the pipeline.
    pub id: i32,
    /// Stage type name.
    #[serde(rename = "type")]
    pub stage_type: String,
    /// Stage parameters.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
    /// IDs of the input nodes, in order.
    #[serde(default)]
    pub inputs: Vec<i32>,
}

/// A parsed pipeline description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDescription {
    /// Pipeline name.
    pub name: String,
    /// Pipeline version string.
    pub version: String,
    /// Observers to run, in order.
    #[serde(default)]
    pub observers: Vec<ObserverEntry>,
    /// Stage graph, when the file describes one.
    #[serde(default)]
    pub stages: Vec<StageEntry>,
}

impl PipelineDescription {
    /// Parses a pipeline description from YAML text, rejecting unknown observer tags.
    pub fn from_yaml(text: &str) -> PipelineResult<Self> {
        let description: PipelineDescription =
            serde_yaml::from_str(text).context(ParseSnafu)?;
        for entry in &description.observers {
            snafu::ensure!(
                OBSERVER_TAGS.contains(&entry.observer_type.as_str()),
                UnknownObserverSnafu { tag: entry.observer_type.clone() }
            );
        }
        Ok(description)
    }

    /// Loads and parses a pipeline file.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let text =
            fs::read_to_string(path).context(ReadSnafu { path: path.to_owned() })?;
        Self::from_yaml(&text)
    }

    /// Instantiates the enabled observers, in file order.
    pub fn build_observers(&self) -> PipelineResult<Vec<Box<dyn Observer>>> {
        self.observers
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| create_observer(&entry.observer_type))
            .collect()
    }

    /// Converts the stage entries into a [`Dag`].
    pub fn to_dag(&self) -> Dag {
        Dag::new(
            self.stages
                .iter()
                .map(|entry| DagNode {
                    id: NodeId::new(entry.id),
                    stage_type: entry.stage_type.clone(),
                    parameters: entry.parameters.clone(),
                    inputs: entry.inputs.iter().map(|&id| NodeId::new(id)).collect(),
                })
                .collect(),
        )
    }
}

/// Result type for pipeline loading.
pub type PipelineResult<T, E = PipelineError> = std::result::Result<T, E>;

/// Error type for pipeline loading.
#[derive(Debug, Snafu)]
pub enum PipelineError {
    /// The pipeline file could not be read.
    #[snafu(display("Could not read pipeline file {}", path.display()))]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The pipeline file is not valid YAML (or has the wrong shape).
    #[snafu(display("Could not parse pipeline file"))]
    Parse {
        /// Underlying parse error.
        source: serde_yaml::Error,
    },

    /// An observer tag is not recognized.
    #[snafu(display("Unknown observer tag {tag:?}"))]
    UnknownObserver {
        /// The unrecognized tag.
        tag: String,
    },
}

impl PipelineError {
    /// The error taxonomy entry this error maps onto.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorKind::FileNotFound
            }
            PipelineError::Read { .. } => ErrorKind::Io,
            PipelineError::Parse { .. } => ErrorKind::InvalidFormat,
            PipelineError::UnknownObserver { .. } => ErrorKind::InvalidArgument,
        }
    }
}
