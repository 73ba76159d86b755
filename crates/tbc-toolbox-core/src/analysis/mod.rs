//! Analyses that consume accumulated observations: the field-mapping analyzer, frame and
//! timecode lookup, and the parallel signal-quality sweeps.

use snafu::Snafu;

use crate::ErrorKind;

mod field_mapping;
mod lookup;
mod mapping_spec;
mod progress;
mod result;
mod signal;

pub use field_mapping::{
    AnalyzerState, FieldMappingAnalyzer, FieldMappingDecision, FieldMappingOptions,
    FieldMappingStats, FrameInfo,
};
pub use lookup::{parse_timecode, FieldLookupResult, FieldMappingLookup, ParsedTimecode};
pub use mapping_spec::{MappingItem, MappingSpec};
pub use progress::{AnalysisProgress, CancelToken, NullProgress};
pub use result::{AnalysisResult, AnalysisStatus};
pub use signal::{burst_level_sweep, snr_sweep, FieldBurstLevel, FieldSnr};

/// Result type for analysis operations.
pub type AnalyzerResult<T, E = AnalysisError> = std::result::Result<T, E>;

/// Error type for analysis operations.
#[derive(Debug, Snafu)]
pub enum AnalysisError {
    /// The operation observed a cancellation request and stopped.
    #[snafu(display("Analysis cancelled"))]
    Cancelled,

    /// The source representation cannot be analyzed.
    #[snafu(display("Source cannot be analyzed: {reason}"))]
    UnusableSource {
        /// Why the source was rejected.
        reason: String,
    },

    /// A mapping-spec item does not match the grammar or violates its constraints.
    #[snafu(display("Invalid mapping-spec item {item:?}"))]
    SpecSyntax {
        /// The offending item text.
        item: String,
    },

    /// A timecode string does not match `H:MM:SS.FF`.
    #[snafu(display("Invalid timecode {text:?} (expected H:MM:SS.FF)"))]
    TimecodeSyntax {
        /// The offending text.
        text: String,
    },

    /// A requested frame does not exist in the source.
    #[snafu(display("Frame {frame} not found in the source"))]
    FrameNotFound {
        /// The requested frame number.
        frame: i32,
    },
}

impl AnalysisError {
    /// The error taxonomy entry this error maps onto.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Cancelled => ErrorKind::Cancelled,
            AnalysisError::UnusableSource { .. } => ErrorKind::InvalidState,
            AnalysisError::SpecSyntax { .. } | AnalysisError::TimecodeSyntax { .. } => {
                ErrorKind::InvalidFormat
            }
            AnalysisError::FrameNotFound { .. } => ErrorKind::InvalidArgument,
        }
    }
}
