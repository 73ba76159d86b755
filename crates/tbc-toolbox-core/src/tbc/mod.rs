//! Access to TBC captures: the raw sample container, the sidecar metadata database, and the
//! concrete [`crate::repr::FieldRepresentation`] that ties them together.
//!
//! A TBC capture is a pair of files: `<name>.tbc`, raw little-endian 16-bit composite samples
//! laid out as `field_count x field_height x field_width`, and a sidecar metadata database
//! (`<name>.tbc.json` by default) describing the source signal and each field.

use std::io;
use std::path::PathBuf;

use snafu::Snafu;

use crate::field::FieldId;
use crate::ErrorKind;

mod metadata;
mod reader;
mod representation;

pub use metadata::MetadataFile;
pub use reader::TbcReader;
pub use representation::TbcFieldRepresentation;

/// Result type for TBC container and metadata access.
pub type TbcResult<T, E = TbcError> = std::result::Result<T, E>;

/// Error type for TBC container and metadata access.
#[derive(Debug, Snafu)]
pub enum TbcError {
    /// The capture file does not exist.
    #[snafu(display("TBC file {} not found", path.display()))]
    NotFound {
        /// Path of the missing file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The capture file could not be opened.
    #[snafu(display("Could not open TBC file {}", path.display()))]
    Open {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A read or seek within the capture failed.
    #[snafu(display("Could not read field {field_id} from the TBC file"))]
    Read {
        /// Field being read.
        field_id: FieldId,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The requested field geometry is unusable.
    #[snafu(display(
        "Invalid TBC geometry: field length {field_length} with line length {line_length}"
    ))]
    BadGeometry {
        /// Samples per field as requested.
        field_length: usize,
        /// Samples per line as requested.
        line_length: usize,
    },

    /// The field ID lies outside the capture.
    #[snafu(display("Field {field_id} is outside the capture ({field_count} fields)"))]
    FieldOutOfRange {
        /// The requested field.
        field_id: FieldId,
        /// Number of fields in the capture.
        field_count: u64,
    },

    /// The line range lies outside the field.
    #[snafu(display("Lines {start_line}..{end_line} are outside the field"))]
    LineOutOfRange {
        /// First requested line.
        start_line: u32,
        /// One past the last requested line.
        end_line: u32,
    },

    /// Line-addressed reads need a line length, but the reader was opened without one.
    #[snafu(display("TBC reader was opened without a line length; line reads are unavailable"))]
    NoLineLength,

    /// The file ended before a complete field could be read.
    #[snafu(display("TBC file is truncated within field {field_id}"))]
    Truncated {
        /// The field being read.
        field_id: FieldId,
    },

    /// The sidecar metadata database could not be opened.
    #[snafu(display("Could not open metadata file {}", path.display()))]
    MetadataOpen {
        /// Path of the sidecar.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The sidecar metadata database could not be parsed.
    #[snafu(display("Could not parse metadata file {}", path.display()))]
    MetadataParse {
        /// Path of the sidecar.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The sidecar's video parameters failed the validity predicate.
    #[snafu(display("Metadata video parameters failed validation"))]
    MetadataInvalid {
        /// Validation report.
        source: garde::Report,
    },
}

impl TbcError {
    /// The error taxonomy entry this error maps onto.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TbcError::NotFound { .. } => ErrorKind::FileNotFound,
            TbcError::Open { .. } | TbcError::Read { .. } | TbcError::MetadataOpen { .. } => {
                ErrorKind::Io
            }
            TbcError::BadGeometry { .. }
            | TbcError::FieldOutOfRange { .. }
            | TbcError::LineOutOfRange { .. } => ErrorKind::InvalidArgument,
            TbcError::NoLineLength => ErrorKind::InvalidState,
            TbcError::Truncated { .. }
            | TbcError::MetadataParse { .. }
            | TbcError::MetadataInvalid { .. } => ErrorKind::InvalidFormat,
        }
    }
}

#[cfg(test)]
mod tests;
