use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::field::FieldId;
use crate::ioutil::retry_if_interrupted;

use super::{
    BadGeometrySnafu, FieldOutOfRangeSnafu, LineOutOfRangeSnafu, NoLineLengthSnafu, OpenSnafu,
    ReadSnafu, TbcError, TbcResult, TruncatedSnafu,
};

/// Reader for the raw TBC sample container.
///
/// The container is a headerless sequence of little-endian `u16` samples laid out as
/// `field_count x field_height x field_width`.  The field count is discovered from the file
/// size; a trailing partial field is ignored.
#[derive(Debug)]
pub struct TbcReader {
    file: File,
    path: PathBuf,
    field_count: u64,
    field_length: usize,
    line_length: usize,
}

impl TbcReader {
    /// Opens a capture.
    ///
    /// `field_length` is the number of samples per stored field and must be positive.
    /// `line_length` is the number of samples per line; pass 0 when unknown, in which case
    /// line-addressed reads are unavailable.
    pub fn open(path: &Path, field_length: usize, line_length: usize) -> TbcResult<Self> {
        snafu::ensure!(
            field_length > 0 && (line_length == 0 || line_length <= field_length),
            BadGeometrySnafu { field_length, line_length }
        );

        let mut file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                TbcError::NotFound { path: path.to_owned(), source: e }
            }
            _ => TbcError::Open { path: path.to_owned(), source: e },
        })?;

        let file_size = retry_if_interrupted(|| file.seek(SeekFrom::End(0)))
            .context(OpenSnafu { path: path.to_owned() })?;
        let field_bytes = field_length as u64 * 2;
        let field_count = file_size / field_bytes;

        Ok(TbcReader { file, path: path.to_owned(), field_count, field_length, line_length })
    }

    /// Path the reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of complete fields in the capture.
    pub fn field_count(&self) -> u64 {
        self.field_count
    }

    /// Samples per stored field.
    pub fn field_length(&self) -> usize {
        self.field_length
    }

    /// Samples per line, or 0 when unknown.
    pub fn line_length(&self) -> usize {
        self.line_length
    }

    /// Stored lines per field, when the line length is known.
    pub fn lines_per_field(&self) -> Option<u32> {
        (self.line_length > 0).then(|| (self.field_length / self.line_length) as u32)
    }

    fn check_field(&self, field_id: FieldId) -> TbcResult<u64> {
        snafu::ensure!(
            field_id.is_valid() && field_id.value() < self.field_count,
            FieldOutOfRangeSnafu { field_id, field_count: self.field_count }
        );
        Ok(field_id.value())
    }

    fn read_samples(&mut self, field_id: FieldId, byte_offset: u64, samples: usize) -> TbcResult<Vec<u16>> {
        retry_if_interrupted(|| self.file.seek(SeekFrom::Start(byte_offset)))
            .context(ReadSnafu { field_id })?;

        let mut bytes = vec![0u8; samples * 2];
        match self.file.read_exact(&mut bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return TruncatedSnafu { field_id }.fail();
            }
            Err(e) => return Err(e).context(ReadSnafu { field_id }),
        }

        Ok(bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }

    /// Reads one complete stored field.
    pub fn read_field(&mut self, field_id: FieldId) -> TbcResult<Vec<u16>> {
        let index = self.check_field(field_id)?;
        let offset = index * self.field_length as u64 * 2;
        self.read_samples(field_id, offset, self.field_length)
    }

    /// Reads the stored lines `[start_line, end_line)` of one field.
    pub fn read_field_lines(
        &mut self,
        field_id: FieldId,
        start_line: u32,
        end_line: u32,
    ) -> TbcResult<Vec<u16>> {
        snafu::ensure!(self.line_length > 0, NoLineLengthSnafu);
        let index = self.check_field(field_id)?;

        let lines_per_field = (self.field_length / self.line_length) as u32;
        snafu::ensure!(
            start_line < end_line && end_line <= lines_per_field,
            LineOutOfRangeSnafu { start_line, end_line }
        );

        let start_sample =
            index * self.field_length as u64 + start_line as u64 * self.line_length as u64;
        let sample_count = (end_line - start_line) as usize * self.line_length;
        self.read_samples(field_id, start_sample * 2, sample_count)
    }

    /// Reads a single stored line of one field.
    pub fn read_line(&mut self, field_id: FieldId, line: u32) -> TbcResult<Vec<u16>> {
        self.read_field_lines(field_id, line, line + 1)
    }
}
