use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::BoundedCache;
use crate::field::{FieldId, FieldIdRange};
use crate::hints::{ActiveLineHint, DropoutHint, FieldParityHint, FieldPhaseHint, HintSource};
use crate::repr::{ArtifactId, FieldRepresentation, LineView, Provenance};
use crate::video::{standard_field_height, FieldDescriptor, FieldParity, VideoParameters};

use super::{MetadataFile, TbcReader, TbcResult};

/// How many materialized fields the sample cache retains.
pub(crate) const SAMPLE_CACHE_FIELDS: usize = 100;

/// Concrete [`FieldRepresentation`] backed by a TBC capture and its sidecar metadata.
///
/// Fields are materialized on demand through a bounded LRU cache, so observers that walk lines
/// of the same field repeatedly only pay for one read.  The reader and the cache are behind
/// mutexes: the representation is shared read-only across worker threads during parallel
/// sweeps.
#[derive(Debug)]
pub struct TbcFieldRepresentation {
    reader: Mutex<TbcReader>,
    metadata: MetadataFile,
    params: Option<VideoParameters>,
    active_line: Option<ActiveLineHint>,
    cache: Mutex<BoundedCache<FieldId, Arc<[u16]>>>,
    field_count: u64,
    line_length: usize,
    stored_height: u32,
    artifact_id: ArtifactId,
    detail: String,
}

impl TbcFieldRepresentation {
    /// Opens a capture and its sidecar metadata.
    ///
    /// When `metadata_path` is `None`, the conventional `<tbc_path>.json` sidecar is used.
    /// The field geometry comes from the sidecar's video parameters.
    pub fn open(tbc_path: &Path, metadata_path: Option<&Path>) -> TbcResult<Self> {
        let default_sidecar = {
            let mut os = tbc_path.as_os_str().to_owned();
            os.push(".json");
            std::path::PathBuf::from(os)
        };
        let sidecar = metadata_path.unwrap_or(&default_sidecar);

        let metadata = MetadataFile::open(sidecar)?;
        let params = metadata.video_parameters();
        let (field_length, line_length) = match &params {
            Some(p) => ((p.field_width * p.field_height) as usize, p.field_width as usize),
            None => (0, 0),
        };
        snafu::ensure!(
            field_length > 0,
            super::BadGeometrySnafu { field_length, line_length }
        );

        let reader = TbcReader::open(tbc_path, field_length, line_length)?;
        debug!(
            tbc = %tbc_path.display(),
            sidecar = %sidecar.display(),
            fields = reader.field_count(),
            "opened TBC capture"
        );
        Ok(Self::new(reader, metadata))
    }

    /// Builds a representation from an already-open reader and metadata.
    pub fn new(reader: TbcReader, metadata: MetadataFile) -> Self {
        let params = metadata.video_parameters();
        let active_line = metadata.active_line_hint();
        let field_count = reader.field_count();
        let line_length = if reader.line_length() > 0 {
            reader.line_length()
        } else {
            params.map(|p| p.field_width as usize).unwrap_or(0)
        };
        let stored_height = params.map(|p| p.field_height).unwrap_or_else(|| {
            reader.lines_per_field().unwrap_or(0)
        });
        let detail = reader.path().display().to_string();
        TbcFieldRepresentation {
            reader: Mutex::new(reader),
            metadata,
            params,
            active_line,
            cache: Mutex::new(BoundedCache::new(
                NonZeroUsize::new(SAMPLE_CACHE_FIELDS).unwrap(),
            )),
            field_count,
            line_length,
            stored_height,
            artifact_id: ArtifactId::next(),
            detail,
        }
    }

    /// The sidecar metadata backing this representation.
    pub fn metadata(&self) -> &MetadataFile {
        &self.metadata
    }

    fn is_first_field(&self, id: FieldId) -> bool {
        self.metadata
            .field_metadata(id)
            .and_then(|m| m.is_first_field)
            .unwrap_or(id.value() % 2 == 0)
    }

    fn cached_field(&self, id: FieldId) -> Option<Arc<[u16]>> {
        let mut cache = self.cache.lock();
        if let Some(samples) = cache.get(&id) {
            return Some(Arc::clone(samples));
        }
        drop(cache);

        let samples = match self.reader.lock().read_field(id) {
            Ok(samples) => Arc::<[u16]>::from(samples),
            Err(error) => {
                trace!(%id, %error, "field read failed");
                return None;
            }
        };
        self.cache.lock().put(id, Arc::clone(&samples));
        Some(samples)
    }
}

impl FieldRepresentation for TbcFieldRepresentation {
    fn field_range(&self) -> FieldIdRange {
        FieldIdRange::new(FieldId::new(0), FieldId::new(self.field_count))
    }

    fn descriptor(&self, id: FieldId) -> Option<FieldDescriptor> {
        if !self.has_field(id) {
            return None;
        }
        let params = self.params?;
        let is_first = self.is_first_field(id);
        Some(FieldDescriptor {
            field_id: id,
            parity: if is_first { FieldParity::Top } else { FieldParity::Bottom },
            format: params.system.format(),
            width: params.field_width,
            height: standard_field_height(params.system, self.stored_height),
            frame_number: None,
        })
    }

    fn line(&self, id: FieldId, line: u32) -> Option<LineView> {
        let descriptor = self.descriptor(id)?;
        if line >= descriptor.height || self.line_length == 0 {
            return None;
        }
        let samples = self.cached_field(id)?;
        LineView::new(samples, line as usize * self.line_length, self.line_length)
    }

    fn field(&self, id: FieldId) -> Option<Vec<u16>> {
        let descriptor = self.descriptor(id)?;
        let samples = self.cached_field(id)?;
        let wanted = descriptor.height as usize * self.line_length;
        Some(samples[..wanted.min(samples.len())].to_vec())
    }

    fn video_parameters(&self) -> Option<VideoParameters> {
        self.params
    }

    fn field_parity_hint(&self, id: FieldId) -> Option<FieldParityHint> {
        let is_first_field = self.metadata.field_metadata(id)?.is_first_field?;
        Some(FieldParityHint {
            is_first_field,
            source: HintSource::Metadata,
            confidence_pct: HintSource::Metadata.default_confidence(),
        })
    }

    fn field_phase_hint(&self, id: FieldId) -> Option<FieldPhaseHint> {
        let field_phase_id = self.metadata.field_metadata(id)?.field_phase_id?;
        Some(FieldPhaseHint {
            field_phase_id,
            source: HintSource::Metadata,
            confidence_pct: HintSource::Metadata.default_confidence(),
        })
    }

    fn active_line_hint(&self, _id: FieldId) -> Option<ActiveLineHint> {
        self.active_line
    }

    fn dropout_hints(&self, id: FieldId) -> Vec<DropoutHint> {
        self.metadata.dropouts(id)
    }

    fn type_name(&self) -> &'static str {
        "TbcFieldRepresentation"
    }

    fn artifact_id(&self) -> ArtifactId {
        self.artifact_id
    }

    fn provenance(&self) -> Provenance {
        Provenance::new("tbc_source", &self.detail)
    }
}
