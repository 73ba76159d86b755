//! The polymorphic field representation and its wrappers.
//!
//! A [`FieldRepresentation`] exposes a contiguous half-open range of fields together with their
//! samples, descriptors, hints and observations.  Concrete representations either own (or read)
//! their samples, like [`crate::tbc::TbcFieldRepresentation`], or wrap another representation
//! and override selected accessors without touching the sample bytes.
//!
//! Representations are shared by owning handle ([`SharedRepresentation`]); wrappers hold such a
//! handle to their source, so a wrapper keeps its source alive.  Wrappers never point forward in
//! the processing graph, so no reference cycles can form.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::field::{FieldId, FieldIdRange};
use crate::hints::{ActiveLineHint, DropoutHint, FieldParityHint, FieldPhaseHint, HintSource};
use crate::obs::{FieldObservations, ObservationContext};
use crate::video::{standard_field_height, FieldDescriptor, VideoParameters};

#[cfg(test)]
mod tests;

/// Identifies one artifact (representation) produced during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactId(u64);

static NEXT_ARTIFACT_ID: AtomicU64 = AtomicU64::new(1);

impl ArtifactId {
    /// Allocates a fresh process-unique artifact ID.
    pub fn next() -> Self {
        ArtifactId(NEXT_ARTIFACT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value, for display.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifact-{}", self.0)
    }
}

/// Records which stage created a representation and from what.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Provenance {
    /// Name of the stage (or component) that created the representation.
    pub created_by: String,
    /// Free-form description of the source material or transformation.
    pub detail: String,
}

impl Provenance {
    /// Creates a provenance record.
    pub fn new(created_by: &str, detail: &str) -> Self {
        Provenance { created_by: created_by.to_owned(), detail: detail.to_owned() }
    }
}

/// A borrowed view of one line's samples.
///
/// The view shares ownership of the materialized field it slices into, so it stays valid after
/// the representation's internal cache moves on.  No sample bytes are copied.
#[derive(Debug, Clone)]
pub struct LineView {
    samples: Arc<[u16]>,
    offset: usize,
    length: usize,
}

impl LineView {
    /// Creates a view of `samples[offset..offset + length]`.  Returns `None` when the window
    /// falls outside the buffer.
    pub fn new(samples: Arc<[u16]>, offset: usize, length: usize) -> Option<Self> {
        if offset.checked_add(length)? <= samples.len() {
            Some(LineView { samples, offset, length })
        } else {
            None
        }
    }

    /// The line's samples.
    pub fn as_slice(&self) -> &[u16] {
        &self.samples[self.offset..self.offset + self.length]
    }

    /// Number of samples in the line.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the line is empty.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl Deref for LineView {
    type Target = [u16];

    fn deref(&self) -> &[u16] {
        self.as_slice()
    }
}

/// Owning handle to a representation, shared between stages and wrappers.
pub type SharedRepresentation = Arc<dyn FieldRepresentation>;

/// Abstract accessor for a contiguous range of video fields.
///
/// Line indices are 0-based within the standards-compliant field height; [`line`] and [`field`]
/// return `None`/absence for indices at or beyond that height, even when the underlying
/// container stores padding there.  [`field`] always truncates trailing container padding.
///
/// Observers receive representations as `&dyn FieldRepresentation` (borrowed views); only
/// stages and wrappers hold owning [`SharedRepresentation`] handles.
///
/// [`line`]: FieldRepresentation::line
/// [`field`]: FieldRepresentation::field
pub trait FieldRepresentation: fmt::Debug + Send + Sync {
    /// The contiguous half-open range of fields this representation exposes.
    fn field_range(&self) -> FieldIdRange;

    /// Number of fields exposed.
    fn field_count(&self) -> u64 {
        self.field_range().size()
    }

    /// Whether `id` falls within [`FieldRepresentation::field_range`].
    fn has_field(&self, id: FieldId) -> bool {
        self.field_range().contains(id)
    }

    /// Descriptor for one field, or `None` outside the range.
    fn descriptor(&self, id: FieldId) -> Option<FieldDescriptor>;

    /// One line of samples, or `None` when `line` is at or beyond the standards height or the
    /// data is unavailable.
    fn line(&self, id: FieldId, line: u32) -> Option<LineView>;

    /// A whole field's samples, truncated to `descriptor.height * line_length` (container
    /// padding never leaks through).
    fn field(&self, id: FieldId) -> Option<Vec<u16>>;

    /// The per-source video parameters, when known.
    fn video_parameters(&self) -> Option<VideoParameters>;

    /// Field parity hint, when one is available.
    fn field_parity_hint(&self, _id: FieldId) -> Option<FieldParityHint> {
        None
    }

    /// Colour-sequence phase hint, when one is available.
    fn field_phase_hint(&self, _id: FieldId) -> Option<FieldPhaseHint> {
        None
    }

    /// Active-picture line range hint, when one is available.
    fn active_line_hint(&self, _id: FieldId) -> Option<ActiveLineHint> {
        None
    }

    /// Dropout hints for one field.
    fn dropout_hints(&self, _id: FieldId) -> Vec<DropoutHint> {
        Vec::new()
    }

    /// Observations attached to one field.
    fn observations(&self, _id: FieldId) -> FieldObservations {
        FieldObservations::default()
    }

    /// Short name of the concrete representation type.
    fn type_name(&self) -> &'static str;

    /// Identity of this artifact within the run.
    fn artifact_id(&self) -> ArtifactId;

    /// Who created this representation and from what.
    fn provenance(&self) -> Provenance;
}

/// Derives an [`ActiveLineHint`] from video parameters and the system's standard field height.
///
/// Used by [`VideoParamsOverride`] when substituted parameters invalidate the source's hint.
pub(crate) fn derive_active_line_hint(params: &VideoParameters) -> ActiveLineHint {
    let field_height = standard_field_height(params.system, params.field_height) as i32;
    // Conventional first active picture line for both 525- and 625-line systems, counted
    // within one field.
    let first_field_line = 22.min(field_height.saturating_sub(1));
    ActiveLineHint {
        first_active_frame_line: first_field_line * 2,
        last_active_frame_line: field_height * 2 - 1,
        first_active_field_line: first_field_line,
        last_active_field_line: field_height - 1,
        source: HintSource::SampleAnalysis,
        confidence_pct: HintSource::SampleAnalysis.default_confidence(),
    }
}

/// Wrapper substituting the video parameters (and the derived active-line hint) of a source
/// representation.  Samples and all other accessors pass through.
#[derive(Debug)]
pub struct VideoParamsOverride {
    source: SharedRepresentation,
    params: VideoParameters,
    active_line: ActiveLineHint,
    artifact_id: ArtifactId,
}

impl VideoParamsOverride {
    /// Wraps `source`, overriding its video parameters with `params`.
    pub fn new(source: SharedRepresentation, params: VideoParameters) -> Self {
        let active_line = derive_active_line_hint(&params);
        VideoParamsOverride { source, params, active_line, artifact_id: ArtifactId::next() }
    }
}

impl FieldRepresentation for VideoParamsOverride {
    fn field_range(&self) -> FieldIdRange {
        self.source.field_range()
    }

    fn descriptor(&self, id: FieldId) -> Option<FieldDescriptor> {
        let source_descriptor = self.source.descriptor(id)?;
        // The substituted parameters change the claimed system, so the format and the
        // standards height are re-derived; the stored line layout is unchanged.
        Some(FieldDescriptor {
            format: self.params.system.format(),
            width: self.params.field_width,
            height: standard_field_height(self.params.system, self.params.field_height)
                .min(source_descriptor.height.max(1)),
            ..source_descriptor
        })
    }

    fn line(&self, id: FieldId, line: u32) -> Option<LineView> {
        if line >= self.descriptor(id)?.height {
            return None;
        }
        self.source.line(id, line)
    }

    fn field(&self, id: FieldId) -> Option<Vec<u16>> {
        self.source.field(id)
    }

    fn video_parameters(&self) -> Option<VideoParameters> {
        Some(self.params)
    }

    fn field_parity_hint(&self, id: FieldId) -> Option<FieldParityHint> {
        self.source.field_parity_hint(id)
    }

    fn field_phase_hint(&self, id: FieldId) -> Option<FieldPhaseHint> {
        self.source.field_phase_hint(id)
    }

    fn active_line_hint(&self, _id: FieldId) -> Option<ActiveLineHint> {
        Some(self.active_line)
    }

    fn dropout_hints(&self, id: FieldId) -> Vec<DropoutHint> {
        self.source.dropout_hints(id)
    }

    fn observations(&self, id: FieldId) -> FieldObservations {
        self.source.observations(id)
    }

    fn type_name(&self) -> &'static str {
        "VideoParamsOverride"
    }

    fn artifact_id(&self) -> ArtifactId {
        self.artifact_id
    }

    fn provenance(&self) -> Provenance {
        Provenance::new("video_params", &format!("override of {}", self.source.artifact_id()))
    }
}

/// Wrapper exposing a supplied set of per-field observations, falling back to the source's own
/// observations for fields the supplied set does not cover.
#[derive(Debug)]
pub struct ObservationAttachment {
    source: SharedRepresentation,
    attached: ObservationContext,
    artifact_id: ArtifactId,
}

impl ObservationAttachment {
    /// Wraps `source`, attaching the observations accumulated in `attached`.
    pub fn new(source: SharedRepresentation, attached: ObservationContext) -> Self {
        ObservationAttachment { source, attached, artifact_id: ArtifactId::next() }
    }

    /// The attached observation context.
    pub fn context(&self) -> &ObservationContext {
        &self.attached
    }
}

impl FieldRepresentation for ObservationAttachment {
    fn field_range(&self) -> FieldIdRange {
        self.source.field_range()
    }

    fn descriptor(&self, id: FieldId) -> Option<FieldDescriptor> {
        self.source.descriptor(id)
    }

    fn line(&self, id: FieldId, line: u32) -> Option<LineView> {
        self.source.line(id, line)
    }

    fn field(&self, id: FieldId) -> Option<Vec<u16>> {
        self.source.field(id)
    }

    fn video_parameters(&self) -> Option<VideoParameters> {
        self.source.video_parameters()
    }

    fn field_parity_hint(&self, id: FieldId) -> Option<FieldParityHint> {
        self.source.field_parity_hint(id)
    }

    fn field_phase_hint(&self, id: FieldId) -> Option<FieldPhaseHint> {
        self.source.field_phase_hint(id)
    }

    fn active_line_hint(&self, id: FieldId) -> Option<ActiveLineHint> {
        self.source.active_line_hint(id)
    }

    fn dropout_hints(&self, id: FieldId) -> Vec<DropoutHint> {
        self.source.dropout_hints(id)
    }

    fn observations(&self, id: FieldId) -> FieldObservations {
        let attached = self.attached.all_for_field(id);
        if attached.is_empty() {
            self.source.observations(id)
        } else {
            attached
        }
    }

    fn type_name(&self) -> &'static str {
        "ObservationAttachment"
    }

    fn artifact_id(&self) -> ArtifactId {
        self.artifact_id
    }

    fn provenance(&self) -> Provenance {
        Provenance::new("observers", &format!("observations over {}", self.source.artifact_id()))
    }
}
