use std::sync::Arc;

use snafu::ResultExt;
use tracing::info;

use crate::analysis::{MappingItem, MappingSpec};
use crate::dag::executor::RunContext;
use crate::dag::stage::{NodeType, NodeTypeInfo, Stage};
use crate::dag::{DagResult, InvalidParameterSnafu, MissingParameterSnafu, SpecParseSnafu};
use crate::field::{FieldId, FieldIdRange};
use crate::hints::{ActiveLineHint, DropoutHint, FieldParityHint, FieldPhaseHint};
use crate::obs::FieldObservations;
use crate::params::ParameterMap;
use crate::repr::{
    ArtifactId, FieldRepresentation, LineView, Provenance, SharedRepresentation,
};
use crate::video::{FieldDescriptor, FieldParity, VideoParameters};

/// One output position of a field map.
#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Passes a source field through.
    Source(FieldId),
    /// A synthesized black field.
    Pad,
}

/// Wrapper that reorders, selects and pads a source representation according to a
/// [`MappingSpec`].
///
/// Output field IDs are a fresh contiguous space `0..n`; each maps either to a source field
/// (samples pass through by handle) or to a synthesized black field.
#[derive(Debug)]
pub struct FieldMapRepresentation {
    source: SharedRepresentation,
    slots: Vec<Slot>,
    params: Option<VideoParameters>,
    black_line: Arc<[u16]>,
    artifact_id: ArtifactId,
}

impl FieldMapRepresentation {
    /// Builds the mapping, validating that every referenced field exists in the source.
    pub fn new(source: SharedRepresentation, spec: &MappingSpec) -> DagResult<Self> {
        let source_range = source.field_range();
        let mut slots = Vec::new();
        for item in spec.items() {
            match *item {
                MappingItem::Range { first, last } => {
                    snafu::ensure!(
                        source_range.contains(first) && source_range.contains(last),
                        InvalidParameterSnafu {
                            parameter: String::from("mapping_spec"),
                            reason: format!(
                                "range {first}-{last} lies outside the source fields \
                                 {source_range}"
                            ),
                        }
                    );
                    slots.extend(
                        (first.value()..=last.value()).map(|id| Slot::Source(FieldId::new(id))),
                    );
                }
                MappingItem::Pad { fields } => {
                    slots.extend(std::iter::repeat(Slot::Pad).take(fields as usize));
                }
            }
        }

        let params = source.video_parameters();
        let (width, black) = params
            .map(|p| (p.field_width as usize, p.black_16b_ire))
            .unwrap_or((0, 0));
        Ok(FieldMapRepresentation {
            source,
            slots,
            params,
            black_line: Arc::from(vec![black; width].as_slice()),
            artifact_id: ArtifactId::next(),
        })
    }

    fn slot(&self, id: FieldId) -> Option<Slot> {
        if !id.is_valid() {
            return None;
        }
        self.slots.get(id.value() as usize).copied()
    }
}

impl FieldRepresentation for FieldMapRepresentation {
    fn field_range(&self) -> FieldIdRange {
        FieldIdRange::new(FieldId::new(0), FieldId::new(self.slots.len() as u64))
    }

    fn descriptor(&self, id: FieldId) -> Option<FieldDescriptor> {
        match self.slot(id)? {
            Slot::Source(source_id) => {
                // The descriptor is re-addressed into the output coordinate space.
                let descriptor = self.source.descriptor(source_id)?;
                Some(FieldDescriptor { field_id: id, ..descriptor })
            }
            Slot::Pad => {
                let params = self.params?;
                Some(FieldDescriptor {
                    field_id: id,
                    parity: if id.value() % 2 == 0 {
                        FieldParity::Top
                    } else {
                        FieldParity::Bottom
                    },
                    format: params.system.format(),
                    width: params.field_width,
                    height: crate::video::standard_field_height(
                        params.system,
                        params.field_height,
                    ),
                    frame_number: None,
                })
            }
        }
    }

    fn line(&self, id: FieldId, line: u32) -> Option<LineView> {
        match self.slot(id)? {
            Slot::Source(source_id) => self.source.line(source_id, line),
            Slot::Pad => {
                let descriptor = self.descriptor(id)?;
                if line >= descriptor.height {
                    return None;
                }
                LineView::new(Arc::clone(&self.black_line), 0, self.black_line.len())
            }
        }
    }

    fn field(&self, id: FieldId) -> Option<Vec<u16>> {
        match self.slot(id)? {
            Slot::Source(source_id) => self.source.field(source_id),
            Slot::Pad => {
                let descriptor = self.descriptor(id)?;
                let length = descriptor.height as usize * self.black_line.len();
                let black = *self.black_line.first().unwrap_or(&0);
                Some(vec![black; length])
            }
        }
    }

    fn video_parameters(&self) -> Option<VideoParameters> {
        self.params
    }

    fn field_parity_hint(&self, id: FieldId) -> Option<FieldParityHint> {
        match self.slot(id)? {
            Slot::Source(source_id) => self.source.field_parity_hint(source_id),
            Slot::Pad => None,
        }
    }

    fn field_phase_hint(&self, id: FieldId) -> Option<FieldPhaseHint> {
        match self.slot(id)? {
            Slot::Source(source_id) => self.source.field_phase_hint(source_id),
            Slot::Pad => None,
        }
    }

    fn active_line_hint(&self, id: FieldId) -> Option<ActiveLineHint> {
        self.source.active_line_hint(id)
    }

    fn dropout_hints(&self, id: FieldId) -> Vec<DropoutHint> {
        match self.slot(id) {
            Some(Slot::Source(source_id)) => self.source.dropout_hints(source_id),
            _ => Vec::new(),
        }
    }

    fn observations(&self, id: FieldId) -> FieldObservations {
        match self.slot(id) {
            Some(Slot::Source(source_id)) => self.source.observations(source_id),
            _ => FieldObservations::default(),
        }
    }

    fn type_name(&self) -> &'static str {
        "FieldMapRepresentation"
    }

    fn artifact_id(&self) -> ArtifactId {
        self.artifact_id
    }

    fn provenance(&self) -> Provenance {
        Provenance::new("field_map", &format!("remap of {}", self.source.artifact_id()))
    }
}

/// Reorders, selects and pads fields according to a mapping specification.
///
/// Parameters:
/// - `mapping_spec` (string, required): the specification, typically emitted by the
///   field-mapping analyzer.
#[derive(Debug, Default)]
pub struct FieldMapStage;

impl Stage for FieldMapStage {
    fn type_info(&self) -> NodeTypeInfo {
        NodeTypeInfo {
            node_type: NodeType::Transform,
            name: "field_map",
            display_name: "Field Map",
            description: "Reorders and pads fields per a mapping specification",
            min_inputs: 1,
            max_inputs: 1,
            min_outputs: 1,
            max_outputs: 1,
            user_creatable: true,
        }
    }

    fn execute(
        &self,
        inputs: &[SharedRepresentation],
        parameters: &ParameterMap,
        _run: &mut RunContext<'_>,
    ) -> DagResult<Vec<SharedRepresentation>> {
        let spec_text = parameters
            .get("mapping_spec")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                MissingParameterSnafu {
                    stage_type: String::from("field_map"),
                    parameter: String::from("mapping_spec"),
                }
                .build()
            })?;
        let spec = MappingSpec::parse(spec_text).context(SpecParseSnafu)?;

        let mapped = FieldMapRepresentation::new(inputs[0].clone(), &spec)?;
        info!(
            output_fields = mapped.field_count(),
            items = spec.items().len(),
            "applied field map"
        );
        Ok(vec![Arc::new(mapped) as SharedRepresentation])
    }
}
