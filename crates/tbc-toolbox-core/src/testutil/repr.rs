use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Arc;

use crate::field::{FieldId, FieldIdRange};
use crate::hints::{DropoutHint, FieldParityHint, FieldPhaseHint, HintSource};
use crate::obs::{FieldObservations, ObservationContext, ObservationValue};
use crate::repr::{ArtifactId, FieldRepresentation, LineView, Provenance};
use crate::video::{standard_field_height, FieldDescriptor, FieldParity, VideoParameters};

/// In-memory representation with painted sample data, for observer and analyzer tests.
#[derive(Debug)]
pub(crate) struct SyntheticRepresentation {
    params: Option<VideoParameters>,
    width: u32,
    stored_height: u32,
    start: u64,
    fields: Vec<Vec<u16>>,
    parity_hints: BTreeMap<u64, FieldParityHint>,
    phase_hints: BTreeMap<u64, FieldPhaseHint>,
    dropouts: BTreeMap<u64, Vec<DropoutHint>>,
    observations: ObservationContext,
    artifact_id: ArtifactId,
}

impl SyntheticRepresentation {
    /// Creates `field_count` fields filled with the black level of `params`.
    pub(crate) fn new(params: VideoParameters, field_count: usize) -> Self {
        let width = params.field_width;
        let stored_height = params.field_height;
        let fill = params.black_16b_ire;
        SyntheticRepresentation {
            params: Some(params),
            width,
            stored_height,
            start: 0,
            fields: vec![vec![fill; (width * stored_height) as usize]; field_count],
            parity_hints: BTreeMap::new(),
            phase_hints: BTreeMap::new(),
            dropouts: BTreeMap::new(),
            observations: ObservationContext::new(),
            artifact_id: ArtifactId::next(),
        }
    }

    /// Creates fields with no video parameters attached.
    #[allow(dead_code)]
    pub(crate) fn without_params(width: u32, stored_height: u32, field_count: usize) -> Self {
        SyntheticRepresentation {
            params: None,
            width,
            stored_height,
            start: 0,
            fields: vec![vec![0; (width * stored_height) as usize]; field_count],
            parity_hints: BTreeMap::new(),
            phase_hints: BTreeMap::new(),
            dropouts: BTreeMap::new(),
            observations: ObservationContext::new(),
            artifact_id: ArtifactId::next(),
        }
    }

    fn params_ref(&self) -> &VideoParameters {
        self.params.as_ref().expect("fixture has video parameters")
    }

    /// Mutable access to one stored line.
    pub(crate) fn line_mut(&mut self, field: usize, line: u32) -> &mut [u16] {
        let width = self.width as usize;
        let offset = line as usize * width;
        &mut self.fields[field][offset..offset + width]
    }

    /// Fills a whole stored line with one value.
    #[allow(dead_code)]
    pub(crate) fn fill_line(&mut self, field: usize, line: u32, value: u16) {
        self.line_mut(field, line).fill(value);
    }

    /// Paints a below-black pulse of `width_samples` starting at an absolute sample offset
    /// within the field.
    pub(crate) fn paint_pulse(&mut self, field: usize, start_sample: usize, width_samples: usize) {
        let sync_tip = 1_000;
        let samples = &mut self.fields[field];
        let end = (start_sample + width_samples).min(samples.len());
        samples[start_sample..end].fill(sync_tip);
    }

    /// Raises the whole field to a mid-grey so that no stray sample reads as a sync pulse.
    pub(crate) fn lift_to_grey(&mut self, field: usize) {
        let grey = {
            let p = self.params_ref();
            (p.black_16b_ire / 2) + (p.white_16b_ire / 2)
        };
        self.fields[field].fill(grey);
    }

    /// Manchester-encodes a 24-bit biphase code onto one line, starting at the active-video
    /// start with the standard 2 us cells.  Codes must have bit 23 set (all IEC 60857 codes
    /// do): the decoder treats the first mid-cell transition as a 1.
    pub(crate) fn paint_biphase_line(&mut self, field: usize, line: u32, code: u32) {
        let p = *self.params_ref();
        let low = p.black_16b_ire;
        let high = p.white_16b_ire;
        let cell = 2.0 * p.samples_per_us();
        let start = p.active_video_start as f64;
        let line_samples = self.line_mut(field, line);
        for bit_index in 0..24 {
            let bit = (code >> (23 - bit_index)) & 1 == 1;
            let cell_start = start + bit_index as f64 * cell;
            let cell_mid = cell_start + cell / 2.0;
            let cell_end = cell_start + cell;
            for sample in cell_start as usize..(cell_end as usize).min(line_samples.len()) {
                let in_first_half = (sample as f64) < cell_mid;
                let level_high = if bit { !in_first_half } else { in_first_half };
                line_samples[sample] = if level_high { high } else { low };
            }
        }
    }

    /// Paints a sinusoidal colour burst of the given peak amplitude into the burst region of
    /// one line.
    pub(crate) fn paint_burst_sine(&mut self, field: usize, line: u32, amplitude: f64) {
        let p = *self.params_ref();
        let (start, end) = (p.colour_burst_start as usize, p.colour_burst_end as usize);
        let mid = f64::from(p.black_16b_ire) + 2.0 * amplitude;
        let line_samples = self.line_mut(field, line);
        for idx in start..=end.min(line_samples.len() - 1) {
            let phase = 2.0 * PI * ((idx - start) as f64) / 8.0;
            line_samples[idx] = (mid + amplitude * phase.sin()) as u16;
        }
    }

    /// Paints a square burst whose zero crossings read as predominantly rising or falling.
    ///
    /// The pattern is tuned to the inclusive PAL burst window (41 samples): nine significant
    /// crossings, the majority rising when `rising` is set.
    pub(crate) fn paint_burst_square(&mut self, field: usize, line: u32, amplitude: f64, rising: bool) {
        let p = *self.params_ref();
        let (start, end) = (p.colour_burst_start as usize, p.colour_burst_end as usize);
        let mid = f64::from(p.black_16b_ire) + 2.0 * amplitude;
        let line_samples = self.line_mut(field, line);
        for idx in start..=end.min(line_samples.len() - 1) {
            let block = (idx - start) / 4;
            let is_high = if block >= 9 { rising } else { (block % 2 == 1) == rising };
            let offset = if is_high { amplitude } else { -amplitude };
            line_samples[idx] = (mid + offset) as u16;
        }
    }

    /// Attaches a field parity hint.
    pub(crate) fn set_parity_hint(&mut self, field: u64, is_first_field: bool) {
        self.parity_hints.insert(
            field,
            FieldParityHint {
                is_first_field,
                source: HintSource::Metadata,
                confidence_pct: HintSource::Metadata.default_confidence(),
            },
        );
    }

    /// Attaches a colour-sequence phase hint.
    pub(crate) fn set_phase_hint(&mut self, field: u64, field_phase_id: i32) {
        self.phase_hints.insert(
            field,
            FieldPhaseHint {
                field_phase_id,
                source: HintSource::Metadata,
                confidence_pct: HintSource::Metadata.default_confidence(),
            },
        );
    }

    /// Attaches dropout hints.
    pub(crate) fn set_dropouts(&mut self, field: u64, count: usize) {
        let hints = (0..count)
            .map(|i| DropoutHint {
                line: 30 + i as u32,
                start_sample: 100,
                end_sample: 200,
                source: HintSource::Metadata,
                confidence_pct: HintSource::Metadata.default_confidence(),
            })
            .collect();
        self.dropouts.insert(field, hints);
    }

    /// Attaches an observation, as if an observer had already run.
    pub(crate) fn set_observation(
        &mut self,
        field: u64,
        namespace: &str,
        name: &str,
        value: impl Into<ObservationValue>,
    ) {
        self.observations.set(FieldId::new(field), namespace, name, value).unwrap();
    }
}

impl FieldRepresentation for SyntheticRepresentation {
    fn field_range(&self) -> FieldIdRange {
        FieldIdRange::new(
            FieldId::new(self.start),
            FieldId::new(self.start + self.fields.len() as u64),
        )
    }

    fn descriptor(&self, id: FieldId) -> Option<FieldDescriptor> {
        if !self.has_field(id) {
            return None;
        }
        let (format, height) = match &self.params {
            Some(p) => (p.system.format(), standard_field_height(p.system, self.stored_height)),
            None => (crate::video::VideoFormat::Unknown, self.stored_height),
        };
        let is_first = self
            .parity_hints
            .get(&id.value())
            .map(|h| h.is_first_field)
            .unwrap_or(id.value() % 2 == 0);
        Some(FieldDescriptor {
            field_id: id,
            parity: if is_first { FieldParity::Top } else { FieldParity::Bottom },
            format,
            width: self.width,
            height,
            frame_number: None,
        })
    }

    fn line(&self, id: FieldId, line: u32) -> Option<LineView> {
        let descriptor = self.descriptor(id)?;
        if line >= descriptor.height {
            return None;
        }
        let index = (id.value() - self.start) as usize;
        let samples: Arc<[u16]> = Arc::from(self.fields[index].as_slice());
        LineView::new(samples, (line * self.width) as usize, self.width as usize)
    }

    fn field(&self, id: FieldId) -> Option<Vec<u16>> {
        let descriptor = self.descriptor(id)?;
        let index = (id.value() - self.start) as usize;
        let length = (descriptor.height * self.width) as usize;
        Some(self.fields[index][..length].to_vec())
    }

    fn video_parameters(&self) -> Option<VideoParameters> {
        self.params
    }

    fn field_parity_hint(&self, id: FieldId) -> Option<FieldParityHint> {
        self.parity_hints.get(&id.value()).copied()
    }

    fn field_phase_hint(&self, id: FieldId) -> Option<FieldPhaseHint> {
        self.phase_hints.get(&id.value()).copied()
    }

    fn dropout_hints(&self, id: FieldId) -> Vec<DropoutHint> {
        self.dropouts.get(&id.value()).cloned().unwrap_or_default()
    }

    fn observations(&self, id: FieldId) -> FieldObservations {
        self.observations.all_for_field(id)
    }

    fn type_name(&self) -> &'static str {
        "SyntheticRepresentation"
    }

    fn artifact_id(&self) -> ArtifactId {
        self.artifact_id
    }

    fn provenance(&self) -> Provenance {
        Provenance::new("testutil", "synthetic fixture")
    }
}
