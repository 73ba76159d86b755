//! Median colour-burst level measurement.

use tracing::debug;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;

use super::{burst, Observer};


const NAMESPACE: &str = "burst_level";

/// Burst levels above this are treated as measurement artifacts and discarded.
const OUTLIER_IRE: f64 = 30.0;

/// Measures the median colour-burst amplitude of a field in IRE.
///
/// Three representative lines are sampled (top, middle and bottom of the active area); each
/// line's burst window is DC-centered and its RMS scaled to a peak amplitude, outliers are
/// discarded, and the median of the survivors is converted to IRE.
#[derive(Debug, Default)]
pub struct BurstLevelObserver;

impl Observer for BurstLevelObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![ObservationKey::new(
            NAMESPACE,
            "median_burst_ire",
            ObservationType::F64,
            "Median colour-burst peak amplitude in IRE",
            true,
        )]
    }

    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        _history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord> {
        field_burst_level_ire(repr, field_id)
            .map(|ire| vec![ObservationRecord::new(NAMESPACE, "median_burst_ire", ire)])
            .unwrap_or_default()
    }
}

/// Computes the median burst level of one field in IRE, or `None` when no usable burst sample
/// survives.
pub(crate) fn field_burst_level_ire(
    repr: &dyn FieldRepresentation,
    field_id: FieldId,
) -> Option<f64> {
    let descriptor = repr.descriptor(field_id)?;
    let params = repr.video_parameters().filter(|p| p.is_valid())?;

    let start_line = 11u32;
    let end_line = repr
        .active_line_hint(field_id)
        .filter(|h| h.last_active_field_line > start_line as i32)
        .map(|h| h.last_active_field_line as u32)
        .unwrap_or(descriptor.height.saturating_sub(10))
        .min(descriptor.height);
    if end_line <= start_line {
        return None;
    }

    let sample_lines =
        [start_line, start_line + (end_line - start_line) / 2, end_line - 1];

    let ire_per_code = params.ire_per_code();
    let mut levels = Vec::new();
    for line in sample_lines {
        let Some(peak) = burst::line_burst_peak(repr, field_id, line, &params) else {
            continue;
        };
        if peak * ire_per_code > OUTLIER_IRE {
            continue;
        }
        levels.push(peak);
    }

    if levels.is_empty() {
        return None;
    }
    let median_ire = burst::median(levels) * ire_per_code;
    debug!(%field_id, median_ire, "burst level");
    Some(median_ire)
}
