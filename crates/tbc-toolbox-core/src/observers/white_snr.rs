//! White SNR measurement from the vertical-interval test signals.

use tracing::debug;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;
use crate::video::VideoFormat;

use super::vits::{self, LineSlice};
use super::Observer;

#[cfg(test)]
mod tests;

const NAMESPACE: &str = "white_snr";

/// White reference slices, tried in order until one reads as white.
fn white_slices(format: VideoFormat) -> &'static [LineSlice] {
    match format {
        VideoFormat::Pal => &[LineSlice { line: 19, start_us: 12.0, length_us: 8.0 }],
        _ => &[
            LineSlice { line: 20, start_us: 14.0, length_us: 12.0 },
            LineSlice { line: 20, start_us: 52.0, length_us: 8.0 },
            LineSlice { line: 13, start_us: 13.0, length_us: 15.0 },
        ],
    }
}

/// Measures the signal-to-noise ratio of the white VITS reference.
#[derive(Debug, Default)]
pub struct WhiteSnrObserver;

impl Observer for WhiteSnrObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![ObservationKey::new(
            NAMESPACE,
            "snr_db",
            ObservationType::F64,
            "White SNR in dB, capped at 80",
            true,
        )]
    }

    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        _history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord> {
        field_white_snr(repr, field_id)
            .map(|snr_db| vec![ObservationRecord::new(NAMESPACE, "snr_db", snr_db)])
            .unwrap_or_default()
    }
}

/// Computes the white SNR for one field, trying each candidate slice until one's mean sits in
/// the 90-110 IRE window expected of a white reference.
pub(crate) fn field_white_snr(repr: &dyn FieldRepresentation, field_id: FieldId) -> Option<f64> {
    let format = repr.descriptor(field_id)?.format;
    for slice in white_slices(format) {
        let samples = vits::line_slice_ire(repr, field_id, *slice);
        if samples.is_empty() {
            continue;
        }
        let white_mean = vits::mean(&samples);
        if (90.0..=110.0).contains(&white_mean) {
            let snr_db = vits::ratio_db(white_mean, vits::stddev(&samples));
            debug!(%field_id, snr_db, white_mean, "white SNR");
            return Some(snr_db);
        }
    }
    None
}
