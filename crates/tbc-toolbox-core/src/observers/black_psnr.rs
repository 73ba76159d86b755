//! Black PSNR measurement from the vertical-interval test signals.

use tracing::debug;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;
use crate::video::VideoFormat;

use super::vits::{self, LineSlice};
use super::Observer;


const NAMESPACE: &str = "black_psnr";

fn black_slice(format: VideoFormat) -> LineSlice {
    match format {
        VideoFormat::Pal => LineSlice { line: 22, start_us: 12.0, length_us: 50.0 },
        _ => LineSlice { line: 1, start_us: 10.0, length_us: 20.0 },
    }
}

/// Measures peak signal-to-noise against the black reference line.
#[derive(Debug, Default)]
pub struct BlackPsnrObserver;

impl Observer for BlackPsnrObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![ObservationKey::new(
            NAMESPACE,
            "psnr_db",
            ObservationType::F64,
            "Black PSNR in dB against a 100 IRE reference, capped at 80",
            true,
        )]
    }

    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        _history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord> {
        field_black_psnr(repr, field_id)
            .map(|psnr_db| vec![ObservationRecord::new(NAMESPACE, "psnr_db", psnr_db)])
            .unwrap_or_default()
    }
}

/// Computes the black PSNR for one field: noise measured on the black line, referenced to a
/// 100 IRE signal.
pub(crate) fn field_black_psnr(repr: &dyn FieldRepresentation, field_id: FieldId) -> Option<f64> {
    let format = repr.descriptor(field_id)?.format;
    let samples = vits::line_slice_ire(repr, field_id, black_slice(format));
    if samples.is_empty() {
        return None;
    }
    let psnr_db = vits::ratio_db(100.0, vits::stddev(&samples));
    debug!(%field_id, psnr_db, "black PSNR");
    Some(psnr_db)
}
