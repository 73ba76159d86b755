//! Whole-capture signal-quality sweeps.
//!
//! The burst-level and SNR measurements are independent per field, so the sweeps fan the field
//! range out across the rayon worker pool and join.  Results land in one slot per field, so the
//! output order is deterministic regardless of completion order.  Progress is reported and
//! cancellation observed once per 100-field chunk.

use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::field::FieldId;
use crate::observers::{black_psnr_of, burst_level_of, white_snr_of};
use crate::repr::FieldRepresentation;

use super::progress::AnalysisProgress;
use super::{AnalyzerResult, CancelledSnafu};

/// Chunk granularity for progress and cancellation checks.
const CHUNK_FIELDS: usize = 100;

/// Burst level of one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBurstLevel {
    /// The measured field.
    pub field_id: FieldId,
    /// Median burst amplitude in IRE, when measurable.
    pub median_burst_ire: Option<f64>,
}

/// SNR measurements of one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSnr {
    /// The measured field.
    pub field_id: FieldId,
    /// White SNR in dB, when a white reference was found.
    pub white_snr_db: Option<f64>,
    /// Black PSNR in dB, when the black line was readable.
    pub black_psnr_db: Option<f64>,
}

fn sweep<T: Send>(
    repr: &dyn FieldRepresentation,
    progress: &dyn AnalysisProgress,
    what: &str,
    per_field: impl Fn(FieldId) -> T + Sync,
) -> AnalyzerResult<Vec<T>> {
    let ids: Vec<FieldId> = repr.field_range().iter().collect();
    let total = ids.len();
    let completed = AtomicUsize::new(0);

    let chunks: AnalyzerResult<Vec<Vec<T>>> = ids
        .par_chunks(CHUNK_FIELDS)
        .map(|chunk| {
            snafu::ensure!(!progress.is_cancelled(), CancelledSnafu);
            let results: Vec<T> = chunk.iter().map(|&id| per_field(id)).collect();
            let done = completed.fetch_add(chunk.len(), Ordering::Relaxed) + chunk.len();
            progress.set_sub_status(&format!("{what} {done}/{total}"));
            progress.set_progress(((done * 100) / total.max(1)) as u8);
            Ok(results)
        })
        .collect();

    Ok(chunks?.into_iter().flatten().collect())
}

/// Measures the median burst level of every field in the capture.
pub fn burst_level_sweep(
    repr: &dyn FieldRepresentation,
    progress: &dyn AnalysisProgress,
) -> AnalyzerResult<Vec<FieldBurstLevel>> {
    progress.set_status("Measuring burst levels");
    sweep(repr, progress, "burst level", |field_id| FieldBurstLevel {
        field_id,
        median_burst_ire: burst_level_of(repr, field_id),
    })
}

/// Measures the white SNR and black PSNR of every field in the capture.
pub fn snr_sweep(
    repr: &dyn FieldRepresentation,
    progress: &dyn AnalysisProgress,
) -> AnalyzerResult<Vec<FieldSnr>> {
    progress.set_status("Measuring SNR");
    sweep(repr, progress, "SNR", |field_id| FieldSnr {
        field_id,
        white_snr_db: white_snr_of(repr, field_id),
        black_psnr_db: black_psnr_of(repr, field_id),
    })
}
