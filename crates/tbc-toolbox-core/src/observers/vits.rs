//! Vertical-interval test signal helpers shared by the white SNR and black PSNR observers.

use crate::field::FieldId;
use crate::repr::FieldRepresentation;
use crate::video::VideoFormat;

/// One candidate slice of a VITS line, in microseconds from the line start.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineSlice {
    /// 1-based field line number.
    pub(crate) line: u32,
    pub(crate) start_us: f64,
    pub(crate) length_us: f64,
}

/// Reads one VITS slice and converts it to IRE.  Returns an empty vector when the slice is
/// unavailable.
pub(crate) fn line_slice_ire(
    repr: &dyn FieldRepresentation,
    field_id: FieldId,
    slice: LineSlice,
) -> Vec<f64> {
    let Some(descriptor) = repr.descriptor(field_id) else {
        return Vec::new();
    };
    let Some(params) = repr.video_parameters().filter(|p| p.is_valid()) else {
        return Vec::new();
    };

    // 1-based line numbering in the slice tables.
    let line_index = slice.line.saturating_sub(1);
    if line_index >= descriptor.height {
        return Vec::new();
    }

    let us_per_line = match descriptor.format {
        VideoFormat::Pal => 64.0,
        _ => 63.5,
    };
    let samples_per_us = f64::from(descriptor.width) / us_per_line;
    let start_sample = (slice.start_us * samples_per_us) as usize;
    let length_samples = (slice.length_us * samples_per_us) as usize;
    if start_sample + length_samples > descriptor.width as usize {
        return Vec::new();
    }

    let Some(line) = repr.line(field_id, line_index) else {
        return Vec::new();
    };
    line[start_sample..start_sample + length_samples]
        .iter()
        .map(|&s| params.code_to_ire(s))
        .collect()
}

pub(crate) fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

pub(crate) fn stddev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    (data.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / data.len() as f64).sqrt()
}

/// `20 * log10(signal / noise)`, capped at 80 dB for effectively noiseless slices.
pub(crate) fn ratio_db(signal: f64, noise: f64) -> f64 {
    if noise <= 0.001 {
        return 80.0;
    }
    20.0 * (signal / noise).log10()
}
