//! Shared colour-burst measurement helpers.

use crate::field::FieldId;
use crate::repr::FieldRepresentation;
use crate::video::VideoParameters;

/// Root-mean-square of a centered sample window.
pub(crate) fn rms(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    (data.iter().map(|v| v * v).sum::<f64>() / data.len() as f64).sqrt()
}

/// Median of an unsorted set; the mean of the middle pair for even counts.
pub(crate) fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

/// Collects the burst-region samples of one line, DC-centered.  Returns `None` when the line or
/// the burst window is unavailable or too short.
pub(crate) fn centered_burst_samples(
    repr: &dyn FieldRepresentation,
    field_id: FieldId,
    line: u32,
    params: &VideoParameters,
    minimum: usize,
) -> Option<Vec<f64>> {
    let line_data = repr.line(field_id, line)?;
    let start = params.colour_burst_start as usize;
    let end = (params.colour_burst_end as usize).min(line_data.len().checked_sub(1)?);
    if end <= start {
        return None;
    }

    let samples: Vec<f64> =
        line_data[start..=end].iter().map(|&s| f64::from(s)).collect();
    if samples.len() < minimum {
        return None;
    }

    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    Some(samples.into_iter().map(|s| s - mean).collect())
}

/// Peak burst amplitude of one line in raw 16-bit code units: RMS of the centered burst window
/// scaled by sqrt(2).
pub(crate) fn line_burst_peak(
    repr: &dyn FieldRepresentation,
    field_id: FieldId,
    line: u32,
    params: &VideoParameters,
) -> Option<f64> {
    let centered = centered_burst_samples(repr, field_id, line, params, 4)?;
    Some(rms(&centered) * 2.0_f64.sqrt())
}

/// Whether the zero crossings of one line's burst are predominantly rising.
///
/// Returns `None` when the signal is too weak or has too few crossings to judge.
pub(crate) fn line_burst_rising(
    repr: &dyn FieldRepresentation,
    field_id: FieldId,
    line: u32,
    params: &VideoParameters,
) -> Option<bool> {
    let centered = centered_burst_samples(repr, field_id, line, params, 8)?;
    let threshold = rms(&centered);
    if threshold < 1.0 {
        return None;
    }

    let mut rising_count = 0u32;
    let mut total_crossings = 0u32;
    for window in centered.windows(2) {
        let (prev, current) = (window[0], window[1]);
        let crossed = (prev < 0.0 && current >= 0.0) || (prev >= 0.0 && current < 0.0);
        if crossed {
            total_crossings += 1;
            if current.abs() > threshold * 0.3 && prev < 0.0 && current >= 0.0 {
                rising_count += 1;
            }
        }
    }

    if total_crossings < 8 {
        return None;
    }
    Some(rising_count > total_crossings / 2)
}
