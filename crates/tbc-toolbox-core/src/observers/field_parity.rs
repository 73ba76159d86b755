//! Field parity detection from the vertical-blanking pulse train.
//!
//! Sync pulses in the vblank region are classified by width (horizontal sync, equalizing,
//! vertical sync); the spacing of the pulses bracketing the blank run determines whether the
//! field is the first or second of its interlaced pair.  When the pulse analysis is
//! inconclusive the observer falls back to flipping the previous field's parity from history,
//! and failing that to the field ID's own parity.

use tracing::debug;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;
use crate::video::{System, VideoParameters};

use super::{Confidence, Observer};

#[cfg(test)]
mod tests;

const NAMESPACE: &str = "field_parity";

/// Minimum number of classified pulses for the vblank analysis to be meaningful.
const MIN_PULSES: usize = 15;

/// How many lines from the top of the field to scan for pulses.
const SEARCH_LINES: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PulseType {
    Hsync,
    Equalizing,
    Vsync,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ClassifiedPulse {
    pub(crate) position: usize,
    pub(crate) pulse_type: PulseType,
}

/// Determines field parity from the vblank pulse train.
#[derive(Debug, Default)]
pub struct FieldParityObserver;

impl Observer for FieldParityObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![
            ObservationKey::new(NAMESPACE, "is_first_field", ObservationType::Bool, "Whether the field is the first of its pair", false),
            ObservationKey::new(NAMESPACE, "confidence_pct", ObservationType::I32, "Detection confidence, 0-100", false),
            ObservationKey::new(NAMESPACE, "confidence", ObservationType::Str, "Detection confidence level", false),
        ]
    }

    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord> {
        let id_fallback = field_id.value() % 2 == 0;

        let Some(params) = repr.video_parameters().filter(|p| p.is_valid()) else {
            return parity_records(id_fallback, 0);
        };

        let Some(field_data) = repr.field(field_id).filter(|f| !f.is_empty()) else {
            return parity_records(id_fallback, 25);
        };

        let pulses = find_sync_pulses(&field_data, &params);
        if pulses.len() < MIN_PULSES {
            return parity_records(id_fallback, 25);
        }

        let (mut is_first_field, mut confidence_pct) = match params.system {
            System::Pal => analyze_pal_parity(&pulses, &params),
            _ => analyze_ntsc_parity(&pulses, &params),
        };

        // Inconclusive pulse analysis: flip the previous field's parity from history, then fall
        // back to the field ID itself.  History lookups only reach strictly smaller IDs.
        if confidence_pct == 0 {
            if let Some(previous) = field_id.predecessor().and_then(|prev| {
                history.get_bool(prev, NAMESPACE, "is_first_field")
            }) {
                is_first_field = !previous;
                confidence_pct = 60;
                debug!(%field_id, is_first_field, "parity from previous field");
            } else {
                is_first_field = id_fallback;
                confidence_pct = 50;
                debug!(%field_id, is_first_field, "parity from field id");
            }
        }

        debug!(%field_id, is_first_field, confidence_pct, "field parity");
        parity_records(is_first_field, confidence_pct)
    }
}

fn parity_records(is_first_field: bool, confidence_pct: u8) -> Vec<ObservationRecord> {
    vec![
        ObservationRecord::new(NAMESPACE, "is_first_field", is_first_field),
        ObservationRecord::new(NAMESPACE, "confidence_pct", i32::from(confidence_pct)),
        ObservationRecord::new(
            NAMESPACE,
            "confidence",
            Confidence::from_pct(confidence_pct).to_string(),
        ),
    ]
}

/// Finds and classifies below-black pulses in the top [`SEARCH_LINES`] lines of a field.
pub(crate) fn find_sync_pulses(
    field_data: &[u16],
    params: &VideoParameters,
) -> Vec<ClassifiedPulse> {
    let samples_per_line = params.field_width as usize;
    let search_samples = field_data.len().min(samples_per_line * SEARCH_LINES);

    // Slice 5 IRE below black: sync tips sit well below, active video well above.
    let ire_step = f64::from(params.white_16b_ire - params.black_16b_ire) / 100.0;
    let sync_threshold = params.black_16b_ire.saturating_sub((5.0 * ire_step) as u16);

    let spu = params.samples_per_us();
    let hsync = ((4.7 - 1.75) * spu)..=((4.7 + 2.0) * spu);
    let equalizing = ((2.3 - 0.5) * spu)..=((2.3 + 0.5) * spu);
    let vsync = (27.1 * 0.5 * spu)..=((27.3 + 1.0) * spu);

    let mut pulses = Vec::new();
    let mut in_pulse = false;
    let mut pulse_start = 0usize;

    for (i, &sample) in field_data[..search_samples].iter().enumerate() {
        let below = sample < sync_threshold;
        if below && !in_pulse {
            pulse_start = i;
            in_pulse = true;
        } else if !below && in_pulse {
            let width = (i - pulse_start) as f64;
            let position = (pulse_start + i) / 2;
            let pulse_type = if hsync.contains(&width) {
                Some(PulseType::Hsync)
            } else if equalizing.contains(&width) {
                Some(PulseType::Equalizing)
            } else if vsync.contains(&width) {
                Some(PulseType::Vsync)
            } else {
                None
            };
            if let Some(pulse_type) = pulse_type {
                pulses.push(ClassifiedPulse { position, pulse_type });
            }
            in_pulse = false;
        }
    }
    pulses
}

/// Locates the vblank pulse run bracketing the vertical sync: returns the indices of its first
/// and last pulse.  Requires the field to start before the vblank (at least ten pulses ahead of
/// the first vertical sync).
fn blank_range(pulses: &[ClassifiedPulse]) -> Option<(usize, usize)> {
    let firstvsync = pulses.iter().position(|p| p.pulse_type == PulseType::Vsync)?;
    if firstvsync < 10 {
        // The capture starts inside the vblank; the bracketing gaps cannot be measured.
        return None;
    }

    for newstart in (firstvsync - 10)..=(firstvsync - 4) {
        let fb = (newstart..pulses.len())
            .find(|&i| pulses[i].pulse_type != PulseType::Hsync)?;
        let Some(next_hsync) =
            (fb..pulses.len()).find(|&i| pulses[i].pulse_type == PulseType::Hsync)
        else {
            continue;
        };
        let lb = next_hsync - 1;
        if lb - fb > 12 {
            return Some((fb, lb));
        }
    }
    None
}

fn bracketing_gaps(pulses: &[ClassifiedPulse], samples_per_line: f64) -> Option<(f64, f64)> {
    let (firstblank, lastblank) = blank_range(pulses)?;
    if firstblank < 1 || lastblank + 1 >= pulses.len() {
        return None;
    }
    let gap1 = (pulses[firstblank].position - pulses[firstblank - 1].position) as f64;
    let gap2 = (pulses[lastblank + 1].position - pulses[lastblank].position) as f64;
    Some((gap1 / samples_per_line, gap2 / samples_per_line))
}

/// PAL: the gaps on both sides of the blank run are equal (within 0.3H); a leading gap of
/// about half a line marks the first field.
fn analyze_pal_parity(pulses: &[ClassifiedPulse], params: &VideoParameters) -> (bool, u8) {
    let samples_per_line = f64::from(params.field_width);
    let Some((gap1, gap2)) = bracketing_gaps(pulses, samples_per_line) else {
        return (false, 0);
    };

    if (gap2 - gap1).abs() > 0.3 {
        return (false, 25);
    }
    let is_first_field = (0.45..=0.55).contains(&gap1);
    (is_first_field, 50)
}

/// NTSC: the two gaps sum to about one and a half lines; a leading gap of about one full line
/// marks the first field.
fn analyze_ntsc_parity(pulses: &[ClassifiedPulse], params: &VideoParameters) -> (bool, u8) {
    let samples_per_line = f64::from(params.field_width);
    let Some((gap1, gap2)) = bracketing_gaps(pulses, samples_per_line) else {
        return (false, 0);
    };

    let gap_sum = (gap1 + gap2).abs();
    if !(1.4..=1.6).contains(&gap_sum) {
        return (false, 25);
    }
    let is_first_field = (0.95..=1.05).contains(&gap1);
    (is_first_field, 50)
}
