//! NTSC 2:3 pulldown detection.
//!
//! Film transferred to NTSC repeats one field of every other frame, which shows up as a
//! repeated colour-sequence phase (normal NTSC counts 1-2-3-4 without repeats) and as fields
//! whose VBI repeats or omits the picture number.  Pulldown only exists on CAV discs; the
//! observer needs the biphase results for the field, so it must run after the biphase observer.

use tracing::debug;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;
use crate::video::VideoFormat;

use super::{Confidence, Observer};

#[cfg(test)]
mod tests;

const NAMESPACE: &str = "pulldown";

/// Detects pulldown fields on NTSC CAV material.
#[derive(Debug, Default)]
pub struct PulldownObserver;

impl Observer for PulldownObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![
            ObservationKey::new(NAMESPACE, "is_pulldown", ObservationType::Bool, "Whether the field repeats film content", false),
            ObservationKey::new(NAMESPACE, "pattern_position", ObservationType::I32, "Position in the five-frame pulldown cycle", true),
            ObservationKey::new(NAMESPACE, "pattern_break", ObservationType::Bool, "Phase and VBI evidence disagree", true),
            ObservationKey::new(NAMESPACE, "confidence", ObservationType::Str, "Detection confidence level", false),
        ]
    }

    fn required_observations(&self) -> Vec<ObservationKey> {
        vec![
            ObservationKey::new("biphase", "confidence", ObservationType::Str, "Decode confidence", false),
            ObservationKey::new("biphase", "picture_number", ObservationType::I32, "CAV picture number", true),
        ]
    }

    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord> {
        let Some(descriptor) = repr.descriptor(field_id) else {
            return Vec::new();
        };
        if descriptor.format != VideoFormat::Ntsc {
            return Vec::new();
        }

        // Without biphase results the disc type is unknown.
        if history.get(field_id, "biphase", "confidence").is_none() {
            return pulldown_records(false, None, false, Confidence::Low);
        }

        // Only CAV discs carry pulldown; a field with no picture number is not one.
        let Some(picture_number) = history.get_i32(field_id, "biphase", "picture_number")
        else {
            return pulldown_records(false, None, false, Confidence::High);
        };

        let phase_suggests = phase_pattern_suggests_pulldown(repr, field_id);
        let vbi_suggests = vbi_pattern_suggests_pulldown(history, field_id, picture_number);

        let pattern_position = Some(picture_number % 5);
        let pattern_break = phase_suggests != vbi_suggests && (phase_suggests || vbi_suggests);

        let (is_pulldown, confidence) = match (phase_suggests, vbi_suggests) {
            (true, true) => (true, Confidence::High),
            (true, false) | (false, true) => (true, Confidence::Medium),
            (false, false) => (false, Confidence::High),
        };

        debug!(
            %field_id,
            is_pulldown,
            phase_suggests,
            vbi_suggests,
            ?pattern_position,
            "pulldown"
        );
        pulldown_records(is_pulldown, pattern_position, pattern_break, confidence)
    }
}

fn pulldown_records(
    is_pulldown: bool,
    pattern_position: Option<i32>,
    pattern_break: bool,
    confidence: Confidence,
) -> Vec<ObservationRecord> {
    let mut records = vec![
        ObservationRecord::new(NAMESPACE, "is_pulldown", is_pulldown),
        ObservationRecord::new(NAMESPACE, "confidence", confidence.to_string()),
    ];
    if let Some(position) = pattern_position {
        records.push(ObservationRecord::new(NAMESPACE, "pattern_position", position));
    }
    if pattern_break {
        records.push(ObservationRecord::new(NAMESPACE, "pattern_break", true));
    }
    records
}

/// Phase evidence: the colour-sequence phase repeats between adjacent fields, or the recent
/// ten-field window shows the repetition density of a 2:3 cadence.
fn phase_pattern_suggests_pulldown(repr: &dyn FieldRepresentation, field_id: FieldId) -> bool {
    let phase_of = |id: FieldId| {
        repr.field_phase_hint(id).map(|h| h.field_phase_id).filter(|&p| p >= 0)
    };

    let Some(current_phase) = phase_of(field_id) else {
        return false;
    };
    let Some(previous) = field_id.predecessor() else {
        return false;
    };
    let Some(previous_phase) = phase_of(previous) else {
        return false;
    };

    if current_phase == previous_phase {
        debug!(%field_id, current_phase, "phase repetition");
        return true;
    }

    // The 2:3 cadence repeats every ten fields; confirm with the repetition density over the
    // last five fields (a clean cadence shows two repeats per five frames).
    if field_id.value() >= 10 {
        if let Some(pattern_phase) = phase_of(field_id.saturating_sub(10)) {
            let phase_diff = (current_phase - pattern_phase).rem_euclid(4);
            if phase_diff == 2 || phase_diff == 0 {
                let mut repetitions = 0;
                for offset in 1..=5u64 {
                    let check = field_id.saturating_sub(offset);
                    let Some(check_previous) = check.predecessor() else {
                        break;
                    };
                    if let (Some(a), Some(b)) = (phase_of(check), phase_of(check_previous)) {
                        if a == b {
                            repetitions += 1;
                        }
                    }
                }
                if repetitions >= 2 {
                    debug!(%field_id, repetitions, "cadence repetition density");
                    return true;
                }
            }
        }
    }
    false
}

/// VBI evidence: the field repeats the previous field's picture number.
fn vbi_pattern_suggests_pulldown(
    history: &ObservationHistory<'_>,
    field_id: FieldId,
    picture_number: i32,
) -> bool {
    field_id
        .predecessor()
        .and_then(|previous| history.get_i32(previous, "biphase", "picture_number"))
        .is_some_and(|previous_picture| previous_picture == picture_number)
}
