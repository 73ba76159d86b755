//! PAL eight-field colour-sequence phase detection.
//!
//! The four-field half of the sequence follows from field parity and the presence of colour
//! burst on line 6 (burst is blanked there on two of the four fields); whether the field sits
//! in the first or second four comes from the majority zero-crossing direction of the burst on
//! lines 7, 11, 15 and 19, offset by the parity-dependent line offset.  Phase 2 inverts that
//! determination.

use tracing::debug;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;
use crate::video::System;

use super::{burst, Confidence, FieldParityObserver, Observer};

#[cfg(test)]
mod tests;

const NAMESPACE: &str = "pal_phase";

/// Determines the PAL field phase (1..=8).
#[derive(Debug, Default)]
pub struct PalPhaseObserver;

impl Observer for PalPhaseObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![
            ObservationKey::new(NAMESPACE, "phase_id", ObservationType::I32, "PAL field phase, 1..=8 (1..=4 when only the four-field half is known)", true),
            ObservationKey::new(NAMESPACE, "confidence", ObservationType::Str, "Detection confidence level", true),
        ]
    }

    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord> {
        let Some(params) = repr.video_parameters().filter(|p| p.is_valid()) else {
            return Vec::new();
        };
        if params.system != System::Pal {
            return Vec::new();
        }

        // Field parity is a precondition.  Prefer the parity observer's result from history;
        // compute it on the spot when the observer is not in the pipeline.
        let is_first_field = match history.get_i32(field_id, "field_parity", "confidence_pct") {
            Some(confidence_pct) if confidence_pct >= 25 => {
                history.get_bool(field_id, "field_parity", "is_first_field").unwrap_or(false)
            }
            Some(_) => return Vec::new(),
            None => {
                let records = FieldParityObserver.process_field(repr, field_id, history);
                let confident = records
                    .iter()
                    .find(|r| r.name == "confidence_pct")
                    .and_then(|r| r.value.as_i32())
                    .is_some_and(|pct| pct >= 25);
                if !confident {
                    return Vec::new();
                }
                records
                    .iter()
                    .find(|r| r.name == "is_first_field")
                    .and_then(|r| r.value.as_bool())
                    .unwrap_or(false)
            }
        };

        let line_offset: u32 = if is_first_field { 2 } else { 3 };

        // Median burst level over the field as the reference for line 6.
        let mut burst_levels = Vec::new();
        for line in 11..300 {
            if let Some(level) = burst::line_burst_peak(repr, field_id, line, &params) {
                burst_levels.push(level);
            }
        }
        if burst_levels.is_empty() {
            return Vec::new();
        }
        let median_burst = burst::median(burst_levels);

        let Some(burst6) = burst::line_burst_peak(repr, field_id, 6 + line_offset, &params)
        else {
            return Vec::new();
        };
        let has_burst_line6 = if burst6 >= median_burst * 0.8 && burst6 <= median_burst * 1.2 {
            true
        } else if burst6 < median_burst * 0.2 {
            false
        } else {
            // Ambiguous burst level on line 6.
            return Vec::new();
        };

        let phase_4field = match (is_first_field, has_burst_line6) {
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
            (false, false) => 4,
        };

        // First four vs second four: majority crossing direction over four burst lines.
        let mut rising_count = 0u32;
        let mut total_count = 0u32;
        for line in [7u32, 11, 15, 19] {
            if let Some(rising) =
                burst::line_burst_rising(repr, field_id, line + line_offset, &params)
            {
                if rising {
                    rising_count += 1;
                }
                total_count += 1;
            }
        }

        if total_count == 0 || rising_count * 2 == total_count {
            // Cannot break the tie; at least the four-field half is known.
            return vec![
                ObservationRecord::new(NAMESPACE, "phase_id", phase_4field),
                ObservationRecord::new(NAMESPACE, "confidence", Confidence::Low.to_string()),
            ];
        }

        let mut is_first_four = rising_count * 2 > total_count;
        if phase_4field == 2 {
            is_first_four = !is_first_four;
        }

        let phase_id = phase_4field + if is_first_four { 0 } else { 4 };
        let confidence =
            if total_count >= 3 { Confidence::High } else { Confidence::Medium };

        debug!(%field_id, phase_id, %confidence, "PAL phase");
        vec![
            ObservationRecord::new(NAMESPACE, "phase_id", phase_id),
            ObservationRecord::new(NAMESPACE, "confidence", confidence.to_string()),
        ]
    }
}
