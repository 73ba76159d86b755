//! Lead-in / lead-out region detection.
//!
//! The programme area of a disc is bracketed by lead-in and lead-out regions signalled by
//! dedicated VBI codes; a decoded CAV picture number of zero likewise marks lead-in.  The
//! field's position within the capture disambiguates lead-in from lead-out.

use tracing::debug;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;

use super::{Confidence, Observer};


const NAMESPACE: &str = "lead_in_out";

/// Fields this close to the capture edges are assumed to be on the matching side of the
/// programme.
const EDGE_FIELDS: u64 = 100;

/// Flags fields inside the lead-in or lead-out regions.
#[derive(Debug, Default)]
pub struct LeadInOutObserver;

impl Observer for LeadInOutObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![
            ObservationKey::new(NAMESPACE, "is_lead_in_out", ObservationType::Bool, "Field lies outside the programme area", false),
            ObservationKey::new(NAMESPACE, "is_lead_in", ObservationType::Bool, "Field lies in the lead-in region", true),
            ObservationKey::new(NAMESPACE, "is_lead_out", ObservationType::Bool, "Field lies in the lead-out region", true),
            ObservationKey::new(NAMESPACE, "confidence", ObservationType::Str, "Detection confidence level", false),
        ]
    }

    fn required_observations(&self) -> Vec<ObservationKey> {
        vec![
            ObservationKey::new("biphase", "lead_in", ObservationType::Bool, "Lead-in code present", true),
            ObservationKey::new("biphase", "lead_out", ObservationType::Bool, "Lead-out code present", true),
        ]
    }

    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord> {
        if repr.descriptor(field_id).is_none() {
            return Vec::new();
        }

        // Without biphase results nothing can be concluded.
        if history.get(field_id, "biphase", "confidence").is_none() {
            return vec![
                ObservationRecord::new(NAMESPACE, "is_lead_in_out", false),
                ObservationRecord::new(NAMESPACE, "confidence", Confidence::Low.to_string()),
            ];
        }

        let lead_in_marker =
            history.get_bool(field_id, "biphase", "lead_in").unwrap_or(false);
        let lead_out_marker =
            history.get_bool(field_id, "biphase", "lead_out").unwrap_or(false);
        let illegal_zero =
            history.get_bool(field_id, "biphase", "cav_picture_zero").unwrap_or(false);

        let is_lead_in_out = lead_in_marker || lead_out_marker || illegal_zero;
        let mut records = vec![
            ObservationRecord::new(NAMESPACE, "is_lead_in_out", is_lead_in_out),
            ObservationRecord::new(NAMESPACE, "confidence", Confidence::High.to_string()),
        ];

        if is_lead_in_out {
            // Prefer the explicit markers; fall back to the position within the capture.
            let range = repr.field_range();
            let near_start = field_id < range.start.saturating_add(EDGE_FIELDS);
            let near_end = field_id >= range.end.saturating_sub(EDGE_FIELDS);
            if lead_in_marker || (illegal_zero && near_start) {
                records.push(ObservationRecord::new(NAMESPACE, "is_lead_in", true));
            } else if lead_out_marker || near_end {
                records.push(ObservationRecord::new(NAMESPACE, "is_lead_out", true));
            }
            debug!(%field_id, lead_in_marker, lead_out_marker, illegal_zero, "lead-in/out");
        }
        records
    }
}
