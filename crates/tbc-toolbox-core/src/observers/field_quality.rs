//! Per-field quality scoring from upstream dropout information.
//!
//! The score feeds duplicate resolution in the field-mapping analyzer: when two frames carry
//! the same VBI number, the one whose fields dropped out less wins.

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;

use super::Observer;


const NAMESPACE: &str = "field_quality";

/// Scores a field by its dropout count: 1.0 for a clean field, falling towards 0 as dropouts
/// accumulate.
#[derive(Debug, Default)]
pub struct FieldQualityObserver;

impl Observer for FieldQualityObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![ObservationKey::new(
            NAMESPACE,
            "score",
            ObservationType::F64,
            "Field quality in (0, 1]; 1.0 is dropout-free",
            true,
        )]
    }

    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        _history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord> {
        if repr.descriptor(field_id).is_none() {
            return Vec::new();
        }
        let dropouts = repr.dropout_hints(field_id).len();
        let score = 1.0 / (1.0 + dropouts as f64);
        vec![ObservationRecord::new(NAMESPACE, "score", score)]
    }
}
