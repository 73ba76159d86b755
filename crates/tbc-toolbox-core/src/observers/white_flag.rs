//! NTSC white-flag detection (line 11).
//!
//! The white flag marks the first field of a film frame on some CAV discs: the whole active
//! part of line 11 is driven to white.

use tracing::debug;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord, ObservationType};
use crate::repr::FieldRepresentation;
use crate::video::VideoFormat;

use super::Observer;


const NAMESPACE: &str = "white_flag";

/// Detects the NTSC white flag.
#[derive(Debug, Default)]
pub struct WhiteFlagObserver;

impl Observer for WhiteFlagObserver {
    fn name(&self) -> &'static str {
        NAMESPACE
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        vec![ObservationKey::new(
            NAMESPACE,
            "present",
            ObservationType::Bool,
            "White flag present on line 11",
            true,
        )]
    }

    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        _history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord> {
        let Some(descriptor) = repr.descriptor(field_id) else {
            return Vec::new();
        };
        if descriptor.format != VideoFormat::Ntsc {
            return Vec::new();
        }

        // Line 11, 0-based.
        let Some(line) = repr.line(field_id, 10) else {
            return Vec::new();
        };
        let Some(params) = repr.video_parameters().filter(|p| p.is_valid()) else {
            return Vec::new();
        };
        let zero_crossing = params.vbi_slice_level();

        // Look at the middle three quarters of the line, clear of sync and blanking.
        let active_start = descriptor.width as usize / 8;
        let active_end = descriptor.width as usize * 7 / 8;
        if active_end <= active_start {
            return Vec::new();
        }

        let white_count =
            line[active_start..active_end].iter().filter(|&&s| s > zero_crossing).count();
        let present = white_count > (active_end - active_start) / 2;

        debug!(%field_id, present, white_count, "white flag");
        vec![ObservationRecord::new(NAMESPACE, "present", present)]
    }
}
