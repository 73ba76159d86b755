//! The observer framework and the built-in per-field signal analyzers.
//!
//! An observer reads one field's samples (and, through the history view, earlier observations)
//! and stages what it finds as [`ObservationRecord`]s.  The engine applies the records to the
//! live [`crate::obs::ObservationContext`] after each call, so an observer running later in the
//! same field sees the results of observers that ran before it.
//!
//! Observers never fail: when a value cannot be determined they simply stage nothing for the
//! affected keys, and consumers treat the absence as "unknown".

use std::fmt;

use derive_more::derive::Display;

use crate::field::FieldId;
use crate::obs::{ObservationHistory, ObservationKey, ObservationRecord};
use crate::params::{ConfigResult, ParameterDescriptor, ParameterMap};
use crate::repr::FieldRepresentation;

pub(crate) mod burst;
pub(crate) mod vbi;
pub(crate) mod vits;

mod biphase;
mod black_psnr;
mod burst_level;
mod closed_caption;
mod field_parity;
mod field_quality;
mod fm_code;
mod lead_in_out;
mod pal_phase;
mod pulldown;
mod video_id;
mod vitc;
mod white_flag;
mod white_snr;

pub(crate) use black_psnr::field_black_psnr as black_psnr_of;
pub(crate) use burst_level::field_burst_level_ire as burst_level_of;
pub(crate) use white_snr::field_white_snr as white_snr_of;

pub use biphase::BiphaseObserver;
pub use black_psnr::BlackPsnrObserver;
pub use burst_level::BurstLevelObserver;
pub use closed_caption::ClosedCaptionObserver;
pub use field_parity::FieldParityObserver;
pub use field_quality::FieldQualityObserver;
pub use fm_code::FmCodeObserver;
pub use lead_in_out::LeadInOutObserver;
pub use pal_phase::PalPhaseObserver;
pub use pulldown::PulldownObserver;
pub use video_id::VideoIdObserver;
pub use vitc::VitcObserver;
pub use white_flag::WhiteFlagObserver;
pub use white_snr::WhiteSnrObserver;

/// Confidence attached to an observation.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    /// No valid observation could be made.
    #[display("none")]
    None,
    /// Weak evidence.
    #[display("low")]
    Low,
    /// Reasonable evidence.
    #[display("medium")]
    Medium,
    /// Strong evidence.
    #[display("high")]
    High,
}

impl Confidence {
    /// Maps a 0-100 percentage onto the four confidence levels.
    pub fn from_pct(pct: u8) -> Self {
        match pct {
            75.. => Confidence::High,
            50.. => Confidence::Medium,
            25.. => Confidence::Low,
            _ => Confidence::None,
        }
    }
}

/// A per-field signal analyzer.
///
/// Implementations are stateless per invocation: any cross-field state lives in the observation
/// context and is reached through the [`ObservationHistory`] view, which only ever exposes
/// results written before the current call.
pub trait Observer: fmt::Debug + Send + Sync {
    /// Stable machine name; also the namespace the observer writes under.
    fn name(&self) -> &'static str;

    /// Implementation version.
    fn version(&self) -> &'static str {
        "1.0"
    }

    /// The observation keys this observer may write.
    fn provided_observations(&self) -> Vec<ObservationKey>;

    /// Observation keys this observer reads from earlier observers.
    fn required_observations(&self) -> Vec<ObservationKey> {
        Vec::new()
    }

    /// Declarative schema of the observer's configuration parameters.
    fn configuration_schema(&self) -> Vec<ParameterDescriptor> {
        Vec::new()
    }

    /// Applies a configuration.  The default implementation validates against
    /// [`Observer::configuration_schema`] and accepts; observers with parameters override this
    /// to store them.
    fn configure(&mut self, config: &ParameterMap) -> ConfigResult<()> {
        crate::params::validate_configuration(&self.configuration_schema(), config)
    }

    /// Analyzes one field, staging any observations made.
    fn process_field(
        &self,
        repr: &dyn FieldRepresentation,
        field_id: FieldId,
        history: &ObservationHistory<'_>,
    ) -> Vec<ObservationRecord>;
}

/// Validation outcome for an ordered observer sequence.
#[derive(Debug, Default)]
pub struct ObserverSequenceReport {
    /// Missing-requirement messages; the sequence must not run when non-empty.
    pub errors: Vec<String>,
    /// Duplicate-provider messages (a later observer overrides an earlier key).
    pub warnings: Vec<String>,
}

impl ObserverSequenceReport {
    /// Whether the sequence may run.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks that every observer's required observations are provided by an observer earlier in
/// the sequence, accumulating provisions in order.  Duplicate providers are reported as
/// warnings (the later writer overrides).
pub fn validate_observer_sequence(observers: &[Box<dyn Observer>]) -> ObserverSequenceReport {
    let mut report = ObserverSequenceReport::default();
    let mut available: Vec<ObservationKey> = Vec::new();

    for (position, observer) in observers.iter().enumerate() {
        for required in observer.required_observations() {
            if !available.iter().any(|k| k == &required) {
                report.errors.push(format!(
                    "observer '{}' at position {position} requires observation '{}' which is \
                     not provided by any earlier observer",
                    observer.name(),
                    required.full_key()
                ));
            }
        }
        for provided in observer.provided_observations() {
            if available.iter().any(|k| k == &provided) {
                report.warnings.push(format!(
                    "observer '{}' provides observation '{}' which is already provided by an \
                     earlier observer (later write overrides)",
                    observer.name(),
                    provided.full_key()
                ));
            } else {
                available.push(provided);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests;
