use std::sync::Arc;

use tracing::info;

use crate::dag::executor::RunContext;
use crate::dag::stage::{NodeType, NodeTypeInfo, Stage};
use crate::dag::{DagResult, InvalidParameterSnafu};
use crate::obs::ObservationKey;
use crate::observers::Observer;
use crate::params::ParameterMap;
use crate::pipeline::create_observer;
use crate::repr::{ObservationAttachment, SharedRepresentation};

/// Observer tags this stage runs when the `observers` parameter is absent.
const DEFAULT_OBSERVERS: &str =
    "biphase,field_parity,pulldown,lead_in_out,field_quality,burst_level";

/// Runs a set of observers serially over every field of the input.
///
/// The observers' schemas are registered with the run's observation context, each field is
/// processed in order (observers within a field run in list order, so later observers see
/// earlier results through history), and the populated observations are attached to the
/// output via [`ObservationAttachment`].
///
/// Parameters:
/// - `observers` (string, optional): comma-separated observer tags; defaults to the biphase /
///   parity / pulldown / lead-in-out / quality / burst set the mapping analyzer needs.
#[derive(Debug, Default)]
pub struct ObserversStage;

impl ObserversStage {
    fn build_observers(tags: &str) -> DagResult<Vec<Box<dyn Observer>>> {
        tags.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(|tag| {
                create_observer(tag).map_err(|_| {
                    InvalidParameterSnafu {
                        parameter: String::from("observers"),
                        reason: format!("unknown observer tag {tag:?}"),
                    }
                    .build()
                })
            })
            .collect()
    }
}

impl Stage for ObserversStage {
    fn type_info(&self) -> NodeTypeInfo {
        NodeTypeInfo {
            node_type: NodeType::Transform,
            name: "observers",
            display_name: "Observers",
            description: "Runs per-field observers and attaches their observations",
            min_inputs: 1,
            max_inputs: 1,
            min_outputs: 1,
            max_outputs: 1,
            user_creatable: true,
        }
    }

    fn provided_observations(&self) -> Vec<ObservationKey> {
        Self::build_observers(DEFAULT_OBSERVERS)
            .expect("default observer tags resolve")
            .iter()
            .flat_map(|observer| observer.provided_observations())
            .collect()
    }

    fn execute(
        &self,
        inputs: &[SharedRepresentation],
        parameters: &ParameterMap,
        run: &mut RunContext<'_>,
    ) -> DagResult<Vec<SharedRepresentation>> {
        let source = inputs[0].clone();
        let tags = parameters
            .get("observers")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_OBSERVERS);
        let observers = Self::build_observers(tags)?;

        let sequence_report = crate::observers::validate_observer_sequence(&observers);
        if !sequence_report.is_valid() {
            return crate::dag::ValidationFailedSnafu { errors: sequence_report.errors }.fail();
        }
        for warning in &sequence_report.warnings {
            tracing::warn!("{warning}");
        }

        for observer in &observers {
            run.observations
                .register_schema(&observer.provided_observations())
                .map_err(|error| {
                    crate::dag::ValidationFailedSnafu { errors: vec![error.to_string()] }.build()
                })?;
        }

        let field_range = source.field_range();
        let total = field_range.size();
        info!(observers = observers.len(), fields = total, "running observers");

        for (index, field_id) in field_range.iter().enumerate() {
            if index % 100 == 0 {
                run.progress.set_sub_status(&format!("Observing field {index}/{total}"));
                run.progress
                    .set_progress(((index as u64 * 100) / total.max(1)) as u8);
                snafu::ensure!(
                    !run.progress.is_cancelled(),
                    crate::dag::ExecutionCancelledSnafu
                );
            }
            for observer in &observers {
                let records = {
                    let history = run.observations.history();
                    observer.process_field(source.as_ref(), field_id, &history)
                };
                run.observations.apply_records(field_id, records);
            }
        }

        let attachment =
            ObservationAttachment::new(source, run.observations.clone());
        Ok(vec![Arc::new(attachment) as SharedRepresentation])
    }
}
