use std::collections::BTreeMap;

use snafu::IntoError;
use tracing::{debug, info};

use crate::analysis::{AnalysisProgress, NullProgress};
use crate::obs::ObservationContext;
use crate::repr::SharedRepresentation;

use super::registry::StageRegistry;
use super::{validate, Dag, DagResult, NodeId, StageFailedSnafu};

/// Mutable state shared by the stages of one run.
pub struct RunContext<'a> {
    /// The run's observation store.  Exclusive to the run.
    pub observations: &'a mut ObservationContext,
    /// Progress sink and cancellation source.
    pub progress: &'a dyn AnalysisProgress,
}

impl std::fmt::Debug for RunContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext").field("observations", self.observations).finish()
    }
}

impl<'a> RunContext<'a> {
    /// Creates a run context.
    pub fn new(
        observations: &'a mut ObservationContext,
        progress: &'a dyn AnalysisProgress,
    ) -> Self {
        RunContext { observations, progress }
    }
}

/// Executes pipelines.
///
/// Execution walks the topological order from the virtual root.  Each node's stage receives
/// the outputs of its input nodes, concatenated in input-list order, and its outputs are held
/// for downstream consumers; representations are shared by handle, never copied.  The first
/// stage failure stops the run: the stage's failure hook fires and a single error kind plus
/// message is surfaced.
#[derive(Debug, Default)]
pub struct DagExecutor;

impl DagExecutor {
    /// Creates an executor.
    pub fn new() -> Self {
        DagExecutor
    }

    /// Validates and executes a whole pipeline, returning every node's outputs.
    pub fn execute(
        &self,
        dag: &Dag,
        registry: &StageRegistry,
        run: &mut RunContext<'_>,
    ) -> DagResult<BTreeMap<NodeId, Vec<SharedRepresentation>>> {
        let report = validate(dag, registry)?;
        for warning in &report.warnings {
            tracing::warn!("{warning}");
        }

        let order = dag.topological_order()?;
        info!(nodes = order.len(), "executing pipeline");

        let mut outputs: BTreeMap<NodeId, Vec<SharedRepresentation>> = BTreeMap::new();
        for id in order {
            snafu::ensure!(!run.progress.is_cancelled(), super::ExecutionCancelledSnafu);

            let node = dag.node(id).expect("ordered node exists");
            let stage = registry.create(&node.stage_type).expect("validated stage type");

            let inputs: Vec<SharedRepresentation> = node
                .inputs
                .iter()
                .flat_map(|input| outputs.get(input).cloned().unwrap_or_default())
                .collect();

            debug!(%id, stage = %node.stage_type, inputs = inputs.len(), "executing stage");
            match stage.execute(&inputs, &node.parameters, run) {
                Ok(stage_outputs) => {
                    outputs.insert(id, stage_outputs);
                }
                Err(error) => {
                    stage.on_failure(id, &error);
                    return Err(error).map_err(|source| {
                        StageFailedSnafu { id, stage_type: node.stage_type.clone() }
                            .into_error(source)
                    });
                }
            }
        }
        Ok(outputs)
    }

    /// Executes the pipeline and returns the outputs of one node.
    pub fn execute_to_node(
        &self,
        dag: &Dag,
        registry: &StageRegistry,
        node: NodeId,
        run: &mut RunContext<'_>,
    ) -> DagResult<Vec<SharedRepresentation>> {
        let mut outputs = self.execute(dag, registry, run)?;
        Ok(outputs.remove(&node).unwrap_or_default())
    }

    /// Convenience wrapper executing with a fresh observation context and no progress sink.
    pub fn execute_simple(
        &self,
        dag: &Dag,
        registry: &StageRegistry,
    ) -> DagResult<BTreeMap<NodeId, Vec<SharedRepresentation>>> {
        let mut observations = ObservationContext::new();
        let mut run = RunContext::new(&mut observations, &NullProgress);
        self.execute(dag, registry, &mut run)
    }
}
