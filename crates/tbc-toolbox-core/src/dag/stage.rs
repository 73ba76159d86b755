use std::fmt;

use derive_more::derive::Display;

use crate::obs::ObservationKey;
use crate::params::ParameterMap;
use crate::repr::SharedRepresentation;

use super::executor::RunContext;
use super::{DagResult, NodeId};

/// Structural role of a stage, with its input/output cardinality.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Produces a representation from external data (0 inputs, 1 output).
    Source,
    /// Rewrites one representation (1 input, 1 output).
    Transform,
    /// Fans one representation out (1 input, N outputs).
    Splitter,
    /// Joins several representations (N inputs, 1 output).
    Merger,
    /// Arbitrary rearrangement (N inputs, M outputs).
    Complex,
    /// Consumes a representation without producing one (1 input, 0 outputs).
    Sink,
}

/// Static description of a stage type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeInfo {
    /// Structural role.
    pub node_type: NodeType,
    /// Machine name used in pipelines and the registry.
    pub name: &'static str,
    /// Name shown to users.
    pub display_name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Minimum number of inputs.
    pub min_inputs: usize,
    /// Maximum number of inputs.
    pub max_inputs: usize,
    /// Minimum number of outputs.
    pub min_outputs: usize,
    /// Maximum number of outputs.
    pub max_outputs: usize,
    /// Whether users may add this stage to pipelines themselves.
    pub user_creatable: bool,
}

/// One processing step of a pipeline.
///
/// Stages receive their inputs' output representations (ordered by the node's input list) and
/// return their own outputs; representations are shared by `Arc`, so passing them downstream
/// never copies samples.  A failing stage stops the whole run; the executor calls
/// [`Stage::on_failure`] before surfacing the error.
pub trait Stage: fmt::Debug + Send + Sync {
    /// Implementation version.
    fn version(&self) -> &'static str {
        "1.0"
    }

    /// Static description of this stage type.
    fn type_info(&self) -> NodeTypeInfo;

    /// Observation keys this stage (or the observers it hosts) writes during execution.
    fn provided_observations(&self) -> Vec<ObservationKey> {
        Vec::new()
    }

    /// Observation keys this stage needs some earlier stage to have provided.
    fn required_observations(&self) -> Vec<ObservationKey> {
        Vec::new()
    }

    /// Executes the stage.
    fn execute(
        &self,
        inputs: &[SharedRepresentation],
        parameters: &ParameterMap,
        run: &mut RunContext<'_>,
    ) -> DagResult<Vec<SharedRepresentation>>;

    /// Invoked by the executor when this stage's execution fails, before the run stops.
    fn on_failure(&self, node: NodeId, error: &super::DagError) {
        tracing::error!(%node, stage = self.type_info().name, %error, "stage failed");
    }
}
