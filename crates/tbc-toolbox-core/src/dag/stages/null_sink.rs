use tracing::info;

use crate::dag::executor::RunContext;
use crate::dag::stage::{NodeType, NodeTypeInfo, Stage};
use crate::dag::DagResult;
use crate::params::ParameterMap;
use crate::repr::SharedRepresentation;

/// Terminal stage that consumes its input and produces nothing.
///
/// Useful for benchmarking pipeline plumbing and for keeping a branch of a splitter alive.
#[derive(Debug, Default)]
pub struct NullSinkStage;

impl Stage for NullSinkStage {
    fn type_info(&self) -> NodeTypeInfo {
        NodeTypeInfo {
            node_type: NodeType::Sink,
            name: "null_sink",
            display_name: "Null Sink",
            description: "Consumes its input and produces nothing",
            min_inputs: 1,
            max_inputs: 1,
            min_outputs: 0,
            max_outputs: 0,
            user_creatable: true,
        }
    }

    fn execute(
        &self,
        inputs: &[SharedRepresentation],
        _parameters: &ParameterMap,
        _run: &mut RunContext<'_>,
    ) -> DagResult<Vec<SharedRepresentation>> {
        for input in inputs {
            info!(
                artifact = %input.artifact_id(),
                fields = input.field_count(),
                "null sink consumed representation"
            );
        }
        Ok(Vec::new())
    }
}
