//! Pass-through stages: no-op plumbing for pipeline construction and testing.

use crate::dag::executor::RunContext;
use crate::dag::stage::{NodeType, NodeTypeInfo, Stage};
use crate::dag::DagResult;
use crate::params::ParameterMap;
use crate::repr::SharedRepresentation;

/// Passes a single input through unchanged.
#[derive(Debug, Default)]
pub struct PassthroughStage;

impl Stage for PassthroughStage {
    fn type_info(&self) -> NodeTypeInfo {
        NodeTypeInfo {
            node_type: NodeType::Transform,
            name: "passthrough",
            display_name: "Pass-through",
            description: "Passes the input to the output unchanged",
            min_inputs: 1,
            max_inputs: 1,
            min_outputs: 1,
            max_outputs: 1,
            user_creatable: true,
        }
    }

    fn execute(
        &self,
        inputs: &[SharedRepresentation],
        _parameters: &ParameterMap,
        _run: &mut RunContext<'_>,
    ) -> DagResult<Vec<SharedRepresentation>> {
        Ok(inputs.to_vec())
    }
}

/// Fans one input out to several identical outputs.
///
/// Parameters:
/// - `outputs` (int, default 2): how many outputs to produce.
#[derive(Debug, Default)]
pub struct PassthroughSplitterStage;

impl Stage for PassthroughSplitterStage {
    fn type_info(&self) -> NodeTypeInfo {
        NodeTypeInfo {
            node_type: NodeType::Splitter,
            name: "passthrough_splitter",
            display_name: "Pass-through Splitter",
            description: "Duplicates the input handle onto every output",
            min_inputs: 1,
            max_inputs: 1,
            min_outputs: 1,
            max_outputs: 8,
            user_creatable: true,
        }
    }

    fn execute(
        &self,
        inputs: &[SharedRepresentation],
        parameters: &ParameterMap,
        _run: &mut RunContext<'_>,
    ) -> DagResult<Vec<SharedRepresentation>> {
        let outputs = parameters
            .get("outputs")
            .and_then(|v| v.as_i32())
            .unwrap_or(2)
            .clamp(1, 8) as usize;
        Ok(vec![inputs[0].clone(); outputs])
    }
}

/// Joins several inputs by forwarding the first; the rest only extend lifetimes.
#[derive(Debug, Default)]
pub struct PassthroughMergerStage;

impl Stage for PassthroughMergerStage {
    fn type_info(&self) -> NodeTypeInfo {
        NodeTypeInfo {
            node_type: NodeType::Merger,
            name: "passthrough_merger",
            display_name: "Pass-through Merger",
            description: "Forwards the first input, discarding the rest",
            min_inputs: 1,
            max_inputs: 8,
            min_outputs: 1,
            max_outputs: 1,
            user_creatable: true,
        }
    }

    fn execute(
        &self,
        inputs: &[SharedRepresentation],
        _parameters: &ParameterMap,
        _run: &mut RunContext<'_>,
    ) -> DagResult<Vec<SharedRepresentation>> {
        Ok(vec![inputs[0].clone()])
    }
}

/// Forwards every input to the matching output.
#[derive(Debug, Default)]
pub struct PassthroughComplexStage;

impl Stage for PassthroughComplexStage {
    fn type_info(&self) -> NodeTypeInfo {
        NodeTypeInfo {
            node_type: NodeType::Complex,
            name: "passthrough_complex",
            display_name: "Pass-through Complex",
            description: "Forwards every input to the matching output",
            min_inputs: 1,
            max_inputs: 8,
            min_outputs: 1,
            max_outputs: 8,
            user_creatable: true,
        }
    }

    fn execute(
        &self,
        inputs: &[SharedRepresentation],
        _parameters: &ParameterMap,
        _run: &mut RunContext<'_>,
    ) -> DagResult<Vec<SharedRepresentation>> {
        Ok(inputs.to_vec())
    }
}
