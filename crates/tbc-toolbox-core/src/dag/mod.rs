//! The processing DAG: node model, stage trait, registry, validation and execution.
//!
//! A pipeline is a directed acyclic graph of [`DagNode`]s.  Each node names a stage type from
//! the process-wide [`StageRegistry`], carries a typed parameter map, and lists its input
//! nodes in order.  The executor instantiates stages, walks the graph in topological order
//! from the virtual root, and threads reference-counted representations from outputs to
//! inputs without copying.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::params::ParameterMap;
use crate::ErrorKind;

mod executor;
mod registry;
mod stage;
pub mod stages;
mod validator;

pub use executor::{DagExecutor, RunContext};
pub use registry::{global_registry, StageFactory, StageRegistry};
pub use stage::{NodeType, NodeTypeInfo, Stage};
pub use validator::{validate, ValidationReport};


/// Identifies one node within a DAG.
///
/// Real nodes have positive IDs; the reserved [`NodeId::ROOT`] is a virtual root that gates
/// execution order and never corresponds to a stage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(i32);

impl NodeId {
    /// The virtual root node.
    pub const ROOT: NodeId = NodeId(-2);

    /// Creates a node ID.
    pub const fn new(id: i32) -> Self {
        NodeId(id)
    }

    /// Raw value.
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Whether this names a real node (positive ID).
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == NodeId::ROOT {
            write!(f, "root")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// One node of a pipeline DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagNode {
    /// Unique positive identifier.
    pub id: NodeId,
    /// Stage type name, resolved through the registry.
    pub stage_type: String,
    /// Stage parameters.
    #[serde(default)]
    pub parameters: ParameterMap,
    /// Input nodes, in the order the stage receives them.
    #[serde(default)]
    pub inputs: Vec<NodeId>,
}

impl DagNode {
    /// Creates a node.
    pub fn new(id: i32, stage_type: &str, inputs: Vec<i32>) -> Self {
        DagNode {
            id: NodeId::new(id),
            stage_type: stage_type.to_owned(),
            parameters: ParameterMap::new(),
            inputs: inputs.into_iter().map(NodeId::new).collect(),
        }
    }

    /// Adds a parameter.
    pub fn with_parameter(
        mut self,
        name: &str,
        value: impl Into<crate::params::ParameterValue>,
    ) -> Self {
        self.parameters.insert(name.to_owned(), value.into());
        self
    }
}

/// A pipeline DAG.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dag {
    /// The nodes, in no particular order.
    pub nodes: Vec<DagNode>,
}

impl Dag {
    /// Creates a DAG from nodes.
    pub fn new(nodes: Vec<DagNode>) -> Self {
        Dag { nodes }
    }

    /// Finds a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&DagNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Computes a topological execution order starting from the virtual root (sources first).
    ///
    /// Fails on duplicate or non-positive IDs, dangling input references, and cycles.
    pub fn topological_order(&self) -> DagResult<Vec<NodeId>> {
        let mut indegree: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();

        for node in &self.nodes {
            snafu::ensure!(node.id.is_valid(), InvalidNodeIdSnafu { id: node.id });
            snafu::ensure!(
                indegree.insert(node.id, 0).is_none(),
                DuplicateNodeIdSnafu { id: node.id }
            );
        }
        for node in &self.nodes {
            for &input in &node.inputs {
                snafu::ensure!(
                    self.node(input).is_some(),
                    DanglingInputSnafu { id: node.id, input }
                );
                *indegree.get_mut(&node.id).expect("node registered") += 1;
                dependents.entry(input).or_default().push(node.id);
            }
        }

        // Kahn's algorithm: the virtual root feeds every source node.
        let mut ready: Vec<NodeId> =
            indegree.iter().filter(|(_, &d)| d == 0).map(|(&id, _)| id).collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop() {
            order.push(id);
            for &dependent in dependents.get(&id).map(Vec::as_slice).unwrap_or_default() {
                let degree = indegree.get_mut(&dependent).expect("node registered");
                *degree -= 1;
                if *degree == 0 {
                    ready.push(dependent);
                }
            }
        }

        snafu::ensure!(order.len() == self.nodes.len(), CycleSnafu);
        Ok(order)
    }
}

/// Result type for DAG operations.
pub type DagResult<T, E = DagError> = std::result::Result<T, E>;

/// Error type for DAG construction, validation and execution.
#[derive(Debug, Snafu)]
pub enum DagError {
    /// A node carries a non-positive ID.
    #[snafu(display("Node ID {id} is not positive"))]
    InvalidNodeId {
        /// The offending ID.
        id: NodeId,
    },

    /// Two nodes share an ID.
    #[snafu(display("Node ID {id} appears more than once"))]
    DuplicateNodeId {
        /// The duplicated ID.
        id: NodeId,
    },

    /// A node lists an input that is not in the DAG.
    #[snafu(display("Node {id} references missing input node {input}"))]
    DanglingInput {
        /// The referencing node.
        id: NodeId,
        /// The missing input.
        input: NodeId,
    },

    /// The graph contains a cycle.
    #[snafu(display("The DAG contains a cycle"))]
    Cycle,

    /// A stage type is not registered.
    #[snafu(display("Unknown stage type {stage_type:?} on node {id}"))]
    UnknownStageType {
        /// The node naming the stage.
        id: NodeId,
        /// The unknown type name.
        stage_type: String,
    },

    /// Structural or observation-dependency validation failed; all errors are listed.
    #[snafu(display("Pipeline validation failed:\n{}", errors.join("\n")))]
    ValidationFailed {
        /// One message per violation.
        errors: Vec<String>,
    },

    /// A required stage parameter is absent.
    #[snafu(display("Stage {stage_type:?} requires parameter {parameter:?}"))]
    MissingParameter {
        /// The stage type.
        stage_type: String,
        /// The absent parameter.
        parameter: String,
    },

    /// A stage parameter is present but unusable.
    #[snafu(display("Invalid value for parameter {parameter:?}: {reason}"))]
    InvalidParameter {
        /// The parameter name.
        parameter: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A stage failed during execution; the executor stops at the first failure.
    #[snafu(display("Stage {stage_type:?} (node {id}) failed: {source}"))]
    StageFailed {
        /// The failing node.
        id: NodeId,
        /// Its stage type.
        stage_type: String,
        /// The stage's error.
        #[snafu(source(from(DagError, Box::new)))]
        source: Box<DagError>,
    },

    /// Loading the stage's backing data failed.
    #[snafu(display("Could not load stage input"))]
    SourceLoad {
        /// The underlying TBC error.
        source: crate::tbc::TbcError,
    },

    /// A mapping spec parameter failed to parse.
    #[snafu(display("Could not parse the mapping spec parameter"))]
    SpecParse {
        /// The underlying analysis error.
        source: crate::analysis::AnalysisError,
    },

    /// The run observed a cancellation request.
    #[snafu(display("Execution cancelled"))]
    ExecutionCancelled,

    /// The stage is a declared stub.
    #[snafu(display("Stage {stage_type:?} is not implemented"))]
    StageNotImplemented {
        /// The stage type.
        stage_type: String,
    },
}

impl DagError {
    /// The error taxonomy entry this error maps onto.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DagError::InvalidNodeId { .. }
            | DagError::DuplicateNodeId { .. }
            | DagError::DanglingInput { .. }
            | DagError::UnknownStageType { .. }
            | DagError::MissingParameter { .. }
            | DagError::InvalidParameter { .. } => ErrorKind::InvalidArgument,
            DagError::Cycle | DagError::ValidationFailed { .. } => ErrorKind::InvalidState,
            DagError::StageFailed { source, .. } => source.kind(),
            DagError::SourceLoad { source } => source.kind(),
            DagError::SpecParse { source } => source.kind(),
            DagError::ExecutionCancelled => ErrorKind::Cancelled,
            DagError::StageNotImplemented { .. } => ErrorKind::NotImplemented,
        }
    }
}
