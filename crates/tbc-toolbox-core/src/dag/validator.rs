use std::collections::BTreeSet;

use crate::obs::ObservationKey;

use super::registry::StageRegistry;
use super::{Dag, DagResult, ValidationFailedSnafu};

/// Outcome of pipeline validation.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Violations; the pipeline must not run when non-empty.
    pub errors: Vec<String>,
    /// Advisory findings (duplicate observation providers).
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether the pipeline may run.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates a DAG against a registry.
///
/// Checks, in order: graph structure (IDs, references, acyclicity), stage types, input arity
/// against each stage's [`super::NodeTypeInfo`], and observation dependencies (walking the
/// topological order, every stage's required observations must be provided by an earlier
/// stage; duplicate providers are warned about, as the later write overrides).  All violations
/// of a phase are collected before the result is returned.
pub fn validate(dag: &Dag, registry: &StageRegistry) -> DagResult<ValidationReport> {
    // Structural problems make the later phases meaningless, so they surface immediately.
    let order = dag.topological_order()?;

    let mut report = ValidationReport::default();
    let mut available: BTreeSet<ObservationKey> = BTreeSet::new();

    for id in &order {
        let node = dag.node(*id).expect("ordered node exists");
        let Some(stage) = registry.create(&node.stage_type) else {
            report
                .errors
                .push(format!("node {id}: unknown stage type {:?}", node.stage_type));
            continue;
        };
        let info = stage.type_info();

        let arity = node.inputs.len();
        if arity < info.min_inputs || arity > info.max_inputs {
            report.errors.push(format!(
                "node {id}: stage '{}' takes {}..={} inputs but {arity} are connected",
                info.name, info.min_inputs, info.max_inputs
            ));
        }

        for required in stage.required_observations() {
            if !available.contains(&required) {
                report.errors.push(format!(
                    "node {id}: stage '{}' requires observation '{}' which is not provided \
                     by any earlier stage",
                    info.name,
                    required.full_key()
                ));
            }
        }
        for provided in stage.provided_observations() {
            if available.contains(&provided) {
                report.warnings.push(format!(
                    "node {id}: stage '{}' provides observation '{}' which is already \
                     provided by an earlier stage (later write overrides)",
                    info.name,
                    provided.full_key()
                ));
            } else {
                available.insert(provided);
            }
        }
    }

    snafu::ensure!(
        report.errors.is_empty(),
        ValidationFailedSnafu { errors: report.errors }
    );
    Ok(report)
}
