use std::collections::BTreeMap;

use derive_more::derive::Display;
use serde::{Deserialize, Serialize};

use crate::params::ParameterValue;

/// Outcome of an analysis run.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStatus {
    /// The analysis completed and its outputs are usable.
    Success,
    /// The analysis could not produce a usable result.
    Failed,
    /// The caller cancelled; partial diagnostics may be present.
    Cancelled,
}

/// Result envelope returned to analysis callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Outcome of the run.
    pub status: AnalysisStatus,
    /// One-paragraph human-readable outcome description.
    pub summary: String,
    /// Per-item findings, one line each.
    pub items: Vec<String>,
    /// Named scalar statistics gathered during the run.
    pub statistics: BTreeMap<String, ParameterValue>,
    /// Named data series for plotting, serialized per series.
    pub graph_data: BTreeMap<String, String>,
    /// Parameter updates the analysis recommends applying to its target stage.
    pub parameter_changes: BTreeMap<String, ParameterValue>,
}

impl AnalysisResult {
    /// Creates an empty result with the given status and summary.
    pub fn new(status: AnalysisStatus, summary: &str) -> Self {
        AnalysisResult {
            status,
            summary: summary.to_owned(),
            items: Vec::new(),
            statistics: BTreeMap::new(),
            graph_data: BTreeMap::new(),
            parameter_changes: BTreeMap::new(),
        }
    }

    /// Creates a failure result.
    pub fn failed(summary: &str) -> Self {
        Self::new(AnalysisStatus::Failed, summary)
    }

    /// Adds one named statistic.
    pub fn with_statistic(mut self, name: &str, value: impl Into<ParameterValue>) -> Self {
        self.statistics.insert(name.to_owned(), value.into());
        self
    }
}
