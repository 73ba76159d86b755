use std::path::PathBuf;
use std::sync::Arc;

use snafu::ResultExt;
use tracing::info;

use crate::dag::executor::RunContext;
use crate::dag::stage::{NodeType, NodeTypeInfo, Stage};
use crate::dag::{DagResult, MissingParameterSnafu, SourceLoadSnafu};
use crate::params::ParameterMap;
use crate::repr::{FieldRepresentation, SharedRepresentation};
use crate::tbc::TbcFieldRepresentation;

/// Source stage loading a TBC capture and its sidecar metadata.
///
/// Parameters:
/// - `tbc_path` (path, required): the capture file.
/// - `metadata_path` (path, optional): the sidecar; defaults to `<tbc_path>.json`.
#[derive(Debug, Default)]
pub struct TbcSourceStage;

impl Stage for TbcSourceStage {
    fn type_info(&self) -> NodeTypeInfo {
        NodeTypeInfo {
            node_type: NodeType::Source,
            name: "tbc_source",
            display_name: "TBC Source",
            description: "Loads a TBC capture with its sidecar metadata",
            min_inputs: 0,
            max_inputs: 0,
            min_outputs: 1,
            max_outputs: 1,
            user_creatable: true,
        }
    }

    fn execute(
        &self,
        _inputs: &[SharedRepresentation],
        parameters: &ParameterMap,
        _run: &mut RunContext<'_>,
    ) -> DagResult<Vec<SharedRepresentation>> {
        let tbc_path: PathBuf = parameters
            .get("tbc_path")
            .and_then(|v| v.as_path())
            .ok_or_else(|| {
                MissingParameterSnafu {
                    stage_type: String::from("tbc_source"),
                    parameter: String::from("tbc_path"),
                }
                .build()
            })?;
        let metadata_path = parameters.get("metadata_path").and_then(|v| v.as_path());

        let representation =
            TbcFieldRepresentation::open(&tbc_path, metadata_path.as_deref())
                .context(SourceLoadSnafu)?;
        info!(
            tbc = %tbc_path.display(),
            fields = representation.field_count(),
            "loaded TBC capture"
        );
        Ok(vec![Arc::new(representation) as SharedRepresentation])
    }
}
