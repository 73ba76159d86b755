//! Built-in pipeline stages.

use std::sync::Arc;

use super::registry::StageRegistry;

mod field_map;
mod null_sink;
mod observers;
mod passthrough;
mod tbc_source;
mod video_params;

pub use field_map::{FieldMapRepresentation, FieldMapStage};
pub use null_sink::NullSinkStage;
pub use observers::ObserversStage;
pub use passthrough::{
    PassthroughComplexStage, PassthroughMergerStage, PassthroughSplitterStage, PassthroughStage,
};
pub use tbc_source::TbcSourceStage;
pub use video_params::VideoParamsStage;

/// Registers every built-in stage.
pub(crate) fn register_builtin_stages(registry: &mut StageRegistry) {
    registry.register(|| Arc::new(TbcSourceStage));
    registry.register(|| Arc::new(PassthroughStage));
    registry.register(|| Arc::new(PassthroughSplitterStage));
    registry.register(|| Arc::new(PassthroughMergerStage));
    registry.register(|| Arc::new(PassthroughComplexStage));
    registry.register(|| Arc::new(VideoParamsStage));
    registry.register(|| Arc::new(ObserversStage));
    registry.register(|| Arc::new(FieldMapStage));
    registry.register(|| Arc::new(NullSinkStage));
}
