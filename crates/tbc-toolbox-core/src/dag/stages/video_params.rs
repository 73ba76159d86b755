use std::sync::Arc;

use crate::dag::executor::RunContext;
use crate::dag::stage::{NodeType, NodeTypeInfo, Stage};
use crate::dag::{DagResult, InvalidParameterSnafu};
use crate::params::ParameterMap;
use crate::repr::{SharedRepresentation, VideoParamsOverride};
use crate::video::System;

/// Overrides selected video parameters of the input representation.
///
/// Substitutes the parameters (and the derived active-line hint) without touching samples:
/// the output is a [`VideoParamsOverride`] wrapper over the input.
///
/// Parameters (all optional; absent ones keep the input's values):
/// - `system` (string): one of `NTSC`, `PAL`, `PAL-M`.
/// - `white_16b_ire`, `black_16b_ire` (int): blanking codes.
/// - `active_video_start`, `active_video_end` (int): active-video sample span.
/// - `colour_burst_start`, `colour_burst_end` (int): burst sample span.
#[derive(Debug, Default)]
pub struct VideoParamsStage;

impl Stage for VideoParamsStage {
    fn type_info(&self) -> NodeTypeInfo {
        NodeTypeInfo {
            node_type: NodeType::Transform,
            name: "video_params",
            display_name: "Video Parameters",
            description: "Overrides video parameters without touching samples",
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
        parameters: &ParameterMap,
        _run: &mut RunContext<'_>,
    ) -> DagResult<Vec<SharedRepresentation>> {
        let source = inputs[0].clone();
        let Some(mut params) = source.video_parameters() else {
            return InvalidParameterSnafu {
                parameter: String::from("system"),
                reason: String::from("the input carries no video parameters to override"),
            }
            .fail();
        };

        if let Some(system) = parameters.get("system").and_then(|v| v.as_str()) {
            params.system = match system {
                "NTSC" => System::Ntsc,
                "PAL" => System::Pal,
                "PAL-M" => System::PalM,
                other => {
                    return InvalidParameterSnafu {
                        parameter: String::from("system"),
                        reason: format!("unknown system {other:?}"),
                    }
                    .fail()
                }
            };
            // A new system implies its standard subcarrier and frame rate.
            if let Some(fsc) = params.system.default_subcarrier_hz() {
                params.fsc = fsc;
            }
            params.frame_rate = params.system.frame_rate();
        }

        let override_u16 = |name: &str, target: &mut u16| {
            if let Some(value) = parameters.get(name).and_then(|v| v.as_i32()) {
                *target = value.clamp(0, i32::from(u16::MAX)) as u16;
            }
        };
        override_u16("white_16b_ire", &mut params.white_16b_ire);
        override_u16("black_16b_ire", &mut params.black_16b_ire);

        let override_u32 = |name: &str, target: &mut u32| {
            if let Some(value) = parameters.get(name).and_then(|v| v.as_i32()) {
                *target = value.max(0) as u32;
            }
        };
        override_u32("active_video_start", &mut params.active_video_start);
        override_u32("active_video_end", &mut params.active_video_end);
        override_u32("colour_burst_start", &mut params.colour_burst_start);
        override_u32("colour_burst_end", &mut params.colour_burst_end);

        if !params.is_valid() {
            return InvalidParameterSnafu {
                parameter: String::from("video_params"),
                reason: String::from("the overridden parameters fail validation"),
            }
            .fail();
        }

        Ok(vec![Arc::new(VideoParamsOverride::new(source, params)) as SharedRepresentation])
    }
}
