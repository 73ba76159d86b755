use num::rational::Ratio;

use crate::obs::{ObservationRecord, ObservationValue};
use crate::video::{System, VideoParameters};

pub(crate) mod repr;
pub(crate) mod test_cases;

pub(crate) use repr::SyntheticRepresentation;
pub(crate) use test_cases::{test_case_map, LazyTestCases, TestCases};

/// Look up a staged observer record by key name.
pub(crate) fn record_value<'a>(
    records: &'a [ObservationRecord],
    name: &str,
) -> Option<&'a ObservationValue> {
    records.iter().find(|r| r.name == name).map(|r| &r.value)
}

/// NTSC parameters with a tiny stored geometry, for tests that never touch samples.
pub(crate) fn ntsc_tiny_parameters() -> VideoParameters {
    VideoParameters {
        field_width: 8,
        field_height: 4,
        active_video_start: 2,
        active_video_end: 6,
        colour_burst_start: 0,
        colour_burst_end: 1,
        ..ntsc_parameters()
    }
}

/// PAL parameters with a tiny stored geometry, for tests that never touch samples.
pub(crate) fn pal_tiny_parameters() -> VideoParameters {
    VideoParameters { system: System::Pal, frame_rate: Ratio::from_integer(25), ..ntsc_tiny_parameters() }
}

/// Video parameters for a 4x-subcarrier NTSC capture, the common test fixture.
pub(crate) fn ntsc_parameters() -> VideoParameters {
    VideoParameters {
        system: System::Ntsc,
        field_width: 910,
        field_height: 263,
        sample_rate: 4.0 * (315.0e6 / 88.0),
        fsc: 315.0e6 / 88.0,
        frame_rate: Ratio::new(30_000, 1_001),
        active_video_start: 134,
        active_video_end: 894,
        colour_burst_start: 78,
        colour_burst_end: 110,
        white_16b_ire: 54_016,
        black_16b_ire: 16_384,
    }
}

/// Video parameters for a 4x-subcarrier PAL capture.
pub(crate) fn pal_parameters() -> VideoParameters {
    VideoParameters {
        system: System::Pal,
        field_width: 1135,
        field_height: 313,
        sample_rate: 4.0 * ((283.75 * 15_625.0) + 25.0),
        fsc: (283.75 * 15_625.0) + 25.0,
        frame_rate: Ratio::from_integer(25),
        active_video_start: 185,
        active_video_end: 1107,
        colour_burst_start: 98,
        colour_burst_end: 138,
        white_16b_ire: 54_016,
        black_16b_ire: 16_384,
    }
}
