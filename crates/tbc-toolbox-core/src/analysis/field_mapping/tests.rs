use googletest::prelude::*;

use super::*;
use crate::analysis::{CancelToken, NullProgress};
use crate::testutil::{ntsc_tiny_parameters, pal_tiny_parameters, SyntheticRepresentation};

fn ntsc_capture(frames: usize) -> SyntheticRepresentation {
    SyntheticRepresentation::new(ntsc_tiny_parameters(), frames * 2)
}

fn pal_capture(frames: usize) -> SyntheticRepresentation {
    SyntheticRepresentation::new(pal_tiny_parameters(), frames * 2)
}

fn set_picture(repr: &mut SyntheticRepresentation, frame: u64, picture: i32) {
    repr.set_observation(frame * 2, "biphase", "picture_number", picture);
}

fn analyze(repr: &SyntheticRepresentation, options: FieldMappingOptions) -> FieldMappingDecision {
    FieldMappingAnalyzer::new(options).analyze(repr, &NullProgress)
}

fn spec_of(decision: &FieldMappingDecision) -> String {
    decision.mapping_spec.as_ref().expect("successful decision has a spec").to_string()
}

#[googletest::test]
fn test_clean_cav_capture_maps_to_one_range() {
    let mut repr = ntsc_capture(5);
    for frame in 0..5 {
        set_picture(&mut repr, frame, frame as i32 + 1);
    }

    let decision = analyze(&repr, FieldMappingOptions::default());
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    expect_that!(decision.is_cav, eq(true));
    expect_that!(decision.is_pal, eq(false));
    expect_that!(spec_of(&decision), eq("0-9"));
    expect_that!(decision.stats.total_fields, eq(10));
}

#[googletest::test]
fn test_gap_padding_emits_pad_token() {
    // Frames [0-1, 2-3, 4-5] numbered 1..=3, two dead frames, then [10-11, 12-13] numbered
    // 6..=7: the two-frame numbering gap is padded with four fields.
    let mut repr = ntsc_capture(7);
    for (frame, picture) in [(0u64, 1), (1, 2), (2, 3), (5, 6), (6, 7)] {
        set_picture(&mut repr, frame, picture);
    }

    let options =
        FieldMappingOptions { delete_unmappable_frames: true, ..FieldMappingOptions::default() };
    let decision = analyze(&repr, options);
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    insta::assert_snapshot!(spec_of(&decision), @"0-5,PAD_4,10-13");
    expect_that!(decision.stats.gaps_padded, eq(1));
    expect_that!(decision.stats.padding_frames, eq(2));
    expect_that!(decision.stats.removed_unmappable, eq(2));
}

#[googletest::test]
fn test_duplicate_resolution_keeps_the_better_frame() {
    // Two frames share VBI number 500; the 0.9-quality frame survives.
    let mut repr = ntsc_capture(2);
    set_picture(&mut repr, 0, 500);
    set_picture(&mut repr, 1, 500);
    for field in 0..2 {
        repr.set_observation(field, "field_quality", "score", 0.7);
    }
    for field in 2..4 {
        repr.set_observation(field, "field_quality", "score", 0.9);
    }

    let decision = analyze(&repr, FieldMappingOptions::default());
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    expect_that!(spec_of(&decision), eq("2-3"));
    expect_that!(decision.stats.removed_duplicates, eq(1));
}

#[googletest::test]
fn test_clv_timecode_conversion() {
    // 0:10:10.28 on PAL is frame ((10*60 + 10) * 25) + 28 = 15278.
    let mut repr = pal_capture(2);
    for (frame, picture) in [(0u64, 28), (1, 29)] {
        repr.set_observation(frame * 2, "biphase", "clv_hours", 0);
        repr.set_observation(frame * 2, "biphase", "clv_minutes", 10);
        repr.set_observation(frame * 2, "biphase", "clv_seconds", 10);
        repr.set_observation(frame * 2, "biphase", "clv_picture", picture);
    }

    let decision = analyze(&repr, FieldMappingOptions::default());
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    expect_that!(decision.is_cav, eq(false));
    expect_that!(decision.is_pal, eq(true));
    // Both frames map contiguously; the numbering base is the converted timecode.
    expect_that!(spec_of(&decision), eq("0-3"));
}

#[googletest::test]
fn test_clv_frame_number_arithmetic() {
    let mut observations = crate::obs::FieldObservations::default();
    let mut biphase = crate::obs::NamespaceObservations::default();
    biphase.insert("clv_hours".into(), 0.into());
    biphase.insert("clv_minutes".into(), 10.into());
    biphase.insert("clv_seconds".into(), 10.into());
    biphase.insert("clv_picture".into(), 28.into());
    observations.insert("biphase".into(), biphase);

    expect_that!(clv_frame_number(&observations, true), some(eq(15_278)));
    expect_that!(clv_frame_number(&observations, false), some(eq(18_328)));
    expect_that!(
        clv_frame_number(&crate::obs::FieldObservations::default(), true),
        none()
    );
}

#[googletest::test]
fn test_lead_in_frames_are_removed() {
    let mut repr = ntsc_capture(3);
    repr.set_observation(0, "biphase", "lead_in", true);
    set_picture(&mut repr, 1, 10);
    set_picture(&mut repr, 2, 11);

    let decision = analyze(&repr, FieldMappingOptions::default());
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    expect_that!(spec_of(&decision), eq("2-5"));
    expect_that!(decision.stats.removed_lead_in_out, eq(1));
}

#[googletest::test]
fn test_invalid_phase_frames_are_removed() {
    let mut repr = ntsc_capture(3);
    set_picture(&mut repr, 0, 1);
    set_picture(&mut repr, 1, 2);
    set_picture(&mut repr, 2, 3);
    // Frame 1's fields disagree on the colour sequence (3 does not follow 1 on NTSC).
    repr.set_phase_hint(2, 1);
    repr.set_phase_hint(3, 3);
    // Frame 2 is consistent.
    repr.set_phase_hint(4, 1);
    repr.set_phase_hint(5, 2);

    let options =
        FieldMappingOptions { pad_gaps: false, ..FieldMappingOptions::default() };
    let decision = analyze(&repr, options);
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    expect_that!(decision.stats.removed_invalid_phase, eq(1));
    expect_that!(spec_of(&decision), eq("0-1,4-5"));
}

#[googletest::test]
fn test_pal_phase_wraps_at_eight() {
    let mut repr = pal_capture(1);
    repr.set_observation(0, "biphase", "clv_seconds", 1);
    repr.set_observation(0, "biphase", "clv_picture", 0);
    repr.set_phase_hint(0, 8);
    repr.set_phase_hint(1, 1);

    let decision = analyze(&repr, FieldMappingOptions::default());
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    expect_that!(decision.stats.removed_invalid_phase, eq(0));
}

#[googletest::test]
fn test_vbi_correction_repairs_isolated_misreads() {
    let mut repr = ntsc_capture(13);
    let pictures = [10, 11, 12, 99, 14, 15, 16, 17, 18, 19, 20, 21, 22];
    for (frame, &picture) in pictures.iter().enumerate() {
        set_picture(&mut repr, frame as u64, picture);
    }

    let decision = analyze(&repr, FieldMappingOptions::default());
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    expect_that!(decision.stats.corrected_vbi_errors, eq(1));
    // With the misread repaired to 13, the capture is one contiguous run.
    expect_that!(spec_of(&decision), eq("0-25"));
}

#[googletest::test]
fn test_genuine_repeat_is_not_corrected() {
    // The repeated frame matches its predecessor in both VBI number and phases: it is a real
    // player repeat, so the correction pass leaves it alone and deduplication resolves it.
    let mut repr = ntsc_capture(13);
    let pictures = [10, 11, 12, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21];
    for (frame, &picture) in pictures.iter().enumerate() {
        set_picture(&mut repr, frame as u64, picture);
        let phase = [1, 2, 3, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4][frame];
        repr.set_phase_hint(frame as u64 * 2, phase);
        repr.set_phase_hint(frame as u64 * 2 + 1, if phase == 4 { 1 } else { phase + 1 });
    }

    let decision = analyze(&repr, FieldMappingOptions::default());
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    expect_that!(decision.stats.corrected_vbi_errors, eq(0));
    expect_that!(decision.stats.removed_duplicates, eq(1));
}

#[googletest::test]
fn test_pulldown_frames_inherit_and_renumber() {
    let mut repr = ntsc_capture(4);
    set_picture(&mut repr, 0, 100);
    repr.set_observation(2, "pulldown", "is_pulldown", true);
    set_picture(&mut repr, 2, 101);
    set_picture(&mut repr, 3, 102);

    let decision = analyze(&repr, FieldMappingOptions::default());
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    expect_that!(decision.stats.pulldown_frames, eq(1));
    // All four frames survive in capture order.
    expect_that!(spec_of(&decision), eq("0-7"));
}

#[googletest::test]
fn test_unmappable_frames_fail_without_the_delete_option() {
    let mut repr = ntsc_capture(3);
    set_picture(&mut repr, 0, 1);
    set_picture(&mut repr, 2, 3);

    let decision = analyze(&repr, FieldMappingOptions::default());
    expect_that!(decision.status, eq(AnalysisStatus::Failed));
    expect_that!(decision.state, eq(AnalyzerState::Failed));
    expect_that!(decision.rationale, contains_substring("1 unmappable frame"));
    expect_that!(decision.warnings, len(eq(1)));
}

#[googletest::test]
fn test_large_gaps_are_logged_not_padded() {
    let mut repr = ntsc_capture(2);
    set_picture(&mut repr, 0, 1);
    set_picture(&mut repr, 1, 1500);

    let decision = analyze(&repr, FieldMappingOptions::default());
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    expect_that!(decision.stats.gaps_padded, eq(0));
    expect_that!(decision.warnings, len(eq(1)));
    expect_that!(decision.warnings[0], contains_substring("Large gap"));
    expect_that!(spec_of(&decision), eq("0-3"));
}

#[googletest::test]
fn test_cancellation_returns_partial_diagnostics() {
    let mut repr = ntsc_capture(2);
    set_picture(&mut repr, 0, 1);
    set_picture(&mut repr, 1, 2);

    let token = CancelToken::new();
    token.cancel();
    let decision = FieldMappingAnalyzer::default().analyze(&repr, &token);
    expect_that!(decision.status, eq(AnalysisStatus::Cancelled));
    expect_that!(decision.state, eq(AnalyzerState::Cancelled));
    expect_that!(decision.mapping_spec, none());
}

#[googletest::test]
fn test_too_small_source_fails() {
    let repr = ntsc_capture(0);
    let decision = analyze(&repr, FieldMappingOptions::default());
    expect_that!(decision.status, eq(AnalysisStatus::Failed));
}

#[googletest::test]
fn test_rationale_and_result_envelope() {
    let mut repr = ntsc_capture(5);
    for (frame, picture) in [(0u64, 1), (1, 2), (3, 4), (4, 5)] {
        set_picture(&mut repr, frame, picture);
    }

    let options =
        FieldMappingOptions { delete_unmappable_frames: true, ..FieldMappingOptions::default() };
    let decision = analyze(&repr, options);
    expect_that!(decision.status, eq(AnalysisStatus::Success));
    expect_that!(decision.rationale, contains_substring("NTSC CAV"));
    expect_that!(decision.rationale, contains_substring("Removed 1 unmappable frames"));

    let result = decision.to_analysis_result();
    expect_that!(result.status, eq(AnalysisStatus::Success));
    expect_that!(
        result.statistics["total_fields"],
        eq(&crate::params::ParameterValue::I32(10))
    );
    let spec = result.parameter_changes["mapping_spec"].as_str().unwrap();
    expect_that!(spec, contains_substring("-"));
}
