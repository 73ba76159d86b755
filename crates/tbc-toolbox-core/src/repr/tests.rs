use std::sync::Arc;

use googletest::prelude::*;

use super::*;
use crate::testutil::{ntsc_parameters, pal_parameters, SyntheticRepresentation};
use crate::video::VideoFormat;

fn fixture() -> SyntheticRepresentation {
    SyntheticRepresentation::new(ntsc_parameters(), 4)
}

#[googletest::test]
fn test_every_field_in_range_has_a_descriptor() {
    let repr = fixture();
    for id in repr.field_range().iter() {
        expect_that!(repr.has_field(id), eq(true));
        expect_that!(repr.descriptor(id), some(anything()));
    }
    expect_that!(repr.field_count(), eq(4));
}

#[googletest::test]
fn test_lines_beyond_standards_height_are_absent() {
    let repr = fixture();
    let id = FieldId::new(0);
    let descriptor = repr.descriptor(id).unwrap();

    // NTSC: 243 standard lines inside a 263-line stored field.
    expect_that!(descriptor.height, eq(243));
    expect_that!(repr.line(id, descriptor.height - 1), some(anything()));
    expect_that!(repr.line(id, descriptor.height), none());
    expect_that!(repr.line(id, 262), none());
}

#[googletest::test]
fn test_field_truncates_padding() {
    let repr = fixture();
    let id = FieldId::new(1);
    let descriptor = repr.descriptor(id).unwrap();
    let samples = repr.field(id).unwrap();
    expect_that!(samples.len(), eq((descriptor.height * descriptor.width) as usize));
}

#[googletest::test]
fn test_line_view_is_line_sized() {
    let mut repr = fixture();
    repr.fill_line(0, 5, 40_000);
    let line = repr.line(FieldId::new(0), 5).unwrap();
    expect_that!(line.len(), eq(910));
    expect_that!(line.is_empty(), eq(false));
    expect_that!(line[0], eq(40_000));
    expect_that!(line.as_slice().last(), some(eq(&40_000)));
}

#[googletest::test]
fn test_line_view_rejects_out_of_bounds_windows() {
    let samples: Arc<[u16]> = Arc::from(vec![0u16; 10].as_slice());
    expect_that!(LineView::new(samples.clone(), 0, 10), some(anything()));
    expect_that!(LineView::new(samples.clone(), 5, 6), none());
    expect_that!(LineView::new(samples, usize::MAX, 2), none());
}

#[googletest::test]
fn test_video_params_override_substitutes_parameters() {
    let source: SharedRepresentation = Arc::new(fixture());
    let source_artifact = source.artifact_id();
    let wrapper = VideoParamsOverride::new(source, pal_parameters());

    let params = wrapper.video_parameters().unwrap();
    expect_that!(params.system, eq(crate::video::System::Pal));

    // The descriptor re-derives format and width from the substituted parameters.
    let descriptor = wrapper.descriptor(FieldId::new(0)).unwrap();
    expect_that!(descriptor.format, eq(VideoFormat::Pal));
    expect_that!(descriptor.width, eq(1135));

    // The derived active-line hint replaces the source's.
    let hint = wrapper.active_line_hint(FieldId::new(0)).unwrap();
    expect_that!(hint.is_valid(), eq(true));

    // A fresh artifact identity, pointing back at the source.
    expect_that!(wrapper.artifact_id(), not(eq(source_artifact)));
}

#[googletest::test]
fn test_video_params_override_passes_samples_through() {
    let mut synthetic = fixture();
    synthetic.fill_line(0, 3, 30_000);
    let source: SharedRepresentation = Arc::new(synthetic);
    let wrapper = VideoParamsOverride::new(source.clone(), ntsc_parameters());

    let direct = source.line(FieldId::new(0), 3).unwrap();
    let wrapped = wrapper.line(FieldId::new(0), 3).unwrap();
    expect_that!(wrapped.as_slice(), eq(direct.as_slice()));
}

#[googletest::test]
fn test_observation_attachment_prefers_attached_and_falls_back() {
    let mut synthetic = fixture();
    synthetic.set_observation(0, "biphase", "picture_number", 100);
    let source: SharedRepresentation = Arc::new(synthetic);

    let mut attached = ObservationContext::new();
    attached.set(FieldId::new(1), "biphase", "picture_number", 200).unwrap();
    let wrapper = ObservationAttachment::new(source, attached);

    // Field 1 is covered by the attachment.
    let field1 = wrapper.observations(FieldId::new(1));
    expect_that!(field1["biphase"]["picture_number"].as_i32(), some(eq(200)));

    // Field 0 is not, so the source's observations show through.
    let field0 = wrapper.observations(FieldId::new(0));
    expect_that!(field0["biphase"]["picture_number"].as_i32(), some(eq(100)));
}

#[googletest::test]
fn test_artifact_ids_are_unique() {
    let a = ArtifactId::next();
    let b = ArtifactId::next();
    expect_that!(a, not(eq(b)));
    expect_that!(a.to_string(), starts_with("artifact-"));
}
