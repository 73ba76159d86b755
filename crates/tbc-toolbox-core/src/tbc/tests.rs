use std::fs;
use std::path::PathBuf;

use display_error_chain::ErrorChainExt;
use googletest::prelude::*;

use super::*;
use crate::repr::FieldRepresentation;
use crate::video::{FieldParity, System, VideoFormat};
use crate::ErrorKind;

const WIDTH: u32 = 4;
const STORED_HEIGHT: u32 = 245;
const FIELD_LENGTH: usize = (WIDTH * STORED_HEIGHT) as usize;

/// Writes a two-field capture whose sample values encode their own position:
/// `field * 10_000 + line * 10 + sample`.
fn write_capture(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("capture.tbc");
    let mut bytes = Vec::with_capacity(FIELD_LENGTH * 2 * 2);
    for field in 0..2u16 {
        for line in 0..STORED_HEIGHT as u16 {
            for sample in 0..WIDTH as u16 {
                bytes.extend_from_slice(&(field * 10_000 + line * 10 + sample).to_le_bytes());
            }
        }
    }
    fs::write(&path, bytes).unwrap();
    path
}

fn write_sidecar(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("capture.tbc.json");
    let json = r#"{
        "video_parameters": {
            "system": "NTSC",
            "field_width": 4,
            "field_height": 245,
            "sample_rate": 14318181.8,
            "active_video_start": 1,
            "active_video_end": 4,
            "colour_burst_start": 0,
            "colour_burst_end": 1,
            "white_16b_ire": 54016,
            "black_16b_ire": 16384,
            "first_active_frame_line": 40,
            "last_active_frame_line": 480
        },
        "pcm_audio_parameters": { "sample_rate": 44100, "bits": 16, "channels": 2 },
        "fields": [
            { "is_first_field": true, "field_phase_id": 1, "sync_confidence": 100,
              "dropouts": [ { "line": 2, "start_sample": 1, "end_sample": 3 } ] },
            { "is_first_field": false, "field_phase_id": 2 }
        ]
    }"#;
    fs::write(&path, json).unwrap();
    path
}

#[googletest::test]
fn test_reader_discovers_field_count_from_file_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_capture(dir.path());

    let reader = TbcReader::open(&path, FIELD_LENGTH, WIDTH as usize).unwrap();
    expect_that!(reader.field_count(), eq(2));
    expect_that!(reader.lines_per_field(), some(eq(STORED_HEIGHT)));

    // A trailing partial field is ignored.
    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(&[0u8; 10]);
    fs::write(&path, bytes).unwrap();
    let reader = TbcReader::open(&path, FIELD_LENGTH, WIDTH as usize).unwrap();
    expect_that!(reader.field_count(), eq(2));
}

#[googletest::test]
fn test_reader_reads_fields_and_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_capture(dir.path());
    let mut reader = TbcReader::open(&path, FIELD_LENGTH, WIDTH as usize).unwrap();

    let field0 = reader.read_field(crate::field::FieldId::new(0)).unwrap();
    expect_that!(field0.len(), eq(FIELD_LENGTH));
    expect_that!(field0[0], eq(0));
    expect_that!(field0[4], eq(10)); // line 1, sample 0

    let line = reader.read_line(crate::field::FieldId::new(1), 3).unwrap();
    expect_that!(line, eq(&vec![10_030, 10_031, 10_032, 10_033]));

    let lines = reader.read_field_lines(crate::field::FieldId::new(0), 1, 3).unwrap();
    expect_that!(lines.len(), eq(2 * WIDTH as usize));
    expect_that!(lines[0], eq(10));
}

#[googletest::test]
fn test_reader_error_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_capture(dir.path());

    let missing = TbcReader::open(&dir.path().join("nope.tbc"), FIELD_LENGTH, 0);
    expect_that!(missing.map(|_| ()).map_err(|e| e.kind()), err(eq(ErrorKind::FileNotFound)));

    let bad_geometry = TbcReader::open(&path, 0, 0);
    expect_that!(
        bad_geometry.map(|_| ()).map_err(|e| e.kind()),
        err(eq(ErrorKind::InvalidArgument))
    );

    let mut reader = TbcReader::open(&path, FIELD_LENGTH, WIDTH as usize).unwrap();
    let out_of_range = reader.read_field(crate::field::FieldId::new(2));
    expect_that!(out_of_range.map_err(|e| e.kind()), err(eq(&ErrorKind::InvalidArgument)));

    let invalid = reader.read_field(crate::field::FieldId::invalid());
    expect_that!(invalid.map_err(|e| e.kind()), err(eq(&ErrorKind::InvalidArgument)));

    let bad_lines = reader.read_field_lines(crate::field::FieldId::new(0), 3, 3);
    expect_that!(bad_lines.map_err(|e| e.kind()), err(eq(&ErrorKind::InvalidArgument)));

    let mut no_lines = TbcReader::open(&path, FIELD_LENGTH, 0).unwrap();
    let line_read = no_lines.read_line(crate::field::FieldId::new(0), 0);
    expect_that!(line_read.map_err(|e| e.kind()), err(eq(&ErrorKind::InvalidState)));
}

#[googletest::test]
fn test_metadata_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sidecar(dir.path());
    let metadata = MetadataFile::open(&path).unwrap();

    let params = metadata.video_parameters().unwrap();
    expect_that!(params.system, eq(System::Ntsc));
    expect_that!(params.is_valid(), eq(true));
    // The subcarrier is absent from the sidecar, so the standards default applies.
    expect_that!(params.fsc, near(3_579_545.45, 0.01));
    expect_that!(params.frame_rate, eq(num::rational::Ratio::new(30_000, 1_001)));

    let hint = metadata.active_line_hint().unwrap();
    expect_that!(hint.first_active_frame_line, eq(40));
    expect_that!(hint.first_active_field_line, eq(20));

    let field0 = metadata.field_metadata(crate::field::FieldId::new(0)).unwrap();
    expect_that!(field0.is_first_field, some(eq(true)));
    expect_that!(metadata.dropouts(crate::field::FieldId::new(0)), len(eq(1)));
    expect_that!(metadata.field_metadata(crate::field::FieldId::new(9)), none());
    expect_that!(metadata.all_field_metadata(), len(eq(2)));
    expect_that!(metadata.pcm_audio_parameters().map(|p| p.sample_rate), some(eq(44_100)));
}

#[googletest::test]
fn test_metadata_parse_error_kind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, "{ not json").unwrap();
    let error = MetadataFile::open(&path).map(|_| ()).unwrap_err();
    expect_that!(error.kind(), eq(ErrorKind::InvalidFormat));
    expect_that!(error.chain().to_string(), contains_substring("Could not parse metadata file"));
}

#[googletest::test]
fn test_representation_truncates_padding_and_bounds_lines() {
    let dir = tempfile::tempdir().unwrap();
    let tbc = write_capture(dir.path());
    write_sidecar(dir.path());

    let repr = TbcFieldRepresentation::open(&tbc, None).unwrap();
    let id = crate::field::FieldId::new(0);

    let descriptor = repr.descriptor(id).unwrap();
    // NTSC standard height truncates the two padding lines the container stores.
    expect_that!(descriptor.height, eq(243));
    expect_that!(descriptor.format, eq(VideoFormat::Ntsc));
    expect_that!(descriptor.parity, eq(FieldParity::Top));

    let field = repr.field(id).unwrap();
    expect_that!(field.len(), eq((243 * WIDTH) as usize));

    expect_that!(repr.line(id, 242), some(anything()));
    expect_that!(repr.line(id, 243), none());
    expect_that!(repr.line(id, 244), none());

    // Line contents come from the right place in the file.
    let line = repr.line(id, 1).unwrap();
    expect_that!(line.as_slice(), eq(&[10, 11, 12, 13][..]));
}

#[googletest::test]
fn test_representation_hints_come_from_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let tbc = write_capture(dir.path());
    write_sidecar(dir.path());
    let repr = TbcFieldRepresentation::open(&tbc, None).unwrap();

    let parity = repr.field_parity_hint(crate::field::FieldId::new(1)).unwrap();
    expect_that!(parity.is_first_field, eq(false));
    expect_that!(parity.confidence_pct, eq(100));

    let phase = repr.field_phase_hint(crate::field::FieldId::new(0)).unwrap();
    expect_that!(phase.field_phase_id, eq(1));

    expect_that!(repr.dropout_hints(crate::field::FieldId::new(0)), len(eq(1)));
    expect_that!(repr.dropout_hints(crate::field::FieldId::new(1)), empty());
    expect_that!(repr.active_line_hint(crate::field::FieldId::new(0)), some(anything()));

    // The second field's descriptor uses the metadata parity.
    let descriptor = repr.descriptor(crate::field::FieldId::new(1)).unwrap();
    expect_that!(descriptor.parity, eq(FieldParity::Bottom));
}

#[googletest::test]
fn test_representation_repeated_line_access_uses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let tbc = write_capture(dir.path());
    write_sidecar(dir.path());
    let repr = TbcFieldRepresentation::open(&tbc, None).unwrap();
    let id = crate::field::FieldId::new(1);

    let first = repr.line(id, 0).unwrap();
    let second = repr.line(id, 0).unwrap();
    expect_that!(first.as_slice(), eq(second.as_slice()));
    expect_that!(first[0], eq(10_000));
}
