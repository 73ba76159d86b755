//! The field-mapping analyzer.
//!
//! Player tracking problems leave raw captures with skipped, repeated and missing fields.
//! This analyzer pairs consecutive fields into frames, reads the accumulated VBI, pulldown and
//! phase observations, repairs what can be repaired, and emits a [`MappingSpec`] describing the
//! ordered, de-duplicated, gap-padded programme sequence.  A field-map stage downstream
//! consumes the emitted specification to reorder and pad the capture.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::field::FieldId;
use crate::obs::FieldObservations;
use crate::repr::FieldRepresentation;
use crate::video::VideoFormat;

use super::mapping_spec::{MappingItem, MappingSpec};
use super::progress::AnalysisProgress;
use super::result::{AnalysisResult, AnalysisStatus};

#[cfg(test)]
mod tests;

/// How far ahead the VBI correction window looks.
const SCAN_DISTANCE: usize = 10;

/// Gaps at least this long are logged and left unpadded.
const MAX_PADDED_GAP: i32 = 1000;

/// Options controlling an analyzer run.
#[derive(Debug, Clone, Copy)]
pub struct FieldMappingOptions {
    /// Drop frames whose VBI number cannot be recovered instead of failing the run.
    pub delete_unmappable_frames: bool,
    /// Insert black frames into numbering gaps shorter than [`MAX_PADDED_GAP`].
    pub pad_gaps: bool,
}

impl Default for FieldMappingOptions {
    fn default() -> Self {
        FieldMappingOptions { delete_unmappable_frames: false, pad_gaps: true }
    }
}

/// One candidate output frame: a pair of consecutive source fields plus everything the
/// observers learned about them.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// First (top) field of the pair.
    pub first_field: FieldId,
    /// Second (bottom) field of the pair.
    pub second_field: FieldId,
    /// Position of the frame within the raw capture.
    pub seq_frame_number: i32,
    /// Frame number recovered from the VBI; -1 when unknown.
    pub vbi_frame_number: i32,
    /// Quality score in (0, 1], used to resolve duplicates.
    pub quality_score: f64,
    /// Whether either field is a pulldown repeat.
    pub is_pulldown: bool,
    /// Whether the frame lies in the lead-in/lead-out region.
    pub is_lead_in_out: bool,
    /// Scratch flag used by the removal passes.
    pub marked_for_deletion: bool,
    /// Whether the frame is synthesized padding rather than real capture data.
    pub is_padded: bool,
    /// Colour-sequence phase of the first field; -1 when unknown.
    pub first_field_phase: i32,
    /// Colour-sequence phase of the second field; -1 when unknown.
    pub second_field_phase: i32,
}

impl FrameInfo {
    fn padded(vbi_frame_number: i32) -> Self {
        FrameInfo {
            first_field: FieldId::invalid(),
            second_field: FieldId::invalid(),
            seq_frame_number: -1,
            vbi_frame_number,
            quality_score: 0.0,
            is_pulldown: false,
            is_lead_in_out: false,
            marked_for_deletion: false,
            is_padded: true,
            first_field_phase: -1,
            second_field_phase: -1,
        }
    }
}

/// Counters describing what an analyzer run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldMappingStats {
    /// Fields in the source range.
    pub total_fields: u64,
    /// Frames dropped for lying in lead-in/lead-out.
    pub removed_lead_in_out: usize,
    /// Frames dropped for inconsistent field phases.
    pub removed_invalid_phase: usize,
    /// VBI numbers repaired by sequence analysis.
    pub corrected_vbi_errors: usize,
    /// Duplicate frames dropped (best quality kept).
    pub removed_duplicates: usize,
    /// Pulldown frames numbered from their predecessors.
    pub pulldown_frames: usize,
    /// Numbering gaps padded.
    pub gaps_padded: usize,
    /// Black frames inserted into gaps.
    pub padding_frames: usize,
    /// Unmappable frames dropped on request.
    pub removed_unmappable: usize,
}

/// States of one analyzer run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AnalyzerState {
    Start,
    Observing,
    Building,
    Correcting,
    Deduping,
    Verifying,
    Reordering,
    Padding,
    Emitting,
    Success,
    Failed,
    Cancelled,
}

/// The analyzer's verdict.
#[derive(Debug, Clone)]
pub struct FieldMappingDecision {
    /// Outcome of the run.
    pub status: AnalysisStatus,
    /// State the run finished in.
    pub state: AnalyzerState,
    /// The emitted mapping specification, on success.
    pub mapping_spec: Option<MappingSpec>,
    /// Whether the disc reads as CAV (picture numbers) rather than CLV (timecodes).
    pub is_cav: bool,
    /// Whether the source is a 625-line system.
    pub is_pal: bool,
    /// Counters describing the run.
    pub stats: FieldMappingStats,
    /// Human-readable description of what was done (or why the run failed).
    pub rationale: String,
    /// Structured warnings gathered along the way.
    pub warnings: Vec<String>,
}

impl FieldMappingDecision {
    fn failed(state: AnalyzerState, rationale: &str) -> Self {
        FieldMappingDecision {
            status: if state == AnalyzerState::Cancelled {
                AnalysisStatus::Cancelled
            } else {
                AnalysisStatus::Failed
            },
            state,
            mapping_spec: None,
            is_cav: false,
            is_pal: false,
            stats: FieldMappingStats::default(),
            rationale: rationale.to_owned(),
            warnings: Vec::new(),
        }
    }

    /// Repackages the decision into the generic analysis result envelope.
    pub fn to_analysis_result(&self) -> AnalysisResult {
        let mut result = AnalysisResult::new(self.status, &self.rationale);
        result.items = self.warnings.clone();
        result
            .statistics
            .insert("total_fields".into(), (self.stats.total_fields as i32).into());
        result
            .statistics
            .insert("removed_lead_in_out".into(), (self.stats.removed_lead_in_out as i32).into());
        result.statistics.insert(
            "removed_invalid_phase".into(),
            (self.stats.removed_invalid_phase as i32).into(),
        );
        result
            .statistics
            .insert("corrected_vbi_errors".into(), (self.stats.corrected_vbi_errors as i32).into());
        result
            .statistics
            .insert("removed_duplicates".into(), (self.stats.removed_duplicates as i32).into());
        result
            .statistics
            .insert("pulldown_frames".into(), (self.stats.pulldown_frames as i32).into());
        result.statistics.insert("gaps_padded".into(), (self.stats.gaps_padded as i32).into());
        result
            .statistics
            .insert("padding_frames".into(), (self.stats.padding_frames as i32).into());
        result
            .statistics
            .insert("removed_unmappable".into(), (self.stats.removed_unmappable as i32).into());
        if let Some(spec) = &self.mapping_spec {
            result.parameter_changes.insert("mapping_spec".into(), spec.to_string().into());
        }
        result
    }
}

/// Reconstructs an ordered, de-duplicated, gap-padded programme sequence from a raw capture.
#[derive(Debug, Default)]
pub struct FieldMappingAnalyzer {
    options: FieldMappingOptions,
}

impl FieldMappingAnalyzer {
    /// Creates an analyzer with the given options.
    pub fn new(options: FieldMappingOptions) -> Self {
        FieldMappingAnalyzer { options }
    }

    /// Runs the analysis against a source whose observations have been populated.
    pub fn analyze(
        &self,
        source: &dyn FieldRepresentation,
        progress: &dyn AnalysisProgress,
    ) -> FieldMappingDecision {
        info!("field mapping analysis starting");
        progress.set_status("Collecting observations");
        progress.set_progress(0);

        let field_range = source.field_range();
        if !field_range.is_valid() || field_range.size() < 2 {
            return FieldMappingDecision::failed(
                AnalyzerState::Failed,
                "Source has fewer than two fields; nothing to map",
            );
        }

        let mut stats = FieldMappingStats { total_fields: field_range.size(), ..Default::default() };

        let format = source
            .descriptor(field_range.start)
            .map(|d| d.format)
            .unwrap_or(VideoFormat::Ntsc);
        let is_pal = format == VideoFormat::Pal;

        // Steps 1 and 2: ingest observations and pair consecutive fields into frames.
        let mut is_cav = false;
        let mut frames = Vec::with_capacity((field_range.size() / 2) as usize);
        for (index, pair) in field_range.iter().tuples::<(_, _)>().enumerate() {
            if index % 100 == 0 {
                progress.set_sub_status(&format!("Pairing fields {}/{}", index * 2, stats.total_fields));
                progress.set_progress((20 + index * 100 / stats.total_fields as usize).min(70) as u8);
                if progress.is_cancelled() {
                    return FieldMappingDecision::failed(
                        AnalyzerState::Cancelled,
                        "Analysis cancelled while collecting observations",
                    );
                }
            }
            frames.push(build_frame(source, pair.0, pair.1, index as i32, is_pal, &mut is_cav));
        }

        debug!(
            frames = frames.len(),
            format = %format,
            disc = if is_cav { "CAV" } else { "CLV" },
            "built frame map"
        );

        // Step 3: drop lead-in/lead-out frames.
        progress.set_status("Applying corrections");
        progress.set_progress(72);
        stats.removed_lead_in_out = remove_marked(&mut frames, |frame| frame.is_lead_in_out);
        debug!(removed = stats.removed_lead_in_out, "removed lead-in/out frames");

        // Step 4: drop frames whose two fields disagree on the colour sequence.
        stats.removed_invalid_phase = remove_invalid_phase(&mut frames, format);
        debug!(removed = stats.removed_invalid_phase, "removed invalid-phase frames");

        if progress.is_cancelled() {
            return FieldMappingDecision::failed(
                AnalyzerState::Cancelled,
                "Analysis cancelled while applying corrections",
            );
        }

        // Step 5: repair isolated VBI misreads by sequence analysis.
        stats.corrected_vbi_errors = correct_vbi_with_sequence(&mut frames, format);
        debug!(corrected = stats.corrected_vbi_errors, "corrected VBI numbers");

        // Step 6: resolve duplicate VBI numbers by quality.
        stats.removed_duplicates = remove_duplicates(&mut frames);
        debug!(removed = stats.removed_duplicates, "removed duplicate frames");

        // Step 7: pulldown frames inherit their predecessor's number (NTSC CAV only).
        if !is_pal && is_cav {
            stats.pulldown_frames = number_pulldown_frames(&mut frames);
        }

        // Step 8: every remaining frame must be numbered.
        let unmappable = frames.iter().filter(|f| f.vbi_frame_number < 0).count();
        let mut warnings = Vec::new();
        if unmappable > 0 {
            if self.options.delete_unmappable_frames {
                warn!(unmappable, "deleting unmappable frames as requested");
                stats.removed_unmappable =
                    remove_marked(&mut frames, |frame| frame.vbi_frame_number < 0 && !frame.is_pulldown);
            } else {
                let rationale = format!(
                    "Field mapping failed: {unmappable} unmappable frame(s) detected out of {} \
                     total frames. Try the delete_unmappable_frames option.",
                    frames.len()
                );
                let mut decision = FieldMappingDecision::failed(AnalyzerState::Failed, &rationale);
                decision.warnings.push(format!(
                    "Unmappable frames present: {unmappable} of {} frames",
                    frames.len()
                ));
                decision.stats = stats;
                decision.is_cav = is_cav;
                decision.is_pal = is_pal;
                return decision;
            }
        }

        // Step 9: play out in VBI order; a pulldown frame follows its source frame.
        frames.sort_by(|a, b| {
            (a.vbi_frame_number, a.is_pulldown).cmp(&(b.vbi_frame_number, b.is_pulldown))
        });

        // Step 10: pad numbering gaps with black frames.
        if self.options.pad_gaps {
            let (gaps, padding) = pad_gaps(&mut frames, &mut warnings);
            stats.gaps_padded = gaps;
            stats.padding_frames = padding;
        }

        // Step 11: with pulldown in play the VBI numbers repeat, so renumber densely.
        if !is_pal && is_cav && stats.pulldown_frames > 0 {
            renumber_for_pulldown(&mut frames);
        }

        // Step 12: emit the mapping specification.
        progress.set_status("Generating mapping specification");
        progress.set_progress(85);
        let mapping_spec = generate_mapping_spec(&frames);
        let rationale = generate_rationale(&stats, is_cav, is_pal);

        info!(
            input_fields = stats.total_fields,
            output_frames = frames.len(),
            spec_items = mapping_spec.items().len(),
            "field mapping analysis complete"
        );
        progress.set_progress(100);

        FieldMappingDecision {
            status: AnalysisStatus::Success,
            state: AnalyzerState::Success,
            mapping_spec: Some(mapping_spec),
            is_cav,
            is_pal,
            stats,
            rationale,
            warnings,
        }
    }
}

fn observation_i32(observations: &FieldObservations, namespace: &str, name: &str) -> Option<i32> {
    observations.get(namespace)?.get(name)?.as_i32()
}

fn observation_f64(observations: &FieldObservations, namespace: &str, name: &str) -> Option<f64> {
    observations.get(namespace)?.get(name)?.as_f64()
}

fn observation_bool(observations: &FieldObservations, namespace: &str, name: &str) -> Option<bool> {
    observations.get(namespace)?.get(name)?.as_bool()
}

/// Converts a (possibly partial) CLV timecode into a frame number.  Absent parts contribute
/// nothing, matching the behavior of discs that only encode hours/minutes on some lines.
fn clv_frame_number(observations: &FieldObservations, is_pal: bool) -> Option<i32> {
    let hours = observation_i32(observations, "biphase", "clv_hours");
    let minutes = observation_i32(observations, "biphase", "clv_minutes");
    let seconds = observation_i32(observations, "biphase", "clv_seconds");
    let picture = observation_i32(observations, "biphase", "clv_picture");
    if hours.is_none() && minutes.is_none() && seconds.is_none() && picture.is_none() {
        return None;
    }

    let fps = if is_pal { 25 } else { 30 };
    let mut frame = 0;
    frame += hours.unwrap_or(0) * 3600 * fps;
    frame += minutes.unwrap_or(0) * 60 * fps;
    frame += seconds.unwrap_or(0) * fps;
    frame += picture.unwrap_or(0);
    Some(frame)
}

fn build_frame(
    source: &dyn FieldRepresentation,
    first: FieldId,
    second: FieldId,
    seq_frame_number: i32,
    is_pal: bool,
    is_cav: &mut bool,
) -> FrameInfo {
    let first_obs = source.observations(first);
    let second_obs = source.observations(second);

    // CAV picture numbers are preferred; CLV timecodes are converted to frame numbers.
    let mut vbi_frame_number = -1;
    if let Some(picture) = observation_i32(&first_obs, "biphase", "picture_number")
        .or_else(|| observation_i32(&second_obs, "biphase", "picture_number"))
    {
        vbi_frame_number = picture;
        *is_cav = true;
    } else if let Some(frame) = clv_frame_number(&first_obs, is_pal)
        .or_else(|| clv_frame_number(&second_obs, is_pal))
    {
        vbi_frame_number = frame;
    }

    let phase_of = |id: FieldId| {
        source.field_phase_hint(id).map(|h| h.field_phase_id).unwrap_or(-1)
    };

    let quality_of = |observations: &FieldObservations| {
        observation_f64(observations, "field_quality", "score").unwrap_or(1.0)
    };
    let quality_score = (quality_of(&first_obs) + quality_of(&second_obs)) / 2.0;

    let is_pulldown = observation_bool(&first_obs, "pulldown", "is_pulldown").unwrap_or(false)
        || observation_bool(&second_obs, "pulldown", "is_pulldown").unwrap_or(false);

    let lead_marker = |observations: &FieldObservations| {
        observation_bool(observations, "biphase", "lead_in").unwrap_or(false)
            || observation_bool(observations, "biphase", "lead_out").unwrap_or(false)
            || observation_bool(observations, "biphase", "cav_picture_zero").unwrap_or(false)
    };
    let is_lead_in_out = lead_marker(&first_obs) || lead_marker(&second_obs);

    FrameInfo {
        first_field: first,
        second_field: second,
        seq_frame_number,
        vbi_frame_number,
        quality_score,
        is_pulldown,
        is_lead_in_out,
        marked_for_deletion: false,
        is_padded: false,
        first_field_phase: phase_of(first),
        second_field_phase: phase_of(second),
    }
}

/// Marks frames matching `predicate` and removes them, returning how many went.
fn remove_marked(frames: &mut Vec<FrameInfo>, predicate: impl Fn(&FrameInfo) -> bool) -> usize {
    let before = frames.len();
    frames.retain(|frame| !predicate(frame));
    before - frames.len()
}

fn next_phase(phase: i32, format: VideoFormat) -> i32 {
    let modulus = if format == VideoFormat::Pal { 8 } else { 4 };
    (phase % modulus) + 1
}

/// Drops frames whose second field's phase does not follow the first field's.  Both phases
/// must be known for a frame to be judged.
fn remove_invalid_phase(frames: &mut Vec<FrameInfo>, format: VideoFormat) -> usize {
    remove_marked(frames, |frame| {
        frame.first_field_phase != -1
            && frame.second_field_phase != -1
            && frame.second_field_phase != next_phase(frame.first_field_phase, format)
    })
}

/// Repairs isolated VBI misreads: inside a sliding window anchored on a trusted frame, an
/// errant frame is rewritten to the expected sequential number when enough good frames bracket
/// it, it is not a genuine repeat, and its phase continues the sequence.  A genuine repeat
/// (same VBI and same phases as its predecessor) ends the window.
fn correct_vbi_with_sequence(frames: &mut [FrameInfo], format: VideoFormat) -> usize {
    let mut corrections = 0;

    for i in 0..frames.len() {
        if i + SCAN_DISTANCE >= frames.len() {
            break;
        }
        if frames[i].is_pulldown || frames[i].vbi_frame_number == -1 {
            continue;
        }

        let start_vbi = frames[i].vbi_frame_number;

        // Classify each window position: does it hold the expected sequential number?
        let mut vbi_good = [false; SCAN_DISTANCE];
        let mut expected_increment = 1;
        let mut sequence_good = true;
        for (j, good) in vbi_good.iter_mut().enumerate() {
            let idx = i + j + 1;
            if idx >= frames.len() {
                break;
            }
            if !frames[idx].is_pulldown {
                sequence_good = frames[idx].vbi_frame_number == start_vbi + expected_increment;
                *good = sequence_good;
                expected_increment += 1;
            } else {
                *good = sequence_good;
            }
        }

        if vbi_good.iter().all(|&g| g) {
            continue;
        }

        // Trust the window only when at least two good frames bracket the errors.
        let good_before = vbi_good
            .iter()
            .enumerate()
            .take_while(|&(j, &good)| {
                let idx = i + j + 1;
                idx < frames.len() && (frames[idx].is_pulldown || good)
            })
            .filter(|&(j, _)| !frames[i + j + 1].is_pulldown)
            .count();
        let good_after = vbi_good
            .iter()
            .enumerate()
            .rev()
            .take_while(|&(j, &good)| {
                let idx = i + j + 1;
                idx < frames.len() && (frames[idx].is_pulldown || good)
            })
            .filter(|&(j, _)| i + j + 1 < frames.len() && !frames[i + j + 1].is_pulldown)
            .count();
        if good_before < 2 || good_after < 2 {
            continue;
        }

        let mut in_error = false;
        let mut expected_increment = 1;
        for (j, &good) in vbi_good.iter().enumerate() {
            let idx = i + j + 1;
            if idx >= frames.len() {
                break;
            }
            if !good {
                in_error = true;
                if !frames[idx].is_pulldown {
                    let is_repeating = idx > 0
                        && frames[idx].vbi_frame_number == frames[idx - 1].vbi_frame_number;

                    let has_correct_phase = if idx > 0
                        && frames[idx].first_field_phase != -1
                        && frames[idx - 1].second_field_phase != -1
                    {
                        frames[idx].first_field_phase
                            == next_phase(frames[idx - 1].second_field_phase, format)
                    } else {
                        true
                    };

                    if !is_repeating && has_correct_phase {
                        let corrected = start_vbi + expected_increment;
                        debug!(
                            seq = frames[idx].seq_frame_number,
                            from = frames[idx].vbi_frame_number,
                            to = corrected,
                            "correcting VBI number"
                        );
                        frames[idx].vbi_frame_number = corrected;
                        corrections += 1;
                    } else if is_repeating {
                        let phase_repeats = frames[idx].first_field_phase
                            == frames[idx - 1].first_field_phase
                            && frames[idx].second_field_phase == frames[idx - 1].second_field_phase;
                        if phase_repeats {
                            // A genuine repeated frame, not a misread: stop the window here.
                            debug!(
                                seq = frames[idx].seq_frame_number,
                                "sequence break is a genuine repeat"
                            );
                            break;
                        }
                    }
                    expected_increment += 1;
                }
            } else {
                if !frames[idx].is_pulldown {
                    expected_increment += 1;
                }
                if in_error {
                    break;
                }
            }
        }
    }
    corrections
}

/// Groups frames by VBI number and keeps the best-quality frame of each group.
fn remove_duplicates(frames: &mut Vec<FrameInfo>) -> usize {
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (index, frame) in frames.iter().enumerate() {
        if !frame.is_pulldown && frame.vbi_frame_number != -1 {
            groups.entry(frame.vbi_frame_number).or_default().push(index);
        }
    }

    let mut removed = 0;
    for (vbi, indices) in groups.iter().filter(|(_, indices)| indices.len() > 1) {
        let best = indices
            .iter()
            .copied()
            .max_by(|&a, &b| {
                frames[a]
                    .quality_score
                    .partial_cmp(&frames[b].quality_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("non-empty duplicate group");
        debug!(
            vbi,
            duplicates = indices.len(),
            kept_seq = frames[best].seq_frame_number,
            "resolving duplicate frames"
        );
        for &index in indices {
            if index != best {
                frames[index].marked_for_deletion = true;
                removed += 1;
            }
        }
    }

    frames.retain(|frame| !frame.marked_for_deletion);
    removed
}

/// Pulldown frames carry their source frame's number.
fn number_pulldown_frames(frames: &mut [FrameInfo]) -> usize {
    let mut pulldown_count = 0;
    for i in 1..frames.len() {
        if frames[i].is_pulldown {
            frames[i].vbi_frame_number = frames[i - 1].vbi_frame_number;
            pulldown_count += 1;
        }
    }
    // A capture can start mid-pattern with a pulldown frame.
    if frames.len() > 1 && frames[0].is_pulldown {
        frames[0].vbi_frame_number = frames[1].vbi_frame_number - 1;
        warn!(assigned = frames[0].vbi_frame_number, "first frame is pulldown");
    }
    pulldown_count
}

/// Inserts synthesized black frames into numbering gaps between consecutive non-pulldown
/// frames.  Gaps of [`MAX_PADDED_GAP`] frames or more are left alone.
fn pad_gaps(frames: &mut Vec<FrameInfo>, warnings: &mut Vec<String>) -> (usize, usize) {
    let mut padded = Vec::with_capacity(frames.len());
    let mut gaps = 0;
    let mut total_padding = 0;

    for i in 0..frames.len() {
        padded.push(frames[i].clone());

        if i + 1 >= frames.len() || frames[i].is_pulldown || frames[i + 1].is_pulldown {
            continue;
        }
        let current_vbi = frames[i].vbi_frame_number;
        let gap_size = frames[i + 1].vbi_frame_number - current_vbi - 1;
        if gap_size > 0 && gap_size < MAX_PADDED_GAP {
            debug!(current_vbi, gap_size, "padding numbering gap");
            for j in 0..gap_size {
                padded.push(FrameInfo::padded(current_vbi + j + 1));
            }
            gaps += 1;
            total_padding += gap_size as usize;
        } else if gap_size >= MAX_PADDED_GAP {
            let message = format!(
                "Large gap of {gap_size} frames (VBI {current_vbi} to {}) left unpadded",
                frames[i + 1].vbi_frame_number
            );
            warn!("{message}");
            warnings.push(message);
        }
    }

    *frames = padded;
    (gaps, total_padding)
}

/// With pulldown frames sharing their source numbers, reassign dense sequential numbers.
fn renumber_for_pulldown(frames: &mut [FrameInfo]) {
    let mut next = frames.first().map(|f| f.vbi_frame_number).unwrap_or(0);
    for frame in frames.iter_mut() {
        frame.vbi_frame_number = next;
        next += 1;
    }
}

/// Walks the final frame list and emits contiguous runs of real source fields as inclusive
/// ranges, coalescing padded frames into `PAD_N` tokens.  A discontinuity in source field IDs
/// closes the current range.
fn generate_mapping_spec(frames: &[FrameInfo]) -> MappingSpec {
    let mut items = Vec::new();
    let mut run_start: Option<FieldId> = None;
    let mut last_real: Option<&FrameInfo> = None;
    let mut pad_frames = 0u32;

    for frame in frames {
        if frame.is_padded {
            if let (Some(start), Some(prev)) = (run_start.take(), last_real) {
                items.push(MappingItem::Range { first: start, last: prev.second_field });
            }
            pad_frames += 1;
            continue;
        }

        if pad_frames > 0 {
            // The pad directive counts fields: two per padded frame.
            items.push(MappingItem::Pad { fields: pad_frames * 2 });
            pad_frames = 0;
        }

        let contiguous = last_real
            .is_some_and(|prev| frame.first_field == prev.second_field.saturating_add(1));
        if let Some(start) = run_start {
            if !contiguous {
                let prev = last_real.expect("open run has a last frame");
                items.push(MappingItem::Range { first: start, last: prev.second_field });
                run_start = None;
            }
        }
        if run_start.is_none() {
            run_start = Some(frame.first_field);
        }
        last_real = Some(frame);
    }

    if let (Some(start), Some(prev)) = (run_start, last_real) {
        items.push(MappingItem::Range { first: start, last: prev.second_field });
    } else if pad_frames > 0 {
        items.push(MappingItem::Pad { fields: pad_frames * 2 });
    }

    MappingSpec::new(items).expect("emitted items satisfy the grammar")
}

fn generate_rationale(stats: &FieldMappingStats, is_cav: bool, is_pal: bool) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Field mapping analysis complete.");
    let _ = writeln!(
        text,
        "Disc type: {} {}",
        if is_pal { "PAL" } else { "NTSC" },
        if is_cav { "CAV" } else { "CLV" }
    );
    let _ = writeln!(
        text,
        "Input: {} fields ({} field pairs/frames)",
        stats.total_fields,
        stats.total_fields / 2
    );
    let _ = writeln!(text);
    let _ = writeln!(text, "Operations performed:");
    if stats.removed_lead_in_out > 0 {
        let _ =
            writeln!(text, "  - Removed {} lead-in/lead-out frames", stats.removed_lead_in_out);
    }
    if stats.removed_invalid_phase > 0 {
        let _ = writeln!(
            text,
            "  - Removed {} frames with invalid phase sequences",
            stats.removed_invalid_phase
        );
    }
    if stats.corrected_vbi_errors > 0 {
        let _ = writeln!(
            text,
            "  - Corrected {} VBI frame number errors using sequence analysis",
            stats.corrected_vbi_errors
        );
    }
    if stats.removed_duplicates > 0 {
        let _ = writeln!(
            text,
            "  - Removed {} duplicate frames (keeping best quality)",
            stats.removed_duplicates
        );
    }
    if stats.pulldown_frames > 0 {
        let _ = writeln!(text, "  - Numbered {} pulldown frames", stats.pulldown_frames);
    }
    if stats.gaps_padded > 0 {
        let _ = writeln!(
            text,
            "  - Padded {} gaps with {} black frames",
            stats.gaps_padded, stats.padding_frames
        );
    }
    if stats.removed_unmappable > 0 {
        let _ = writeln!(text, "  - Removed {} unmappable frames", stats.removed_unmappable);
    }
    text
}
