//! MIDI clip timeline model
//!
//! A clip has three independent extents:
//! - `duration`: how much arrangement timeline the clip covers
//! - `loop_length`: where its content ends and the next repetition begins
//! - `content_start_offset`: how much content is skipped before it sounds
//!
//! Every note and automation lookup in arrangement time goes through
//! [`MidiClip::content_time_at`], never straight into the content axis.
//!
//! ```rust
//! use timeline_automation::prelude::*;
//!
//! // one bar of content looped three times
//! let clip = MidiClip::new(TrackId::new(), 0.0, 12.0)
//!     .with_loop_length(4.0)
//!     .add_note(Note::new(60, 100, 1.0, 0.5));
//!
//! assert_eq!(clip.arrangement_times_for(1.0), vec![1.0, 5.0, 9.0]);
//! assert_eq!(clip.content_time_at(6.0), Some(2.0));
//! ```
//!
//! Edits never modify a clip in place: each returns a new value. Notes and
//! each automation lane are shared between versions until one of them is
//! edited.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::automation::ClipAutomation;
use crate::id::{ClipId, NoteId, PatternId, PointId, TrackId};
use crate::lane::{ClipLane, ControlPoint};
use crate::note::{Note, MIN_NOTE_BEATS};
use crate::parameter::Parameter;
use crate::time::{sanitize_beats, wrap};

/// Shortest clip duration or loop length in beats
pub const MIN_CLIP_BEATS: f64 = MIN_NOTE_BEATS;

/// Length of a clip created without an explicit duration
pub const DEFAULT_CLIP_BEATS: f64 = 4.0;

/// A stretch of arrangement time that plays one contiguous run of content
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentSegment {
    /// Beats from the clip start
    pub arrangement_start: f64,
    /// Beats from the content start
    pub content_start: f64,
    pub length: f64,
}

impl ContentSegment {
    pub fn arrangement_end(&self) -> f64 {
        self.arrangement_start + self.length
    }

    pub fn content_end(&self) -> f64 {
        self.content_start + self.length
    }

    fn contains_content(&self, time: f64) -> bool {
        time >= self.content_start && time < self.content_end()
    }
}

/// One audible occurrence of a note, in beats from the clip start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteOnset {
    pub note: NoteId,
    pub pitch: u8,
    pub velocity: u8,
    pub start: f64,
    /// Truncated at the end of the repetition and of the clip
    pub duration: f64,
}

impl NoteOnset {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Outcome of [`MidiClip::split`]
#[derive(Debug, Clone)]
pub enum ClipSplit {
    /// The cut fell outside the clip; the clip is returned unchanged
    Whole(MidiClip),
    Pair(MidiClip, MidiClip),
}

impl ClipSplit {
    pub fn into_pair(self) -> Option<(MidiClip, MidiClip)> {
        match self {
            Self::Pair(left, right) => Some((left, right)),
            Self::Whole(_) => None,
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Self::Pair(..))
    }
}

/// MIDI clip placed on a track
#[derive(Debug, Clone)]
pub struct MidiClip {
    id: ClipId,
    track: TrackId,
    timeline_start: f64,
    duration: f64,
    loop_length: f64,
    can_repeat: bool,
    content_start_offset: f64,
    pattern: Option<PatternId>,
    /// Sorted by start, then pitch
    notes: Arc<Vec<Note>>,
    automation: ClipAutomation,
}

impl MidiClip {
    /// Create an empty clip whose loop covers its whole duration
    pub fn new(track: TrackId, timeline_start: f64, duration: f64) -> Self {
        let duration = clip_length(duration);
        Self {
            id: ClipId::new(),
            track,
            timeline_start: sanitize_beats(timeline_start).max(0.0),
            duration,
            loop_length: duration,
            can_repeat: true,
            content_start_offset: 0.0,
            pattern: None,
            notes: Arc::new(Vec::new()),
            automation: ClipAutomation::new(),
        }
    }

    // ==================== Builders ====================

    /// Re-identify the clip; automation lanes follow the new id
    #[must_use]
    pub fn with_id(mut self, id: ClipId) -> Self {
        self.id = id;
        self.automation = self.automation.with_owner(id);
        self
    }

    #[must_use]
    pub fn with_track(mut self, track: TrackId) -> Self {
        self.track = track;
        self
    }

    #[must_use]
    pub fn with_timeline_start(mut self, start: f64) -> Self {
        self.timeline_start = sanitize_beats(start).max(0.0);
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = clip_length(duration);
        self
    }

    /// Set the loop length; the content offset is wrapped into the new loop
    #[must_use]
    pub fn with_loop_length(mut self, loop_length: f64) -> Self {
        self.loop_length = clip_length(loop_length);
        self.content_start_offset = wrap_offset(self.content_start_offset, self.loop_length);
        self
    }

    #[must_use]
    pub fn with_repeat(mut self, can_repeat: bool) -> Self {
        self.can_repeat = can_repeat;
        self
    }

    /// Offset wraps into `[0, loop_length)`
    #[must_use]
    pub fn with_content_offset(mut self, offset: f64) -> Self {
        self.content_start_offset = wrap_offset(offset, self.loop_length);
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: Option<PatternId>) -> Self {
        self.pattern = pattern;
        self
    }

    #[must_use]
    pub fn with_notes<I>(mut self, notes: I) -> Self
    where
        I: IntoIterator<Item = Note>,
    {
        let mut notes: Vec<Note> = notes.into_iter().map(Note::normalized).collect();
        sort_notes(&mut notes);
        self.notes = Arc::new(notes);
        self
    }

    /// Install automation; its lanes are handed to this clip
    #[must_use]
    pub fn with_automation(mut self, automation: ClipAutomation) -> Self {
        self.automation = automation.with_owner(self.id);
        self
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn track(&self) -> TrackId {
        self.track
    }

    pub fn timeline_start(&self) -> f64 {
        self.timeline_start
    }

    pub fn timeline_end(&self) -> f64 {
        self.timeline_start + self.duration
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn loop_length(&self) -> f64 {
        self.loop_length
    }

    pub fn can_repeat(&self) -> bool {
        self.can_repeat
    }

    pub fn content_start_offset(&self) -> f64 {
        self.content_start_offset
    }

    pub fn pattern(&self) -> Option<PatternId> {
        self.pattern
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn automation(&self) -> &ClipAutomation {
        &self.automation
    }

    /// Whether content wraps at least once within the duration
    pub fn repeats(&self) -> bool {
        self.can_repeat && self.content_start_offset + self.duration > self.loop_length
    }

    /// Content axis and arrangement axis coincide
    pub fn is_flat(&self) -> bool {
        self.content_start_offset == 0.0 && self.loop_length == self.duration
    }

    /// Whether both clips read the very same note storage
    pub fn shares_notes(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.notes, &other.notes)
    }

    // ==================== Playback Mapping ====================

    /// Content time heard at `time` beats after the clip start.
    ///
    /// `None` outside `[0, duration)` and in the silent tail of a clip that
    /// does not repeat.
    pub fn content_time_at(&self, time: f64) -> Option<f64> {
        if !(time >= 0.0 && time < self.duration) {
            return None;
        }
        let raw = self.content_start_offset + time;
        if self.can_repeat {
            Some(wrap(raw, self.loop_length))
        } else if raw < self.loop_length {
            Some(raw)
        } else {
            None
        }
    }

    /// The audible runs of content, in arrangement order
    pub fn segments(&self) -> Vec<ContentSegment> {
        let first = ContentSegment {
            arrangement_start: 0.0,
            content_start: self.content_start_offset,
            length: (self.loop_length - self.content_start_offset).min(self.duration),
        };
        let mut segments = vec![first];
        if !self.repeats() {
            return segments;
        }

        for repetition in 1u64.. {
            let arrangement_start =
                repetition as f64 * self.loop_length - self.content_start_offset;
            if arrangement_start >= self.duration {
                break;
            }
            segments.push(ContentSegment {
                arrangement_start,
                content_start: 0.0,
                length: self.loop_length.min(self.duration - arrangement_start),
            });
        }
        segments
    }

    /// Every arrangement time (beats from clip start) at which content time
    /// `content_time` is heard
    pub fn arrangement_times_for(&self, content_time: f64) -> Vec<f64> {
        self.segments()
            .iter()
            .filter(|segment| segment.contains_content(content_time))
            .map(|segment| segment.arrangement_start + (content_time - segment.content_start))
            .collect()
    }

    /// Every audible note occurrence, ordered by start then pitch.
    ///
    /// Notes that begin in skipped content are not heard. Occurrences are cut
    /// at the end of their repetition and at the end of the clip.
    pub fn note_onsets(&self) -> Vec<NoteOnset> {
        let mut onsets = Vec::new();
        for segment in self.segments() {
            for note in self.notes.iter() {
                if !segment.contains_content(note.start) {
                    continue;
                }
                if let Some(cut) = note.truncated(segment.content_end()) {
                    onsets.push(NoteOnset {
                        note: note.id,
                        pitch: note.pitch,
                        velocity: note.velocity,
                        start: segment.arrangement_start + (note.start - segment.content_start),
                        duration: cut.duration,
                    });
                }
            }
        }
        onsets.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));
        onsets
    }

    /// Note occurrences held at `time` beats after the clip start
    pub fn notes_sounding_at(&self, time: f64) -> Vec<NoteOnset> {
        self.note_onsets()
            .into_iter()
            .filter(|onset| time >= onset.start && time < onset.end())
            .collect()
    }

    /// Automation value at `time` beats after the clip start, or `None`
    /// where the clip is silent
    pub fn automation_value_at(&self, parameter: Parameter, time: f64) -> Option<f32> {
        self.content_time_at(time)
            .map(|content| self.automation.value_at(parameter, content))
    }

    /// Lane for `parameter` laid out along the arrangement axis (beats from
    /// clip start), with every repetition materialized
    pub fn arrangement_lane(&self, parameter: Parameter) -> Option<ClipLane> {
        let lane = self.automation.lane(parameter)?;
        if self.is_flat() {
            return Some(lane.clone());
        }
        Some(unroll_lane(lane, &self.segments()))
    }

    // ==================== Note Edits ====================

    #[must_use]
    pub fn add_note(&self, note: Note) -> Self {
        self.edit_notes(|notes| notes.push(note.normalized()))
    }

    /// Unknown ids leave the clip unchanged
    #[must_use]
    pub fn remove_note(&self, id: NoteId) -> Self {
        self.edit_notes(|notes| notes.retain(|note| note.id != id))
    }

    /// Replace the note carrying the same id
    #[must_use]
    pub fn update_note(&self, note: Note) -> Self {
        self.edit_notes(|notes| {
            if let Some(existing) = notes.iter_mut().find(|n| n.id == note.id) {
                *existing = note.normalized();
            }
        })
    }

    #[must_use]
    pub fn select_note(&self, id: NoteId, selected: bool) -> Self {
        self.edit_notes(|notes| {
            for note in notes.iter_mut().filter(|n| n.id == id) {
                note.selected = selected;
            }
        })
    }

    #[must_use]
    pub fn select_all_notes(&self) -> Self {
        self.edit_notes(|notes| notes.iter_mut().for_each(|n| n.selected = true))
    }

    #[must_use]
    pub fn deselect_all_notes(&self) -> Self {
        self.edit_notes(|notes| notes.iter_mut().for_each(|n| n.selected = false))
    }

    #[must_use]
    pub fn delete_selected_notes(&self) -> Self {
        self.edit_notes(|notes| notes.retain(|n| !n.selected))
    }

    /// Snap note starts to a grid in beats. A non-positive grid is ignored.
    #[must_use]
    pub fn quantize(&self, grid: f64) -> Self {
        if !(grid > 0.0 && grid.is_finite()) {
            return self.clone();
        }
        self.edit_notes(|notes| {
            for note in notes.iter_mut() {
                note.start = ((note.start / grid).round() * grid).max(0.0);
            }
        })
    }

    /// Take over another clip's note storage (pattern siblings)
    #[must_use]
    pub(crate) fn with_shared_notes(&self, source: &Self) -> Self {
        Self {
            notes: Arc::clone(&source.notes),
            ..self.clone()
        }
    }

    // ==================== Automation Edits ====================

    #[must_use]
    pub fn add_automation_point(&self, parameter: Parameter, point: ControlPoint) -> Self {
        self.update_automation(|automation| automation.add_point(self.id, parameter, point))
    }

    #[must_use]
    pub fn remove_automation_point(&self, parameter: Parameter, id: PointId) -> Self {
        self.update_automation(|automation| automation.remove_point(parameter, id))
    }

    #[must_use]
    pub fn update_automation_point(
        &self,
        parameter: Parameter,
        id: PointId,
        time: f64,
        value: f32,
    ) -> Self {
        self.update_automation(|automation| {
            automation.update_lane(self.id, parameter, |lane| lane.update_point(id, time, value))
        })
    }

    /// Replace a whole lane; it is handed to this clip
    #[must_use]
    pub fn set_automation_lane(&self, lane: ClipLane) -> Self {
        let lane = lane.with_owner(self.id);
        self.update_automation(|automation| automation.set_lane(lane))
    }

    #[must_use]
    pub fn update_automation<F>(&self, edit: F) -> Self
    where
        F: FnOnce(&ClipAutomation) -> ClipAutomation,
    {
        Self {
            automation: edit(&self.automation).with_owner(self.id),
            ..self.clone()
        }
    }

    // ==================== Structural Operations ====================

    /// Materialize looping and offset content into a plain clip.
    ///
    /// The result sounds identical, with `loop_length == duration` and no
    /// content offset. Repeated notes become separate notes with fresh ids,
    /// and each automation lane is cut per repetition with its boundary
    /// values kept. The pattern link is dropped because the content no longer
    /// matches its siblings.
    #[must_use]
    pub fn flatten(&self) -> Self {
        if self.is_flat() {
            return self.clone();
        }
        let segments = self.segments();
        trace!(clip = %self.id, segments = segments.len(), "flattening clip");

        let notes: Vec<Note> = self
            .note_onsets()
            .into_iter()
            .filter_map(|onset| {
                let note = self.note(onset.note)?;
                Some(Note {
                    id: NoteId::new(),
                    start: onset.start,
                    duration: onset.duration,
                    selected: false,
                    ..*note
                })
            })
            .collect();
        let automation = self.automation.map_lanes(|lane| unroll_lane(lane, &segments));

        Self {
            loop_length: self.duration,
            content_start_offset: 0.0,
            pattern: None,
            automation,
            ..self.clone()
        }
        .with_notes(notes)
    }

    /// Cut the clip `at` beats after its start.
    ///
    /// Only `0 < at < duration` produces two fragments; anything else yields
    /// [`ClipSplit::Whole`]. Looping or offset clips are flattened first.
    /// The left fragment keeps the clip id; the right one gets a new id, new
    /// note ids and new automation identities. Notes crossing the cut stay
    /// on the left, shortened to the cut. Both fragments drop the pattern
    /// link.
    pub fn split(&self, at: f64) -> ClipSplit {
        if !(at > 0.0 && at < self.duration) {
            debug!(clip = %self.id, at, duration = self.duration, "split outside clip, keeping it whole");
            return ClipSplit::Whole(self.clone());
        }

        let flat = self.flatten();
        let right_id = ClipId::new();
        let (left_automation, right_automation) = flat.automation.split(at, right_id);

        let left_notes: Vec<Note> = flat
            .notes
            .iter()
            .filter_map(|note| note.truncated(at))
            .collect();
        let right_notes: Vec<Note> = flat
            .notes
            .iter()
            .filter(|note| note.start >= at)
            .map(|note| Note {
                start: note.start - at,
                ..note.reidentified()
            })
            .collect();

        let left = Self {
            duration: at,
            loop_length: at,
            pattern: None,
            automation: left_automation,
            ..flat.clone()
        }
        .with_notes(left_notes);

        let right_duration = flat.duration - at;
        let right = Self {
            id: right_id,
            timeline_start: flat.timeline_start + at,
            duration: right_duration,
            loop_length: right_duration,
            pattern: None,
            automation: right_automation,
            ..flat
        }
        .with_notes(right_notes);

        debug!(left = %left.id, right = %right.id, at, "split clip");
        ClipSplit::Pair(left, right)
    }

    /// Copy placed at `start`: new clip id and automation identities, same
    /// pattern link and shared notes
    #[must_use]
    pub fn duplicate_at(&self, start: f64) -> Self {
        let id = ClipId::new();
        Self {
            id,
            automation: self.automation.deep_copy(id),
            ..self.clone()
        }
        .with_timeline_start(start)
    }

    /// Copy placed at `start` with nothing shared: fresh note ids and no
    /// pattern link
    #[must_use]
    pub fn duplicate_unique_at(&self, start: f64) -> Self {
        let notes: Vec<Note> = self.notes.iter().map(|note| note.reidentified()).collect();
        self.duplicate_at(start).with_pattern(None).with_notes(notes)
    }

    fn edit_notes<F>(&self, edit: F) -> Self
    where
        F: FnOnce(&mut Vec<Note>),
    {
        let mut next = self.clone();
        let notes = Arc::make_mut(&mut next.notes);
        edit(&mut *notes);
        sort_notes(notes);
        next
    }
}

/// Lay a content-axis lane along the arrangement axis, one window per segment
fn unroll_lane(lane: &ClipLane, segments: &[ContentSegment]) -> ClipLane {
    if lane.is_empty() {
        return lane.clone();
    }
    let mut unrolled = lane.clear();
    for segment in segments {
        let window = lane.window(segment.content_start, segment.content_end());
        unrolled.extend_shifted(&window, segment.arrangement_start);
    }
    unrolled
}

fn clip_length(beats: f64) -> f64 {
    let beats = sanitize_beats(beats);
    if beats > MIN_CLIP_BEATS {
        beats
    } else {
        MIN_CLIP_BEATS
    }
}

fn wrap_offset(offset: f64, loop_length: f64) -> f64 {
    wrap(sanitize_beats(offset), loop_length)
}

fn sort_notes(notes: &mut [Note]) {
    notes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn clip(duration: f64) -> MidiClip {
        MidiClip::new(TrackId::new(), 8.0, duration)
    }

    fn starts(onsets: &[NoteOnset]) -> Vec<f64> {
        onsets.iter().map(|onset| onset.start).collect()
    }

    #[test]
    fn test_new_defaults() {
        let clip = clip(4.0);
        assert_eq!(clip.loop_length(), 4.0);
        assert!(clip.can_repeat());
        assert_eq!(clip.content_start_offset(), 0.0);
        assert_eq!(clip.pattern(), None);
        assert!(clip.is_flat());
        assert_eq!(clip.timeline_end(), 12.0);
    }

    #[test]
    fn test_lengths_are_clamped() {
        let clip = clip(-3.0).with_loop_length(0.0);
        assert_eq!(clip.duration(), MIN_CLIP_BEATS);
        assert_eq!(clip.loop_length(), MIN_CLIP_BEATS);
        assert_eq!(MidiClip::new(TrackId::new(), -5.0, 1.0).timeline_start(), 0.0);
    }

    #[test]
    fn test_offset_wraps_into_loop() {
        let clip = clip(8.0).with_loop_length(4.0).with_content_offset(5.0);
        assert_eq!(clip.content_start_offset(), 1.0);

        let shorter = clip.with_loop_length(0.75);
        assert_eq!(shorter.content_start_offset(), 0.25);
    }

    #[test]
    fn test_loop_wrap_scenario() {
        let clip = clip(12.0)
            .with_loop_length(4.0)
            .add_note(Note::new(60, 100, 1.0, 0.5));

        assert_eq!(clip.arrangement_times_for(1.0), vec![1.0, 5.0, 9.0]);
        assert_eq!(starts(&clip.note_onsets()), vec![1.0, 5.0, 9.0]);
    }

    #[test]
    fn test_truncation_scenario() {
        let clip = clip(2.0)
            .with_loop_length(4.0)
            .with_repeat(false)
            .add_note(Note::new(60, 100, 3.0, 0.5));

        assert!(clip.arrangement_times_for(3.0).is_empty());
        assert!(clip.note_onsets().is_empty());
    }

    #[test]
    fn test_no_repeat_pads_with_silence() {
        let clip = clip(8.0).with_loop_length(4.0).with_repeat(false);
        assert_eq!(clip.content_time_at(3.5), Some(3.5));
        assert_eq!(clip.content_time_at(4.0), None);
        assert_eq!(clip.content_time_at(7.0), None);
        assert!(!clip.repeats());
    }

    #[test]
    fn test_content_time_with_offset() {
        let clip = clip(8.0).with_loop_length(4.0).with_content_offset(1.0);
        assert_eq!(clip.content_time_at(0.0), Some(1.0));
        assert_eq!(clip.content_time_at(3.0), Some(0.0));
        assert_eq!(clip.content_time_at(7.5), Some(0.5));
        assert_eq!(clip.content_time_at(8.0), None);
        assert_eq!(clip.content_time_at(-0.5), None);
        assert_eq!(clip.content_time_at(f64::NAN), None);
    }

    #[test]
    fn test_segments_with_offset() {
        let clip = clip(8.0).with_loop_length(4.0).with_content_offset(1.0);
        let segments = clip.segments();
        assert_eq!(
            segments,
            vec![
                ContentSegment { arrangement_start: 0.0, content_start: 1.0, length: 3.0 },
                ContentSegment { arrangement_start: 3.0, content_start: 0.0, length: 4.0 },
                ContentSegment { arrangement_start: 7.0, content_start: 0.0, length: 1.0 },
            ]
        );
    }

    #[test]
    fn test_shared_pattern_phase() {
        let pattern = PatternId::new();
        let note = Note::new(64, 90, 2.0, 1.0);
        let a = clip(4.0).with_pattern(Some(pattern)).add_note(note);
        let b = a.duplicate_at(16.0).with_content_offset(1.0);

        assert_eq!(a.pattern(), b.pattern());
        assert!(a.shares_notes(&b));
        assert_eq!(starts(&a.note_onsets()), vec![2.0]);
        assert_eq!(starts(&b.note_onsets()), vec![1.0]);
    }

    #[test]
    fn test_onsets_are_truncated() {
        let clip = clip(6.0)
            .with_loop_length(4.0)
            .add_note(Note::new(60, 100, 3.0, 2.0));

        let onsets = clip.note_onsets();
        assert_eq!(starts(&onsets), vec![3.0]);
        // cut at the loop boundary
        assert_eq!(onsets[0].duration, 1.0);
    }

    #[test]
    fn test_notes_sounding_at() {
        let clip = clip(8.0)
            .with_loop_length(4.0)
            .add_note(Note::new(60, 100, 0.0, 1.0))
            .add_note(Note::new(67, 100, 0.5, 1.0));

        let pitches = |time| -> Vec<u8> {
            clip.notes_sounding_at(time).iter().map(|o| o.pitch).collect()
        };
        assert_eq!(pitches(0.75), vec![60, 67]);
        assert_eq!(pitches(1.25), vec![67]);
        assert_eq!(pitches(4.25), vec![60]);
        assert!(pitches(3.0).is_empty());
    }

    #[test]
    fn test_note_edits_are_copy_on_write() {
        let original = clip(4.0).add_note(Note::new(60, 100, 1.0, 1.0));
        let id = original.notes()[0].id;

        let moved = original.update_note(Note {
            start: 2.0,
            ..original.notes()[0]
        });
        assert_eq!(original.notes()[0].start, 1.0);
        assert_eq!(moved.note(id).unwrap().start, 2.0);
        assert!(!moved.shares_notes(&original));

        let removed = moved.remove_note(id);
        assert!(removed.notes().is_empty());
        assert_eq!(moved.notes().len(), 1);

        let unknown = original.remove_note(NoteId::new());
        assert_eq!(unknown.notes().len(), 1);
    }

    #[test]
    fn test_notes_stay_sorted() {
        let clip = clip(4.0)
            .add_note(Note::new(64, 100, 2.0, 0.5))
            .add_note(Note::new(67, 100, 0.5, 0.5))
            .add_note(Note::new(60, 100, 2.0, 0.5));

        let order: Vec<(f64, u8)> = clip.notes().iter().map(|n| (n.start, n.pitch)).collect();
        assert_eq!(order, vec![(0.5, 67), (2.0, 60), (2.0, 64)]);
    }

    #[test]
    fn test_note_selection() {
        let clip = clip(4.0)
            .add_note(Note::new(60, 100, 0.0, 0.5))
            .add_note(Note::new(62, 100, 1.0, 0.5));
        let first = clip.notes()[0].id;

        let trimmed = clip.select_note(first, true).delete_selected_notes();
        assert_eq!(trimmed.notes().len(), 1);
        assert_eq!(trimmed.notes()[0].pitch, 62);

        assert!(clip.select_all_notes().delete_selected_notes().notes().is_empty());
        assert_eq!(clip.select_all_notes().deselect_all_notes().notes().len(), 2);
    }

    #[test]
    fn test_quantize() {
        let clip = clip(4.0)
            .add_note(Note::new(60, 100, 0.13, 0.5))
            .add_note(Note::new(62, 100, 1.9, 0.5));

        let quantized = clip.quantize(0.25);
        let starts: Vec<f64> = quantized.notes().iter().map(|n| n.start).collect();
        assert_eq!(starts, vec![0.25, 2.0]);

        assert_eq!(clip.quantize(0.0).notes()[0].start, 0.13);
    }

    #[test]
    fn test_automation_follows_mapping() {
        let clip = clip(8.0)
            .with_loop_length(4.0)
            .add_automation_point(Parameter::Volume, ControlPoint::new(0.0, 0.0))
            .add_automation_point(Parameter::Volume, ControlPoint::new(4.0, 1.0));

        let at = |time| clip.automation_value_at(Parameter::Volume, time).unwrap();
        assert!((at(2.0) - 0.5).abs() < 1e-6);
        // second repetition starts over
        assert!((at(6.0) - 0.5).abs() < 1e-6);
        assert_eq!(clip.automation_value_at(Parameter::Volume, 9.0), None);

        let lane = clip.automation().lane(Parameter::Volume).unwrap();
        assert_eq!(lane.owner(), clip.id());
    }

    #[test]
    fn test_arrangement_lane_unrolls_repetitions() {
        let clip = clip(8.0)
            .with_loop_length(4.0)
            .add_automation_point(Parameter::Volume, ControlPoint::new(0.0, 0.0))
            .add_automation_point(Parameter::Volume, ControlPoint::new(4.0, 1.0));

        let lane = clip.arrangement_lane(Parameter::Volume).unwrap();
        let points: Vec<(f64, f32)> = lane.points().map(|p| (p.time, p.value)).collect();
        assert_eq!(points, vec![(0.0, 0.0), (4.0, 1.0), (4.0, 0.0), (8.0, 1.0)]);

        // the restart wins at the wrap point
        assert_eq!(lane.value_at(4.0), 0.0);
        assert!(clip.arrangement_lane(Parameter::Pan).is_none());
    }

    #[test]
    fn test_flatten_materializes_repetitions() {
        let clip = clip(10.0)
            .with_loop_length(4.0)
            .with_content_offset(2.0)
            .with_pattern(Some(PatternId::new()))
            .add_note(Note::new(60, 100, 0.0, 1.0))
            .add_note(Note::new(62, 100, 3.0, 2.0));

        let flat = clip.flatten();
        assert!(flat.is_flat());
        assert_eq!(flat.loop_length(), 10.0);
        assert_eq!(flat.pattern(), None);
        assert_eq!(flat.id(), clip.id());

        let expected: Vec<(f64, f64)> = clip
            .note_onsets()
            .iter()
            .map(|onset| (onset.start, onset.duration))
            .collect();
        let actual: Vec<(f64, f64)> = flat.notes().iter().map(|n| (n.start, n.duration)).collect();
        assert_eq!(actual, expected);
        assert_eq!(starts(&flat.note_onsets()), starts(&clip.note_onsets()));
    }

    #[test]
    fn test_flatten_keeps_automation_audible_values() {
        let clip = clip(10.0)
            .with_loop_length(4.0)
            .with_content_offset(1.0)
            .add_automation_point(Parameter::Pan, ControlPoint::new(0.0, -1.0))
            .add_automation_point(Parameter::Pan, ControlPoint::new(4.0, 1.0));
        let flat = clip.flatten();

        for step in 0..40 {
            let time = step as f64 * 0.25 + 0.1;
            let expected = clip.automation_value_at(Parameter::Pan, time).unwrap();
            let actual = flat.automation_value_at(Parameter::Pan, time).unwrap();
            assert!((expected - actual).abs() < 1e-5, "at {time}: {expected} vs {actual}");
        }
    }

    #[test]
    fn test_split_plain_clip() {
        let clip = clip(4.0)
            .add_note(Note::new(60, 100, 0.0, 1.0))
            .add_note(Note::new(62, 100, 1.5, 1.0))
            .add_note(Note::new(64, 100, 3.0, 0.5))
            .add_automation_point(Parameter::Volume, ControlPoint::new(0.0, 0.2))
            .add_automation_point(Parameter::Volume, ControlPoint::new(4.0, 0.8));

        let (left, right) = clip.split(2.0).into_pair().unwrap();

        assert_eq!(left.id(), clip.id());
        assert_ne!(right.id(), clip.id());
        assert_eq!(left.duration(), 2.0);
        assert_eq!(left.loop_length(), 2.0);
        assert_eq!(right.duration(), 2.0);
        assert_eq!(right.timeline_start(), clip.timeline_start() + 2.0);

        let left_notes: Vec<(u8, f64, f64)> =
            left.notes().iter().map(|n| (n.pitch, n.start, n.duration)).collect();
        assert_eq!(left_notes, vec![(60, 0.0, 1.0), (62, 1.5, 0.5)]);
        let right_notes: Vec<(u8, f64)> = right.notes().iter().map(|n| (n.pitch, n.start)).collect();
        assert_eq!(right_notes, vec![(64, 1.0)]);
        assert!(clip.note(right.notes()[0].id).is_none());

        let boundary = clip.automation().value_at(Parameter::Volume, 2.0);
        assert_eq!(left.automation().value_at(Parameter::Volume, 2.0), boundary);
        assert_eq!(right.automation().value_at(Parameter::Volume, 0.0), boundary);
        assert_eq!(right.automation().lane(Parameter::Volume).unwrap().owner(), right.id());
    }

    #[test]
    fn test_split_looping_clip_sounds_the_same() {
        let clip = clip(8.0)
            .with_loop_length(2.0)
            .add_note(Note::new(60, 100, 0.5, 0.5))
            .add_automation_point(Parameter::Volume, ControlPoint::new(0.0, 0.0))
            .add_automation_point(Parameter::Volume, ControlPoint::new(2.0, 1.0));

        // mid-ramp and exactly on a loop restart
        for at in [3.0, 4.0] {
            let (left, right) = clip.split(at).into_pair().unwrap();

            let mut heard: Vec<f64> = starts(&left.note_onsets());
            heard.extend(right.note_onsets().iter().map(|onset| onset.start + at));
            assert_eq!(heard, starts(&clip.note_onsets()));

            for step in 0..32 {
                let time = f64::from(step) * 0.25;
                let expected = clip.automation_value_at(Parameter::Volume, time).unwrap();
                let actual = if time < at {
                    left.automation_value_at(Parameter::Volume, time)
                } else {
                    right.automation_value_at(Parameter::Volume, time - at)
                }
                .unwrap();
                assert!((actual - expected).abs() < 1e-6, "split at {at}, beat {time}: {actual} vs {expected}");
            }
        }
    }

    #[test]
    fn test_unrolling_many_short_loops() {
        let step = 1.0 / 64.0;
        let clip = clip(64.0)
            .with_loop_length(step)
            .add_automation_point(Parameter::Volume, ControlPoint::new(0.0, 0.0))
            .add_automation_point(Parameter::Volume, ControlPoint::new(step, 1.0));

        let lane = clip.arrangement_lane(Parameter::Volume).unwrap();
        assert_eq!(clip.segments().len(), 4096);
        assert_eq!(lane.len(), 2 * 4096);
        assert_eq!(lane.value_at(10.0 + step / 2.0), 0.5);
        assert_eq!(lane.value_at(10.0), 0.0);
    }

    #[test]
    fn test_split_on_loop_boundary_keeps_last_ramp() {
        let clip = clip(8.0)
            .with_loop_length(4.0)
            .add_automation_point(Parameter::Volume, ControlPoint::new(0.0, 0.0))
            .add_automation_point(Parameter::Volume, ControlPoint::new(4.0, 1.0));
        let (left, right) = clip.split(4.0).into_pair().unwrap();

        assert_eq!(left.automation_value_at(Parameter::Volume, 2.0), Some(0.5));
        assert_eq!(left.automation_value_at(Parameter::Volume, 3.0), Some(0.75));
        assert_eq!(right.automation_value_at(Parameter::Volume, 0.0), Some(0.0));
        assert_eq!(right.automation_value_at(Parameter::Volume, 2.0), Some(0.5));
    }

    #[test]
    fn test_degenerate_split_keeps_clip_whole() {
        let clip = clip(4.0);
        for at in [0.0, -1.0, 4.0, 9.0, f64::NAN] {
            match clip.split(at) {
                ClipSplit::Whole(whole) => assert_eq!(whole.id(), clip.id()),
                ClipSplit::Pair(..) => panic!("split at {at} should not cut"),
            }
        }
    }

    #[test]
    fn test_duplicate_deep_copies_automation() {
        let clip = clip(4.0)
            .add_note(Note::new(60, 100, 0.0, 1.0))
            .add_automation_point(Parameter::Volume, ControlPoint::new(0.0, 0.5));
        let copy = clip.duplicate_at(32.0);

        assert_ne!(copy.id(), clip.id());
        assert_eq!(copy.timeline_start(), 32.0);
        assert!(copy.shares_notes(&clip));

        let original_lane = clip.automation().lane(Parameter::Volume).unwrap();
        let copied_lane = copy.automation().lane(Parameter::Volume).unwrap();
        assert_eq!(copied_lane.owner(), copy.id());
        assert!(original_lane.point(copied_lane.first().unwrap().id).is_none());

        let point = copied_lane.first().unwrap().id;
        let edited = copy.update_automation_point(Parameter::Volume, point, 0.0, 1.0);
        assert_eq!(edited.automation().value_at(Parameter::Volume, 0.0), 1.0);
        assert_eq!(clip.automation().value_at(Parameter::Volume, 0.0), 0.5);
    }

    #[test]
    fn test_duplicate_unique_shares_nothing() {
        let clip = clip(4.0)
            .with_pattern(Some(PatternId::new()))
            .add_note(Note::new(60, 100, 0.0, 1.0));
        let copy = clip.duplicate_unique_at(4.0);

        assert_eq!(copy.pattern(), None);
        assert!(!copy.shares_notes(&clip));
        assert_ne!(copy.notes()[0].id, clip.notes()[0].id);
    }

    #[test]
    fn test_with_id_rebinds_automation() {
        let clip = clip(4.0).add_automation_point(Parameter::Pan, ControlPoint::new(0.0, 0.0));
        let id = ClipId::new();
        let renamed = clip.with_id(id);
        assert_eq!(renamed.automation().lane(Parameter::Pan).unwrap().owner(), id);
    }
}
