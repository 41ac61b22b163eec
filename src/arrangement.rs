//! Tracks, their clips, and the engine snapshot of the whole arrangement
//!
//! The arrangement is the editing session: it owns every track and every
//! track owns its clips outright. Edits replace clip and lane values rather
//! than mutating them, so a snapshot or a clip handed out earlier never
//! changes underneath its reader. Each successful edit bumps the revision.
//!
//! Clips sharing a pattern id play the same notes. Editing the notes of one
//! of them hands the new note storage to all of its siblings; automation,
//! loop settings and content offset stay per clip.

use tracing::debug;

use crate::clip::{ClipSplit, MidiClip};
use crate::config::Config;
use crate::id::{ClipId, PatternId, TrackId};
use crate::lane::TrackLane;
use crate::parameter::Parameter;
use crate::snapshot::{self, ClipSnapshot, EngineSnapshot, TrackSnapshot};
use crate::time::Tempo;

#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    name: String,
    volume: TrackLane,
    pan: TrackLane,
    /// Ordered by timeline start
    clips: Vec<MidiClip>,
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        let id = TrackId::new();
        Self {
            id,
            name: name.into(),
            volume: TrackLane::new(id, Parameter::Volume),
            pan: TrackLane::new(id, Parameter::Pan),
            clips: Vec::new(),
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lane(&self, parameter: Parameter) -> &TrackLane {
        match parameter {
            Parameter::Volume => &self.volume,
            Parameter::Pan => &self.pan,
        }
    }

    pub fn clips(&self) -> &[MidiClip] {
        &self.clips
    }

    pub fn clip(&self, id: ClipId) -> Option<&MidiClip> {
        self.clips.iter().find(|clip| clip.id() == id)
    }

    /// Track automation value at absolute `time`
    pub fn value_at(&self, parameter: Parameter, time: f64) -> f32 {
        self.lane(parameter).value_at(time)
    }

    /// Clips covering absolute `time`
    pub fn clips_at(&self, time: f64) -> impl Iterator<Item = &MidiClip> {
        self.clips
            .iter()
            .filter(move |clip| time >= clip.timeline_start() && time < clip.timeline_end())
    }

    fn lane_mut(&mut self, parameter: Parameter) -> &mut TrackLane {
        match parameter {
            Parameter::Volume => &mut self.volume,
            Parameter::Pan => &mut self.pan,
        }
    }

    fn insert_clip(&mut self, clip: MidiClip) {
        let clip = clip.with_track(self.id);
        let index = self
            .clips
            .partition_point(|existing| existing.timeline_start() <= clip.timeline_start());
        self.clips.insert(index, clip);
    }

    fn take_clip(&mut self, id: ClipId) -> Option<MidiClip> {
        let index = self.clips.iter().position(|clip| clip.id() == id)?;
        Some(self.clips.remove(index))
    }

    fn snapshot(&self, tempo: Tempo) -> TrackSnapshot {
        TrackSnapshot {
            track: self.id,
            volume: snapshot::track_lane(&self.volume, tempo),
            pan: snapshot::track_lane(&self.pan, tempo),
            clips: self
                .clips
                .iter()
                .map(|clip| ClipSnapshot::new(clip, tempo))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Arrangement {
    config: Config,
    tempo: Tempo,
    tracks: Vec<Track>,
    revision: u64,
}

impl Arrangement {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            tempo: config.tempo(),
            tracks: Vec::new(),
            revision: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
        self.touch();
    }

    /// Bumped by every edit
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id == id)
    }

    pub fn clip(&self, id: ClipId) -> Option<&MidiClip> {
        self.tracks.iter().find_map(|track| track.clip(id))
    }

    /// Every clip linked to `pattern`, across all tracks
    pub fn pattern_clips(&self, pattern: PatternId) -> impl Iterator<Item = &MidiClip> {
        self.tracks
            .iter()
            .flat_map(|track| track.clips.iter())
            .filter(move |clip| clip.pattern() == Some(pattern))
    }

    // ==================== Tracks ====================

    pub fn add_track(&mut self, name: impl Into<String>) -> TrackId {
        let track = Track::new(name);
        let id = track.id;
        debug!(track = %id, name = track.name.as_str(), "added track");
        self.tracks.push(track);
        self.touch();
        id
    }

    /// Remove a track together with every clip it owns
    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        let index = self.tracks.iter().position(|track| track.id == id)?;
        let track = self.tracks.remove(index);
        debug!(track = %id, clips = track.clips.len(), "removed track");
        self.touch();
        Some(track)
    }

    /// Rewrite one automation lane of a track
    pub fn update_track_lane<F>(&mut self, track: TrackId, parameter: Parameter, edit: F) -> bool
    where
        F: FnOnce(&TrackLane) -> TrackLane,
    {
        let Some(track) = self.track_mut(track) else {
            return false;
        };
        let id = track.id;
        let lane = track.lane_mut(parameter);
        *lane = edit(&*lane).with_owner(id);
        self.touch();
        true
    }

    // ==================== Clips ====================

    /// Create an empty clip of the configured default length
    pub fn create_clip(&mut self, track: TrackId, start: f64) -> Option<ClipId> {
        let beats = self.config.timeline.default_clip_beats;
        self.add_clip(track, MidiClip::new(track, start, beats))
    }

    /// Place a clip on `track`, which becomes its only owner
    pub fn add_clip(&mut self, track: TrackId, clip: MidiClip) -> Option<ClipId> {
        let owner = self.track_mut(track)?;
        let id = clip.id();
        owner.insert_clip(clip);
        debug!(clip = %id, track = %track, "added clip");
        self.touch();
        Some(id)
    }

    pub fn remove_clip(&mut self, id: ClipId) -> Option<MidiClip> {
        let clip = self.tracks.iter_mut().find_map(|track| track.take_clip(id))?;
        debug!(clip = %id, "removed clip");
        self.touch();
        Some(clip)
    }

    /// Move a clip to `start` on `track`. An unknown track leaves the clip
    /// where it was.
    pub fn move_clip(&mut self, id: ClipId, track: TrackId, start: f64) -> bool {
        if self.track(track).is_none() {
            return false;
        }
        let Some(clip) = self.tracks.iter_mut().find_map(|owner| owner.take_clip(id)) else {
            return false;
        };
        if let Some(owner) = self.track_mut(track) {
            owner.insert_clip(clip.with_timeline_start(start));
        }
        debug!(clip = %id, track = %track, start, "moved clip");
        self.touch();
        true
    }

    /// Replace a clip by the result of `edit`. The clip keeps its id and
    /// track; a note change reaches every clip sharing its pattern.
    pub fn update_clip<F>(&mut self, id: ClipId, edit: F) -> bool
    where
        F: FnOnce(&MidiClip) -> MidiClip,
    {
        let Some(track) = self.owner_of(id) else {
            return false;
        };
        let Some(clip) = self.tracks[track].take_clip(id) else {
            return false;
        };
        let edited = edit(&clip).with_id(id);
        let notes_changed = !edited.shares_notes(&clip);
        let pattern = edited.pattern();
        self.tracks[track].insert_clip(edited.clone());

        if let (true, Some(pattern)) = (notes_changed, pattern) {
            self.propagate_notes(&edited, pattern);
        }
        self.touch();
        true
    }

    /// Split at absolute `time`. Returns the ids of both fragments, or `None`
    /// when the clip is unknown or `time` does not fall strictly inside it.
    pub fn split_clip(&mut self, id: ClipId, time: f64) -> Option<(ClipId, ClipId)> {
        let track = self.owner_of(id)?;
        let clip = self.tracks[track].clip(id)?;
        let (left, right) = match clip.split(time - clip.timeline_start()) {
            ClipSplit::Pair(left, right) => (left, right),
            ClipSplit::Whole(_) => return None,
        };

        let ids = (left.id(), right.id());
        let owner = &mut self.tracks[track];
        owner.take_clip(id);
        owner.insert_clip(left);
        owner.insert_clip(right);
        self.touch();
        Some(ids)
    }

    /// Copy a clip to `start` on the same track, keeping its pattern link
    pub fn duplicate_clip(&mut self, id: ClipId, start: f64) -> Option<ClipId> {
        let copy = self.clip(id)?.duplicate_at(start);
        self.add_clip(copy.track(), copy)
    }

    /// Copy a clip to `start` on the same track with its own notes
    pub fn duplicate_clip_unique(&mut self, id: ClipId, start: f64) -> Option<ClipId> {
        let copy = self.clip(id)?.duplicate_unique_at(start);
        self.add_clip(copy.track(), copy)
    }

    /// Quantize a clip's notes to the configured grid
    pub fn quantize_clip(&mut self, id: ClipId) -> bool {
        let grid = self.config.editing.quantize_grid;
        self.update_clip(id, |clip| clip.quantize(grid))
    }

    // ==================== Engine ====================

    /// Render everything the engine needs at the current revision
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            revision: self.revision,
            tempo_bpm: self.tempo.bpm(),
            tracks: self
                .tracks
                .iter()
                .map(|track| track.snapshot(self.tempo))
                .collect(),
        }
    }

    fn propagate_notes(&mut self, source: &MidiClip, pattern: PatternId) {
        let mut count = 0usize;
        for track in &mut self.tracks {
            for clip in &mut track.clips {
                if clip.id() != source.id() && clip.pattern() == Some(pattern) {
                    *clip = clip.with_shared_notes(source);
                    count += 1;
                }
            }
        }
        if count > 0 {
            debug!(pattern = %pattern, clips = count, "propagated pattern notes");
        }
    }

    fn owner_of(&self, id: ClipId) -> Option<usize> {
        self.tracks.iter().position(|track| track.clip(id).is_some())
    }

    fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|track| track.id == id)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
