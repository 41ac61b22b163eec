//! MIDI notes stored in a clip

use crate::id::NoteId;
use crate::time::sanitize_beats;

/// Highest MIDI pitch and velocity
pub const MIDI_MAX: u8 = 127;

/// Shortest note length in beats (a 128th of a beat)
pub const MIN_NOTE_BEATS: f64 = 1.0 / 128.0;

/// A note on the clip's content axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub pitch: u8,
    pub velocity: u8,
    /// Beats from the clip content start
    pub start: f64,
    /// Length in beats, always positive
    pub duration: f64,
    pub selected: bool,
}

impl Note {
    /// Create a note with a fresh id. Out-of-range input is clamped.
    pub fn new(pitch: u8, velocity: u8, start: f64, duration: f64) -> Self {
        Self {
            id: NoteId::new(),
            pitch,
            velocity,
            start,
            duration,
            selected: false,
        }
        .normalized()
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Whether the note is held at content time `time`
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end()
    }

    #[must_use]
    pub fn reidentified(self) -> Self {
        Self {
            id: NoteId::new(),
            ..self
        }
    }

    /// Clamp every field into its valid domain
    #[must_use]
    pub fn normalized(self) -> Self {
        let duration = sanitize_beats(self.duration);
        Self {
            pitch: self.pitch.min(MIDI_MAX),
            velocity: self.velocity.min(MIDI_MAX),
            start: sanitize_beats(self.start).max(0.0),
            duration: if duration > MIN_NOTE_BEATS {
                duration
            } else {
                MIN_NOTE_BEATS
            },
            ..self
        }
    }

    /// Truncate the note so it ends no later than `end`.
    /// Returns `None` when nothing of the note is left.
    pub(crate) fn truncated(self, end: f64) -> Option<Self> {
        if self.start >= end {
            return None;
        }
        Some(Self {
            duration: self.duration.min(end - self.start),
            ..self
        })
    }
}
