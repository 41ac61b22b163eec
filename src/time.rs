//! Musical time helpers
//!
//! All model times are beats (`f64`). Seconds only appear at the engine
//! boundary, through [`Tempo`].

use serde::{Deserialize, Serialize};

/// Slowest tempo accepted; lower or non-finite values are clamped up to it.
pub const MIN_BPM: f64 = 1.0;

/// Project tempo in beats per minute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tempo(f64);

impl Tempo {
    #[must_use]
    pub fn new(bpm: f64) -> Self {
        if bpm.is_finite() {
            Self(bpm.max(MIN_BPM))
        } else {
            Self(MIN_BPM)
        }
    }

    #[must_use]
    #[inline]
    pub fn bpm(&self) -> f64 {
        self.0
    }

    /// `seconds = beats * 60 / bpm`
    #[must_use]
    #[inline]
    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * 60.0 / self.0
    }

    #[must_use]
    #[inline]
    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds * self.0 / 60.0
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(120.0)
    }
}

/// Map NaN to zero and clamp infinities to the largest finite values.
#[inline]
pub(crate) fn sanitize_beats(beats: f64) -> f64 {
    if beats.is_nan() {
        0.0
    } else {
        beats.clamp(f64::MIN, f64::MAX)
    }
}

/// Modulo that always lands in `[0, modulus)`.
#[inline]
pub(crate) fn wrap(value: f64, modulus: f64) -> f64 {
    let wrapped = value.rem_euclid(modulus);
    // rem_euclid may round up to exactly `modulus` for tiny negative inputs
    if wrapped >= modulus {
        0.0
    } else {
        wrapped
    }
}
