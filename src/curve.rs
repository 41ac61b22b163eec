//! Volume curve: normalized fader position ↔ decibels
//!
//! One breakpoint table serves both the editor and the engine snapshot, so a
//! meter reading and the level the engine applies always agree.

use serde::{Deserialize, Serialize};

/// A single knee of the volume curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub normalized: f32,
    pub db: f32,
}

/// Piecewise-linear volume curve, ascending in both columns.
pub const VOLUME_BREAKPOINTS: [Breakpoint; 3] = [
    Breakpoint { normalized: 0.01, db: -60.0 },
    Breakpoint { normalized: 0.70, db: 0.0 },
    Breakpoint { normalized: 1.00, db: 6.0 },
];

/// Normalized position of the 0 dB breakpoint.
pub const UNITY_NORMALIZED: f32 = 0.70;

/// Level reported below the lowest breakpoint. Finite so that downstream
/// arithmetic never sees `-inf`.
pub const SILENCE_DB: f32 = -96.0;

const FLOOR: Breakpoint = VOLUME_BREAKPOINTS[0];
const CEILING: Breakpoint = VOLUME_BREAKPOINTS[VOLUME_BREAKPOINTS.len() - 1];

/// Convert a normalized volume to decibels.
#[must_use]
pub fn to_db(normalized: f32) -> f32 {
    if normalized.is_nan() || normalized < FLOOR.normalized {
        return SILENCE_DB;
    }
    if normalized >= CEILING.normalized {
        return CEILING.db;
    }

    for pair in VOLUME_BREAKPOINTS.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if normalized <= hi.normalized {
            let t = (normalized - lo.normalized) / (hi.normalized - lo.normalized);
            return lerp(lo.db, hi.db, t);
        }
    }

    CEILING.db
}

/// Convert decibels back to a normalized volume in `[0, 1]`.
///
/// Anything quieter than the lowest breakpoint, the silence sentinel
/// included, maps to `0.0`.
#[must_use]
pub fn to_normalized(db: f32) -> f32 {
    if db.is_nan() || db < FLOOR.db {
        return 0.0;
    }
    if db >= CEILING.db {
        return CEILING.normalized;
    }

    for pair in VOLUME_BREAKPOINTS.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if db <= hi.db {
            let t = (db - lo.db) / (hi.db - lo.db);
            return lerp(lo.normalized, hi.normalized, t).clamp(0.0, 1.0);
        }
    }

    CEILING.normalized
}

/// Linear gain for a level in decibels; the sentinel and below are silent.
#[must_use]
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    if db <= SILENCE_DB {
        0.0
    } else {
        10_f32.powf(db / 20.0)
    }
}

/// Endpoints are returned exactly so breakpoints survive a round trip.
#[inline]
fn lerp(start: f32, end: f32, t: f32) -> f32 {
    if t <= 0.0 {
        start
    } else if t >= 1.0 {
        end
    } else {
        start + (end - start) * t
    }
}
