//! Engine snapshot rendering
//!
//! The playback engine receives automation as ASCII pairs:
//!
//! ```text
//! t0,v0;t1,v1;...;tn,vn
//! ```
//!
//! `t` is timeline-absolute seconds. For volume `v` is decibels taken from
//! the shared volume curve; for pan it is the raw `[-1, 1]` value. An empty
//! string means "no automation, use the static value".
//!
//! ```rust
//! use timeline_automation::prelude::*;
//! use timeline_automation::snapshot;
//!
//! let lane = TrackLane::new(TrackId::new(), Parameter::Volume)
//!     .with_point(ControlPoint::new(0.0, 0.70))
//!     .with_point(ControlPoint::new(4.0, 1.0));
//!
//! assert_eq!(snapshot::track_lane(&lane, Tempo::new(120.0)), "0,0;2,6");
//! ```

use serde::Serialize;

use crate::clip::MidiClip;
use crate::curve;
use crate::id::{ClipId, TrackId};
use crate::lane::{ClipLane, ControlPoint, TrackLane};
use crate::parameter::Parameter;
use crate::time::Tempo;

/// One decoded wire pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WirePoint {
    pub seconds: f64,
    pub value: f32,
}

/// Value as the engine expects it for `parameter`
#[inline]
pub fn wire_value(parameter: Parameter, value: f32) -> f32 {
    match parameter {
        Parameter::Volume => curve::to_db(value),
        Parameter::Pan => value,
    }
}

/// Render points whose times are beats after `origin_beats`.
///
/// Each time becomes `seconds(time) + seconds(origin_beats)`, so clip lanes
/// land on the same absolute axis as track lanes.
pub fn render<'a, I>(points: I, parameter: Parameter, tempo: Tempo, origin_beats: f64) -> String
where
    I: IntoIterator<Item = &'a ControlPoint>,
{
    let origin = tempo.beats_to_seconds(origin_beats);
    points
        .into_iter()
        .map(|point| {
            let seconds = tempo.beats_to_seconds(point.time) + origin;
            format!("{},{}", seconds, wire_value(parameter, point.value))
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Track-scope lane, times already on the arrangement axis
pub fn track_lane(lane: &TrackLane, tempo: Tempo) -> String {
    render(lane.points(), lane.parameter(), tempo, 0.0)
}

/// Clip-scope lane whose clip starts at `clip_start_beats` on the timeline
pub fn clip_lane(lane: &ClipLane, tempo: Tempo, clip_start_beats: f64) -> String {
    render(lane.points(), lane.parameter(), tempo, clip_start_beats)
}

/// Clip automation for `parameter` as heard: repetitions and content offset
/// are resolved before rendering. A missing lane renders as empty.
pub fn clip_automation(clip: &MidiClip, parameter: Parameter, tempo: Tempo) -> String {
    clip.arrangement_lane(parameter)
        .map(|lane| clip_lane(&lane, tempo, clip.timeline_start()))
        .unwrap_or_default()
}

/// Decode a wire string. Malformed pairs are skipped; the result is sorted
/// by time with equal times kept in wire order.
pub fn parse(wire: &str) -> Vec<WirePoint> {
    let mut points: Vec<WirePoint> = wire
        .split(';')
        .filter_map(|pair| {
            let (seconds, value) = pair.split_once(',')?;
            Some(WirePoint {
                seconds: seconds.trim().parse().ok()?,
                value: value.trim().parse().ok()?,
            })
        })
        .filter(|point| point.seconds.is_finite() && point.value.is_finite())
        .collect();
    points.sort_by(|a, b| a.seconds.total_cmp(&b.seconds));
    points
}

/// Everything the engine needs for one arrangement revision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    /// Increments with every arrangement edit
    pub revision: u64,
    pub tempo_bpm: f64,
    pub tracks: Vec<TrackSnapshot>,
}

impl EngineSnapshot {
    pub fn track(&self, id: TrackId) -> Option<&TrackSnapshot> {
        self.tracks.iter().find(|track| track.track == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub track: TrackId,
    pub volume: String,
    pub pan: String,
    pub clips: Vec<ClipSnapshot>,
}

impl TrackSnapshot {
    pub fn clip(&self, id: ClipId) -> Option<&ClipSnapshot> {
        self.clips.iter().find(|clip| clip.clip == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipSnapshot {
    pub clip: ClipId,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub volume: String,
    pub pan: String,
}

impl ClipSnapshot {
    pub fn new(clip: &MidiClip, tempo: Tempo) -> Self {
        Self {
            clip: clip.id(),
            start_seconds: tempo.beats_to_seconds(clip.timeline_start()),
            end_seconds: tempo.beats_to_seconds(clip.timeline_end()),
            volume: clip_automation(clip, Parameter::Volume, tempo),
            pan: clip_automation(clip, Parameter::Pan, tempo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_lane_is_empty_string() {
        let lane = TrackLane::new(TrackId::new(), Parameter::Pan);
        assert_eq!(track_lane(&lane, Tempo::default()), "");
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_track_volume_in_db() {
        let lane = TrackLane::new(TrackId::new(), Parameter::Volume)
            .with_point(ControlPoint::new(0.0, 0.0))
            .with_point(ControlPoint::new(2.0, 0.70))
            .with_point(ControlPoint::new(6.0, 1.0));

        assert_eq!(track_lane(&lane, Tempo::new(120.0)), "0,-96;1,0;3,6");
        assert_eq!(track_lane(&lane, Tempo::new(60.0)), "0,-96;2,0;6,6");
    }

    #[test]
    fn test_pan_is_raw() {
        let lane = TrackLane::new(TrackId::new(), Parameter::Pan)
            .with_point(ControlPoint::new(0.0, -1.0))
            .with_point(ControlPoint::new(1.0, 0.5));
        assert_eq!(track_lane(&lane, Tempo::new(120.0)), "0,-1;0.5,0.5");
    }

    #[test]
    fn test_clip_lane_adds_clip_start() {
        let lane = ClipLane::new(ClipId::new(), Parameter::Pan)
            .with_point(ControlPoint::new(0.0, 0.0))
            .with_point(ControlPoint::new(2.0, 1.0));
        assert_eq!(clip_lane(&lane, Tempo::new(120.0), 8.0), "4,0;5,1");
    }

    #[test]
    fn test_clip_automation_resolves_loops() {
        let clip = MidiClip::new(TrackId::new(), 4.0, 8.0)
            .with_loop_length(4.0)
            .add_automation_point(Parameter::Pan, ControlPoint::new(0.0, -1.0))
            .add_automation_point(Parameter::Pan, ControlPoint::new(4.0, 1.0));

        assert_eq!(
            clip_automation(&clip, Parameter::Pan, Tempo::new(120.0)),
            "2,-1;4,1;4,-1;6,1"
        );
        assert_eq!(clip_automation(&clip, Parameter::Volume, Tempo::new(120.0)), "");
    }

    #[test]
    fn test_selected_points_only() {
        let lane = TrackLane::new(TrackId::new(), Parameter::Pan)
            .with_point(ControlPoint::new(0.0, -1.0))
            .with_point(ControlPoint::new(2.0, 1.0).selected(true));
        assert_eq!(
            render(lane.selected(), Parameter::Pan, Tempo::new(120.0), 0.0),
            "1,1"
        );
    }

    #[test]
    fn test_parse_skips_malformed_pairs() {
        let points = parse("1.5,-6;oops;0,-96;2,x;3,0,1; 4 , 6 ");
        let pairs: Vec<(f64, f32)> = points.iter().map(|p| (p.seconds, p.value)).collect();
        assert_eq!(pairs, vec![(0.0, -96.0), (1.5, -6.0), (4.0, 6.0)]);
    }

    #[test]
    fn test_render_then_parse() {
        let lane = TrackLane::new(TrackId::new(), Parameter::Volume)
            .with_point(ControlPoint::new(0.5, 0.3))
            .with_point(ControlPoint::new(3.25, 0.9));
        let tempo = Tempo::new(97.0);

        let parsed = parse(&track_lane(&lane, tempo));
        for (wire, point) in parsed.iter().zip(lane.points()) {
            assert_eq!(wire.seconds, tempo.beats_to_seconds(point.time));
            assert_eq!(wire.value, curve::to_db(point.value));
        }
    }
}
