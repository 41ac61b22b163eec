//! Automation lanes and control points
//!
//! A lane is an ordered curve of control points driving one [`Parameter`].
//! Points live in a `BTreeMap` keyed by `(time, insertion sequence)`, so the
//! curve is sorted after every mutation and equal times keep the order in
//! which they were inserted.
//!
//! Lanes come in two coordinate flavours:
//! - [`TrackLane`]: times are beats on the arrangement timeline
//! - [`ClipLane`]: times are beats relative to the clip content start
//!
//! Every operation is pure: mutators take `&self` and hand back a new lane.
//!
//! ```rust
//! use timeline_automation::prelude::*;
//!
//! let lane = ClipLane::new(ClipId::new(), Parameter::Volume)
//!     .with_point(ControlPoint::new(0.0, 0.2))
//!     .with_point(ControlPoint::new(4.0, 0.8));
//!
//! assert!((lane.value_at(2.0) - 0.5).abs() < 1e-6);
//! assert_eq!(lane.value_at(-1.0), 0.2); // held before the first point
//! assert_eq!(lane.value_at(9.0), 0.8); // held after the last point
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::RangeBounds;

use crate::id::{ClipId, LaneId, PointId, TrackId};
use crate::parameter::Parameter;
use crate::time::sanitize_beats;

/// Coordinate system of a lane's point times
pub trait TimeScope: Debug + Clone + Copy + Default + Send + Sync + 'static {
    /// Entity that owns lanes of this scope
    type Owner: Debug + Clone + Copy + PartialEq + Eq + Hash + Send + Sync + 'static;

    const NAME: &'static str;
}

/// Times are arrangement-absolute beats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackTime;

impl TimeScope for TrackTime {
    type Owner = TrackId;
    const NAME: &'static str = "track";
}

/// Times are beats from the clip content start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipTime;

impl TimeScope for ClipTime {
    type Owner = ClipId;
    const NAME: &'static str = "clip";
}

pub type TrackLane = AutomationLane<TrackTime>;
pub type ClipLane = AutomationLane<ClipTime>;

/// Single control point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub id: PointId,
    /// Position in beats (scope depends on the owning lane)
    pub time: f64,
    /// Parameter value, clamped to range when stored in a lane
    pub value: f32,
    pub selected: bool,
}

impl ControlPoint {
    /// Create an unselected point with a fresh id
    pub fn new(time: f64, value: f32) -> Self {
        Self::with_id(PointId::new(), time, value)
    }

    pub fn with_id(id: PointId, time: f64, value: f32) -> Self {
        Self {
            id,
            time,
            value,
            selected: false,
        }
    }

    #[must_use]
    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Same point under a new identity
    #[must_use]
    pub fn reidentified(self) -> Self {
        Self {
            id: PointId::new(),
            ..self
        }
    }
}

/// Beats with a total order; `-0.0` is folded into `0.0` before it gets here.
#[derive(Debug, Clone, Copy)]
struct TimeKey(f64);

impl PartialEq for TimeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimeKey {}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PointKey {
    time: TimeKey,
    seq: u64,
}

impl PointKey {
    /// Sorts after every stored point at `time`.
    fn after_all_at(time: f64) -> Self {
        Self {
            time: TimeKey(time),
            seq: u64::MAX,
        }
    }
}

/// Automation curve for a single parameter
#[derive(Debug, Clone)]
pub struct AutomationLane<S: TimeScope> {
    id: LaneId,
    owner: S::Owner,
    parameter: Parameter,
    points: BTreeMap<PointKey, ControlPoint>,
    next_seq: u64,
    /// Whether the editor shows the lane unfolded
    expanded: bool,
    scope: PhantomData<S>,
}

impl<S: TimeScope> AutomationLane<S> {
    /// Create an empty lane
    pub fn new(owner: S::Owner, parameter: Parameter) -> Self {
        Self::with_id(LaneId::new(), owner, parameter)
    }

    pub fn with_id(id: LaneId, owner: S::Owner, parameter: Parameter) -> Self {
        Self {
            id,
            owner,
            parameter,
            points: BTreeMap::new(),
            next_seq: 0,
            expanded: false,
            scope: PhantomData,
        }
    }

    /// Add a point, builder style
    #[must_use]
    pub fn with_point(mut self, point: ControlPoint) -> Self {
        self.insert(point);
        self
    }

    #[must_use]
    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    /// Hand the lane to another owner
    #[must_use]
    pub fn with_owner(mut self, owner: S::Owner) -> Self {
        self.owner = owner;
        self
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> LaneId {
        self.id
    }

    pub fn owner(&self) -> S::Owner {
        self.owner
    }

    pub fn parameter(&self) -> Parameter {
        self.parameter
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in non-decreasing time order
    pub fn points(&self) -> impl DoubleEndedIterator<Item = &ControlPoint> + ExactSizeIterator {
        self.points.values()
    }

    pub fn first(&self) -> Option<&ControlPoint> {
        self.points.values().next()
    }

    pub fn last(&self) -> Option<&ControlPoint> {
        self.points.values().next_back()
    }

    pub fn point(&self, id: PointId) -> Option<&ControlPoint> {
        self.points.values().find(|p| p.id == id)
    }

    /// Points whose time falls inside `range`
    pub fn points_in<R>(&self, range: R) -> impl Iterator<Item = &ControlPoint>
    where
        R: RangeBounds<f64>,
    {
        self.points.values().filter(move |p| range.contains(&p.time))
    }

    pub fn selected(&self) -> impl Iterator<Item = &ControlPoint> {
        self.points.values().filter(|p| p.selected)
    }

    // ==================== Queries ====================

    /// Interpolated value at `time`.
    ///
    /// - empty lane: the parameter default
    /// - at or before the first point: the first value (edge hold)
    /// - at or after the last point: the last value (edge hold)
    /// - otherwise linear between the bracketing points
    ///
    /// Where several points share a time, a query exactly at that time
    /// returns the later-inserted one. The head of the lane is the exception:
    /// edge hold pins it to the first point.
    #[inline]
    pub fn value_at(&self, time: f64) -> f32 {
        let time = sanitize_beats(time);

        let (first, last) = match (self.first(), self.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return self.parameter.default_value(),
        };

        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        let probe = PointKey::after_all_at(time);
        let prev = match self.points.range(..=probe).next_back() {
            Some((_, point)) => point,
            None => return first.value,
        };
        if prev.time == time {
            return prev.value;
        }
        let next = match self.points.range(probe..).next() {
            Some((_, point)) => point,
            None => return prev.value,
        };

        let span = next.time - prev.time;
        let t = ((time - prev.time) / span) as f32;
        prev.value + (next.value - prev.value) * t
    }

    // ==================== Point Edits ====================

    /// Insert a point, clamping its value into the parameter range
    #[must_use]
    pub fn add_point(&self, point: ControlPoint) -> Self {
        let mut next = self.clone();
        next.insert(point);
        next
    }

    /// Remove a point by id; unknown ids leave the lane unchanged
    #[must_use]
    pub fn remove_point(&self, id: PointId) -> Self {
        let mut next = self.clone();
        next.take(id);
        next
    }

    /// Move a point and set its value. The point keeps its id and selection.
    #[must_use]
    pub fn update_point(&self, id: PointId, time: f64, value: f32) -> Self {
        let mut next = self.clone();
        if let Some(point) = next.take(id) {
            next.insert(ControlPoint {
                time,
                value,
                ..point
            });
        }
        next
    }

    #[must_use]
    pub fn select_point(&self, id: PointId, selected: bool) -> Self {
        self.map_points(|p| {
            if p.id == id {
                p.selected = selected;
            }
        })
    }

    /// Select every point inside `[start, end]`, leaving the rest untouched
    #[must_use]
    pub fn select_range(&self, start: f64, end: f64) -> Self {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        self.map_points(|p| {
            if p.time >= lo && p.time <= hi {
                p.selected = true;
            }
        })
    }

    // ==================== Bulk Operations ====================

    #[must_use]
    pub fn select_all(&self) -> Self {
        self.map_points(|p| p.selected = true)
    }

    #[must_use]
    pub fn deselect_all(&self) -> Self {
        self.map_points(|p| p.selected = false)
    }

    #[must_use]
    pub fn delete_selected(&self) -> Self {
        let mut next = self.clone();
        next.points.retain(|_, p| !p.selected);
        next
    }

    #[must_use]
    pub fn clear(&self) -> Self {
        let mut next = self.clone();
        next.points.clear();
        next
    }

    /// Move every point by `offset` beats
    #[must_use]
    pub fn shift(&self, offset: f64) -> Self {
        let mut next = self.cleared();
        for point in self.points.values() {
            next.insert(ControlPoint {
                time: point.time + offset,
                ..*point
            });
        }
        next
    }

    /// Insert every point of `other`, moved by `offset` beats.
    ///
    /// Merged points keep their ids and count as inserted after this lane's
    /// own points, so they win ties at equal times.
    #[must_use]
    pub fn merge<T: TimeScope>(&self, other: &AutomationLane<T>, offset: f64) -> Self {
        let mut next = self.clone();
        next.extend_shifted(other, offset);
        next
    }

    /// Same curve with a new lane id and new point ids throughout
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        let mut copy = self.cleared();
        copy.id = LaneId::new();
        for point in self.points.values() {
            copy.insert(point.reidentified());
        }
        copy
    }

    // ==================== Slicing ====================

    /// Curve restricted to `[.., at]`. Points stored at `at` are kept as they
    /// are; otherwise the curve is closed with a point at `at` carrying the
    /// original value there. An empty lane stays empty.
    #[must_use]
    pub fn slice_left(&self, at: f64) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        let at = sanitize_beats(at);

        let mut left = self.cleared();
        for point in self.points.values().filter(|p| p.time <= at) {
            left.insert(*point);
        }
        if left.last().map_or(true, |last| last.time < at) {
            left.insert(ControlPoint::new(at, self.value_at(at)));
        }
        left
    }

    /// Curve after `at`, rebased so that `at` becomes time zero.
    ///
    /// The result is a new lane: fresh lane id, fresh point ids, and a
    /// leading point at zero carrying the original value at `at`.
    #[must_use]
    pub fn slice_right(&self, at: f64) -> Self {
        let mut right = self.cleared();
        right.id = LaneId::new();
        if self.is_empty() {
            return right;
        }
        let at = sanitize_beats(at);
        let boundary = self.value_at(at);

        right.insert(ControlPoint::new(0.0, boundary));
        for point in self.points.values().filter(|p| p.time > at) {
            right.insert(ControlPoint {
                time: point.time - at,
                ..point.reidentified()
            });
        }
        right
    }

    /// Curve between `start` and `end`, rebased to start at zero, with
    /// boundary points at both ends.
    #[must_use]
    pub fn window(&self, start: f64, end: f64) -> Self {
        self.slice_right(start).slice_left(end - start)
    }

    // ==================== Internals ====================

    /// Same identity and settings, no points
    fn cleared(&self) -> Self {
        Self {
            id: self.id,
            owner: self.owner,
            parameter: self.parameter,
            points: BTreeMap::new(),
            next_seq: 0,
            expanded: self.expanded,
            scope: PhantomData,
        }
    }

    fn insert(&mut self, mut point: ControlPoint) {
        // `+ 0.0` folds -0.0 into 0.0 so both sort together
        point.time = sanitize_beats(point.time) + 0.0;
        point.value = self.parameter.clamp_value(point.value);

        let key = PointKey {
            time: TimeKey(point.time),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.points.insert(key, point);
    }

    /// In-place [`merge`](Self::merge)
    pub(crate) fn extend_shifted<T: TimeScope>(&mut self, other: &AutomationLane<T>, offset: f64) {
        for point in other.points.values() {
            self.insert(ControlPoint {
                time: point.time + offset,
                ..*point
            });
        }
    }

    fn take(&mut self, id: PointId) -> Option<ControlPoint> {
        let key = self
            .points
            .iter()
            .find_map(|(key, p)| (p.id == id).then_some(*key))?;
        self.points.remove(&key)
    }

    fn map_points<F>(&self, mut edit: F) -> Self
    where
        F: FnMut(&mut ControlPoint),
    {
        let mut next = self.clone();
        for point in next.points.values_mut() {
            edit(point);
        }
        next
    }
}
