//! Clip automation - one lane per parameter on a clip's local time axis
//!
//! Lanes sit behind `Arc`s, so editing one lane leaves the others shared
//! with every earlier version of the aggregate. Structural edits (slice,
//! deep copy, owner change) touch every lane in one step: a split clip never
//! ends up with one lane cut and another whole.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::id::{ClipId, PointId};
use crate::lane::{ClipLane, ControlPoint};
use crate::parameter::Parameter;

/// Automation lanes of a single clip, keyed by parameter.
///
/// A missing lane means the parameter is not automated and sits at its
/// default value.
#[derive(Debug, Clone, Default)]
pub struct ClipAutomation {
    lanes: BTreeMap<Parameter, Arc<ClipLane>>,
}

impl ClipAutomation {
    /// Create an aggregate with no lanes
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the lane for its parameter, builder style
    #[must_use]
    pub fn with_lane(mut self, lane: ClipLane) -> Self {
        self.lanes.insert(lane.parameter(), Arc::new(lane));
        self
    }

    pub fn lane(&self, parameter: Parameter) -> Option<&ClipLane> {
        self.lanes.get(&parameter).map(Arc::as_ref)
    }

    pub fn lanes(&self) -> impl Iterator<Item = &ClipLane> {
        self.lanes.values().map(Arc::as_ref)
    }

    pub fn parameters(&self) -> impl Iterator<Item = Parameter> + '_ {
        self.lanes.keys().copied()
    }

    /// Number of lanes
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Value of `parameter` at clip-local `time`, or its default when the
    /// parameter has no lane
    pub fn value_at(&self, parameter: Parameter, time: f64) -> f32 {
        match self.lanes.get(&parameter) {
            Some(lane) => lane.value_at(time),
            None => parameter.default_value(),
        }
    }

    /// Values of all lanes at a time
    pub fn values_at(&self, time: f64) -> BTreeMap<Parameter, f32> {
        self.lanes
            .iter()
            .map(|(parameter, lane)| (*parameter, lane.value_at(time)))
            .collect()
    }

    // ==================== Edits ====================

    /// Replace the lane for its parameter
    #[must_use]
    pub fn set_lane(&self, lane: ClipLane) -> Self {
        self.clone().with_lane(lane)
    }

    #[must_use]
    pub fn remove_lane(&self, parameter: Parameter) -> Self {
        let mut next = self.clone();
        next.lanes.remove(&parameter);
        next
    }

    /// Rewrite one lane. A lane is created for `parameter` when missing,
    /// owned by `owner`.
    #[must_use]
    pub fn update_lane<F>(&self, owner: ClipId, parameter: Parameter, edit: F) -> Self
    where
        F: FnOnce(&ClipLane) -> ClipLane,
    {
        let edited = match self.lanes.get(&parameter) {
            Some(lane) => edit(lane),
            None => edit(&ClipLane::new(owner, parameter)),
        };
        self.set_lane(edited)
    }

    #[must_use]
    pub fn add_point(&self, owner: ClipId, parameter: Parameter, point: ControlPoint) -> Self {
        self.update_lane(owner, parameter, |lane| lane.add_point(point))
    }

    /// Remove a point from a lane; a missing lane or id is a no-op
    #[must_use]
    pub fn remove_point(&self, parameter: Parameter, id: PointId) -> Self {
        match self.lanes.get(&parameter) {
            Some(lane) => self.set_lane(lane.remove_point(id)),
            None => self.clone(),
        }
    }

    /// Apply the same edit to every lane
    #[must_use]
    pub fn map_lanes<F>(&self, mut edit: F) -> Self
    where
        F: FnMut(&ClipLane) -> ClipLane,
    {
        let lanes = self
            .lanes
            .iter()
            .map(|(parameter, lane)| (*parameter, Arc::new(edit(lane))))
            .collect();
        Self { lanes }
    }

    // ==================== Structural Operations ====================

    /// Left fragment of a split at `at`: every lane cut with its boundary value kept
    #[must_use]
    pub fn slice_left(&self, at: f64) -> Self {
        self.map_lanes(|lane| lane.slice_left(at))
    }

    /// Right fragment of a split at `at`, rebased to zero and handed to `owner`
    #[must_use]
    pub fn slice_right(&self, at: f64, owner: ClipId) -> Self {
        self.map_lanes(|lane| lane.slice_right(at).with_owner(owner))
    }

    /// Both fragments of a split at `at`
    pub fn split(&self, at: f64, right_owner: ClipId) -> (Self, Self) {
        (self.slice_left(at), self.slice_right(at, right_owner))
    }

    /// Identical curves under new lane and point identities, owned by `owner`
    #[must_use]
    pub fn deep_copy(&self, owner: ClipId) -> Self {
        self.map_lanes(|lane| lane.deep_copy().with_owner(owner))
    }

    /// Move every lane to a new owner, keeping identities
    #[must_use]
    pub fn with_owner(&self, owner: ClipId) -> Self {
        self.map_lanes(|lane| lane.clone().with_owner(owner))
    }

    /// Whether two aggregates share storage for `parameter`
    pub(crate) fn shares_lane(&self, other: &Self, parameter: Parameter) -> bool {
        match (self.lanes.get(&parameter), other.lanes.get(&parameter)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
