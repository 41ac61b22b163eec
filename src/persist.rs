//! Stored clip and lane data
//!
//! Documents are JSON. Decoding runs in three steps:
//! 1. the raw document is brought up to [`SCHEMA_VERSION`] through
//!    [`MIGRATIONS`], one version at a time;
//! 2. it is decoded into typed records whose fields may all be absent;
//! 3. the records are resolved into model values, filling every absent
//!    field from the defaults in this module.
//!
//! Missing, unknown or wrongly typed content never fails a load: such a
//! field reads as absent and takes its default. Only text that is not a
//! JSON object is reported as an error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::automation::ClipAutomation;
use crate::clip::{MidiClip, DEFAULT_CLIP_BEATS};
use crate::error::PersistError;
use crate::id::{ClipId, LaneId, NoteId, PatternId, PointId, TrackId};
use crate::lane::{AutomationLane, ClipTime, ControlPoint, TimeScope};
use crate::note::{Note, MIDI_MAX};
use crate::parameter::Parameter;

/// Version written by this crate
pub const SCHEMA_VERSION: u64 = 2;

const VERSION_KEY: &str = "schemaVersion";

/// Version assumed for documents that carry none
const UNVERSIONED: u64 = 1;

const DEFAULT_PITCH: u8 = 60;
const DEFAULT_VELOCITY: u8 = 100;
const DEFAULT_NOTE_BEATS: f64 = 1.0;
const DEFAULT_CAN_REPEAT: bool = true;
const DEFAULT_PARAMETER: Parameter = Parameter::Volume;

/// Rewrites a raw document in place
pub type Migration = fn(&mut Map<String, Value>);

/// Upgrade steps; entry `(n, step)` turns a version `n` document into `n + 1`
pub const MIGRATIONS: &[(u64, Migration)] = &[(1, split_legacy_automation as Migration)];

// ==================== Lenient Fields ====================

/// Field decoder that reads a value of the wrong type as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(value) => Ok(Some(value)),
        Err(error) => {
            warn!(%error, "ignoring stored field of the wrong type");
            Ok(None)
        }
    }
}

/// List decoder that drops entries which are not objects. Anything other
/// than a list reads as empty.
fn lenient_records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        _ => {
            warn!("ignoring stored list of the wrong type");
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| {
            if !item.is_object() {
                warn!(%item, "dropping stored entry that is not an object");
                return None;
            }
            serde_json::from_value(item).ok()
        })
        .collect())
}

// ==================== Records ====================

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PointRecord {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<PointId>,
    #[serde(deserialize_with = "lenient")]
    pub time: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub value: Option<f32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LaneRecord {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<LaneId>,
    #[serde(deserialize_with = "lenient")]
    pub parameter: Option<String>,
    #[serde(deserialize_with = "lenient_records")]
    pub points: Vec<PointRecord>,
    #[serde(deserialize_with = "lenient")]
    pub expanded: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteRecord {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<NoteId>,
    #[serde(deserialize_with = "lenient")]
    pub pitch: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub velocity: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub start_time: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub duration: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub selected: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClipRecord {
    #[serde(deserialize_with = "lenient")]
    pub schema_version: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub id: Option<ClipId>,
    #[serde(deserialize_with = "lenient")]
    pub track_id: Option<TrackId>,
    #[serde(deserialize_with = "lenient")]
    pub timeline_start: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub duration: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub loop_length: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub can_repeat: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub content_start_offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub pattern_id: Option<PatternId>,
    #[serde(deserialize_with = "lenient_records")]
    pub notes: Vec<NoteRecord>,
    #[serde(deserialize_with = "lenient_records")]
    pub automation: Vec<LaneRecord>,
}

// ==================== Encoding ====================

impl PointRecord {
    fn from_point(point: &ControlPoint) -> Self {
        Self {
            id: Some(point.id),
            time: Some(point.time),
            value: Some(point.value),
        }
    }
}

impl LaneRecord {
    pub fn from_lane<S: TimeScope>(lane: &AutomationLane<S>) -> Self {
        Self {
            id: Some(lane.id()),
            parameter: Some(lane.parameter().name().to_string()),
            points: lane.points().map(PointRecord::from_point).collect(),
            expanded: Some(lane.is_expanded()),
        }
    }
}

impl NoteRecord {
    pub fn from_note(note: &Note) -> Self {
        Self {
            id: Some(note.id),
            pitch: Some(i64::from(note.pitch)),
            velocity: Some(i64::from(note.velocity)),
            start_time: Some(note.start),
            duration: Some(note.duration),
            selected: Some(note.selected),
        }
    }
}

impl ClipRecord {
    pub fn from_clip(clip: &MidiClip) -> Self {
        Self {
            schema_version: Some(SCHEMA_VERSION),
            id: Some(clip.id()),
            track_id: Some(clip.track()),
            timeline_start: Some(clip.timeline_start()),
            duration: Some(clip.duration()),
            loop_length: Some(clip.loop_length()),
            can_repeat: Some(clip.can_repeat()),
            content_start_offset: Some(clip.content_start_offset()),
            pattern_id: clip.pattern(),
            notes: clip.notes().iter().map(NoteRecord::from_note).collect(),
            automation: clip.automation().lanes().map(LaneRecord::from_lane).collect(),
        }
    }
}

// ==================== Default Resolution ====================

fn resolve_parameter(name: Option<&str>) -> Parameter {
    match name {
        Some(name) => Parameter::from_name(name).unwrap_or_else(|| {
            warn!(parameter = name, fallback = %DEFAULT_PARAMETER, "unknown automation parameter");
            DEFAULT_PARAMETER
        }),
        None => {
            debug!(fallback = %DEFAULT_PARAMETER, "lane without parameter");
            DEFAULT_PARAMETER
        }
    }
}

fn midi_byte(value: Option<i64>, default: u8) -> u8 {
    match value {
        Some(value) => value.clamp(0, i64::from(MIDI_MAX)) as u8,
        None => default,
    }
}

impl LaneRecord {
    /// Resolve into a lane handed to `owner`
    pub fn into_lane<S: TimeScope>(self, owner: S::Owner) -> AutomationLane<S> {
        let parameter = resolve_parameter(self.parameter.as_deref());
        let lane = AutomationLane::with_id(self.id.unwrap_or_default(), owner, parameter)
            .with_expanded(self.expanded.unwrap_or(false));

        self.points.into_iter().fold(lane, |lane, point| {
            lane.with_point(ControlPoint::with_id(
                point.id.unwrap_or_default(),
                point.time.unwrap_or(0.0),
                point.value.unwrap_or_else(|| parameter.default_value()),
            ))
        })
    }
}

impl NoteRecord {
    pub fn into_note(self) -> Note {
        Note {
            id: self.id.unwrap_or_default(),
            pitch: midi_byte(self.pitch, DEFAULT_PITCH),
            velocity: midi_byte(self.velocity, DEFAULT_VELOCITY),
            start: self.start_time.unwrap_or(0.0),
            duration: self.duration.unwrap_or(DEFAULT_NOTE_BEATS),
            selected: self.selected.unwrap_or(false),
        }
        .normalized()
    }
}

impl ClipRecord {
    /// Resolve into a clip.
    ///
    /// `loopLength` defaults to the duration, `canRepeat` to true and
    /// `contentStartOffset` to zero.
    pub fn into_clip(self) -> MidiClip {
        let id = self.id.unwrap_or_default();
        let duration = self.duration.unwrap_or(DEFAULT_CLIP_BEATS);

        let automation = self
            .automation
            .into_iter()
            .map(|lane| lane.into_lane::<ClipTime>(id))
            .fold(ClipAutomation::new(), ClipAutomation::with_lane);

        MidiClip::new(
            self.track_id.unwrap_or_default(),
            self.timeline_start.unwrap_or(0.0),
            duration,
        )
        .with_id(id)
        .with_loop_length(self.loop_length.unwrap_or(duration))
        .with_repeat(self.can_repeat.unwrap_or(DEFAULT_CAN_REPEAT))
        .with_content_offset(self.content_start_offset.unwrap_or(0.0))
        .with_pattern(self.pattern_id)
        .with_notes(self.notes.into_iter().map(NoteRecord::into_note))
        .with_automation(automation)
    }
}

// ==================== Migrations ====================

/// Bring a raw document up to [`SCHEMA_VERSION`].
///
/// Non-object documents are left alone; typed decoding reports them.
pub fn migrate(document: &mut Value) -> Result<(), PersistError> {
    let Some(object) = document.as_object_mut() else {
        return Ok(());
    };

    let mut version = object
        .get(VERSION_KEY)
        .and_then(Value::as_u64)
        .unwrap_or(UNVERSIONED);
    if version > SCHEMA_VERSION {
        return Err(PersistError::UnsupportedVersion(version));
    }

    for (from, step) in MIGRATIONS {
        if *from == version {
            debug!(from = version, to = version + 1, "migrating stored clip");
            step(object);
            version += 1;
        }
    }
    object.insert(VERSION_KEY.to_string(), json!(version));
    Ok(())
}

/// Version 1 kept clip automation as two arrays of `{timeBeats, value}`,
/// with pan stored as `0..1` around a `0.5` centre
fn split_legacy_automation(clip: &mut Map<String, Value>) {
    let legacy = [
        ("volumeAutomation", Parameter::Volume),
        ("panAutomation", Parameter::Pan),
    ];

    let mut lanes = Vec::new();
    for (key, parameter) in legacy {
        let Some(points) = clip.remove(key) else {
            continue;
        };
        let Value::Array(points) = points else {
            warn!(key, "dropping legacy automation that is not a list");
            continue;
        };
        let points: Vec<Value> = points
            .iter()
            .filter_map(|point| {
                let time = point
                    .get("timeBeats")
                    .or_else(|| point.get("time"))
                    .and_then(Value::as_f64)?;
                let value = point.get("value").and_then(Value::as_f64)?;
                let value = match parameter {
                    Parameter::Volume => value,
                    Parameter::Pan => value * 2.0 - 1.0,
                };
                Some(json!({ "time": time, "value": value }))
            })
            .collect();
        if !points.is_empty() {
            lanes.push(json!({ "parameter": parameter.name(), "points": points }));
        }
    }

    match clip.get_mut("automation") {
        Some(Value::Array(existing)) => existing.extend(lanes),
        _ => {
            clip.insert("automation".to_string(), Value::Array(lanes));
        }
    }
}

// ==================== Entry Points ====================

pub fn clip_to_json(clip: &MidiClip) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(&ClipRecord::from_clip(clip))?)
}

pub fn clip_from_json(json: &str) -> Result<MidiClip, PersistError> {
    let mut document = Value::Object(serde_json::from_str(json)?);
    migrate(&mut document)?;
    let record: ClipRecord = serde_json::from_value(document)?;
    Ok(record.into_clip())
}

pub fn lane_to_json<S: TimeScope>(lane: &AutomationLane<S>) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(&LaneRecord::from_lane(lane))?)
}

/// Decode a lane and hand it to `owner`
pub fn lane_from_json<S: TimeScope>(
    json: &str,
    owner: S::Owner,
) -> Result<AutomationLane<S>, PersistError> {
    let document = Value::Object(serde_json::from_str(json)?);
    let record: LaneRecord = serde_json::from_value(document)?;
    Ok(record.into_lane(owner))
}
