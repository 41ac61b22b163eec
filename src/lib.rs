//! # timeline-automation
//!
//! Automation curves and the MIDI clip timeline model of a multi-track editor.
//!
//! This crate provides:
//! - **Automation lanes** - Sorted control points with edge-hold linear interpolation,
//!   at track scope ([`TrackLane`]) or clip scope ([`ClipLane`])
//! - **Clip automation** - One lane per parameter, sliced and deep-copied as a unit
//! - **MIDI clips** - Duration, loop length and content offset kept apart, with the
//!   playback mapping that reconciles them
//! - **Volume curve** - Normalized fader position to decibels through a fixed breakpoint table
//! - **Engine snapshots** - Beat-domain curves rendered as `"seconds,value;..."` strings
//! - **Persistence** - Versioned JSON records with central defaults
//!
//! Every edit returns a new value. Notes and lanes live behind `Arc`s, so an
//! edit copies only what it touches.
//!
//! ## Quick Start
//!
//! ```rust
//! use timeline_automation::prelude::*;
//! use timeline_automation::snapshot;
//!
//! let clip = MidiClip::new(TrackId::new(), 8.0, 8.0)
//!     .with_loop_length(4.0)
//!     .add_note(Note::new(60, 100, 1.0, 0.5))
//!     .add_automation_point(Parameter::Volume, ControlPoint::new(0.0, 0.01))
//!     .add_automation_point(Parameter::Volume, ControlPoint::new(4.0, 0.70));
//!
//! // the note sounds once per repetition
//! assert_eq!(clip.arrangement_times_for(1.0), vec![1.0, 5.0]);
//!
//! // automation restarts with the content
//! let halfway = clip.automation_value_at(Parameter::Volume, 6.0).unwrap();
//! assert!((halfway - 0.355).abs() < 1e-6);
//!
//! // the engine receives timeline-absolute seconds and decibels
//! let wire = snapshot::clip_automation(&clip, Parameter::Volume, Tempo::new(120.0));
//! assert_eq!(wire, "4,-60;6,0;6,-60;8,0");
//! ```
//!
//! ## Splitting
//!
//! ```rust
//! use timeline_automation::prelude::*;
//!
//! let clip = MidiClip::new(TrackId::new(), 0.0, 4.0)
//!     .add_automation_point(Parameter::Pan, ControlPoint::new(0.0, -1.0))
//!     .add_automation_point(Parameter::Pan, ControlPoint::new(4.0, 1.0));
//!
//! let (left, right) = clip.split(1.0).into_pair().unwrap();
//! assert_eq!(left.automation().value_at(Parameter::Pan, 1.0), -0.5);
//! assert_eq!(right.automation().value_at(Parameter::Pan, 0.0), -0.5);
//!
//! // cuts at or beyond the edges leave the clip whole
//! assert!(!clip.split(4.0).is_pair());
//! ```

pub mod arrangement;
pub mod automation;
pub mod clip;
pub mod config;
pub mod curve;
pub mod error;
pub mod id;
pub mod lane;
pub mod note;
pub mod parameter;
pub mod persist;
pub mod snapshot;
pub mod time;

pub use arrangement::{Arrangement, Track};
pub use automation::ClipAutomation;
pub use clip::{ClipSplit, ContentSegment, MidiClip, NoteOnset};
pub use config::Config;
pub use error::{ConfigError, PersistError};
pub use id::{ClipId, LaneId, NoteId, PatternId, PointId, TrackId};
pub use lane::{AutomationLane, ClipLane, ClipTime, ControlPoint, TimeScope, TrackLane, TrackTime};
pub use note::Note;
pub use parameter::Parameter;
pub use snapshot::EngineSnapshot;
pub use time::Tempo;

/// Prelude for common imports
pub mod prelude {
    pub use crate::arrangement::{Arrangement, Track};
    pub use crate::automation::ClipAutomation;
    pub use crate::clip::{ClipSplit, MidiClip};
    pub use crate::config::Config;
    pub use crate::id::{ClipId, NoteId, PatternId, PointId, TrackId};
    pub use crate::lane::{ClipLane, ControlPoint, TrackLane};
    pub use crate::note::Note;
    pub use crate::parameter::Parameter;
    pub use crate::time::Tempo;
}
