//! Identifiers for points, lanes, notes, clips, tracks and patterns
//!
//! Every identifier is a random v4 UUID. Fresh identities are minted whenever
//! content is copied, so two values never share an id by accident.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

define_id!(
    /// Identity of a single control point
    PointId
);
define_id!(
    /// Identity of an automation lane
    LaneId
);
define_id!(
    /// Identity of a MIDI note inside a clip
    NoteId
);
define_id!(
    /// Identity of a clip on the arrangement
    ClipId
);
define_id!(
    /// Identity of a track
    TrackId
);
define_id!(
    /// Non-owning link between clips that share note content
    PatternId
);
