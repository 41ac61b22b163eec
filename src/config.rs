//! Editor defaults loaded from TOML
//!
//! ```toml
//! [timeline]
//! tempo_bpm = 120.0
//! default_clip_beats = 4.0
//!
//! [editing]
//! quantize_grid = 0.25
//! ```
//!
//! Every section and key is optional.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::clip::DEFAULT_CLIP_BEATS;
use crate::error::ConfigError;
use crate::time::Tempo;

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub timeline: Timeline,
    pub editing: Editing,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)?;
        content.parse()
    }

    pub fn tempo(&self) -> Tempo {
        Tempo::new(self.timeline.tempo_bpm)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Timeline {
    pub tempo_bpm: f64,
    /// Length of a newly created clip
    pub default_clip_beats: f64,
}

impl Default for Timeline {
    fn default() -> Timeline {
        Timeline {
            tempo_bpm: 120.0,
            default_clip_beats: DEFAULT_CLIP_BEATS,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Editing {
    /// Grid in beats used by quantize
    pub quantize_grid: f64,
}

impl Default for Editing {
    fn default() -> Editing {
        Editing { quantize_grid: 0.25 }
    }
}
