//! Automatable mixer parameters
//!
//! | Parameter | Range      | Default | Bipolar |
//! |-----------|------------|---------|---------|
//! | Volume    | 0.0 – 1.0  | 0.70    | no      |
//! | Pan       | -1.0 – 1.0 | 0.0     | yes     |
//!
//! Volume is stored normalized and reaches decibels through [`crate::curve`].
//! The volume default sits on the 0 dB breakpoint.

use serde::{Deserialize, Serialize};

use crate::curve::UNITY_NORMALIZED;

/// Parameter driven by an automation lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    #[default]
    Volume,
    Pan,
}

impl Parameter {
    #[must_use]
    #[inline]
    pub fn min_value(&self) -> f32 {
        match self {
            Self::Volume => 0.0,
            Self::Pan => -1.0,
        }
    }

    #[must_use]
    #[inline]
    pub fn max_value(&self) -> f32 {
        match self {
            Self::Volume => 1.0,
            Self::Pan => 1.0,
        }
    }

    #[must_use]
    #[inline]
    pub fn default_value(&self) -> f32 {
        match self {
            Self::Volume => UNITY_NORMALIZED,
            Self::Pan => 0.0,
        }
    }

    /// Whether the range extends below zero
    #[must_use]
    #[inline]
    pub fn is_bipolar(&self) -> bool {
        matches!(self, Self::Pan)
    }

    /// Clamp a value into range. NaN falls back to the default.
    #[must_use]
    #[inline]
    pub fn clamp_value(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default_value()
        } else {
            value.clamp(self.min_value(), self.max_value())
        }
    }

    #[must_use]
    pub fn all() -> &'static [Parameter] {
        &[Self::Volume, Self::Pan]
    }

    /// Name used in persisted data
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Pan => "pan",
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Volume => "Volume",
            Self::Pan => "Pan",
        }
    }

    /// Resolve a persisted name, case-insensitively.
    ///
    /// Returns `None` for names this crate does not know. Loaders substitute
    /// [`Parameter::Volume`] in that case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|parameter| parameter.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_ranges() {
        assert_eq!(Parameter::Volume.min_value(), 0.0);
        assert_eq!(Parameter::Volume.max_value(), 1.0);
        assert!(!Parameter::Volume.is_bipolar());

        assert_eq!(Parameter::Pan.min_value(), -1.0);
        assert_eq!(Parameter::Pan.max_value(), 1.0);
        assert_eq!(Parameter::Pan.default_value(), 0.0);
        assert!(Parameter::Pan.is_bipolar());
    }

    #[test]
    fn test_volume_default_is_unity() {
        assert_eq!(crate::curve::to_db(Parameter::Volume.default_value()), 0.0);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(Parameter::Volume.clamp_value(1.5), 1.0);
        assert_eq!(Parameter::Volume.clamp_value(-0.2), 0.0);
        assert_eq!(Parameter::Pan.clamp_value(-3.0), -1.0);
        assert_eq!(Parameter::Pan.clamp_value(f32::NAN), 0.0);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Parameter::from_name("volume"), Some(Parameter::Volume));
        assert_eq!(Parameter::from_name("PAN"), Some(Parameter::Pan));
        assert_eq!(Parameter::from_name("cutoff"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Parameter::Pan), "Pan");
        assert_eq!(Parameter::default(), Parameter::Volume);
        assert_eq!(Parameter::all().len(), 2);
    }
}
