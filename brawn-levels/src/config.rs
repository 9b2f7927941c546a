//! Construction-time configuration for the standards grid.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{
    AGE_MAX, AGE_MIN, BROAD_JUMP_DIFFICULTY_MODIFIER, BROAD_JUMP_WEIGHT_MODIFIER,
    DEFAULT_AGE_MODIFIER, DEFAULT_DIFFICULTY_MODIFIER, DEFAULT_MAX_LEVEL, DEFAULT_PEAK_AGE,
    DEFAULT_WEIGHT_MODIFIER, MAX_LEVEL_LIMIT,
};
use crate::model::Activity;

/// Top-level configuration: global resolution plus per-activity overrides.
///
/// Activities absent from `activity` use [`ActivityConfig::default_for`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StandardsConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub activity: BTreeMap<Activity, ActivityOverlay>,
}

impl StandardsConfig {
    /// Parse a configuration document from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a field has the wrong type.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Resolved settings for one activity.
    #[must_use]
    pub fn activity_config(&self, activity: Activity) -> ActivityConfig {
        let defaults = ActivityConfig::default_for(activity);
        self.activity
            .get(&activity)
            .map_or(defaults, |overlay| defaults.with_overlay(overlay))
    }

    #[must_use]
    pub const fn max_level(&self) -> u32 {
        self.global.max_level
    }

    /// Validate every invariant before the grid is built.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.global.validate()?;
        for activity in Activity::ALL {
            self.activity_config(activity).validate(activity)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default = "GlobalConfig::default_max_level")]
    pub max_level: u32,
}

impl GlobalConfig {
    #[must_use]
    pub const fn default_max_level() -> u32 {
        DEFAULT_MAX_LEVEL
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_level < 1 {
            return Err(ConfigError::MinViolation {
                field: "global.max_level",
                min: 1.0,
                value: f64::from(self.max_level),
            });
        }
        if self.max_level > MAX_LEVEL_LIMIT {
            return Err(ConfigError::MaxViolation {
                field: "global.max_level",
                max: f64::from(MAX_LEVEL_LIMIT),
                value: f64::from(self.max_level),
            });
        }
        Ok(())
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            max_level: Self::default_max_level(),
        }
    }
}

/// Synthetic levels to add below level 1 and above the top base level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StretchConfig {
    #[serde(default)]
    pub lower: u32,
    #[serde(default)]
    pub upper: u32,
}

impl StretchConfig {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lower == 0 && self.upper == 0
    }
}

/// Fully-resolved per-activity settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityConfig {
    pub weight_modifier: f64,
    pub age_modifier: f64,
    pub difficulty_modifier: f64,
    pub peak_age: f64,
    pub enable_generation: bool,
    /// Divide instead of multiply by the age falloff for decreasing datasets.
    pub invert_age_falloff: bool,
    pub stretch: StretchConfig,
}

impl ActivityConfig {
    #[must_use]
    pub const fn default_for(activity: Activity) -> Self {
        let (weight_modifier, difficulty_modifier) = match activity {
            Activity::BroadJump => (BROAD_JUMP_WEIGHT_MODIFIER, BROAD_JUMP_DIFFICULTY_MODIFIER),
            _ => (DEFAULT_WEIGHT_MODIFIER, DEFAULT_DIFFICULTY_MODIFIER),
        };
        Self {
            weight_modifier,
            age_modifier: DEFAULT_AGE_MODIFIER,
            difficulty_modifier,
            peak_age: DEFAULT_PEAK_AGE,
            enable_generation: true,
            invert_age_falloff: false,
            stretch: StretchConfig { lower: 0, upper: 0 },
        }
    }

    fn with_overlay(&self, overlay: &ActivityOverlay) -> Self {
        Self {
            weight_modifier: overlay.weight_modifier.unwrap_or(self.weight_modifier),
            age_modifier: overlay.age_modifier.unwrap_or(self.age_modifier),
            difficulty_modifier: overlay
                .difficulty_modifier
                .unwrap_or(self.difficulty_modifier),
            peak_age: overlay.peak_age.unwrap_or(self.peak_age),
            enable_generation: overlay.enable_generation.unwrap_or(self.enable_generation),
            invert_age_falloff: overlay
                .invert_age_falloff
                .unwrap_or(self.invert_age_falloff),
            stretch: overlay.stretch.unwrap_or(self.stretch),
        }
    }

    fn validate(&self, activity: Activity) -> Result<(), ConfigError> {
        let modifiers = [
            ("weight_modifier", self.weight_modifier),
            ("age_modifier", self.age_modifier),
            ("difficulty_modifier", self.difficulty_modifier),
            ("peak_age", self.peak_age),
        ];
        for (field, value) in modifiers {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite {
                    activity,
                    field,
                    value,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.age_modifier) {
            return Err(ConfigError::RangeViolation {
                activity,
                field: "age_modifier",
                min: 0.0,
                max: 1.0,
                value: self.age_modifier,
            });
        }
        if self.peak_age <= AGE_MIN || self.peak_age >= AGE_MAX {
            return Err(ConfigError::RangeViolation {
                activity,
                field: "peak_age",
                min: AGE_MIN,
                max: AGE_MAX,
                value: self.peak_age,
            });
        }
        if self.difficulty_modifier <= -1.0 {
            return Err(ConfigError::RangeViolation {
                activity,
                field: "difficulty_modifier",
                min: -1.0,
                max: f64::INFINITY,
                value: self.difficulty_modifier,
            });
        }
        Ok(())
    }
}

/// Optional per-activity overrides layered over the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityOverlay {
    #[serde(default)]
    pub weight_modifier: Option<f64>,
    #[serde(default)]
    pub age_modifier: Option<f64>,
    #[serde(default)]
    pub difficulty_modifier: Option<f64>,
    #[serde(default)]
    pub peak_age: Option<f64>,
    #[serde(default)]
    pub enable_generation: Option<bool>,
    #[serde(default)]
    pub invert_age_falloff: Option<bool>,
    #[serde(default)]
    pub stretch: Option<StretchConfig>,
}

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be at most {max} (got {value})")]
    MaxViolation {
        field: &'static str,
        max: f64,
        value: f64,
    },
    #[error("{activity}.{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        activity: Activity,
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{activity}.{field} must be finite (got {value})")]
    NonFinite {
        activity: Activity,
        field: &'static str,
        value: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_activity_table() {
        let config = StandardsConfig::default();
        assert_eq!(config.max_level(), 100);
        let bench = config.activity_config(Activity::BenchPress);
        assert!((bench.weight_modifier - 0.1).abs() < f64::EPSILON);
        assert!(bench.difficulty_modifier.abs() < f64::EPSILON);
        let jump = config.activity_config(Activity::BroadJump);
        assert!((jump.weight_modifier + 0.1).abs() < f64::EPSILON);
        assert!((jump.difficulty_modifier - 0.05).abs() < f64::EPSILON);
        assert!(jump.enable_generation);
        assert!(jump.stretch.is_empty());
        assert!(!config.activity_config(Activity::Run).invert_age_falloff);
        assert!((jump.peak_age - 27.0).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overlay_replaces_only_named_fields() {
        let config = StandardsConfig::from_json(
            r#"{
                "global": {"max_level": 50},
                "activity": {
                    "Run": {"peak_age": 30, "stretch": {"upper": 2}},
                    "BroadJump": {"enable_generation": false},
                    "ConeDrill": {"invert_age_falloff": true}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_level(), 50);
        let run = config.activity_config(Activity::Run);
        assert!((run.peak_age - 30.0).abs() < f64::EPSILON);
        assert_eq!(run.stretch, StretchConfig { lower: 0, upper: 2 });
        assert!((run.age_modifier - 0.5).abs() < f64::EPSILON);
        let jump = config.activity_config(Activity::BroadJump);
        assert!(!jump.enable_generation);
        assert!(config.activity_config(Activity::ConeDrill).invert_age_falloff);
        assert!(!run.invert_age_falloff);
        assert!((jump.weight_modifier + 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_out_of_bounds_fields() {
        let mut config = StandardsConfig::default();
        config.global.max_level = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MinViolation {
                field: "global.max_level",
                ..
            })
        ));

        let mut config = StandardsConfig::default();
        config.global.max_level = MAX_LEVEL_LIMIT;
        assert!(config.validate().is_ok());
        config.global.max_level = 4_000_000_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MaxViolation {
                field: "global.max_level",
                ..
            })
        ));

        let mut config = StandardsConfig::default();
        config.activity.insert(
            Activity::Deadlift,
            ActivityOverlay {
                peak_age: Some(100.0),
                ..ActivityOverlay::default()
            },
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RangeViolation {
                field: "peak_age",
                ..
            })
        ));

        let mut config = StandardsConfig::default();
        config.activity.insert(
            Activity::Run,
            ActivityOverlay {
                weight_modifier: Some(f64::NAN),
                ..ActivityOverlay::default()
            },
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFinite {
                activity: Activity::Run,
                ..
            })
        ));
    }

    #[test]
    fn negative_stretch_counts_fail_to_parse() {
        let parsed =
            StandardsConfig::from_json(r#"{"activity": {"Run": {"stretch": {"lower": -1}}}}"#);
        assert!(parsed.is_err());
    }
}
