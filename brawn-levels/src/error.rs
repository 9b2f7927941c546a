//! Error taxonomy for the level engine.
use thiserror::Error;

use crate::config::ConfigError;
use crate::model::{Activity, Attribute, Gender};

/// Errors raised while building or querying standards.
///
/// Data-integrity variants (`MismatchedLevelCount`, `NoStandardsAvailable`,
/// `MissingReferenceData`, `IncompleteLevels`) point at malformed input data
/// and abort the current construction or request. `WrongAttribute` is a
/// caller fault. Missing or non-positive inputs never surface here; they
/// score as level 0 instead.
#[derive(Debug, Error)]
pub enum LevelsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cannot interpolate between {lower} and {upper} levels")]
    MismatchedLevelCount { lower: usize, upper: usize },
    #[error("no standards available for {activity}")]
    NoStandardsAvailable { activity: Activity },
    #[error("no average weight reference for {gender}")]
    MissingReferenceData { gender: Gender },
    #[error("{activity} belongs to {actual}, not {expected}")]
    WrongAttribute {
        activity: Activity,
        expected: Attribute,
        actual: Attribute,
    },
    #[error("{0} is not part of the loaded standards")]
    UnknownActivity(Activity),
    #[error("{activity} standard ({gender}, age {age}, weight {weight}) is missing level {level}")]
    IncompleteLevels {
        activity: Activity,
        gender: Gender,
        age: f64,
        weight: f64,
        level: u32,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to parse standards data: {0}")]
    Parse(#[from] serde_json::Error),
}
