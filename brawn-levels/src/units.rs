//! Unit conversion, parsing and display helpers.
//!
//! Standards are stored in kilograms, milliseconds and centimetres. These
//! helpers move user-facing values in and out of that representation.
use thiserror::Error;

use crate::constants::{
    CM_PER_FOOT, CM_PER_INCH, KG_PER_LB, LB_PER_KG, MS_PER_MINUTE, MS_PER_SECOND,
};
use crate::model::Unit;
use crate::numbers::floor_to_usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("malformed time '{0}', expected m:ss or m:ss.mmm")]
    MalformedTime(String),
    #[error("malformed number '{0}'")]
    MalformedNumber(String),
}

#[must_use]
pub fn lb_to_kg(lb: f64) -> f64 {
    lb * KG_PER_LB
}

#[must_use]
pub fn kg_to_lb(kg: f64) -> f64 {
    kg * LB_PER_KG
}

#[must_use]
pub fn minutes_to_ms(minutes: f64) -> f64 {
    minutes * MS_PER_MINUTE
}

#[must_use]
pub fn seconds_to_ms(seconds: f64) -> f64 {
    seconds * MS_PER_SECOND
}

#[must_use]
pub fn ms_to_minutes(ms: f64) -> f64 {
    ms / MS_PER_MINUTE
}

#[must_use]
pub fn feet_to_cm(feet: f64) -> f64 {
    feet * CM_PER_FOOT
}

#[must_use]
pub fn inches_to_cm(inches: f64) -> f64 {
    inches * CM_PER_INCH
}

#[must_use]
pub fn cm_to_inches(cm: f64) -> f64 {
    cm / CM_PER_INCH
}

/// Snap a kilogram weight to the nearest whole pound.
#[must_use]
pub fn snap_to_whole_lb(kg: f64) -> f64 {
    lb_to_kg(kg_to_lb(kg).round())
}

fn parse_number(raw: &str) -> Result<f64, UnitError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .ok_or_else(|| UnitError::MalformedNumber(raw.to_string()))
}

/// Parse `m:ss`, `m:ss.mmm` or `h:mm:ss` into milliseconds.
///
/// # Errors
///
/// Returns `MalformedTime` when the string has the wrong shape or seconds
/// and minutes overflow their field.
pub fn parse_time(raw: &str) -> Result<f64, UnitError> {
    let malformed = || UnitError::MalformedTime(raw.to_string());
    let parts: Vec<&str> = raw.trim().split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => ("0", *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(malformed()),
    };
    let hours = parse_number(hours).map_err(|_| malformed())?;
    let minutes = parse_number(minutes).map_err(|_| malformed())?;
    let seconds = parse_number(seconds).map_err(|_| malformed())?;
    if seconds >= 60.0 || (parts.len() == 3 && minutes >= 60.0) {
        return Err(malformed());
    }
    Ok(minutes_to_ms(hours.mul_add(60.0, minutes)) + seconds_to_ms(seconds))
}

/// Format milliseconds as `m:ss`, optionally with a `.mmm` suffix.
#[must_use]
pub fn format_time(ms: f64, include_ms: bool) -> String {
    let ms = ms.max(0.0);
    let minutes = floor_to_usize(ms / MS_PER_MINUTE);
    let seconds = floor_to_usize((ms % MS_PER_MINUTE) / MS_PER_SECOND);
    let millis = floor_to_usize(ms % MS_PER_SECOND);
    if include_ms {
        format!("{minutes}:{seconds:02}.{millis:03}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Format centimetres as whole feet and rounded inches, e.g. `10ft 11in`.
#[must_use]
pub fn format_feet_inches(cm: f64) -> String {
    let total_inches = cm_to_inches(cm.max(0.0)).round();
    let feet = floor_to_usize(total_inches / 12.0);
    let inches = floor_to_usize(total_inches % 12.0);
    format!("{feet}ft {inches}in")
}

/// Human-readable rendering of a value stored in `unit`.
#[must_use]
pub fn format_performance(value: f64, unit: Unit) -> String {
    match unit {
        Unit::Kg => format!("{value:.1} kg ({:.0} lb)", kg_to_lb(value)),
        Unit::Ms => format_time(value, false),
        Unit::Cm => format!("{value:.1} cm ({})", format_feet_inches(value)),
    }
}
