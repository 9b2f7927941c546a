//! Parsing of command line performance tokens and body weights.
//!
//! Tokens look like `BenchPress=225lb`, `Run=7:15`, `BroadJump=10ft11in` or
//! `ConeDrill=9000`. A bare number is taken in the activity's native unit.
use std::sync::OnceLock;

use brawn_levels::units::{feet_to_cm, inches_to_cm, lb_to_kg, parse_time, seconds_to_ms};
use brawn_levels::{Activity, ActivityPerformance, ParseNameError, Unit, UnitError};
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("malformed performance '{0}', expected Activity=VALUE[unit]")]
    MalformedToken(String),
    #[error("unrecognised quantity '{0}'")]
    MalformedQuantity(String),
    #[error(transparent)]
    Name(#[from] ParseNameError),
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error("{activity} is measured in {expected}, got a value in {actual}")]
    UnitMismatch {
        activity: Activity,
        expected: Unit,
        actual: Unit,
    },
    #[error("no standards loaded for {0}")]
    NotLoaded(Activity),
    #[error("body weight must be positive, got '{0}'")]
    BodyWeight(String),
    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

/// A parsed value already converted to its base unit.
///
/// `unit` is `None` for a bare number, which takes whatever unit the
/// activity is measured in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Option<Unit>,
}

impl Quantity {
    /// Value in `native`, the unit the activity is measured in.
    ///
    /// # Errors
    ///
    /// Returns `UnitMismatch` when the quantity has a different dimension.
    pub fn resolve(self, activity: Activity, native: Unit) -> Result<f64, InputError> {
        match self.unit {
            Some(actual) if actual != native => Err(InputError::UnitMismatch {
                activity,
                expected: native,
                actual,
            }),
            _ => Ok(self.value),
        }
    }
}

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> Result<&'static Regex, regex::Error> {
    if let Some(regex) = cell.get() {
        return Ok(regex);
    }
    let regex = Regex::new(pattern)?;
    Ok(cell.get_or_init(|| regex))
}

fn token_pattern() -> Result<&'static Regex, regex::Error> {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    cached(&TOKEN, r"^\s*(?P<activity>[A-Za-z][A-Za-z_\- ]*?)\s*=\s*(?P<value>\S.*?)\s*$")
}

fn time_pattern() -> Result<&'static Regex, regex::Error> {
    static TIME: OnceLock<Regex> = OnceLock::new();
    cached(&TIME, r"^\d+(?::\d{1,2}){1,2}(?:\.\d+)?$")
}

fn feet_pattern() -> Result<&'static Regex, regex::Error> {
    static FEET: OnceLock<Regex> = OnceLock::new();
    cached(
        &FEET,
        r"(?i)^(?P<ft>\d+(?:\.\d+)?)\s*(?:ft|')\s*(?:(?P<in>\d+(?:\.\d+)?)\s*(?:in|\x22)?)?$",
    )
}

fn number_pattern() -> Result<&'static Regex, regex::Error> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    cached(
        &NUMBER,
        r"(?i)^(?P<num>\d+(?:\.\d+)?|\.\d+)\s*(?P<unit>kgs?|lbs?|cm|in|ms|s)?$",
    )
}

fn number(raw: &str) -> Result<f64, InputError> {
    raw.parse::<f64>()
        .map_err(|_| InputError::MalformedQuantity(raw.to_string()))
}

/// Parse a value with an optional unit suffix.
///
/// # Errors
///
/// Returns `MalformedQuantity` for anything that is not a time, a
/// feet/inches length or a number with a known suffix.
pub fn parse_quantity(raw: &str) -> Result<Quantity, InputError> {
    let raw = raw.trim();
    if time_pattern()?.is_match(raw) {
        return Ok(Quantity {
            value: parse_time(raw)?,
            unit: Some(Unit::Ms),
        });
    }
    if let Some(caps) = feet_pattern()?.captures(raw) {
        let feet = number(&caps["ft"])?;
        let inches = caps.name("in").map_or(Ok(0.0), |m| number(m.as_str()))?;
        return Ok(Quantity {
            value: feet_to_cm(feet) + inches_to_cm(inches),
            unit: Some(Unit::Cm),
        });
    }
    let caps = number_pattern()?
        .captures(raw)
        .ok_or_else(|| InputError::MalformedQuantity(raw.to_string()))?;
    let value = number(&caps["num"])?;
    let suffix = caps.name("unit").map(|m| m.as_str().to_ascii_lowercase());
    let quantity = match suffix.as_deref() {
        None => Quantity { value, unit: None },
        Some("kg" | "kgs") => Quantity {
            value,
            unit: Some(Unit::Kg),
        },
        Some("lb" | "lbs") => Quantity {
            value: lb_to_kg(value),
            unit: Some(Unit::Kg),
        },
        Some("cm") => Quantity {
            value,
            unit: Some(Unit::Cm),
        },
        Some("in") => Quantity {
            value: inches_to_cm(value),
            unit: Some(Unit::Cm),
        },
        Some("ms") => Quantity {
            value,
            unit: Some(Unit::Ms),
        },
        Some("s") => Quantity {
            value: seconds_to_ms(value),
            unit: Some(Unit::Ms),
        },
        Some(_) => return Err(InputError::MalformedQuantity(raw.to_string())),
    };
    Ok(quantity)
}

/// Split an `Activity=VALUE` token.
///
/// # Errors
///
/// Returns `MalformedToken`, an unknown activity name or a bad quantity.
pub fn parse_token(token: &str) -> Result<(Activity, Quantity), InputError> {
    let caps = token_pattern()?
        .captures(token)
        .ok_or_else(|| InputError::MalformedToken(token.to_string()))?;
    let activity: Activity = caps["activity"].parse()?;
    let quantity = parse_quantity(&caps["value"])?;
    Ok((activity, quantity))
}

/// Parse a token into a performance in the activity's native unit.
///
/// `unit_of` reports the unit each activity is stored in, or `None` when the
/// activity has no standards.
///
/// # Errors
///
/// Returns any token error, `NotLoaded`, or `UnitMismatch` when the value's
/// dimension does not match the activity.
pub fn parse_performance<F>(token: &str, unit_of: F) -> Result<ActivityPerformance, InputError>
where
    F: FnOnce(Activity) -> Option<Unit>,
{
    let (activity, quantity) = parse_token(token)?;
    let native = unit_of(activity).ok_or(InputError::NotLoaded(activity))?;
    let performance = quantity.resolve(activity, native)?;
    Ok(ActivityPerformance::new(activity, performance))
}

/// Parse a body weight such as `190lb`, `86.2kg` or `86.2` into kilograms.
///
/// # Errors
///
/// Returns `BodyWeight` for a zero weight or a non-weight unit.
pub fn parse_body_weight(raw: &str) -> Result<f64, InputError> {
    let quantity = parse_quantity(raw)?;
    match quantity.unit {
        None | Some(Unit::Kg) if quantity.value > 0.0 => Ok(quantity.value),
        _ => Err(InputError::BodyWeight(raw.to_string())),
    }
}
