//! Data model shared by every stage of the engine.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::LevelsError;

/// Athlete gender as used by the reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Self; 2] = [Self::Male, Self::Female];
}

/// Higher-level athletic category aggregating activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Strength,
    Power,
    Endurance,
    Agility,
}

impl Attribute {
    /// Declaration order doubles as aggregation order.
    pub const ALL: [Self; 4] = [Self::Strength, Self::Power, Self::Endurance, Self::Agility];
}

/// A measurable exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Activity {
    BackSquat,
    Deadlift,
    BenchPress,
    Run,
    BroadJump,
    ConeDrill,
}

impl Activity {
    pub const ALL: [Self; 6] = [
        Self::BackSquat,
        Self::Deadlift,
        Self::BenchPress,
        Self::Run,
        Self::BroadJump,
        Self::ConeDrill,
    ];
}

/// Native unit of an activity's performance values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Ms,
    Cm,
    Kg,
}

/// Numeric axis of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Age,
    Weight,
}

macro_rules! display_as_debug {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{self:?}")
            }
        })*
    };
}

display_as_debug!(Gender, Attribute, Activity);

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ms => write!(f, "ms"),
            Self::Cm => write!(f, "cm"),
            Self::Kg => write!(f, "kg"),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Age => write!(f, "age"),
            Self::Weight => write!(f, "weight"),
        }
    }
}

/// Failure to parse an enum from its name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseNameError {
    pub kind: &'static str,
    pub value: String,
}

fn parse_by_name<T: Copy + fmt::Display>(
    kind: &'static str,
    candidates: &[T],
    value: &str,
) -> Result<T, ParseNameError> {
    let wanted: String = value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    candidates
        .iter()
        .copied()
        .find(|c| c.to_string().to_ascii_lowercase() == wanted)
        .ok_or_else(|| ParseNameError {
            kind,
            value: value.to_string(),
        })
}

impl FromStr for Gender {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" => Ok(Self::Male),
            "f" => Ok(Self::Female),
            _ => parse_by_name("gender", &Self::ALL, s),
        }
    }
}

impl FromStr for Attribute {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_by_name("attribute", &Self::ALL, s)
    }
}

impl FromStr for Activity {
    type Err = ParseNameError;

    /// Accepts `BenchPress`, `bench-press`, `bench_press` and similar spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_by_name("activity", &Self::ALL, s)
    }
}

/// A single athlete's physical profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub age: f64,
    pub weight: f64,
    pub gender: Gender,
}

impl Metrics {
    #[must_use]
    pub const fn new(age: f64, weight: f64, gender: Gender) -> Self {
        Self {
            age,
            weight,
            gender,
        }
    }

    #[must_use]
    pub const fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Age => self.age,
            Metric::Weight => self.weight,
        }
    }
}

/// Ordered level number → performance value mapping.
///
/// Keys are numeric so iteration order is always ascending level order,
/// regardless of how the source document ordered them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Levels(BTreeMap<u32, f64>);

impl Levels {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Number the given values contiguously from level 1.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        Self((1..).zip(values).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, level: u32) -> Option<f64> {
        self.0.get(&level).copied()
    }

    pub fn insert(&mut self, level: u32, value: f64) {
        self.0.insert(level, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.0.iter().map(|(level, value)| (*level, *value))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.values().copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }

    /// Whether the dataset rewards higher values, inferred from levels 1 and 2.
    #[must_use]
    pub fn is_increasing(&self) -> bool {
        matches!((self.get(1), self.get(2)), (Some(first), Some(second)) if second > first)
    }

    #[must_use]
    pub fn same_keys(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.keys().eq(other.0.keys())
    }

    /// Multiply every value by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self(self.0.iter().map(|(k, v)| (*k, v * factor)).collect())
    }

    #[must_use]
    pub fn min_value(&self) -> Option<f64> {
        self.values().reduce(f64::min)
    }

    #[must_use]
    pub fn max_value(&self) -> Option<f64> {
        self.values().reduce(f64::max)
    }
}

impl FromIterator<(u32, f64)> for Levels {
    fn from_iter<I: IntoIterator<Item = (u32, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One labeled point of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standard {
    pub metrics: Metrics,
    pub levels: Levels,
}

/// Axis along which synthetic standards are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorSpec {
    pub metric: Metric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityMetadata {
    pub attribute: Attribute,
    #[serde(default)]
    pub generators: Vec<GeneratorSpec>,
    pub unit: Unit,
    pub name: String,
}

impl ActivityMetadata {
    #[must_use]
    pub fn generates(&self, metric: Metric) -> bool {
        self.generators.iter().any(|g| g.metric == metric)
    }
}

/// Metadata plus every standard of one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityStandards {
    pub metadata: ActivityMetadata,
    #[serde(default)]
    pub standards: Vec<Standard>,
}

/// The raw standards document, keyed by activity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StandardsDocument(pub BTreeMap<Activity, ActivityStandards>);

impl StandardsDocument {
    /// Parse a standards document from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the document shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn get(&self, activity: Activity) -> Option<&ActivityStandards> {
        self.0.get(&activity)
    }

    pub fn activities(&self) -> impl Iterator<Item = Activity> + '_ {
        self.0.keys().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvgWeightsMetadata {
    pub unit: Unit,
}

/// Average body weight by gender and age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvgWeights {
    pub metadata: AvgWeightsMetadata,
    pub weights: Vec<Metrics>,
}

impl AvgWeights {
    /// Parse an average weight table from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the table shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Weight of the entry with the closest age; the first entry wins ties.
    ///
    /// # Errors
    ///
    /// Returns `MissingReferenceData` when the table has no entry for `gender`.
    pub fn weight_for(&self, gender: Gender, age: f64) -> Result<f64, LevelsError> {
        let mut closest: Option<(f64, f64)> = None;
        for entry in self.weights.iter().filter(|w| w.gender == gender) {
            let diff = (entry.age - age).abs();
            if closest.is_none_or(|(best, _)| diff < best) {
                closest = Some((diff, entry.weight));
            }
        }
        closest
            .map(|(_, weight)| weight)
            .ok_or(LevelsError::MissingReferenceData { gender })
    }
}

/// The query subject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub metrics: Metrics,
}

/// One measured result in the activity's native unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityPerformance {
    pub activity: Activity,
    pub performance: f64,
}

impl ActivityPerformance {
    #[must_use]
    pub const fn new(activity: Activity, performance: f64) -> Self {
        Self {
            activity,
            performance,
        }
    }
}

/// Per-attribute levels, 0 meaning "not computable".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeLevels {
    pub strength: u32,
    pub power: u32,
    pub endurance: u32,
    pub agility: u32,
}

impl AttributeLevels {
    #[must_use]
    pub const fn get(&self, attribute: Attribute) -> u32 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Power => self.power,
            Attribute::Endurance => self.endurance,
            Attribute::Agility => self.agility,
        }
    }

    pub const fn set(&mut self, attribute: Attribute, level: u32) {
        match attribute {
            Attribute::Strength => self.strength = level,
            Attribute::Power => self.power = level,
            Attribute::Endurance => self.endurance = level,
            Attribute::Agility => self.agility = level,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, u32)> + '_ {
        Attribute::ALL.into_iter().map(|a| (a, self.get(a)))
    }
}

/// Final calculator output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelOutput {
    pub player: u32,
    pub attributes: AttributeLevels,
}

/// Body of a level calculation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalcRequest {
    pub player: Player,
    #[serde(default)]
    pub activity_performances: Vec<ActivityPerformance>,
}

impl CalcRequest {
    /// Parse a request body from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the request shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_numeric_keys_in_order() {
        let levels: Levels = serde_json::from_str(r#"{"10": 3.0, "2": 2.0, "1": 1.0}"#).unwrap();
        let keys: Vec<u32> = levels.keys().collect();
        assert_eq!(keys, vec![1, 2, 10]);
        assert!(levels.is_increasing());
        let json = serde_json::to_string(&levels).unwrap();
        assert_eq!(json, r#"{"1":1.0,"2":2.0,"10":3.0}"#);
    }

    #[test]
    fn levels_direction_follows_first_pair() {
        let decreasing = Levels::from_values([600.0, 500.0, 450.0]);
        assert!(!decreasing.is_increasing());
        assert!(!Levels::from_values([1.0]).is_increasing());
    }

    #[test]
    fn enums_parse_loose_names() {
        assert_eq!("bench-press".parse::<Activity>(), Ok(Activity::BenchPress));
        assert_eq!("ConeDrill".parse::<Activity>(), Ok(Activity::ConeDrill));
        assert_eq!("F".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!("male".parse::<Gender>(), Ok(Gender::Male));
        assert_eq!("agility".parse::<Attribute>(), Ok(Attribute::Agility));
        let err = "curl".parse::<Activity>().unwrap_err();
        assert_eq!(err.to_string(), "unknown activity: curl");
    }

    #[test]
    fn avg_weight_picks_nearest_age_first_on_ties() {
        let table = AvgWeights::from_json(
            r#"{
                "metadata": {"unit": "kg"},
                "weights": [
                    {"age": 20, "weight": 70, "gender": "Male"},
                    {"age": 30, "weight": 80, "gender": "Male"},
                    {"age": 20, "weight": 60, "gender": "Female"}
                ]
            }"#,
        )
        .unwrap();
        assert!((table.weight_for(Gender::Male, 24.0).unwrap() - 70.0).abs() < f64::EPSILON);
        assert!((table.weight_for(Gender::Male, 25.0).unwrap() - 70.0).abs() < f64::EPSILON);
        assert!((table.weight_for(Gender::Male, 90.0).unwrap() - 80.0).abs() < f64::EPSILON);
        assert!((table.weight_for(Gender::Female, 5.0).unwrap() - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn avg_weight_fails_fast_without_gender_entries() {
        let table = AvgWeights {
            metadata: AvgWeightsMetadata { unit: Unit::Kg },
            weights: vec![Metrics::new(25.0, 80.0, Gender::Male)],
        };
        assert!(matches!(
            table.weight_for(Gender::Female, 25.0),
            Err(LevelsError::MissingReferenceData {
                gender: Gender::Female
            })
        ));
    }

    #[test]
    fn calc_request_uses_camel_case_body() {
        let request = CalcRequest::from_json(
            r#"{
                "player": {"metrics": {"age": 25, "weight": 86.18, "gender": "Male"}},
                "activityPerformances": [{"activity": "Run", "performance": 435000}]
            }"#,
        )
        .unwrap();
        assert_eq!(request.activity_performances.len(), 1);
        assert_eq!(request.activity_performances[0].activity, Activity::Run);
        assert_eq!(request.player.metrics.gender, Gender::Male);
    }

    #[test]
    fn level_output_serializes_attribute_names() {
        let mut attributes = AttributeLevels::default();
        attributes.set(Attribute::Endurance, 42);
        let output = LevelOutput {
            player: 10,
            attributes,
        };
        let json = serde_json::to_value(output).unwrap();
        assert_eq!(json["attributes"]["Endurance"], 42);
        assert_eq!(json["attributes"]["Strength"], 0);
        assert_eq!(json["player"], 10);
    }
}
