//! Query engine over the prepared standards grid.
//!
//! [`Standards`] owns the normalized and generated grid. Reads go through
//! [`StandardsQuery`], a `Copy` value that narrows by gender, age and weight
//! without touching the grid.
use log::debug;

use crate::config::StandardsConfig;
use crate::error::LevelsError;
use crate::generator::prepare_activity;
use crate::model::{
    Activity, ActivityMetadata, Attribute, AvgWeights, Gender, Levels, Metric, Metrics, Standard,
    StandardsDocument,
};
use crate::units::snap_to_whole_lb;

/// Prepared, read-only standards for every loaded activity.
#[derive(Debug, Clone)]
pub struct Standards {
    grid: StandardsDocument,
    config: StandardsConfig,
}

impl Standards {
    /// Build the grid from a raw document.
    ///
    /// `raw` is copied; the caller's value is left untouched. Every activity
    /// is stretched, resampled to `max_level` levels, skewed by its
    /// difficulty modifier and, when enabled, widened along its generator
    /// axes.
    ///
    /// # Errors
    ///
    /// Returns `Config` for invalid settings and the data-integrity variants
    /// of [`LevelsError`] for malformed standards.
    pub fn new(
        raw: &StandardsDocument,
        avg_weights: &AvgWeights,
        config: StandardsConfig,
    ) -> Result<Self, LevelsError> {
        config.validate()?;
        let mut grid = raw.clone();
        for (activity, standards) in &mut grid.0 {
            let activity_config = config.activity_config(*activity);
            prepare_activity(
                *activity,
                standards,
                avg_weights,
                &activity_config,
                config.max_level(),
            )?;
            debug!(
                "{activity}: {} standards after preparation",
                standards.standards.len()
            );
        }
        Ok(Self { grid, config })
    }

    #[must_use]
    pub const fn config(&self) -> &StandardsConfig {
        &self.config
    }

    /// The prepared grid.
    #[must_use]
    pub const fn grid(&self) -> &StandardsDocument {
        &self.grid
    }

    pub fn activities(&self) -> impl Iterator<Item = Activity> + '_ {
        self.grid.activities()
    }

    /// Start a query over one activity.
    ///
    /// # Errors
    ///
    /// Returns `UnknownActivity` when the activity was not loaded.
    pub fn query(&self, activity: Activity) -> Result<StandardsQuery<'_>, LevelsError> {
        self.grid
            .get(activity)
            .map(|entry| StandardsQuery::over(activity, &entry.standards))
            .ok_or(LevelsError::UnknownActivity(activity))
    }

    /// # Errors
    ///
    /// Returns `UnknownActivity` when the activity was not loaded.
    pub fn metadata(&self, activity: Activity) -> Result<&ActivityMetadata, LevelsError> {
        self.grid
            .get(activity)
            .map(|entry| &entry.metadata)
            .ok_or(LevelsError::UnknownActivity(activity))
    }

    /// Loaded activities that feed `attribute`, in document order.
    #[must_use]
    pub fn attribute_activities(&self, attribute: Attribute) -> Vec<Activity> {
        self.grid
            .0
            .iter()
            .filter(|(_, entry)| entry.metadata.attribute == attribute)
            .map(|(activity, _)| *activity)
            .collect()
    }

    /// Distinct ages sampled for `gender`, in grid order.
    ///
    /// # Errors
    ///
    /// Returns `UnknownActivity` when the activity was not loaded.
    pub fn ages_for(&self, activity: Activity, gender: Gender) -> Result<Vec<f64>, LevelsError> {
        Ok(self.query(activity)?.by_gender(gender).ages())
    }

    /// Weights sampled at the age closest to `age`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownActivity` or `NoStandardsAvailable`.
    pub fn weights_for(
        &self,
        activity: Activity,
        gender: Gender,
        age: f64,
    ) -> Result<Vec<f64>, LevelsError> {
        self.query(activity)?
            .by_gender(gender)
            .by_age(age)
            .weights_at_closest_age()
    }

    /// One interpolated standard per weight sampled at the closest age.
    ///
    /// # Errors
    ///
    /// Propagates query and interpolation errors.
    pub fn interpolated_table(
        &self,
        activity: Activity,
        gender: Gender,
        age: f64,
        normalize_lb: bool,
    ) -> Result<Vec<Standard>, LevelsError> {
        self.query(activity)?
            .by_gender(gender)
            .by_age(age)
            .interpolated_all(normalize_lb)
    }
}

/// Immutable, narrowed view over one activity's standards.
#[derive(Debug, Clone, Copy)]
pub struct StandardsQuery<'a> {
    activity: Activity,
    standards: &'a [Standard],
    gender: Option<Gender>,
    age: Option<f64>,
    weight: Option<f64>,
}

impl<'a> StandardsQuery<'a> {
    /// Query an arbitrary slice of standards belonging to `activity`.
    #[must_use]
    pub const fn over(activity: Activity, standards: &'a [Standard]) -> Self {
        Self {
            activity,
            standards,
            gender: None,
            age: None,
            weight: None,
        }
    }

    #[must_use]
    pub const fn activity(&self) -> Activity {
        self.activity
    }

    #[must_use]
    pub const fn by_gender(self, gender: Gender) -> Self {
        Self {
            gender: Some(gender),
            ..self
        }
    }

    #[must_use]
    pub const fn by_age(self, age: f64) -> Self {
        Self {
            age: Some(age),
            ..self
        }
    }

    #[must_use]
    pub const fn by_weight(self, weight: f64) -> Self {
        Self {
            weight: Some(weight),
            ..self
        }
    }

    #[must_use]
    pub const fn by_metrics(self, metrics: Metrics) -> Self {
        Self {
            gender: Some(metrics.gender),
            age: Some(metrics.age),
            weight: Some(metrics.weight),
            ..self
        }
    }

    #[allow(clippy::float_cmp)]
    fn matches(&self, standard: &Standard) -> bool {
        let metrics = &standard.metrics;
        self.gender.is_none_or(|g| metrics.gender == g)
            && self.age.is_none_or(|a| metrics.age == a)
            && self.weight.is_none_or(|w| metrics.weight == w)
    }

    fn iter(&self) -> impl Iterator<Item = &'a Standard> + '_ {
        self.standards.iter().filter(|s| self.matches(s))
    }

    /// Every standard matching the filters exactly, in grid order.
    #[must_use]
    pub fn all(&self) -> Vec<&'a Standard> {
        self.iter().collect()
    }

    /// First exact match.
    #[must_use]
    pub fn one(&self) -> Option<&'a Standard> {
        self.iter().next()
    }

    /// Closest standards at or below and at or above `target` on `metric`.
    ///
    /// A missing side falls back to the first (lower) or last (upper)
    /// matching standard. Ties go to the last standard seen on the lower side
    /// and to the first one seen on the upper side.
    ///
    /// # Errors
    ///
    /// Returns `NoStandardsAvailable` when nothing matches the filters.
    pub fn nearest(
        &self,
        metric: Metric,
        target: f64,
    ) -> Result<(&'a Standard, &'a Standard), LevelsError> {
        let mut lower: Option<&'a Standard> = None;
        let mut upper: Option<&'a Standard> = None;
        let mut first: Option<&'a Standard> = None;
        let mut last: Option<&'a Standard> = None;
        for standard in self.iter() {
            first.get_or_insert(standard);
            last = Some(standard);
            let value = standard.metrics.value(metric);
            if value <= target && lower.is_none_or(|l| value >= l.metrics.value(metric)) {
                lower = Some(standard);
            }
            if value >= target && upper.is_none_or(|u| value < u.metrics.value(metric)) {
                upper = Some(standard);
            }
        }
        let (Some(first), Some(last)) = (first, last) else {
            return Err(LevelsError::NoStandardsAvailable {
                activity: self.activity,
            });
        };
        Ok((lower.unwrap_or(first), upper.unwrap_or(last)))
    }

    /// Distinct ages among the matches, in first-seen order.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn ages(&self) -> Vec<f64> {
        let mut ages: Vec<f64> = Vec::new();
        for standard in self.iter() {
            if !ages.contains(&standard.metrics.age) {
                ages.push(standard.metrics.age);
            }
        }
        ages
    }

    /// Weights sampled at the age closest to the query age.
    ///
    /// Uses the gender and age filters; ties between the two neighbouring
    /// ages go to the upper one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` without an age filter and
    /// `NoStandardsAvailable` when nothing matches.
    pub fn weights_at_closest_age(&self) -> Result<Vec<f64>, LevelsError> {
        let closest = self.closest_age()?;
        Ok(self
            .by_age(closest)
            .iter()
            .map(|s| s.metrics.weight)
            .collect())
    }

    /// Sampled age closest to the query age, ignoring any weight filter.
    ///
    /// Ties between the two neighbouring ages go to the upper one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` without an age filter and
    /// `NoStandardsAvailable` when nothing matches.
    pub fn closest_age(&self) -> Result<f64, LevelsError> {
        let age = self.require_age()?;
        let across_ages = Self {
            age: None,
            weight: None,
            ..*self
        };
        let (lower, upper) = across_ages.nearest(Metric::Age, age)?;
        let lower_diff = (lower.metrics.age - age).abs();
        let upper_diff = (upper.metrics.age - age).abs();
        Ok(if lower_diff < upper_diff {
            lower.metrics.age
        } else {
            upper.metrics.age
        })
    }

    fn require_age(&self) -> Result<f64, LevelsError> {
        self.age
            .ok_or_else(|| LevelsError::InvalidArgument("query needs an age".to_string()))
    }

    fn require_metrics(&self) -> Result<Metrics, LevelsError> {
        match (self.gender, self.age, self.weight) {
            (Some(gender), Some(age), Some(weight)) => Ok(Metrics::new(age, weight, gender)),
            _ => Err(LevelsError::InvalidArgument(
                "interpolation needs gender, age and weight".to_string(),
            )),
        }
    }

    /// Interpolate a standard for the fully-specified query metrics.
    ///
    /// Weight is interpolated within each bracketing age first, then the two
    /// results are interpolated by age. Out-of-range metrics clamp to the
    /// nearest sampled boundary.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when gender, age or weight is unset, plus
    /// any error from [`nearest`](Self::nearest) or [`interpolate_levels`].
    pub fn interpolated(&self) -> Result<Standard, LevelsError> {
        let metrics = self.require_metrics()?;
        self.interpolate_at(metrics)
    }

    /// One interpolated standard per weight sampled at the closest age.
    ///
    /// With `normalize_lb` each weight is first snapped to a whole pound.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` without gender and age filters, plus any
    /// interpolation error.
    pub fn interpolated_all(&self, normalize_lb: bool) -> Result<Vec<Standard>, LevelsError> {
        let gender = self
            .gender
            .ok_or_else(|| LevelsError::InvalidArgument("query needs a gender".to_string()))?;
        let age = self.require_age()?;
        self.weights_at_closest_age()?
            .into_iter()
            .map(|weight| {
                let weight = if normalize_lb {
                    snap_to_whole_lb(weight)
                } else {
                    weight
                };
                self.interpolate_at(Metrics::new(age, weight, gender))
            })
            .collect()
    }

    fn interpolate_at(&self, metrics: Metrics) -> Result<Standard, LevelsError> {
        let by_gender = Self::over(self.activity, self.standards).by_gender(metrics.gender);
        let (lower, upper) = by_gender.nearest(Metric::Age, metrics.age)?;
        let (age_lower, age_upper) = (lower.metrics.age, upper.metrics.age);
        let age_ratio = bracket_ratio(metrics.age, age_lower, age_upper);

        let at_age = |age: f64| -> Result<Levels, LevelsError> {
            let (lower, upper) = by_gender.by_age(age).nearest(Metric::Weight, metrics.weight)?;
            let ratio = bracket_ratio(metrics.weight, lower.metrics.weight, upper.metrics.weight);
            interpolate_levels(&lower.levels, &upper.levels, ratio)
        };

        let levels = interpolate_levels(&at_age(age_lower)?, &at_age(age_upper)?, age_ratio)?;
        Ok(Standard { metrics, levels })
    }
}

/// Position of `target` inside `[lower, upper]`, clamped to `[0, 1]`.
///
/// A degenerate bracket yields 1.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn bracket_ratio(target: f64, lower: f64, upper: f64) -> f64 {
    if upper == lower {
        return 1.0;
    }
    ((target - lower) / (upper - lower)).clamp(0.0, 1.0)
}

/// Level-wise linear interpolation `lower + (upper − lower)·ratio`.
///
/// # Errors
///
/// Returns `MismatchedLevelCount` when the two mappings have different keys.
pub fn interpolate_levels(
    lower: &Levels,
    upper: &Levels,
    ratio: f64,
) -> Result<Levels, LevelsError> {
    if !lower.same_keys(upper) {
        return Err(LevelsError::MismatchedLevelCount {
            lower: lower.len(),
            upper: upper.len(),
        });
    }
    Ok(lower
        .iter()
        .zip(upper.values())
        .map(|((level, low), high)| (level, (high - low).mul_add(ratio, low)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard(gender: Gender, age: f64, weight: f64, values: [f64; 3]) -> Standard {
        Standard {
            metrics: Metrics::new(age, weight, gender),
            levels: Levels::from_values(values),
        }
    }

    fn grid() -> Vec<Standard> {
        vec![
            standard(Gender::Male, 20.0, 70.0, [10.0, 20.0, 30.0]),
            standard(Gender::Male, 20.0, 90.0, [20.0, 30.0, 40.0]),
            standard(Gender::Male, 40.0, 70.0, [30.0, 40.0, 50.0]),
            standard(Gender::Male, 40.0, 90.0, [40.0, 50.0, 60.0]),
            standard(Gender::Female, 30.0, 60.0, [5.0, 6.0, 7.0]),
        ]
    }

    fn values(levels: &Levels) -> Vec<f64> {
        levels.values().collect()
    }

    #[test]
    fn narrowing_returns_new_queries() {
        let data = grid();
        let base = StandardsQuery::over(Activity::BenchPress, &data);
        let male = base.by_gender(Gender::Male);
        let narrowed = male.by_age(20.0);
        assert_eq!(base.all().len(), 5);
        assert_eq!(male.all().len(), 4);
        assert_eq!(narrowed.all().len(), 2);
        assert_eq!(
            narrowed.by_weight(90.0).one().map(|s| s.metrics.weight),
            Some(90.0)
        );
        assert!(narrowed.by_weight(80.0).one().is_none());
    }

    #[test]
    fn nearest_brackets_and_falls_back() {
        let data = grid();
        let male = StandardsQuery::over(Activity::BenchPress, &data).by_gender(Gender::Male);
        let (lower, upper) = male.nearest(Metric::Age, 30.0).unwrap();
        assert_eq!((lower.metrics.age, upper.metrics.age), (20.0, 40.0));
        // Equal values: the lower side keeps the last, the upper the first.
        assert_eq!(lower.metrics.weight, 90.0);
        assert_eq!(upper.metrics.weight, 70.0);

        let (lower, upper) = male.nearest(Metric::Age, 50.0).unwrap();
        assert_eq!((lower.metrics.age, upper.metrics.age), (40.0, 40.0));
        assert_eq!(upper.metrics.weight, 90.0);

        let (lower, upper) = male.nearest(Metric::Age, 10.0).unwrap();
        assert_eq!((lower.metrics.age, lower.metrics.weight), (20.0, 70.0));
        assert_eq!((upper.metrics.age, upper.metrics.weight), (20.0, 70.0));

        let empty = male.by_age(99.0);
        assert!(matches!(
            empty.nearest(Metric::Weight, 80.0),
            Err(LevelsError::NoStandardsAvailable { .. })
        ));
    }

    #[test]
    fn interpolates_weight_then_age() {
        let data = grid();
        let query = StandardsQuery::over(Activity::BenchPress, &data)
            .by_metrics(Metrics::new(30.0, 80.0, Gender::Male));
        let standard = query.interpolated().unwrap();
        assert_eq!(values(&standard.levels), vec![25.0, 35.0, 45.0]);
        assert_eq!(standard.metrics.weight, 80.0);
    }

    #[test]
    fn out_of_range_metrics_clamp_to_boundary() {
        let data = grid();
        let query = StandardsQuery::over(Activity::BenchPress, &data)
            .by_metrics(Metrics::new(90.0, 200.0, Gender::Male));
        let standard = query.interpolated().unwrap();
        assert_eq!(values(&standard.levels), vec![40.0, 50.0, 60.0]);
    }

    #[test]
    fn interpolation_needs_full_metrics() {
        let data = grid();
        let query = StandardsQuery::over(Activity::BenchPress, &data).by_gender(Gender::Male);
        assert!(matches!(
            query.interpolated(),
            Err(LevelsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn closest_age_ties_go_up() {
        let data = grid();
        let male = StandardsQuery::over(Activity::BenchPress, &data).by_gender(Gender::Male);
        assert_eq!(male.ages(), vec![20.0, 40.0]);
        let weights = male.by_age(30.0).weights_at_closest_age().unwrap();
        assert_eq!(weights, vec![70.0, 90.0]);
        let table = male.by_age(30.0).interpolated_all(false).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(values(&table[0].levels), vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn interpolate_levels_requires_matching_keys() {
        let a = Levels::from_values([1.0, 2.0, 3.0]);
        let b = Levels::from_values([3.0, 4.0, 5.0]);
        assert_eq!(values(&interpolate_levels(&a, &b, 0.5).unwrap()), vec![2.0, 3.0, 4.0]);
        assert_eq!(interpolate_levels(&a, &a, 0.37).unwrap(), a);
        let short = Levels::from_values([1.0, 2.0]);
        assert!(matches!(
            interpolate_levels(&a, &short, 0.5),
            Err(LevelsError::MismatchedLevelCount { lower: 3, upper: 2 })
        ));
    }

    #[test]
    fn bracket_ratio_clamps_and_handles_degenerate_bracket() {
        assert!((bracket_ratio(5.0, 5.0, 5.0) - 1.0).abs() < f64::EPSILON);
        assert!((bracket_ratio(15.0, 10.0, 20.0) - 0.5).abs() < f64::EPSILON);
        assert!(bracket_ratio(0.0, 10.0, 20.0).abs() < f64::EPSILON);
        assert!((bracket_ratio(30.0, 10.0, 20.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn closest_age_ignores_weight_filter() {
        let data = grid();
        let male = StandardsQuery::over(Activity::BenchPress, &data).by_gender(Gender::Male);
        assert!((male.by_age(26.0).by_weight(500.0).closest_age().unwrap() - 20.0).abs() < 1e-9);
        assert!((male.by_age(35.0).closest_age().unwrap() - 40.0).abs() < 1e-9);
        assert!(matches!(
            male.closest_age(),
            Err(LevelsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn prepared_standards_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Standards>();
        assert_send_sync::<StandardsQuery<'static>>();
    }
}
