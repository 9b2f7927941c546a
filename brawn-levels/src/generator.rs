//! Construction-time preparation of one activity's standards.
//!
//! Runs once per activity, in order: stretch, resample to the configured
//! resolution, difficulty skew, synthetic ages, synthetic weights, sort.
//! Real data always wins over generated data at the same
//! (gender, age, weight).
use log::{debug, trace};
use std::cmp::Ordering;

use crate::config::{ActivityConfig, StretchConfig};
use crate::constants::{
    AGE_MAX, AGE_MIN, AGE_STEP, BASE_LEVEL_COUNT, OLD_FLOOR, WEIGHT_MIN_KG, WEIGHT_STEP_KG,
    WEIGHT_STEPS_EACH_SIDE, YOUNG_FLOOR,
};
use crate::curve_fit::{CurveFit, base_level, fit_group};
use crate::error::LevelsError;
use crate::model::{
    Activity, ActivityStandards, AvgWeights, Gender, Levels, Metric, Metrics, Standard,
};
use crate::numbers::round_half_up;
use crate::resample::normalize;
use crate::standards::StandardsQuery;

/// Counts of generated and skipped synthetic standards for one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub generated: usize,
    pub skipped: usize,
}

/// Run the full preparation pipeline on one activity in place.
///
/// # Errors
///
/// Returns the first data-integrity error met along the way.
pub fn prepare_activity(
    activity: Activity,
    entry: &mut ActivityStandards,
    avg_weights: &AvgWeights,
    config: &ActivityConfig,
    max_level: u32,
) -> Result<(), LevelsError> {
    if config.enable_generation && !config.stretch.is_empty() {
        stretch(activity, &mut entry.standards, config.stretch)?;
    }

    let skew = 1.0 + config.difficulty_modifier;
    for standard in &mut entry.standards {
        standard.levels = normalize(&standard.levels, max_level)?.scaled(skew);
    }

    if config.enable_generation {
        if entry.metadata.generates(Metric::Age) {
            let stats = generate_ages(activity, &mut entry.standards, avg_weights, config)?;
            debug!(
                "{activity}: age axis generated {} standards, skipped {}",
                stats.generated, stats.skipped
            );
        }
        if entry.metadata.generates(Metric::Weight) {
            let stats = generate_weights(activity, &mut entry.standards, avg_weights, config)?;
            debug!(
                "{activity}: weight axis generated {} standards, skipped {}",
                stats.generated, stats.skipped
            );
        }
    }

    sort_standards(&mut entry.standards);
    Ok(())
}

fn distinct_ages(activity: Activity, standards: &[Standard], gender: Gender) -> Vec<f64> {
    StandardsQuery::over(activity, standards)
        .by_gender(gender)
        .ages()
}

fn age_steps() -> impl Iterator<Item = f64> {
    (0_u32..)
        .map(|step| AGE_STEP.mul_add(f64::from(step), AGE_MIN))
        .take_while(|age| *age <= AGE_MAX)
}

/// Add fitted levels below level 1 and above the top base level.
///
/// Standards are grouped by (gender, age); each group shares one fitted
/// decay curve.
///
/// # Errors
///
/// Returns `IncompleteLevels` when a standard lacks a base level.
#[allow(clippy::float_cmp)]
pub fn stretch(
    activity: Activity,
    standards: &mut [Standard],
    counts: StretchConfig,
) -> Result<(), LevelsError> {
    for gender in Gender::ALL {
        for age in distinct_ages(activity, standards, gender) {
            let members: Vec<usize> = standards
                .iter()
                .enumerate()
                .filter(|(_, s)| s.metrics.gender == gender && s.metrics.age == age)
                .map(|(idx, _)| idx)
                .collect();
            let group: Vec<&Standard> = members.iter().map(|idx| &standards[*idx]).collect();
            let fit = fit_group(activity, &group)?;
            for idx in members {
                standards[idx].levels = stretch_levels(activity, &standards[idx], &fit, counts)?;
            }
        }
    }
    Ok(())
}

/// Stretched level mapping for one standard.
///
/// Lower levels walk down from level 1 using the ratio at `−i−1`; upper
/// levels walk up from the top base level using the ratio at `level − 1`.
/// Synthetic values are rounded to whole units.
///
/// # Errors
///
/// Returns `IncompleteLevels` when a base level is missing.
pub fn stretch_levels(
    activity: Activity,
    standard: &Standard,
    fit: &CurveFit,
    counts: StretchConfig,
) -> Result<Levels, LevelsError> {
    let mut stretched = Levels::new();
    let step = |value: f64, ratio: f64, upward: bool| {
        if fit.increasing == upward {
            value * ratio
        } else {
            value / ratio
        }
    };

    let mut prev = base_level(activity, standard, 1)?;
    for i in (0..counts.lower).rev() {
        let ratio = fit.curve.ratio(-f64::from(i) - 1.0);
        prev = step(prev, ratio, false);
        stretched.insert(i + 1, round_half_up(prev));
    }

    for level in 1..=BASE_LEVEL_COUNT {
        stretched.insert(level + counts.lower, base_level(activity, standard, level)?);
    }

    prev = base_level(activity, standard, BASE_LEVEL_COUNT)?;
    for i in 0..counts.upper {
        let level = BASE_LEVEL_COUNT + counts.lower + i + 1;
        let ratio = fit.curve.ratio(f64::from(level) - 1.0);
        prev = step(prev, ratio, true);
        stretched.insert(level, round_half_up(prev));
    }
    Ok(stretched)
}

/// Peaked quadratic falloff factor for `age`, clamped to `[floor, 1]`.
///
/// `age_modifier` scales how deep the falloff reaches at the age bounds.
#[must_use]
pub fn age_falloff(age: f64, peak_age: f64, age_modifier: f64) -> f64 {
    let young_floor = (1.0 - YOUNG_FLOOR).mul_add(-age_modifier, 1.0);
    let old_floor = (1.0 - OLD_FLOOR).mul_add(-age_modifier, 1.0);
    let cy = age_modifier * (1.0 - YOUNG_FLOOR) / (peak_age - AGE_MIN).powi(2);
    let co = age_modifier * (1.0 - OLD_FLOOR) / (AGE_MAX - peak_age).powi(2);
    let factor = if age <= peak_age {
        cy.mul_add(-(peak_age - age).powi(2), 1.0)
    } else {
        co.mul_add(-(age - peak_age).powi(2), 1.0)
    };
    factor.clamp(young_floor.min(old_floor), 1.0)
}

fn exists_at(activity: Activity, standards: &[Standard], metrics: Metrics) -> bool {
    StandardsQuery::over(activity, standards)
        .by_metrics(metrics)
        .one()
        .is_some()
}

fn has_gender(standards: &[Standard], gender: Gender) -> bool {
    standards.iter().any(|s| s.metrics.gender == gender)
}

fn push_unless_real(
    activity: Activity,
    standards: &mut Vec<Standard>,
    candidate: Standard,
    stats: &mut GenerationStats,
) {
    if exists_at(activity, standards, candidate.metrics) {
        trace!(
            "{activity}: keeping existing standard at {:?}",
            candidate.metrics
        );
        stats.skipped += 1;
    } else {
        standards.push(candidate);
        stats.generated += 1;
    }
}

fn drop_weightless(standards: &mut Vec<Standard>) {
    standards.retain(|s| s.metrics.weight != 0.0);
}

/// Synthesize one standard per age step from the peak-age reference.
///
/// Every level of the reference is scaled by the falloff factor. With
/// `invert_age_falloff` set, decreasing (time-based) datasets divide by it
/// instead. Weight-less markers are dropped afterwards.
///
/// # Errors
///
/// Returns `MissingReferenceData` when average weights lack a gender that has
/// standards, and interpolation errors from the reference lookup.
pub fn generate_ages(
    activity: Activity,
    standards: &mut Vec<Standard>,
    avg_weights: &AvgWeights,
    config: &ActivityConfig,
) -> Result<GenerationStats, LevelsError> {
    let mut stats = GenerationStats::default();
    for gender in Gender::ALL {
        if !has_gender(standards, gender) {
            continue;
        }
        let peak = config.peak_age;
        let reference_metrics = Metrics::new(peak, avg_weights.weight_for(gender, peak)?, gender);
        let reference = StandardsQuery::over(activity, standards)
            .by_metrics(reference_metrics)
            .interpolated()?;
        let divide = config.invert_age_falloff && !reference.levels.is_increasing();

        for age in age_steps() {
            let factor = age_falloff(age, peak, config.age_modifier);
            let levels = reference
                .levels
                .iter()
                .filter(|(_, base)| *base != 0.0)
                .map(|(level, base)| {
                    let value = if divide { base / factor } else { base * factor };
                    (level, value)
                })
                .collect();
            let metrics = Metrics::new(age, avg_weights.weight_for(gender, age)?, gender);
            push_unless_real(activity, standards, Standard { metrics, levels }, &mut stats);
        }
    }
    drop_weightless(standards);
    Ok(stats)
}

/// Synthesize allometrically scaled weights around the average weight of
/// every age present.
///
/// # Errors
///
/// Returns `MissingReferenceData` when average weights lack a gender that has
/// standards, and interpolation errors from the reference lookup.
pub fn generate_weights(
    activity: Activity,
    standards: &mut Vec<Standard>,
    avg_weights: &AvgWeights,
    config: &ActivityConfig,
) -> Result<GenerationStats, LevelsError> {
    let mut stats = GenerationStats::default();
    let span = WEIGHT_STEP_KG * f64::from(WEIGHT_STEPS_EACH_SIDE);
    for gender in Gender::ALL {
        for age in distinct_ages(activity, standards, gender) {
            let reference_weight = avg_weights.weight_for(gender, age)?;
            let reference = StandardsQuery::over(activity, standards)
                .by_metrics(Metrics::new(age, reference_weight, gender))
                .interpolated()?;

            let min_weight = (reference_weight - span).max(WEIGHT_MIN_KG);
            let max_weight = reference_weight + span;
            let mut weight = min_weight;
            while weight <= max_weight {
                let coefficient = (weight / reference_weight).powf(config.weight_modifier);
                let levels = reference
                    .levels
                    .iter()
                    .filter(|(_, base)| *base != 0.0)
                    .map(|(level, base)| (level, base * coefficient))
                    .collect();
                let metrics = Metrics::new(age, weight, gender);
                push_unless_real(activity, standards, Standard { metrics, levels }, &mut stats);
                weight += WEIGHT_STEP_KG;
            }
        }
    }
    drop_weightless(standards);
    Ok(stats)
}

fn compare_metrics(a: &Metrics, b: &Metrics) -> Ordering {
    a.gender
        .cmp(&b.gender)
        .then_with(|| a.age.total_cmp(&b.age))
        .then_with(|| a.weight.total_cmp(&b.weight))
}

/// Stable sort by gender (Male first), age, then weight.
pub fn sort_standards(standards: &mut [Standard]) {
    standards.sort_by(|a, b| compare_metrics(&a.metrics, &b.metrics));
}
