//! Exponential-decay fit of level-to-level progression ratios.
//!
//! For a group of standards sharing (activity, gender, age) the average ratio
//! between consecutive base levels shrinks as levels rise. The ratio at step
//! `i` is modelled as `A·exp(−B·i) + C` and fitted with Levenberg–Marquardt,
//! with every parameter projected into its box on each update.
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::{debug, warn};
use nalgebra::storage::Owned;
use nalgebra::{DVector, Dyn, OMatrix, U3, Vector3};

use crate::constants::{
    BASE_LEVEL_COUNT, FIT_INITIAL, FIT_MAX, FIT_MAX_EVALUATIONS, FIT_MIN, FIT_PARAM_COUNT,
};
use crate::error::LevelsError;
use crate::model::{Activity, Standard};
use crate::numbers::usize_to_f64;

/// Fitted parameters of `A·exp(−B·x) + C`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayCurve {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl DecayCurve {
    #[must_use]
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Parameters the solver starts from.
    #[must_use]
    pub const fn initial() -> Self {
        Self::new(FIT_INITIAL[0], FIT_INITIAL[1], FIT_INITIAL[2])
    }

    /// Progression ratio predicted at step `x`.
    #[must_use]
    pub fn ratio(&self, x: f64) -> f64 {
        self.a.mul_add((-self.b * x).exp(), self.c)
    }

    fn from_vector(params: &Vector3<f64>) -> Self {
        Self::new(params[0], params[1], params[2])
    }

    fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite()
    }
}

/// Outcome of fitting one (activity, gender, age) group.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveFit {
    pub curve: DecayCurve,
    /// Whether higher values rank higher in this group.
    pub increasing: bool,
    /// Averaged ratio per step, indexed from 0.
    pub samples: Vec<f64>,
    pub converged: bool,
    pub evaluations: usize,
}

impl CurveFit {
    /// Largest absolute gap between the fitted curve and the sampled ratios.
    #[must_use]
    pub fn max_residual(&self) -> f64 {
        self.samples
            .iter()
            .enumerate()
            .map(|(x, y)| (self.curve.ratio(usize_to_f64(x)) - y).abs())
            .fold(0.0, f64::max)
    }
}

/// Average consecutive-level ratios across the weight variants of one group.
///
/// Ratios are oriented so they exceed 1 for both increasing and decreasing
/// datasets: `next / curr` when values grow, `curr / next` otherwise.
///
/// # Errors
///
/// Returns `NoStandardsAvailable` for an empty group and `IncompleteLevels`
/// when a standard lacks one of the base levels.
pub fn progression_ratios(
    activity: Activity,
    group: &[&Standard],
) -> Result<(bool, Vec<f64>), LevelsError> {
    let first = group
        .first()
        .ok_or(LevelsError::NoStandardsAvailable { activity })?;
    let increasing = first.levels.is_increasing();
    let mut samples = Vec::with_capacity(FIT_PARAM_COUNT + 1);
    for level in 1..BASE_LEVEL_COUNT {
        let mut sum = 0.0;
        for standard in group {
            let curr = base_level(activity, standard, level)?;
            let next = base_level(activity, standard, level + 1)?;
            sum += if increasing { next / curr } else { curr / next };
        }
        samples.push(sum / usize_to_f64(group.len()));
    }
    Ok((increasing, samples))
}

pub(crate) fn base_level(
    activity: Activity,
    standard: &Standard,
    level: u32,
) -> Result<f64, LevelsError> {
    standard
        .levels
        .get(level)
        .ok_or(LevelsError::IncompleteLevels {
            activity,
            gender: standard.metrics.gender,
            age: standard.metrics.age,
            weight: standard.metrics.weight,
            level,
        })
}

/// Fit the decay model to `samples`, where sample `i` sits at `x = i`.
///
/// Non-finite samples are ignored. When fewer samples than parameters remain,
/// or the solver diverges, the initial guess is returned unconverged.
#[must_use]
pub fn fit_decay_curve(samples: &[f64]) -> (DecayCurve, bool, usize) {
    let points: Vec<(f64, f64)> = samples
        .iter()
        .enumerate()
        .filter(|(_, y)| y.is_finite())
        .map(|(x, y)| (usize_to_f64(x), *y))
        .collect();
    if points.len() < FIT_PARAM_COUNT {
        warn!(
            "only {} usable ratio samples; keeping initial decay parameters",
            points.len()
        );
        return (DecayCurve::initial(), false, 0);
    }

    let problem = DecayProblem::new(points);
    // The solver stops after `patience * (params + 1)` residual evaluations.
    let (problem, report) = LevenbergMarquardt::new()
        .with_patience(FIT_MAX_EVALUATIONS / (FIT_PARAM_COUNT + 1))
        .minimize(problem);
    let curve = DecayCurve::from_vector(&problem.params);
    if !curve.is_finite() {
        warn!(
            "decay fit diverged ({:?}); keeping initial parameters",
            report.termination
        );
        return (DecayCurve::initial(), false, report.number_of_evaluations);
    }
    let converged = report.termination.was_successful();
    if !converged {
        warn!("decay fit stopped early: {:?}", report.termination);
    }
    (curve, converged, report.number_of_evaluations)
}

/// Compute ratios for `group` and fit them.
///
/// # Errors
///
/// Propagates errors from [`progression_ratios`].
pub fn fit_group(activity: Activity, group: &[&Standard]) -> Result<CurveFit, LevelsError> {
    let (increasing, samples) = progression_ratios(activity, group)?;
    let (curve, converged, evaluations) = fit_decay_curve(&samples);
    debug!(
        "{activity}: fitted decay A={:.4} B={:.4} C={:.4} over {} standards ({evaluations} evaluations)",
        curve.a,
        curve.b,
        curve.c,
        group.len()
    );
    Ok(CurveFit {
        curve,
        increasing,
        samples,
        converged,
        evaluations,
    })
}

fn project(params: &Vector3<f64>) -> Vector3<f64> {
    Vector3::from_fn(|row, _| params[row].clamp(FIT_MIN[row], FIT_MAX[row]))
}

/// Least-squares problem over `(x, y)` samples for the box-bounded decay model.
struct DecayProblem {
    points: Vec<(f64, f64)>,
    params: Vector3<f64>,
}

impl DecayProblem {
    fn new(points: Vec<(f64, f64)>) -> Self {
        Self {
            points,
            params: Vector3::from(FIT_INITIAL),
        }
    }
}

impl LeastSquaresProblem<f64, Dyn, U3> for DecayProblem {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, U3>;
    type ParameterStorage = Owned<f64, U3>;

    fn set_params(&mut self, params: &Vector3<f64>) {
        self.params = project(params);
    }

    fn params(&self) -> Vector3<f64> {
        self.params
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let curve = DecayCurve::from_vector(&self.params);
        Some(DVector::from_iterator(
            self.points.len(),
            self.points.iter().map(|(x, y)| curve.ratio(*x) - y),
        ))
    }

    fn jacobian(&self) -> Option<OMatrix<f64, Dyn, U3>> {
        let (a, b) = (self.params[0], self.params[1]);
        Some(OMatrix::<f64, Dyn, U3>::from_fn_generic(
            Dyn(self.points.len()),
            U3,
            |row, col| {
                let x = self.points[row].0;
                let decay = (-b * x).exp();
                match col {
                    0 => decay,
                    1 => -a * x * decay,
                    _ => 1.0,
                }
            },
        ))
    }
}
