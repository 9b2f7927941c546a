//! Centralized tuning constants for the level engine.
//!
//! Everything that shapes the generated grid lives here so that changes to
//! the model show up as a single reviewed diff rather than scattered literals.

// Level resolution ---------------------------------------------------------
pub const DEFAULT_MAX_LEVEL: u32 = 100;
/// Largest accepted `max_level`; resampling allocates one entry per level.
pub const MAX_LEVEL_LIMIT: u32 = 10_000;
/// Number of levels every raw standard is expected to carry.
pub const BASE_LEVEL_COUNT: u32 = 5;

// Curve fit ----------------------------------------------------------------
pub const FIT_INITIAL: [f64; 3] = [0.4, 0.5, 1.1];
pub const FIT_MIN: [f64; 3] = [0.0, 0.0, 1.02];
pub const FIT_MAX: [f64; 3] = [1.0, 2.0, 1.2];
/// Budget of residual evaluations, not solver iterations.
pub const FIT_MAX_EVALUATIONS: usize = 200;
pub(crate) const FIT_PARAM_COUNT: usize = 3;

// Age axis generation ------------------------------------------------------
pub const AGE_MIN: f64 = 0.0;
pub const AGE_MAX: f64 = 100.0;
pub const AGE_STEP: f64 = 10.0;
pub const YOUNG_FLOOR: f64 = 0.5;
pub const OLD_FLOOR: f64 = 0.5;

// Weight axis generation ---------------------------------------------------
pub const WEIGHT_STEP_KG: f64 = 12.0;
pub const WEIGHT_STEPS_EACH_SIDE: u32 = 3;
pub const WEIGHT_MIN_KG: f64 = 1.0;

// Per-activity defaults ----------------------------------------------------
pub const DEFAULT_WEIGHT_MODIFIER: f64 = 0.1;
pub const BROAD_JUMP_WEIGHT_MODIFIER: f64 = -0.1;
pub const DEFAULT_AGE_MODIFIER: f64 = 0.5;
pub const DEFAULT_DIFFICULTY_MODIFIER: f64 = 0.0;
pub const BROAD_JUMP_DIFFICULTY_MODIFIER: f64 = 0.05;
pub const DEFAULT_PEAK_AGE: f64 = 27.0;

// Unit conversion ----------------------------------------------------------
pub const KG_PER_LB: f64 = 0.453_592;
pub const LB_PER_KG: f64 = 2.204_62;
pub const CM_PER_FOOT: f64 = 30.48;
pub const CM_PER_INCH: f64 = 2.54;
pub const MS_PER_SECOND: f64 = 1_000.0;
pub const MS_PER_MINUTE: f64 = 60_000.0;
