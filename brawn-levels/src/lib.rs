//! Brawn Levels Engine
//!
//! Platform-agnostic athlete level engine. Sparse percentile standards are
//! normalized to a uniform level resolution, widened across ages and body
//! weights, and queried by interpolation to score performances on a 1–100
//! scale. This crate holds no I/O beyond the bundled JSON assets.

pub mod calculator;
pub mod config;
pub mod constants;
pub mod curve_fit;
pub mod error;
pub mod generator;
pub mod model;
pub mod numbers;
pub mod resample;
pub mod standards;
pub mod units;

use anyhow::Context;

// Re-export commonly used types
pub use calculator::{LevelCalculator, find_level};
pub use config::{
    ActivityConfig, ActivityOverlay, ConfigError, GlobalConfig, StandardsConfig, StretchConfig,
};
pub use curve_fit::{CurveFit, DecayCurve, fit_decay_curve, fit_group, progression_ratios};
pub use error::LevelsError;
pub use generator::{GenerationStats, age_falloff, prepare_activity};
pub use model::{
    Activity, ActivityMetadata, ActivityPerformance, ActivityStandards, Attribute,
    AttributeLevels, AvgWeights, CalcRequest, Gender, GeneratorSpec, LevelOutput, Levels, Metric,
    Metrics, ParseNameError, Player, Standard, StandardsDocument, Unit,
};
pub use resample::{compress, expand, normalize};
pub use standards::{Standards, StandardsQuery, bracket_ratio, interpolate_levels};
pub use units::UnitError;

const BUNDLED_STANDARDS: &str = include_str!("../data/standards.json");
const BUNDLED_AVG_WEIGHTS: &str = include_str!("../data/avg-weights.json");

/// Trait for abstracting where raw standards and reference tables come from.
/// Platform-specific implementations should provide this.
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the raw standards document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or parsed.
    fn load_standards(&self) -> Result<StandardsDocument, Self::Error>;

    /// Load the average body weight table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or parsed.
    fn load_avg_weights(&self) -> Result<AvgWeights, Self::Error>;

    /// Load configuration overrides; defaults when the source has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read or parsed.
    fn load_config(&self) -> Result<StandardsConfig, Self::Error> {
        Ok(StandardsConfig::default())
    }
}

/// Loader backed by the JSON assets compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledData;

impl DataLoader for BundledData {
    type Error = LevelsError;

    fn load_standards(&self) -> Result<StandardsDocument, Self::Error> {
        Ok(StandardsDocument::from_json(BUNDLED_STANDARDS)?)
    }

    fn load_avg_weights(&self) -> Result<AvgWeights, Self::Error> {
        Ok(AvgWeights::from_json(BUNDLED_AVG_WEIGHTS)?)
    }
}

impl Standards {
    /// Standards built from the bundled assets with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled assets fail to parse or prepare.
    pub fn bundled() -> Result<Self, LevelsError> {
        let data = BundledData;
        Self::new(
            &data.load_standards()?,
            &data.load_avg_weights()?,
            data.load_config()?,
        )
    }
}

/// Level engine tying a data source to prepared standards.
pub struct LevelEngine<L>
where
    L: DataLoader,
{
    data_loader: L,
    standards: Standards,
}

impl<L> LevelEngine<L>
where
    L: DataLoader,
{
    /// Load and prepare standards using the loader's own configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any input cannot be loaded or the grid cannot be
    /// prepared.
    pub fn new(data_loader: L) -> anyhow::Result<Self> {
        let config = data_loader
            .load_config()
            .context("loading standards configuration")?;
        Self::with_config(data_loader, config)
    }

    /// Load and prepare standards with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any input cannot be loaded or the grid cannot be
    /// prepared.
    pub fn with_config(data_loader: L, config: StandardsConfig) -> anyhow::Result<Self> {
        let raw = data_loader
            .load_standards()
            .context("loading standards")?;
        let avg_weights = data_loader
            .load_avg_weights()
            .context("loading average weights")?;
        let standards =
            Standards::new(&raw, &avg_weights, config).context("preparing standards grid")?;
        Ok(Self {
            data_loader,
            standards,
        })
    }

    pub const fn data_loader(&self) -> &L {
        &self.data_loader
    }

    pub const fn standards(&self) -> &Standards {
        &self.standards
    }

    #[must_use]
    pub const fn calculator(&self) -> LevelCalculator<'_> {
        LevelCalculator::new(&self.standards)
    }

    /// Score a request body.
    ///
    /// # Errors
    ///
    /// Returns `WrongAttribute`, `UnknownActivity` or data-integrity errors.
    pub fn calculate(&self, request: &CalcRequest) -> Result<LevelOutput, LevelsError> {
        self.calculator()
            .calculate(&request.player, &request.activity_performances)
    }
}
