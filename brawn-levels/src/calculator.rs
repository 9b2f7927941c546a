//! Level scoring on top of the prepared standards.
use log::trace;

use crate::error::LevelsError;
use crate::model::{
    ActivityPerformance, Attribute, AttributeLevels, LevelOutput, Levels, Player,
};
use crate::numbers::{is_unset, round_to_u32, usize_to_f64};
use crate::standards::Standards;

/// Level number whose value is closest to `performance`.
///
/// Unset (zero or non-finite) values are skipped and the lowest level wins
/// ties. Returns 1 when no level is usable.
#[must_use]
pub fn find_level(levels: &Levels, performance: f64) -> u32 {
    let mut best = 1;
    let mut best_diff = f64::INFINITY;
    for (level, value) in levels.iter() {
        if is_unset(value) {
            continue;
        }
        let diff = (performance - value).abs();
        if diff < best_diff {
            best = level;
            best_diff = diff;
        }
    }
    best
}

/// Scores players against a [`Standards`] grid.
///
/// Missing metrics, missing activities and non-positive performances score
/// as 0 rather than failing.
#[derive(Debug, Clone, Copy)]
pub struct LevelCalculator<'a> {
    standards: &'a Standards,
}

impl<'a> LevelCalculator<'a> {
    #[must_use]
    pub const fn new(standards: &'a Standards) -> Self {
        Self { standards }
    }

    #[must_use]
    pub const fn standards(&self) -> &'a Standards {
        self.standards
    }

    fn metrics_unset(player: &Player) -> bool {
        is_unset(player.metrics.age) || is_unset(player.metrics.weight)
    }

    /// Level of the activity matching `performance` for `player`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownActivity` or any interpolation error.
    pub fn activity_level(
        &self,
        player: &Player,
        performance: &ActivityPerformance,
    ) -> Result<u32, LevelsError> {
        let standard = self
            .standards
            .query(performance.activity)?
            .by_metrics(player.metrics)
            .interpolated()?;
        let level = find_level(&standard.levels, performance.performance);
        trace!(
            "{}: performance {} -> level {level}",
            performance.activity, performance.performance
        );
        Ok(level)
    }

    /// Mean level across the activities of `attribute`.
    ///
    /// Returns 0 when a required activity is missing, any performance is not
    /// positive, or the attribute has no activities at all.
    ///
    /// # Errors
    ///
    /// Returns `WrongAttribute` when a performance belongs to another
    /// attribute, plus lookup errors for malformed data.
    pub fn calculate_attribute_level(
        &self,
        attribute: Attribute,
        player: &Player,
        performances: &[ActivityPerformance],
    ) -> Result<u32, LevelsError> {
        for performance in performances {
            let actual = self.standards.metadata(performance.activity)?.attribute;
            if actual != attribute {
                return Err(LevelsError::WrongAttribute {
                    activity: performance.activity,
                    expected: attribute,
                    actual,
                });
            }
        }

        let required = self.standards.attribute_activities(attribute);
        if required.is_empty() {
            return Ok(0);
        }
        if let Some(missing) = required
            .iter()
            .find(|activity| !performances.iter().any(|p| p.activity == **activity))
        {
            trace!("{attribute}: missing {missing}, scoring 0");
            return Ok(0);
        }
        if performances.iter().any(|p| p.performance.is_nan() || p.performance <= 0.0) {
            return Ok(0);
        }

        let mut sum = 0.0;
        for performance in performances {
            sum += f64::from(self.activity_level(player, performance)?);
        }
        Ok(round_to_u32(sum / usize_to_f64(performances.len())))
    }

    /// Levels for every attribute, in declaration order.
    ///
    /// Unset player metrics or the first attribute scoring 0 yield all zeros.
    ///
    /// # Errors
    ///
    /// Returns `UnknownActivity` for performances of activities that were
    /// not loaded, plus lookup errors for malformed data.
    pub fn calculate_all_attribute_levels(
        &self,
        player: &Player,
        performances: &[ActivityPerformance],
    ) -> Result<AttributeLevels, LevelsError> {
        let mut levels = AttributeLevels::default();
        if Self::metrics_unset(player) {
            return Ok(levels);
        }
        for attribute in Attribute::ALL {
            let mut matching = Vec::new();
            for performance in performances {
                if self.standards.metadata(performance.activity)?.attribute == attribute {
                    matching.push(*performance);
                }
            }
            let level = self.calculate_attribute_level(attribute, player, &matching)?;
            if level == 0 {
                return Ok(AttributeLevels::default());
            }
            levels.set(attribute, level);
        }
        Ok(levels)
    }

    /// Attribute levels plus the rounded mean player level.
    ///
    /// # Errors
    ///
    /// See [`calculate_all_attribute_levels`](Self::calculate_all_attribute_levels).
    pub fn calculate(
        &self,
        player: &Player,
        performances: &[ActivityPerformance],
    ) -> Result<LevelOutput, LevelsError> {
        let attributes = self.calculate_all_attribute_levels(player, performances)?;
        if attributes.iter().any(|(_, level)| level == 0) {
            return Ok(LevelOutput::default());
        }
        let sum: f64 = attributes.iter().map(|(_, level)| f64::from(level)).sum();
        Ok(LevelOutput {
            player: round_to_u32(sum / usize_to_f64(Attribute::ALL.len())),
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_level_picks_closest_and_first_on_ties() {
        let levels = Levels::from_values([10.0, 20.0, 30.0, 40.0]);
        assert_eq!(find_level(&levels, 21.0), 2);
        assert_eq!(find_level(&levels, 25.0), 2);
        assert_eq!(find_level(&levels, 1_000.0), 4);
        assert_eq!(find_level(&levels, -5.0), 1);
    }

    #[test]
    fn find_level_skips_unset_values() {
        let levels: Levels = [(1, 0.0), (2, 50.0), (3, f64::NAN), (4, 70.0)]
            .into_iter()
            .collect();
        assert_eq!(find_level(&levels, 1.0), 2);
        assert_eq!(find_level(&levels, 65.0), 4);
        assert_eq!(find_level(&Levels::new(), 12.0), 1);
        assert_eq!(find_level(&Levels::from_values([0.0, 0.0]), 12.0), 1);
    }

    #[test]
    fn find_level_on_decreasing_times() {
        let levels = Levels::from_values([600.0, 500.0, 440.0, 385.0, 340.0]);
        assert_eq!(find_level(&levels, 435.0), 3);
        assert_eq!(find_level(&levels, 300.0), 5);
    }
}
