//! Level resolution changes: midpoint expansion and linear compression.
use crate::error::LevelsError;
use crate::model::Levels;
use crate::numbers::{floor_to_usize, u32_to_usize, usize_to_f64};

/// Insert the arithmetic mean between every adjacent pair, `iterations` times.
///
/// Each pass turns `n` levels into `2n - 1`, renumbered from 1. Zero
/// iterations return the input unchanged.
#[must_use]
pub fn expand(levels: &Levels, iterations: u32) -> Levels {
    let mut values: Vec<f64> = levels.values().collect();
    for _ in 0..iterations {
        values = expand_once(&values);
    }
    Levels::from_values(values)
}

fn expand_once(values: &[f64]) -> Vec<f64> {
    let mut expanded = Vec::with_capacity(values.len().saturating_mul(2));
    for (idx, value) in values.iter().enumerate() {
        expanded.push(*value);
        if let Some(next) = values.get(idx + 1) {
            expanded.push(f64::midpoint(*value, *next));
        }
    }
    expanded
}

/// Linearly resample `levels` down to exactly `target` levels.
///
/// # Errors
///
/// Returns `InvalidArgument` when `target` is zero or exceeds the current
/// level count.
pub fn compress(levels: &Levels, target: u32) -> Result<Levels, LevelsError> {
    if target == 0 {
        return Err(LevelsError::InvalidArgument(
            "target level count must be a positive integer".to_string(),
        ));
    }
    let values: Vec<f64> = levels.values().collect();
    let Some(first) = values.first().copied() else {
        return Ok(Levels::new());
    };
    if target == 1 {
        return Ok(Levels::from_values([first]));
    }
    let target = u32_to_usize(target);
    let count = values.len();
    if count < target {
        return Err(LevelsError::InvalidArgument(format!(
            "target level count {target} exceeds the {count} available levels"
        )));
    }

    let span = usize_to_f64(count - 1) / usize_to_f64(target - 1);
    let resampled = (0..target).map(|idx| {
        let position = usize_to_f64(idx) * span;
        let lower_idx = floor_to_usize(position).min(count - 1);
        let upper_idx = (lower_idx + 1).min(count - 1);
        let weight = position - usize_to_f64(lower_idx);
        let lower = values[lower_idx];
        let upper = values[upper_idx];
        lower + (upper - lower) * weight
    });
    Ok(Levels::from_values(resampled.collect::<Vec<_>>()))
}

/// Bring `levels` to exactly `max_level` entries by expansion then compression.
///
/// # Errors
///
/// Returns `InvalidArgument` when a mapping with fewer than two entries would
/// need expanding, since midpoint expansion cannot grow it.
pub fn normalize(levels: &Levels, max_level: u32) -> Result<Levels, LevelsError> {
    let wanted = u32_to_usize(max_level);
    if levels.len() < wanted && levels.len() < 2 {
        return Err(LevelsError::InvalidArgument(format!(
            "cannot expand {} level(s) to {max_level}",
            levels.len()
        )));
    }
    let mut resampled = levels.clone();
    while resampled.len() < wanted {
        resampled = expand(&resampled, 1);
    }
    if resampled.len() > wanted {
        resampled = compress(&resampled, max_level)?;
    }
    Ok(resampled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(levels: &Levels, expected: &[f64]) {
        let values: Vec<f64> = levels.values().collect();
        assert_eq!(values.len(), expected.len(), "{values:?}");
        for (got, want) in values.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{values:?} vs {expected:?}");
        }
    }

    #[test]
    fn expand_inserts_midpoints() {
        let levels = Levels::from_values([10.0, 20.0, 40.0]);
        approx(&expand(&levels, 1), &[10.0, 15.0, 20.0, 30.0, 40.0]);
        approx(
            &expand(&levels, 2),
            &[10.0, 12.5, 15.0, 17.5, 20.0, 25.0, 30.0, 35.0, 40.0],
        );
        assert_eq!(expand(&levels, 0), levels);
    }

    #[test]
    fn compress_resamples_linearly() {
        let levels = Levels::from_values([0.0, 10.0, 20.0, 30.0, 40.0]);
        approx(&compress(&levels, 3).unwrap(), &[0.0, 20.0, 40.0]);
        approx(&compress(&levels, 2).unwrap(), &[0.0, 40.0]);
        approx(&compress(&levels, 1).unwrap(), &[0.0]);
        approx(&compress(&levels, 5).unwrap(), &[0.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn compress_edge_cases() {
        let levels = Levels::from_values([1.0, 2.0]);
        assert!(matches!(
            compress(&levels, 0),
            Err(LevelsError::InvalidArgument(_))
        ));
        assert!(matches!(
            compress(&levels, 3),
            Err(LevelsError::InvalidArgument(_))
        ));
        assert!(compress(&Levels::new(), 4).unwrap().is_empty());
    }

    #[test]
    fn normalize_reaches_exact_resolution() {
        let levels = Levels::from_values([60.0, 80.0, 100.0, 120.0, 140.0]);
        let normalized = normalize(&levels, 100).unwrap();
        assert_eq!(normalized.len(), 100);
        let keys: Vec<u32> = normalized.keys().collect();
        assert_eq!(keys, (1..=100).collect::<Vec<_>>());
        assert!((normalized.get(1).unwrap() - 60.0).abs() < 1e-9);
        assert!((normalized.get(100).unwrap() - 140.0).abs() < 1e-9);
        // Evenly spaced input stays evenly spaced.
        let step = 80.0 / 99.0;
        assert!((normalized.get(2).unwrap() - (60.0 + step)).abs() < 1e-9);
    }

    #[test]
    fn normalize_rejects_single_level() {
        let levels = Levels::from_values([5.0]);
        assert!(matches!(
            normalize(&levels, 10),
            Err(LevelsError::InvalidArgument(_))
        ));
        assert_eq!(normalize(&levels, 1).unwrap(), levels);
    }
}
