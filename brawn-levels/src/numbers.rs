//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round half up (towards positive infinity), the rounding used for every
/// level average.
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Round half up and clamp into the u32 range, returning 0 for NaN values.
#[must_use]
pub fn round_to_u32(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    let max = cast::<u32, f64>(u32::MAX).unwrap_or(f64::MAX);
    let clamped = round_half_up(value).clamp(0.0, max);
    cast::<f64, u32>(clamped).unwrap_or(0)
}

/// Round a non-negative f64 to the nearest count, treating NaN and negatives as 0.
#[must_use]
pub fn round_to_count(value: f64) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    cast::<f64, usize>(value.round()).unwrap_or(0)
}

/// Floor a non-negative position to an index, treating NaN and negatives as 0.
#[must_use]
pub fn floor_to_usize(value: f64) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    cast::<f64, usize>(value.floor()).unwrap_or(usize::MAX)
}

/// Convert usize to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert a level number or count to usize.
#[must_use]
pub fn u32_to_usize(value: u32) -> usize {
    cast::<u32, usize>(value).unwrap_or(usize::MAX)
}

/// Convert a level index to a level number, saturating at u32::MAX.
#[must_use]
pub fn usize_to_u32(value: usize) -> u32 {
    cast::<usize, u32>(value).unwrap_or(u32::MAX)
}

/// Values that the raw data treats as "not set": zero and non-finite numbers.
#[must_use]
pub fn is_unset(value: f64) -> bool {
    value == 0.0 || !value.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_half_up_matches_positive_rounding() {
        assert!((round_half_up(2.5) - 3.0).abs() < f64::EPSILON);
        assert!((round_half_up(2.49) - 2.0).abs() < f64::EPSILON);
        assert!((round_half_up(-2.5) - -2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn round_to_u32_clamps_and_handles_nan() {
        assert_eq!(round_to_u32(41.5), 42);
        assert_eq!(round_to_u32(f64::NAN), 0);
        assert_eq!(round_to_u32(-3.0), 0);
        assert_eq!(round_to_u32(f64::from(u32::MAX) * 2.0), u32::MAX);
    }

    #[test]
    fn round_to_count_floors_negative_and_nan() {
        assert_eq!(round_to_count(2.6), 3);
        assert_eq!(round_to_count(-4.0), 0);
        assert_eq!(round_to_count(f64::NAN), 0);
    }

    #[test]
    fn floor_to_usize_truncates_positions() {
        assert_eq!(floor_to_usize(3.99), 3);
        assert_eq!(floor_to_usize(-0.5), 0);
        assert_eq!(floor_to_usize(f64::NAN), 0);
    }

    #[test]
    fn unset_covers_zero_and_non_finite() {
        assert!(is_unset(0.0));
        assert!(is_unset(f64::NAN));
        assert!(is_unset(f64::INFINITY));
        assert!(!is_unset(-1.0));
        assert!(!is_unset(70.0));
    }
}
