//! Timing helpers derived from course times.

/// Number of level steps in a full traversal.
pub const LEVELS: u32 = 100;

/// Time to move one level (ms).
#[inline]
pub fn step_time_ms(course_ms: u32) -> u64 {
    u64::from(course_ms / LEVELS)
}

/// Extra drive time past an endpoint (ms), truncated toward zero.
///
/// Non-finite or negative ratios yield 0.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn calibration_time_ms(course_ms: u32, ratio: f32) -> u64 {
    if !ratio.is_finite() || ratio <= 0.0 {
        return 0;
    }
    (f64::from(course_ms) * f64::from(ratio)) as u64
}

/// Generous upper bound for one move: a worst-case reset pass, a full
/// traversal with calibration, and a few safety delays in between.
#[inline]
pub fn default_max_run_ms(up_ms: u32, down_ms: u32, ratio: f32, delay_ms: u64) -> u64 {
    let up = u64::from(up_ms) + calibration_time_ms(up_ms, ratio);
    let down = u64::from(down_ms) + calibration_time_ms(down_ms, ratio);
    up.saturating_add(down)
        .saturating_mul(2)
        .saturating_add(delay_ms.saturating_mul(3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10_000, 100)]
    #[case(12_000, 120)]
    #[case(99, 0)]
    #[case(150, 1)]
    fn step_time_is_a_hundredth_of_course(#[case] course: u32, #[case] expected: u64) {
        assert_eq!(step_time_ms(course), expected);
    }

    #[rstest]
    #[case(10_000, 0.1, 1000)]
    #[case(12_000, 0.25, 3000)]
    #[case(10_000, 0.0, 0)]
    #[case(10_000, -0.5, 0)]
    #[case(10_000, f32::NAN, 0)]
    fn calibration_time_scales_with_ratio(
        #[case] course: u32,
        #[case] ratio: f32,
        #[case] expected: u64,
    ) {
        assert_eq!(calibration_time_ms(course, ratio), expected);
    }

    #[test]
    fn default_cap_covers_reset_and_full_move() {
        let cap = default_max_run_ms(10_000, 12_000, 0.1, 1000);
        // reset (11 s) + delay + full descent (13.2 s) + delay
        assert!(cap > 11_000 + 1000 + 13_200 + 1000);
        assert_eq!(cap, 2 * (11_000 + 13_200) + 3000);
    }
}
