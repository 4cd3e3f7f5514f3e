//! Work estimation for admission accounting.

use shared_types::leading_zero_digits;

/// Attempts needed to find a hash with `zeros` leading hex zeros with 50%
/// confidence. Zero digits cost nothing; the result saturates at `u64::MAX`.
pub fn expected_attempts(zeros: u32) -> u64 {
    if zeros == 0 {
        return 0;
    }

    // ln(1 - p) via ln_1p keeps precision when p = 16^-z is tiny.
    let p = 16f64.powi(-(zeros.min(i32::MAX as u32) as i32));
    let ln_miss = (-p).ln_1p();
    if ln_miss == 0.0 {
        return u64::MAX;
    }

    let attempts = (0.5f64.ln() / ln_miss).ceil();
    if !attempts.is_finite() || attempts >= u64::MAX as f64 {
        u64::MAX
    } else {
        attempts as u64
    }
}

/// Work represented by `hash`, keyed by its leading zero digits.
pub fn estimated_work_for(hash: &str) -> u64 {
    expected_attempts(leading_zero_digits(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_digits_is_free() {
        assert_eq!(expected_attempts(0), 0);
        assert_eq!(estimated_work_for("abc"), 0);
    }

    #[test]
    fn test_one_digit() {
        // ln 0.5 / ln(15/16) = 10.74...
        assert_eq!(expected_attempts(1), 11);
    }

    #[test]
    fn test_five_digits_close_to_median() {
        let median = 16f64.powi(5) * std::f64::consts::LN_2;
        let work = estimated_work_for("00000f00") as f64;
        assert!((work - median).abs() / median < 0.001, "work = {work}");
    }

    #[test]
    fn test_monotonic_in_zeros() {
        let mut previous = 0;
        for z in 1..=15 {
            let work = expected_attempts(z);
            assert!(work > previous);
            previous = work;
        }
    }

    #[test]
    fn test_saturates() {
        assert_eq!(expected_attempts(64), u64::MAX);
        assert_eq!(expected_attempts(u32::MAX), u64::MAX);
    }

    #[test]
    fn test_threshold_crossing() {
        // One difficulty-5 hash clears the default 100000 mint threshold,
        // difficulty-4 hashes need three.
        assert!(expected_attempts(5) > 100_000);
        assert!(expected_attempts(4) * 2 < 100_000);
        assert!(expected_attempts(4) * 3 > 100_000);
    }
}
