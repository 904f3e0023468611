//! Score statistics used for threshold calibration

use std::cmp::Ordering;

/// Nearest-rank percentile with the lower-index tie rule:
/// `sorted(values)[⌊(n-1)·p/100⌋]` for `p` in [0, 100].
///
/// The sort is stable and ascending; empty input returns 0.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let idx = ((sorted.len() - 1) as f64 * p / 100.0).floor() as usize;
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_returns_zero() {
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_single_value() {
        assert_eq!(percentile(&[3.5], 0.0), 3.5);
        assert_eq!(percentile(&[3.5], 100.0), 3.5);
    }

    #[test]
    fn test_nearest_rank_lower() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();

        // ⌊9 · 50/100⌋ = 4 → fifth smallest
        assert_eq!(percentile(&values, 50.0), 5.0);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 10.0);
        // ⌊9 · 90/100⌋ = 8
        assert_eq!(percentile(&values, 90.0), 9.0);
    }

    #[test]
    fn test_unsorted_input() {
        let values = [9.0, 1.0, 5.0, 3.0, 7.0];
        assert_eq!(percentile(&values, 50.0), 5.0);
    }

    #[test]
    fn test_ties_take_lower_index() {
        let values = [1.0, 2.0, 2.0, 2.0, 3.0];
        assert_eq!(percentile(&values, 50.0), 2.0);
    }
}
