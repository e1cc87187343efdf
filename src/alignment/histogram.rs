// Histogram distance over group-occurrence vectors

use ndarray::Array1;
use std::collections::HashMap;

/// Densify a sparse group-id -> occurrence-count map into a vector of
/// length `max_group_id + 1` (index 0 included). Missing groups are 0.0.
pub fn occurrence_vector(occurrences: &HashMap<i64, u32>, max_group_id: i64) -> Array1<f64> {
    let max_group_id = max_group_id.max(0);
    let mut result = Array1::zeros(max_group_id as usize + 1);

    for (&group_id, &count) in occurrences {
        if (0..=max_group_id).contains(&group_id) {
            result[group_id as usize] = count as f64;
        }
    }

    result
}

/// Euclidean distance between two dense occurrence vectors.
///
/// Both vectors of a run share one global max group id per channel, so they
/// should always be equal length. Mismatched lengths are tolerated by
/// zero-padding the shorter vector, but indicate inconsistent upstream data
/// and are logged.
pub fn euclidean_distance(v1: &Array1<f64>, v2: &Array1<f64>) -> f64 {
    let n = v1.len().min(v2.len());

    if v1.len() != v2.len() {
        log::warn!(
            "Occurrence vectors differ in length ({} vs {}); zero-padding the shorter. \
             This points at inconsistent group data upstream.",
            v1.len(),
            v2.len()
        );
    }

    let mut sum_sq = 0.0;
    for i in 0..n {
        let diff = v1[i] - v2[i];
        sum_sq += diff * diff;
    }

    // Unmatched tail elements each contribute their own squared value
    let longer = if v1.len() > n { v1 } else { v2 };
    for i in n..longer.len() {
        sum_sq += longer[i] * longer[i];
    }

    sum_sq.sqrt()
}

/// Distance as persisted: scaled by 100 and rounded, keeping two fractional
/// digits in an integer column.
pub fn scaled_distance(v1: &Array1<f64>, v2: &Array1<f64>) -> i64 {
    (euclidean_distance(v1, v2) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(i64, u32)]) -> HashMap<i64, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn densifies_with_zero_fill() {
        let v = occurrence_vector(&counts(&[(0, 2), (3, 1)]), 4);
        assert_eq!(v.to_vec(), vec![2.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn ignores_groups_beyond_max() {
        let v = occurrence_vector(&counts(&[(1, 1), (9, 5)]), 2);
        assert_eq!(v.to_vec(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn distance_is_zero_iff_identical() {
        let a = occurrence_vector(&counts(&[(0, 1), (2, 3)]), 3);
        let b = occurrence_vector(&counts(&[(0, 1), (2, 3)]), 3);
        let c = occurrence_vector(&counts(&[(0, 1), (2, 4)]), 3);
        assert_eq!(euclidean_distance(&a, &b), 0.0);
        assert!(euclidean_distance(&a, &c) > 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = occurrence_vector(&counts(&[(0, 2), (1, 1)]), 2);
        let b = occurrence_vector(&counts(&[(1, 4), (2, 2)]), 2);
        assert_eq!(euclidean_distance(&a, &b), euclidean_distance(&b, &a));
    }

    #[test]
    fn mismatched_lengths_zero_pad() {
        let a = Array1::from(vec![1.0, 2.0]);
        let b = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);
        // Tail elements contribute their own squares: sqrt(9 + 16) = 5
        assert_eq!(euclidean_distance(&a, &b), 5.0);
        assert_eq!(euclidean_distance(&b, &a), 5.0);
    }

    #[test]
    fn scaling_keeps_two_fractional_digits() {
        let a = Array1::from(vec![0.0, 0.0]);
        let b = Array1::from(vec![1.0, 1.0]);
        // sqrt(2) = 1.41421... -> 141
        assert_eq!(scaled_distance(&a, &b), 141);
    }
}
