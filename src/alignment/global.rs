// Global sequence alignment (Needleman-Wunsch edit distance)

use crate::features::FeatureSequence;

/// Scoring parameters for global alignment.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ScoringParams {
    #[serde(default)]
    pub match_score: i64,
    #[serde(default = "one")]
    pub mismatch_penalty: i64,
    #[serde(default = "one")]
    pub gap_penalty: i64,
}

fn one() -> i64 {
    1
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            match_score: 0,
            mismatch_penalty: 1,
            gap_penalty: 1,
        }
    }
}

/// Compute the global alignment distance between two feature sequences.
///
/// Full-sequence alignment with insertion/deletion/substitution costs; no
/// free end gaps. Two simultaneous rests count as a match, a rest against a
/// real value counts as a mismatch. Aligning against an empty sequence costs
/// `len * gap_penalty`. Only two DP rows are kept since the alignment path
/// itself is not needed.
pub fn global_alignment(a: &FeatureSequence, b: &FeatureSequence, params: &ScoringParams) -> i64 {
    let m = a.len();
    let n = b.len();

    let mut prev_row: Vec<i64> = (0..=n as i64).map(|j| j * params.gap_penalty).collect();
    let mut current_row = vec![0i64; n + 1];

    for i in 1..=m {
        current_row[0] = i as i64 * params.gap_penalty;
        for j in 1..=n {
            let score = substitution_cost(a[i - 1], b[j - 1], params);
            current_row[j] = (prev_row[j - 1] + score)
                .min(prev_row[j] + params.gap_penalty)
                .min(current_row[j - 1] + params.gap_penalty);
        }
        std::mem::swap(&mut prev_row, &mut current_row);
    }

    prev_row[n]
}

fn substitution_cost(x: Option<i32>, y: Option<i32>, params: &ScoringParams) -> i64 {
    match (x, y) {
        // Two simultaneous rests are equivalent
        (None, None) => params.match_score,
        (Some(a), Some(b)) if a == b => params.match_score,
        // Differing values, or a rest against a real value
        _ => params.mismatch_penalty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_distance(a: &FeatureSequence, b: &FeatureSequence) -> i64 {
        global_alignment(a, b, &ScoringParams::default())
    }

    #[test]
    fn self_alignment_is_free() {
        let seq = vec![Some(1), Some(-4), None, Some(7), Some(7)];
        assert_eq!(default_distance(&seq, &seq), 0);
    }

    #[test]
    fn alignment_is_symmetric() {
        let a = vec![Some(1), None, Some(3), Some(5)];
        let b = vec![Some(2), Some(3), None];
        assert_eq!(default_distance(&a, &b), default_distance(&b, &a));
    }

    #[test]
    fn empty_sequence_costs_gaps() {
        let b = vec![Some(1), Some(2), Some(3)];
        assert_eq!(default_distance(&Vec::new(), &b), 3);
        assert_eq!(default_distance(&b, &Vec::new()), 3);
        assert_eq!(default_distance(&Vec::new(), &Vec::new()), 0);
    }

    #[test]
    fn all_rest_sequences_match() {
        let a = vec![None, None, None];
        let b = vec![None, None, None];
        assert_eq!(default_distance(&a, &b), 0);
    }

    #[test]
    fn rest_against_value_is_a_mismatch() {
        let a = vec![None];
        let b = vec![Some(5)];
        assert_eq!(default_distance(&a, &b), 1);
    }

    #[test]
    fn single_substitution() {
        let a = vec![Some(1), Some(2), Some(3)];
        let b = vec![Some(1), Some(2), Some(4)];
        assert_eq!(default_distance(&a, &b), 1);
    }

    #[test]
    fn single_gap() {
        let a = vec![Some(1), Some(2), Some(3)];
        let b = vec![Some(1), Some(2)];
        assert_eq!(default_distance(&a, &b), 1);
    }

    #[test]
    fn custom_parameters_are_honored() {
        let params = ScoringParams {
            match_score: 0,
            mismatch_penalty: 3,
            gap_penalty: 2,
        };
        // Substitution (3) beats insert+delete (4)
        let a = vec![Some(1)];
        let b = vec![Some(2)];
        assert_eq!(global_alignment(&a, &b, &params), 3);
        // Pure gap cost
        let c = vec![Some(1), Some(2), Some(3), Some(4)];
        assert_eq!(global_alignment(&Vec::new(), &c, &params), 8);
    }
}
