use itertools::Itertools;
use rayon::prelude::*;

use crate::math::{pearson_complete, students_t_test, Moments};
use crate::matrix::ExpressionMatrix;
use crate::results::PathwayResult;

/// Pearson correlations of every distinct gene pair, as a condensed upper triangle
pub struct CorrelationMatrix {
    n: usize,
    values: Vec<f64>,
}

impl CorrelationMatrix {
    /// Correlates every pair of rows using pairwise-complete observations
    pub fn from_matrix(matrix: &ExpressionMatrix, min_observations: usize) -> Self {
        let n = matrix.n_features();
        let values = (0..n)
            .into_par_iter()
            .flat_map_iter(move |i| {
                let x = matrix.row(i);
                ((i + 1)..n).map(move |j| pearson_complete(x, matrix.row(j), min_observations))
            })
            .collect::<Vec<_>>();
        Self { n, values }
    }

    fn index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        i * self.n - i * (i + 1) / 2 + (j - i - 1)
    }

    /// Correlation between rows `i` and `j`; undefined for `i == j`
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return f64::NAN;
        }
        self.values[self.index(i, j)]
    }

    pub fn n_pairs(&self) -> usize {
        self.values.len()
    }

    /// Moments of every defined correlation
    pub fn moments(&self) -> Moments {
        finite_moments(self.values.iter().copied())
    }

    /// Moments of the defined correlations among `members`
    pub fn moments_within(&self, members: &[usize]) -> Moments {
        finite_moments(
            members
                .iter()
                .tuple_combinations()
                .map(|(&i, &j)| self.get(i, j)),
        )
    }
}

fn finite_moments(values: impl Iterator<Item = f64>) -> Moments {
    let mut moments = Moments::default();
    values.filter(|r| r.is_finite()).for_each(|r| moments.push(r));
    moments
}

/// Scores one pathway against the background of all gene pairs
///
/// The out-group is every pair with at least one gene outside the pathway:
/// the background minus the pathway's own pairs.
pub fn score_pathway(
    pathway: &str,
    members: &[usize],
    correlations: &CorrelationMatrix,
    background: &Moments,
) -> PathwayResult {
    let ingroup = correlations.moments_within(members);
    let outgroup = background.without(&ingroup);
    PathwayResult::builder()
        .pathway(pathway.to_string())
        .ingroup_n(ingroup.n)
        .ingroup_mean(ingroup.mean())
        .outgroup_n(outgroup.n)
        .outgroup_mean(outgroup.mean())
        .pvalue(students_t_test(&ingroup, &outgroup))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use approx::assert_relative_eq;

    fn matrix() -> ExpressionMatrix {
        ExpressionMatrix::from_rows(
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            vec!["s1".into(), "s2".into(), "s3".into(), "s4".into()],
            vec![
                vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
                vec![Some(2.0), Some(4.0), Some(6.0), Some(8.5)],
                vec![Some(4.0), Some(1.0), Some(3.0), Some(2.0)],
                vec![Some(5.0), Some(5.0), Some(5.0), Some(5.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_condensed_layout() {
        let matrix = matrix();
        let correlations = CorrelationMatrix::from_matrix(&matrix, 3);
        assert_eq!(correlations.n_pairs(), 6);
        for i in 0..4 {
            for j in 0..4 {
                if i == j {
                    assert!(correlations.get(i, j).is_nan());
                    continue;
                }
                let expected = pearson_complete(matrix.row(i), matrix.row(j), 3);
                let observed = correlations.get(i, j);
                assert!(
                    (expected.is_nan() && observed.is_nan()) || expected == observed,
                    "pair ({i}, {j})"
                );
            }
        }
    }

    #[test]
    fn test_condensed_layout_follows_row_order() {
        let (matrix, _) = fixtures::correlated_pair();
        let correlations = CorrelationMatrix::from_matrix(&matrix, 3);
        assert_eq!(correlations.n_pairs(), 45);
        let expected = (0..10)
            .tuple_combinations()
            .map(|(i, j)| pearson_complete(matrix.row(i), matrix.row(j), 3))
            .collect::<Vec<_>>();
        assert_eq!(correlations.values, expected);
        assert_relative_eq!(correlations.get(1, 0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_moments_skip_undefined_pairs() {
        let correlations = CorrelationMatrix::from_matrix(&matrix(), 3);
        // every pair with the constant row D is undefined
        assert_eq!(correlations.moments().n, 3);
        assert_eq!(correlations.moments_within(&[0, 1, 3]).n, 1);
    }

    #[test]
    fn test_outgroup_is_background_minus_ingroup() {
        let matrix = matrix();
        let correlations = CorrelationMatrix::from_matrix(&matrix, 3);
        let background = correlations.moments();
        let result = score_pathway("AB", &[0, 1], &correlations, &background);

        assert_eq!(result.ingroup_n, 1);
        assert_relative_eq!(result.ingroup_mean, correlations.get(0, 1));
        assert_eq!(result.outgroup_n, 2);
        let expected = (correlations.get(0, 2) + correlations.get(1, 2)) / 2.0;
        assert_relative_eq!(result.outgroup_mean, expected, epsilon = 1e-12);
    }
}
