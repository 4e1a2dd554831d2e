use rayon::prelude::*;
use tracing::warn;

use crate::math::{arithmetic_mean, present_values, sample_variance};
use crate::matrix::ExpressionMatrix;

/// Centers and scales every feature of the matrix
///
/// Each row has its mean subtracted and is divided by its sample standard
/// deviation, both taken over the present cells. Rows whose deviation is zero
/// or undefined become NaN in every present cell; missing cells stay missing.
pub fn normalize(matrix: &ExpressionMatrix) -> ExpressionMatrix {
    let rows = matrix
        .rows()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(normalize_row)
        .collect::<Vec<_>>();

    let degenerate = rows.iter().filter(|(_, ok)| !ok).count();
    if degenerate > 0 {
        warn!(
            "{} of {} features have zero or undefined variance and were set to NaN",
            degenerate,
            matrix.n_features()
        );
    }

    let values = rows.into_iter().flat_map(|(row, _)| row).collect();
    matrix.with_values(values)
}

/// Returns the scaled row and whether its deviation was usable
fn normalize_row(row: &[Option<f64>]) -> (Vec<Option<f64>>, bool) {
    let present = present_values(row).collect::<Vec<_>>();
    let mean = arithmetic_mean(&present);
    let sd = sample_variance(&present).sqrt();
    let usable = sd.is_finite() && sd > 0.0;
    let scaled = row
        .iter()
        .map(|cell| {
            cell.map(|x| if usable { (x - mean) / sd } else { f64::NAN })
        })
        .collect();
    (scaled, usable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn matrix() -> ExpressionMatrix {
        ExpressionMatrix::from_rows(
            vec!["A".into(), "B".into(), "C".into()],
            vec!["s1".into(), "s2".into(), "s3".into(), "s4".into()],
            vec![
                vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
                vec![Some(7.0), Some(7.0), Some(7.0), Some(7.0)],
                vec![Some(10.0), None, Some(-2.0), Some(4.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rows_are_standardized() {
        let normalized = normalize(&matrix());
        for i in [0, 2] {
            let present = present_values(normalized.row(i)).collect::<Vec<_>>();
            assert_relative_eq!(arithmetic_mean(&present), 0.0, epsilon = 1e-12);
            assert_relative_eq!(sample_variance(&present).sqrt(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_constant_row_is_nan() {
        let normalized = normalize(&matrix());
        assert!(normalized
            .row(1)
            .iter()
            .all(|cell| cell.is_some_and(f64::is_nan)));
    }

    #[test]
    fn test_missing_cells_stay_missing() {
        let normalized = normalize(&matrix());
        assert_eq!(normalized.get(2, 1), None);
        assert_relative_eq!(normalized.get(2, 0).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_value_row_is_nan() {
        let matrix = ExpressionMatrix::from_rows(
            vec!["A".into()],
            vec!["s1".into(), "s2".into()],
            vec![vec![Some(3.0), None]],
        )
        .unwrap();
        let normalized = normalize(&matrix);
        assert!(normalized.get(0, 0).unwrap().is_nan());
        assert_eq!(normalized.get(0, 1), None);
    }

    #[test]
    fn test_input_is_untouched() {
        let original = matrix();
        let _ = normalize(&original);
        assert_eq!(original, matrix());
    }
}
