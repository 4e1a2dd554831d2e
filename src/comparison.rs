use rayon::prelude::*;

use crate::math::{present_values, welch_z, Contingency, Moments};
use crate::matrix::ExpressionMatrix;
use crate::results::PathwayResult;

/// Per-gene Welch z-scores of the primary against the secondary columns
pub fn gene_statistics(
    matrix: &ExpressionMatrix,
    primary: &[usize],
    secondary: &[usize],
) -> Vec<f64> {
    (0..matrix.n_features())
        .into_par_iter()
        .map(|i| {
            let row = matrix.row(i);
            let select = |columns: &[usize]| {
                present_values(&columns.iter().map(|&c| row[c]).collect::<Vec<_>>())
                    .collect::<Vec<_>>()
            };
            welch_z(&select(primary), &select(secondary))
        })
        .collect()
}

/// Defined statistics of a population of genes and how many of them changed
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    pub moments: Moments,
    pub changed: u64,
}

impl Tally {
    pub fn from_statistics(statistics: impl Iterator<Item = f64>, threshold: f64) -> Self {
        let mut tally = Self::default();
        for z in statistics.filter(|z| z.is_finite()) {
            tally.moments.push(z);
            if z.abs() >= threshold {
                tally.changed += 1;
            }
        }
        tally
    }

    fn without(&self, other: &Tally) -> Tally {
        Tally {
            moments: self.moments.without(&other.moments),
            changed: self.changed - other.changed,
        }
    }

    fn unchanged(&self) -> u64 {
        self.moments.n as u64 - self.changed
    }
}

/// Scores one pathway's members against every other gene with a defined statistic
pub fn score_pathway(
    pathway: &str,
    members: &[usize],
    statistics: &[f64],
    background: &Tally,
    threshold: f64,
) -> PathwayResult {
    let ingroup = Tally::from_statistics(members.iter().map(|&i| statistics[i]), threshold);
    let outgroup = background.without(&ingroup);

    let (zscore, oddsratio, pvalue) = if ingroup.moments.n == 0 {
        (f64::NAN, f64::NAN, f64::NAN)
    } else {
        let table = Contingency::new(
            ingroup.changed,
            ingroup.unchanged(),
            outgroup.changed,
            outgroup.unchanged(),
        );
        let stouffer = ingroup.moments.sum / (ingroup.moments.n as f64).sqrt();
        (stouffer, table.odds_ratio(), table.fisher_exact())
    };

    PathwayResult::builder()
        .pathway(pathway.to_string())
        .ingroup_n(ingroup.moments.n)
        .ingroup_mean(ingroup.moments.mean())
        .outgroup_n(outgroup.moments.n)
        .outgroup_mean(outgroup.moments.mean())
        .zscore(zscore)
        .oddsratio(oddsratio)
        .pvalue(pvalue)
        .build()
}
