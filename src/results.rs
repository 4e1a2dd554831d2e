use std::cmp::Ordering;

use bon::Builder;

use crate::config::{RankConfig, RankKey};

/// Which enrichment procedure produced a set of results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    Correlation,
    Comparison,
}

impl Analysis {
    /// The order results of this analysis are reported in
    pub fn rank_key(&self) -> RankKey {
        match self {
            Analysis::Correlation => RankKey::IngroupMeanDesc,
            Analysis::Comparison => RankKey::PvalueAsc,
        }
    }
}

/// Statistics of one pathway from one enrichment run
///
/// `padj` is unset until the run's p-values have been corrected.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct PathwayResult {
    pub pathway: String,
    pub ingroup_n: usize,
    pub ingroup_mean: f64,
    pub outgroup_n: usize,
    pub outgroup_mean: f64,
    /// Aggregate discriminative score (comparison only)
    pub zscore: Option<f64>,
    /// Over-representation of changed genes (comparison only)
    pub oddsratio: Option<f64>,
    /// Raw p-value, NaN when the test is undefined
    pub pvalue: f64,
    pub padj: Option<f64>,
}

impl PathwayResult {
    fn is_significant(&self, alpha: f64) -> bool {
        self.padj.is_some_and(|padj| padj < alpha)
    }
}

/// Keeps the significant results, sorted by `config.key` (ascending p-value
/// when unset), at most `config.top_k`
///
/// The sort is stable, so ties keep the order the engine reported pathways
/// in. Records with an undefined key sort last.
pub fn rank(results: &[PathwayResult], config: &RankConfig) -> Vec<PathwayResult> {
    let mut kept = results
        .iter()
        .filter(|r| r.is_significant(config.alpha))
        .cloned()
        .collect::<Vec<_>>();
    match config.key.unwrap_or(RankKey::PvalueAsc) {
        RankKey::IngroupMeanDesc => {
            kept.sort_by(|a, b| nan_last(b.ingroup_mean, a.ingroup_mean, true))
        }
        RankKey::PvalueAsc => kept.sort_by(|a, b| nan_last(a.pvalue, b.pvalue, false)),
    }
    kept.truncate(config.top_k);
    kept
}

/// Compares finite keys normally and pushes NaN after every number
///
/// `swapped` is set when the caller passes `(b, a)` to sort descending.
fn nan_last(x: f64, y: f64, swapped: bool) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (false, false) => x.total_cmp(&y),
        (true, true) => Ordering::Equal,
        (true, false) if swapped => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, true) if swapped => Ordering::Greater,
        (false, true) => Ordering::Less,
    }
}
