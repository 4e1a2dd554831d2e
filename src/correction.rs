use adjustp::{adjust, Procedure};

use crate::results::PathwayResult;

/// Multiple-testing correction applied across one run's pathways
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Correction {
    Identity,
    #[default]
    BenjaminiHochberg,
    Bonferroni,
}

impl Correction {
    /// Adjusts `pvalues`, leaving undefined ones out of the family
    ///
    /// NaN p-values do not count towards the number of tests and map to `None`.
    pub fn adjust(&self, pvalues: &[f64]) -> Vec<Option<f64>> {
        let tested = pvalues
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_nan())
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let mut adjusted = vec![None; pvalues.len()];
        if tested.is_empty() {
            return adjusted;
        }

        let family = tested.iter().map(|&i| pvalues[i]).collect::<Vec<_>>();
        let corrected = match self {
            Correction::Identity => family,
            Correction::BenjaminiHochberg => adjust(&family, Procedure::BenjaminiHochberg),
            Correction::Bonferroni => adjust(&family, Procedure::Bonferroni),
        };
        for (&i, q) in tested.iter().zip(corrected) {
            adjusted[i] = Some(q.min(1.0));
        }
        adjusted
    }

    /// Sets `padj` on every result of a run
    ///
    /// Must see the complete run; correcting a filtered subset understates
    /// the number of tests.
    pub fn apply(&self, results: &mut [PathwayResult]) {
        let pvalues = results.iter().map(|r| r.pvalue).collect::<Vec<_>>();
        for (result, padj) in results.iter_mut().zip(self.adjust(&pvalues)) {
            result.padj = padj;
        }
    }
}
