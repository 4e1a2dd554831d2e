use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    comparison::{self, Tally},
    config::EngineConfig,
    correlation::{self, CorrelationMatrix},
    error::Result,
    geneset::{GeneSet, GeneSetDb},
    matrix::{ExpressionMatrix, SampleGrouping},
    results::PathwayResult,
};

/// Scores every pathway of a gene-set database against an expression matrix
///
/// Both procedures return raw, uncorrected results in database order. A
/// pathway with fewer than `min_genes` members present in the matrix yields no
/// result at all.
pub struct EnrichmentEngine<'a> {
    gene_sets: &'a GeneSetDb,
    config: EngineConfig,
}
impl<'a> EnrichmentEngine<'a> {
    pub fn new(gene_sets: &'a GeneSetDb, config: EngineConfig) -> Self {
        Self { gene_sets, config }
    }

    /// Correlation enrichment
    ///
    /// Compares the correlations among a pathway's members with those of
    /// every gene pair that has at least one gene outside the pathway.
    pub fn correlation_enrichment(&self, matrix: &ExpressionMatrix) -> Result<Vec<PathwayResult>> {
        self.validate(matrix)?;
        let pathways = self.tested_pathways(matrix);

        let correlations = CorrelationMatrix::from_matrix(matrix, self.config.min_observations);
        let background = correlations.moments();
        debug!(
            "Background: {} of {} gene pairs have a defined correlation",
            background.n,
            correlations.n_pairs()
        );

        let results = pathways
            .par_iter()
            .map(|(set, members)| {
                correlation::score_pathway(&set.name, members, &correlations, &background)
            })
            .collect::<Vec<_>>();
        info!(
            "Correlation enrichment scored {} of {} pathways",
            results.len(),
            self.gene_sets.len()
        );
        Ok(results)
    }

    /// Enrichment comparison between the two groups of `grouping`
    ///
    /// Each gene gets a Welch z-score of primary against secondary samples;
    /// pathways are scored on their members' z-scores and on how many of them
    /// pass `change_threshold` compared to the rest of the matrix.
    pub fn enrichment_comparison(
        &self,
        matrix: &ExpressionMatrix,
        grouping: &SampleGrouping,
    ) -> Result<Vec<PathwayResult>> {
        self.validate(matrix)?;
        let (primary, secondary) = grouping.resolve(matrix)?;
        let pathways = self.tested_pathways(matrix);

        let statistics = comparison::gene_statistics(matrix, &primary, &secondary);
        let threshold = self.config.change_threshold;
        let background = Tally::from_statistics(statistics.iter().copied(), threshold);
        debug!(
            "Background: {} of {} genes have a defined statistic, {} changed",
            background.moments.n,
            statistics.len(),
            background.changed
        );

        let results = pathways
            .par_iter()
            .map(|(set, members)| {
                comparison::score_pathway(&set.name, members, &statistics, &background, threshold)
            })
            .collect::<Vec<_>>();
        info!(
            "Enrichment comparison of {} vs {} samples scored {} of {} pathways",
            primary.len(),
            secondary.len(),
            results.len(),
            self.gene_sets.len()
        );
        Ok(results)
    }

    fn validate(&self, matrix: &ExpressionMatrix) -> Result<()> {
        self.config.validate()?;
        self.gene_sets.validate()?;
        matrix.validate()
    }

    /// Pathways with enough present members, paired with those members' rows
    fn tested_pathways(&self, matrix: &ExpressionMatrix) -> Vec<(&'a GeneSet, Vec<usize>)> {
        let index = matrix.feature_index();
        self.gene_sets
            .iter()
            .filter_map(|set| {
                let members = set.present_in(&index);
                if members.len() < self.config.min_genes {
                    debug!("Skipping {} ({} genes present)", set.name, members.len());
                    return None;
                }
                Some((set, members))
            })
            .collect()
    }
}
