use bon::Builder;
use tracing::info;

use crate::{
    config::{EngineConfig, RankConfig},
    correction::Correction,
    engine::EnrichmentEngine,
    error::Result,
    geneset::GeneSetDb,
    matrix::{ExpressionMatrix, LongTable, SampleGrouping},
    normalize::normalize,
    results::{rank, Analysis, PathwayResult},
    source::DataSource,
};

/// Every corrected result of one enrichment run and its ranked selection
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentRun {
    pub analysis: Analysis,
    /// All tested pathways in database order, with adjusted p-values
    pub results: Vec<PathwayResult>,
    /// Significant pathways, ordered and truncated
    pub ranked: Vec<PathwayResult>,
}

/// One analysis from raw long table to ranked pathways
///
/// Unless `rank.key` is set, results are ordered the way their analysis
/// reads best: descending in-group mean for correlation enrichment,
/// ascending p-value for comparisons.
#[derive(Debug, Clone, Builder)]
pub struct Pipeline<'a> {
    gene_sets: &'a GeneSetDb,
    #[builder(default)]
    engine: EngineConfig,
    #[builder(default)]
    rank: RankConfig,
    #[builder(default)]
    correction: Correction,
}

impl<'a> Pipeline<'a> {
    pub fn load(&self, source: &dyn DataSource) -> Result<LongTable> {
        let table = source.fetch()?;
        info!("Fetched {} records", table.len());
        Ok(table)
    }

    /// Pivots the long table and normalizes every feature
    pub fn prepare(&self, table: &LongTable) -> Result<ExpressionMatrix> {
        let matrix = table.pivot();
        matrix.validate()?;
        info!(
            "Expression matrix: {} features x {} samples",
            matrix.n_features(),
            matrix.n_samples()
        );
        Ok(normalize(&matrix))
    }

    pub fn correlation(&self, matrix: &ExpressionMatrix) -> Result<EnrichmentRun> {
        self.rank.validate()?;
        let results = self.engine().correlation_enrichment(matrix)?;
        Ok(self.finish(Analysis::Correlation, results))
    }

    pub fn comparison(
        &self,
        matrix: &ExpressionMatrix,
        grouping: &SampleGrouping,
    ) -> Result<EnrichmentRun> {
        self.rank.validate()?;
        let results = self.engine().enrichment_comparison(matrix, grouping)?;
        Ok(self.finish(Analysis::Comparison, results))
    }

    fn engine(&self) -> EnrichmentEngine<'a> {
        EnrichmentEngine::new(self.gene_sets, self.engine)
    }

    /// Corrects over the complete run, then filters and ranks
    fn finish(&self, analysis: Analysis, mut results: Vec<PathwayResult>) -> EnrichmentRun {
        self.correction.apply(&mut results);
        let config = RankConfig {
            key: self.rank.key.or(Some(analysis.rank_key())),
            ..self.rank
        };
        let ranked = rank(&results, &config);
        info!(
            "{} of {} pathways reported at alpha {}",
            ranked.len(),
            results.len(),
            config.alpha
        );
        EnrichmentRun {
            analysis,
            results,
            ranked,
        }
    }
}
