use bon::Builder;

use crate::error::{Error, Result};

/// Settings shared by both enrichment procedures
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
pub struct EngineConfig {
    /// Pathways with fewer present genes than this are skipped
    #[builder(default = 2)]
    pub min_genes: usize,
    /// Minimum pairwise-complete observations for a correlation to be defined
    #[builder(default = 3)]
    pub min_observations: usize,
    /// Absolute per-gene z-score at which a gene counts as changed
    #[builder(default = 1.96)]
    pub change_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_genes < 2 {
            return Err(Error::config(format!(
                "min_genes must be at least 2, got {}",
                self.min_genes
            )));
        }
        if self.min_observations < 2 {
            return Err(Error::config(format!(
                "min_observations must be at least 2, got {}",
                self.min_observations
            )));
        }
        if !self.change_threshold.is_finite() || self.change_threshold < 0.0 {
            return Err(Error::config(format!(
                "change_threshold must be a finite non-negative number, got {}",
                self.change_threshold
            )));
        }
        Ok(())
    }
}

/// Sort order applied to significant results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKey {
    /// Strongest in-group signal first
    IngroupMeanDesc,
    /// Smallest raw p-value first
    PvalueAsc,
}

/// Significance filter and truncation settings
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
pub struct RankConfig {
    /// Records with an adjusted p-value at or above this are dropped
    #[builder(default = 0.05)]
    pub alpha: f64,
    /// Maximum number of records kept
    #[builder(default = 20)]
    pub top_k: usize,
    /// Sort order; unset means the order of the analysis that produced the
    /// results, or ascending p-value when ranking outside a pipeline
    pub key: Option<RankKey>,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RankConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(Error::config(format!(
                "alpha must be within (0, 1], got {}",
                self.alpha
            )));
        }
        if self.top_k == 0 {
            return Err(Error::config("top_k must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.min_genes, 2);
        assert_eq!(config.min_observations, 3);
        assert_eq!(config.change_threshold, 1.96);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_rejects_single_gene_pathways() {
        let config = EngineConfig::builder().min_genes(1).build();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_rank_defaults() {
        let config = RankConfig::default();
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.top_k, 20);
        assert_eq!(config.key, None);
    }

    #[test]
    fn test_rank_rejects_bad_alpha() {
        for alpha in [0.0, -0.1, 1.5, f64::NAN] {
            let config = RankConfig::builder().alpha(alpha).build();
            assert!(config.validate().is_err(), "alpha {alpha} accepted");
        }
    }

    #[test]
    fn test_rank_rejects_zero_top_k() {
        let config = RankConfig::builder().top_k(0).build();
        assert!(config.validate().is_err());
    }
}
