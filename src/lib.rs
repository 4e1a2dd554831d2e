//! pathenrich: pathway enrichment for proteomic expression cohorts
//!
//! This library scores curated pathways against a genes-by-samples
//! expression matrix with two procedures:
//! - correlation enrichment, which asks whether a pathway's members are more
//!   correlated with each other than the background of all gene pairs
//! - enrichment comparison, which asks whether a pathway's members change
//!   between two groups of samples more than the rest of the matrix
//!
//! The main components of this library are:
//! - `DataSource`: Pluggable provider of the long-format input table
//! - `normalize`: Row-wise centering and scaling of the expression matrix
//! - `EnrichmentEngine`: Both enrichment procedures over a `GeneSetDb`
//! - `Correction`: Multiple-testing correction over a complete run
//! - `rank`: Significance filtering, ordering and truncation
//! - `Pipeline`: All of the above for one analysis run
//! - `write_table` / `write_bar_chart`: Text table and SVG chart of ranked results

mod comparison;
mod config;
mod correction;
mod correlation;
mod engine;
mod error;
mod geneset;
mod math;
mod matrix;
mod normalize;
mod pipeline;
mod report;
mod results;
mod source;

#[cfg(test)]
mod fixtures;

pub use config::{EngineConfig, RankConfig, RankKey};
pub use correction::Correction;
pub use engine::EnrichmentEngine;
pub use error::{Error, Result};
pub use geneset::{GeneSet, GeneSetDb};
pub use matrix::{ExpressionMatrix, LongTable, Record, SampleGrouping};
pub use normalize::normalize;
pub use pipeline::{EnrichmentRun, Pipeline};
pub use report::{write_bar_chart, write_table, BarMetric};
pub use results::{rank, Analysis, PathwayResult};
pub use source::{read_long_table, DataSource, MemorySource, TsvColumns, TsvSource};
