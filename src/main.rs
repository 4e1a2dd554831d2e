use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pathenrich::{
    write_bar_chart, write_table, BarMetric, Correction, EngineConfig, GeneSetDb, Pipeline,
    RankConfig, RankKey, SampleGrouping, TsvColumns, TsvSource,
};

/// Pathway enrichment of a proteomic expression cohort
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Long-format expression table, tab separated with a header row
    #[arg(short, long)]
    expression: PathBuf,

    /// Pathway database in GMT format
    #[arg(short, long)]
    gene_sets: PathBuf,

    #[arg(long, default_value = "gene")]
    feature_column: String,

    #[arg(long, default_value = "sample")]
    sample_column: String,

    #[arg(long, default_value = "value")]
    value_column: String,

    /// Adjusted p-value below which a pathway is reported
    #[arg(long, default_value_t = 0.05)]
    alpha: f64,

    /// Maximum number of pathways reported
    #[arg(long, default_value_t = 20)]
    top_k: usize,

    /// Pathways with fewer genes present in the matrix are skipped
    #[arg(long, default_value_t = 2)]
    min_genes: usize,

    #[arg(long, value_enum, default_value_t = CorrectionArg::Fdr)]
    correction: CorrectionArg,

    /// Order of the reported pathways; defaults to the analysis' own order
    #[arg(long, value_enum)]
    rank_by: Option<RankArg>,

    /// Write an SVG bar chart of the reported pathways to this file
    #[arg(long)]
    chart: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ChartArg::Padj)]
    chart_metric: ChartArg,

    /// Chart width in pixels
    #[arg(long, default_value_t = 800)]
    chart_width: u32,

    #[command(subcommand)]
    analysis: AnalysisCommand,
}

#[derive(Debug, Subcommand)]
enum AnalysisCommand {
    /// Pathways whose members are unusually correlated with each other
    Correlation,
    /// Pathways whose members change between two groups of samples
    Compare {
        /// Metadata column holding the sample groups
        #[arg(long)]
        group_column: String,
        /// Values of the group column forming the primary group
        #[arg(long, value_delimiter = ',', required = true)]
        primary: Vec<String>,
        /// Values of the group column forming the secondary group
        #[arg(long, value_delimiter = ',', required = true)]
        secondary: Vec<String>,
        /// Absolute per-gene z-score at which a gene counts as changed
        #[arg(long, default_value_t = 1.96)]
        change_threshold: f64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CorrectionArg {
    None,
    Fdr,
    Bonferroni,
}

impl From<CorrectionArg> for Correction {
    fn from(arg: CorrectionArg) -> Self {
        match arg {
            CorrectionArg::None => Correction::Identity,
            CorrectionArg::Fdr => Correction::BenjaminiHochberg,
            CorrectionArg::Bonferroni => Correction::Bonferroni,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RankArg {
    IngroupMean,
    Pvalue,
}

impl From<RankArg> for RankKey {
    fn from(arg: RankArg) -> Self {
        match arg {
            RankArg::IngroupMean => RankKey::IngroupMeanDesc,
            RankArg::Pvalue => RankKey::PvalueAsc,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChartArg {
    IngroupMean,
    Zscore,
    Padj,
}

impl From<ChartArg> for BarMetric {
    fn from(arg: ChartArg) -> Self {
        match arg {
            ChartArg::IngroupMean => BarMetric::IngroupMean,
            ChartArg::Zscore => BarMetric::Zscore,
            ChartArg::Padj => BarMetric::NegLog10Padj,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pathenrich=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let gene_sets = GeneSetDb::from_gmt_path(&cli.gene_sets)
        .with_context(|| format!("reading gene sets from {}", cli.gene_sets.display()))?;
    let columns = TsvColumns::builder()
        .feature(cli.feature_column.clone())
        .sample(cli.sample_column.clone())
        .value(cli.value_column.clone())
        .build();
    let source = TsvSource::new(&cli.expression, columns);

    let change_threshold = match &cli.analysis {
        AnalysisCommand::Compare {
            change_threshold, ..
        } => *change_threshold,
        AnalysisCommand::Correlation => EngineConfig::default().change_threshold,
    };
    let pipeline = Pipeline::builder()
        .gene_sets(&gene_sets)
        .engine(
            EngineConfig::builder()
                .min_genes(cli.min_genes)
                .change_threshold(change_threshold)
                .build(),
        )
        .rank(
            RankConfig::builder()
                .alpha(cli.alpha)
                .top_k(cli.top_k)
                .maybe_key(cli.rank_by.map(RankKey::from))
                .build(),
        )
        .correction(cli.correction.into())
        .build();

    let table = pipeline
        .load(&source)
        .with_context(|| format!("reading expression table {}", cli.expression.display()))?;
    let matrix = pipeline.prepare(&table)?;

    let run = match &cli.analysis {
        AnalysisCommand::Correlation => pipeline.correlation(&matrix)?,
        AnalysisCommand::Compare {
            group_column,
            primary,
            secondary,
            ..
        } => {
            let primary = primary.iter().map(String::as_str).collect::<Vec<_>>();
            let secondary = secondary.iter().map(String::as_str).collect::<Vec<_>>();
            let grouping =
                SampleGrouping::from_metadata(&table, group_column, &primary, &secondary)
                    .with_context(|| format!("grouping samples by {group_column}"))?;
            pipeline.comparison(&matrix, &grouping)?
        }
    };

    write_table(&mut io::stdout().lock(), &run)?;
    if let Some(path) = &cli.chart {
        let mut file = BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        );
        write_bar_chart(&mut file, &run.ranked, cli.chart_metric.into(), cli.chart_width)?;
        file.flush()?;
        info!("Wrote chart to {}", path.display());
    }
    Ok(())
}
