use std::io::Read;
use std::path::{Path, PathBuf};

use bon::Builder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::matrix::{LongTable, Record};

/// Anything that can hand over the cohort's long-format expression table
///
/// Transport and credentials are the implementor's concern; the table must be
/// fully materialized when `fetch` returns.
pub trait DataSource: Send + Sync {
    fn fetch(&self) -> Result<LongTable>;
}

/// Names of the columns holding the feature, sample and value of a record
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct TsvColumns {
    #[builder(default = "gene".to_string())]
    pub feature: String,
    #[builder(default = "sample".to_string())]
    pub sample: String,
    #[builder(default = "value".to_string())]
    pub value: String,
}

impl Default for TsvColumns {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Reads a tab-separated long table with a header row from disk
#[derive(Debug, Clone)]
pub struct TsvSource {
    path: PathBuf,
    columns: TsvColumns,
}

impl TsvSource {
    pub fn new(path: impl AsRef<Path>, columns: TsvColumns) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            columns,
        }
    }
}

impl DataSource for TsvSource {
    fn fetch(&self) -> Result<LongTable> {
        debug!("Reading long table from {}", self.path.display());
        let file = std::fs::File::open(&self.path)?;
        read_long_table(file, &self.columns)
    }
}

/// A table that is already in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    table: LongTable,
}

impl MemorySource {
    pub fn new(table: LongTable) -> Self {
        Self { table }
    }
}

impl DataSource for MemorySource {
    fn fetch(&self) -> Result<LongTable> {
        Ok(self.table.clone())
    }
}

/// Parses a tab-separated long table
///
/// Every column other than the feature, sample and value columns is kept as
/// sample metadata. Empty, `NA`, `NaN`, `null` and infinite values are
/// missing.
pub fn read_long_table<R: Read>(reader: R, columns: &TsvColumns) -> Result<LongTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .quoting(false)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::parse(1, format!("missing column: {name}")))
    };
    let feature = position(&columns.feature)?;
    let sample = position(&columns.sample)?;
    let value = position(&columns.value)?;
    let metadata = (0..headers.len())
        .filter(|i| ![feature, sample, value].contains(i))
        .collect::<Vec<_>>();

    let mut table = LongTable::new(metadata.iter().map(|&i| headers[i].to_string()).collect());
    for row in reader.records() {
        let row = row?;
        let line = row.position().map_or(0, |p| p.line());
        let parsed = parse_value(&row[value]).map_err(|message| Error::parse(line, message))?;
        table.push(Record::new(
            row[feature].to_string(),
            row[sample].to_string(),
            parsed,
            metadata.iter().map(|&i| row[i].to_string()).collect(),
        ));
    }
    debug!(
        "Parsed {} records with {} metadata columns",
        table.len(),
        table.metadata_columns.len()
    );
    Ok(table)
}

fn parse_value(raw: &str) -> std::result::Result<Option<f64>, String> {
    let raw = raw.trim();
    if raw.is_empty() || ["na", "nan", "null"].contains(&raw.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(|v| v.is_finite().then_some(v))
        .map_err(|_| format!("invalid expression value: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TABLE: &str = "\
gene\tsample\tvalue\tfab\tsex
TP53\tp1\t1.5\tM4\tF
TP53\tp2\tNA\tM5\tM
KRAS\tp1\t-0.25\tM4\tF
KRAS\tp2\t\tM5\tM
";

    #[test]
    fn test_read_long_table() {
        let table = read_long_table(TABLE.as_bytes(), &TsvColumns::default()).unwrap();
        assert_eq!(table.metadata_columns, vec!["fab", "sex"]);
        assert_eq!(table.len(), 4);
        assert_eq!(table.records[0].value, Some(1.5));
        assert_eq!(table.records[1].value, None);
        assert_eq!(table.records[2].value, Some(-0.25));
        assert_eq!(table.records[3].value, None);
        assert_eq!(table.records[3].metadata, vec!["M5", "M"]);
    }

    #[test]
    fn test_missing_value_spellings() {
        let raw = "gene\tsample\tvalue\n\
                   TP53\tp1\tNaN\n\
                   TP53\tp2\tnull\n\
                   TP53\tp3\tinf\n\
                   TP53\tp4\t-Infinity\n\
                   TP53\tp5\t 3e-1 \n";
        let table = read_long_table(raw.as_bytes(), &TsvColumns::default()).unwrap();
        let values = table.records.iter().map(|r| r.value).collect::<Vec<_>>();
        assert_eq!(values, vec![None, None, None, None, Some(0.3)]);
    }

    #[test]
    fn test_tsv_source_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TABLE.as_bytes()).unwrap();
        let source = TsvSource::new(file.path(), TsvColumns::default());
        let expected = read_long_table(TABLE.as_bytes(), &TsvColumns::default()).unwrap();
        assert_eq!(source.fetch().unwrap(), expected);
    }

    #[test]
    fn test_tsv_source_missing_file() {
        let source = TsvSource::new("/nonexistent/cohort.tsv", TsvColumns::default());
        assert!(matches!(source.fetch(), Err(Error::Io(_))));
    }

    #[test]
    fn test_custom_columns() {
        let raw = "protein\tpatient\tintensity\nMYC\tp1\t2\n";
        let columns = TsvColumns::builder()
            .feature("protein".to_string())
            .sample("patient".to_string())
            .value("intensity".to_string())
            .build();
        let table = read_long_table(raw.as_bytes(), &columns).unwrap();
        assert!(table.metadata_columns.is_empty());
        assert_eq!(table.records[0].feature, "MYC");
        assert_eq!(table.records[0].value, Some(2.0));
    }

    #[test]
    fn test_missing_column() {
        let raw = "gene\tsample\nTP53\tp1\n";
        let result = read_long_table(raw.as_bytes(), &TsvColumns::default());
        assert!(matches!(result, Err(Error::Parse { line: 1, .. })));
    }

    #[test]
    fn test_invalid_value_reports_line() {
        let raw = "gene\tsample\tvalue\nTP53\tp1\t1.0\nTP53\tp2\thigh\n";
        let result = read_long_table(raw.as_bytes(), &TsvColumns::default());
        assert!(matches!(result, Err(Error::Parse { line: 3, .. })));
    }

    #[test]
    fn test_ragged_row() {
        let raw = "gene\tsample\tvalue\nTP53\tp1\n";
        let result = read_long_table(raw.as_bytes(), &TsvColumns::default());
        assert!(matches!(result, Err(Error::Csv(_))));
    }

    #[test]
    fn test_memory_source() {
        let table = read_long_table(TABLE.as_bytes(), &TsvColumns::default()).unwrap();
        let source = MemorySource::new(table.clone());
        assert_eq!(source.fetch().unwrap(), table);
    }
}
