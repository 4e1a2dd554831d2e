use std::collections::{HashMap, HashSet};

use derive_new::new;
use itertools::Itertools;

use crate::error::{Error, Result};

/// One observation of the long-format input table
#[derive(Debug, Clone, PartialEq, new)]
pub struct Record {
    pub feature: String,
    pub sample: String,
    pub value: Option<f64>,
    /// Values of the table's metadata columns, in column order
    pub metadata: Vec<String>,
}

/// A fully materialized long-format table: one row per (feature, sample)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongTable {
    pub metadata_columns: Vec<String>,
    pub records: Vec<Record>,
}

impl LongTable {
    pub fn new(metadata_columns: Vec<String>) -> Self {
        Self {
            metadata_columns,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Per-sample value of a metadata column, in order of first appearance
    ///
    /// The first record seen for a sample decides its value.
    pub fn sample_metadata(&self, column: &str) -> Result<Vec<(String, String)>> {
        let index = self
            .metadata_columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| Error::config(format!("unknown metadata column: {column}")))?;
        Ok(self
            .records
            .iter()
            .unique_by(|r| r.sample.clone())
            .map(|r| {
                let value = r.metadata.get(index).cloned().unwrap_or_default();
                (r.sample.clone(), value)
            })
            .collect())
    }

    /// Reshape into a features-by-samples matrix
    ///
    /// Features and samples keep their order of first appearance. Repeated
    /// (feature, sample) observations are averaged over their present values;
    /// non-finite values count as missing.
    pub fn pivot(&self) -> ExpressionMatrix {
        let features = self
            .records
            .iter()
            .map(|r| r.feature.as_str())
            .unique()
            .map(String::from)
            .collect::<Vec<_>>();
        let samples = self
            .records
            .iter()
            .map(|r| r.sample.as_str())
            .unique()
            .map(String::from)
            .collect::<Vec<_>>();
        let feature_index = index_of(&features);
        let sample_index = index_of(&samples);

        let mut sums = vec![(0.0, 0usize); features.len() * samples.len()];
        for record in &self.records {
            let Some(value) = record.value.filter(|v| v.is_finite()) else {
                continue;
            };
            let cell = feature_index[record.feature.as_str()] * samples.len()
                + sample_index[record.sample.as_str()];
            sums[cell].0 += value;
            sums[cell].1 += 1;
        }
        let values = sums
            .into_iter()
            .map(|(sum, n)| (n > 0).then(|| sum / n as f64))
            .collect();

        ExpressionMatrix {
            features,
            samples,
            values,
        }
    }
}

fn index_of(names: &[String]) -> HashMap<&str, usize> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect()
}

/// A rectangular features-by-samples matrix of optional expression values
///
/// Stored row-major: the cells of one feature are contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionMatrix {
    features: Vec<String>,
    samples: Vec<String>,
    values: Vec<Option<f64>>,
}

impl ExpressionMatrix {
    /// Builds a matrix from one row of cells per feature
    pub fn from_rows(
        features: Vec<String>,
        samples: Vec<String>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if rows.len() != features.len() {
            return Err(Error::config(format!(
                "{} rows supplied for {} features",
                rows.len(),
                features.len()
            )));
        }
        if let Some((i, row)) = rows.iter().find_position(|r| r.len() != samples.len()) {
            return Err(Error::config(format!(
                "row {} ({}) has {} cells, expected {}",
                i,
                features[i],
                row.len(),
                samples.len()
            )));
        }
        Ok(Self {
            features,
            samples,
            values: rows.into_iter().flatten().collect(),
        })
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty() || self.samples.is_empty()
    }

    pub fn row(&self, i: usize) -> &[Option<f64>] {
        let n = self.samples.len();
        &self.values[i * n..(i + 1) * n]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<f64>]> {
        // chunks panics on zero; a matrix without samples has no cells
        self.values.chunks(self.samples.len().max(1))
    }

    pub fn get(&self, feature: usize, sample: usize) -> Option<f64> {
        self.values[feature * self.samples.len() + sample]
    }

    /// Row index of every feature, by identifier
    pub fn feature_index(&self) -> HashMap<&str, usize> {
        index_of(&self.features)
    }

    /// The same features and samples with new cell values
    pub(crate) fn with_values(&self, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            features: self.features.clone(),
            samples: self.samples.clone(),
            values,
        }
    }

    /// Checks the matrix can take part in an enrichment run
    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(Error::config("expression matrix has no features"));
        }
        if self.samples.is_empty() {
            return Err(Error::config("expression matrix has no samples"));
        }
        Ok(())
    }
}

/// Two disjoint sets of samples compared by the enrichment comparison
///
/// Samples are named, never positional, and resolved against a matrix's
/// columns at comparison time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGrouping {
    primary: Vec<String>,
    secondary: Vec<String>,
}

impl SampleGrouping {
    pub fn new<I, J, S, T>(primary: I, secondary: J) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let primary = primary
            .into_iter()
            .map(Into::<String>::into)
            .unique()
            .collect::<Vec<_>>();
        let secondary = secondary
            .into_iter()
            .map(Into::<String>::into)
            .unique()
            .collect::<Vec<_>>();
        if primary.is_empty() || secondary.is_empty() {
            return Err(Error::config("both sample groups must be non-empty"));
        }
        let primary_set = primary.iter().collect::<HashSet<_>>();
        if let Some(shared) = secondary.iter().find(|s| primary_set.contains(s)) {
            return Err(Error::config(format!(
                "sample {shared} is assigned to both groups"
            )));
        }
        Ok(Self { primary, secondary })
    }

    /// Groups samples by the value of a metadata column
    ///
    /// Samples whose value is in neither list are left out of the comparison.
    pub fn from_metadata(
        table: &LongTable,
        column: &str,
        primary_values: &[&str],
        secondary_values: &[&str],
    ) -> Result<Self> {
        let mut primary = Vec::new();
        let mut secondary = Vec::new();
        for (sample, value) in table.sample_metadata(column)? {
            let in_primary = primary_values.contains(&value.as_str());
            let in_secondary = secondary_values.contains(&value.as_str());
            match (in_primary, in_secondary) {
                (true, true) => {
                    return Err(Error::config(format!(
                        "value {value} of column {column} is listed for both groups"
                    )))
                }
                (true, false) => primary.push(sample),
                (false, true) => secondary.push(sample),
                (false, false) => {}
            }
        }
        Self::new(primary, secondary)
    }

    pub fn primary(&self) -> &[String] {
        &self.primary
    }

    pub fn secondary(&self) -> &[String] {
        &self.secondary
    }

    /// Column indices of the (primary, secondary) samples within `matrix`
    pub fn resolve(&self, matrix: &ExpressionMatrix) -> Result<(Vec<usize>, Vec<usize>)> {
        let columns = index_of(matrix.samples());
        let lookup = |names: &[String]| {
            names
                .iter()
                .map(|name| {
                    columns.get(name.as_str()).copied().ok_or_else(|| {
                        Error::config(format!("sample {name} is not a column of the matrix"))
                    })
                })
                .collect::<Result<Vec<_>>>()
        };
        Ok((lookup(&self.primary)?, lookup(&self.secondary)?))
    }
}
