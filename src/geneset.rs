use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use derive_new::new;
use itertools::Itertools;
use tracing::debug;

use crate::error::{Error, Result};

/// A named pathway and its member gene identifiers
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct GeneSet {
    pub name: String,
    pub genes: Vec<String>,
}

impl GeneSet {
    /// Row indices of the distinct members present in the matrix, ascending
    pub(crate) fn present_in(&self, feature_index: &HashMap<&str, usize>) -> Vec<usize> {
        self.genes
            .iter()
            .filter_map(|gene| feature_index.get(gene.as_str()).copied())
            .sorted_unstable()
            .dedup()
            .collect()
    }
}

/// An ordered pathway database
///
/// Iteration order is insertion order; the engine reports pathways in this
/// order and ranking ties keep it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneSetDb {
    sets: Vec<GeneSet>,
}

impl GeneSetDb {
    pub fn new(sets: Vec<GeneSet>) -> Self {
        Self { sets }
    }

    pub fn insert(&mut self, set: GeneSet) {
        self.sets.push(set);
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeneSet> {
        self.sets.iter()
    }

    pub fn get(&self, name: &str) -> Option<&GeneSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    /// Reads gene sets in GMT format
    ///
    /// One set per line: name, description, then member genes, tab separated.
    pub fn from_gmt<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let mut db = Self::default();
        for row in reader.records() {
            let row = row?;
            let line = row.position().map_or(0, |p| p.line());
            let name = row.get(0).map(str::trim).unwrap_or_default();
            if name.is_empty() {
                if row.iter().all(|field| field.trim().is_empty()) {
                    continue;
                }
                return Err(Error::parse(line, "gene set without a name"));
            }
            let genes = row
                .iter()
                .skip(2)
                .map(str::trim)
                .filter(|gene| !gene.is_empty())
                .map(String::from)
                .collect();
            db.insert(GeneSet::new(name.to_string(), genes));
        }
        debug!("Loaded {} gene sets", db.len());
        Ok(db)
    }

    pub fn from_gmt_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_gmt(file)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::config("gene set database is empty"));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a GeneSetDb {
    type Item = &'a GeneSet;
    type IntoIter = std::slice::Iter<'a, GeneSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.iter()
    }
}

impl FromIterator<GeneSet> for GeneSetDb {
    fn from_iter<T: IntoIterator<Item = GeneSet>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
