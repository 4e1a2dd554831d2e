//! Synthetic cohorts shared by the unit tests

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::geneset::{GeneSet, GeneSetDb};
use crate::matrix::{ExpressionMatrix, LongTable, Record, SampleGrouping};

fn names(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

fn random_row(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn cells(values: Vec<f64>) -> Vec<Option<f64>> {
    values.into_iter().map(Some).collect()
}

/// Ten genes over 24 samples: G1 is an exact linear function of G0, the
/// other eight are independent noise
pub fn correlated_pair() -> (ExpressionMatrix, GeneSetDb) {
    let n_samples = 24;
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let base = random_row(&mut rng, n_samples);
    let mut rows = vec![
        cells(base.clone()),
        cells(base.iter().map(|x| 2.0 * x + 1.0).collect()),
    ];
    for _ in 2..10 {
        rows.push(cells(random_row(&mut rng, n_samples)));
    }
    let matrix = ExpressionMatrix::from_rows(names("G", 10), names("S", n_samples), rows)
        .expect("rectangular fixture");
    let gene_sets = GeneSetDb::new(vec![GeneSet::new(
        "CORRELATED_PAIR".to_string(),
        vec!["G0".into(), "G1".into()],
    )]);
    (matrix, gene_sets)
}

/// Five genes where one is constant; the pathway holds the correlated pair
/// and the constant gene
pub fn with_constant_gene() -> (ExpressionMatrix, GeneSetDb) {
    let n_samples = 12;
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let base = random_row(&mut rng, n_samples);
    let rows = vec![
        cells(base.clone()),
        cells(base.iter().map(|x| 3.0 - x).collect()),
        cells(vec![4.0; n_samples]),
        cells(random_row(&mut rng, n_samples)),
        cells(random_row(&mut rng, n_samples)),
    ];
    let features = vec!["A", "B", "CONST", "C", "D"]
        .into_iter()
        .map(String::from)
        .collect();
    let matrix = ExpressionMatrix::from_rows(features, names("S", n_samples), rows)
        .expect("rectangular fixture");
    let gene_sets = GeneSetDb::new(vec![GeneSet::new(
        "WITH_CONSTANT".to_string(),
        vec!["A".into(), "B".into(), "CONST".into()],
    )]);
    (matrix, gene_sets)
}

/// Forty genes over six primary and six secondary samples
///
/// Secondary samples hold the primary values in reverse order, so every gene
/// has identical group means except G0..G4, whose primary values are shifted
/// up by 5. SHIFTED holds G0..G4, UNSHIFTED holds G10..G14.
pub fn shifted_members() -> (ExpressionMatrix, GeneSetDb, SampleGrouping) {
    let per_group = 6;
    let primary = names("P", per_group);
    let secondary = names("S", per_group);
    let rows = (0..40)
        .map(|g| {
            let base = (0..per_group)
                .map(|k| ((g * 7 + k * 3) % 11) as f64 / 10.0)
                .collect::<Vec<_>>();
            let shift = if g < 5 { 5.0 } else { 0.0 };
            let mut row = base.iter().map(|x| x + shift).collect::<Vec<_>>();
            row.extend(base.iter().rev());
            cells(row)
        })
        .collect();
    let samples = primary.iter().chain(secondary.iter()).cloned().collect();
    let matrix =
        ExpressionMatrix::from_rows(names("G", 40), samples, rows).expect("rectangular fixture");
    let gene_sets = [
        GeneSet::new("SHIFTED".to_string(), names("G", 5)),
        GeneSet::new(
            "UNSHIFTED".to_string(),
            (10..15).map(|i| format!("G{i}")).collect(),
        ),
    ]
    .into_iter()
    .collect::<GeneSetDb>();
    let grouping = SampleGrouping::new(primary, secondary).expect("disjoint groups");
    (matrix, gene_sets, grouping)
}

/// The shifted cohort as a long table with a subtype column
pub fn shifted_long_table() -> LongTable {
    let (matrix, _, _) = shifted_members();
    let mut table = LongTable::new(vec!["subtype".to_string()]);
    for (i, feature) in matrix.features().iter().enumerate() {
        for (j, sample) in matrix.samples().iter().enumerate() {
            let subtype = if sample.starts_with('P') { "M4" } else { "M5" };
            table.push(Record::new(
                feature.clone(),
                sample.clone(),
                matrix.get(i, j),
                vec![subtype.to_string()],
            ));
        }
    }
    table
}
