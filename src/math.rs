use approx::relative_eq;
use derive_new::new;
use statrs::distribution::{ContinuousCDF, Discrete, Hypergeometric, StudentsT};

/// Cells that take part in a computation: present and finite
pub fn present_values(row: &[Option<f64>]) -> impl Iterator<Item = f64> + '_ {
    row.iter().flatten().copied().filter(|x| x.is_finite())
}

pub fn arithmetic_mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Sample variance (n - 1 denominator); NaN for fewer than two values
pub fn sample_variance(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return f64::NAN;
    }
    let mean = arithmetic_mean(x);
    let ss = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    ss / (x.len() - 1) as f64
}

/// Pearson correlation over pairwise-complete observations
///
/// Returns NaN when fewer than `min_observations` cells are present in both
/// rows, or when either row is constant over those cells.
pub fn pearson_complete(x: &[Option<f64>], y: &[Option<f64>], min_observations: usize) -> f64 {
    let complete = || {
        x.iter().zip(y).filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
            _ => None,
        })
    };
    let (n, sum_x, sum_y) = complete().fold((0usize, 0.0f64, 0.0f64), |(n, sx, sy), (a, b)| {
        (n + 1, sx + a, sy + b)
    });
    if n < min_observations.max(2) {
        return f64::NAN;
    }
    let mean_x = sum_x / n as f64;
    let mean_y = sum_y / n as f64;

    // centered second pass, no buffer of the complete pairs
    let (cov, var_x, var_y) = complete().fold((0.0f64, 0.0f64, 0.0f64), |(cov, vx, vy), (a, b)| {
        let dx = a - mean_x;
        let dy = b - mean_y;
        (cov + dx * dy, vx + dx * dx, vy + dy * dy)
    });

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// Running count, sum and sum of squares of a population of observations
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub n: usize,
    pub sum: f64,
    pub sum_sq: f64,
}

impl Moments {
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        self.sum_sq += x * x;
    }

    /// The population left after removing `other` from `self`
    pub fn without(&self, other: &Moments) -> Moments {
        Moments {
            n: self.n - other.n,
            sum: self.sum - other.sum,
            sum_sq: self.sum_sq - other.sum_sq,
        }
    }

    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            return f64::NAN;
        }
        self.sum / self.n as f64
    }

    /// Sum of squared deviations from the mean
    pub fn sum_sq_dev(&self) -> f64 {
        if self.n == 0 {
            return f64::NAN;
        }
        (self.sum_sq - self.sum * self.sum / self.n as f64).max(0.0)
    }
}

/// Two-sided Student's two-sample t-test with pooled variance
pub fn students_t_test(a: &Moments, b: &Moments) -> f64 {
    if a.n == 0 || b.n == 0 {
        return f64::NAN;
    }
    let df = (a.n + b.n) as f64 - 2.0;
    if df < 1.0 {
        return f64::NAN;
    }
    let pooled = (a.sum_sq_dev() + b.sum_sq_dev()) / df;
    let se = (pooled * (1.0 / a.n as f64 + 1.0 / b.n as f64)).sqrt();
    if !(se > 0.0) {
        return f64::NAN;
    }
    let t = (a.mean() - b.mean()) / se;
    two_sided_t(t, df)
}

fn two_sided_t(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Welch standardized mean difference between two groups of observations
///
/// NaN unless both groups have at least two observations and a non-zero
/// standard error.
pub fn welch_z(primary: &[f64], secondary: &[f64]) -> f64 {
    if primary.len() < 2 || secondary.len() < 2 {
        return f64::NAN;
    }
    let se = (sample_variance(primary) / primary.len() as f64
        + sample_variance(secondary) / secondary.len() as f64)
        .sqrt();
    if !(se > 0.0) {
        return f64::NAN;
    }
    (arithmetic_mean(primary) - arithmetic_mean(secondary)) / se
}

/// A 2x2 table of changed/unchanged genes inside/outside a pathway
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct Contingency {
    /// changed members
    pub a: u64,
    /// unchanged members
    pub b: u64,
    /// changed non-members
    pub c: u64,
    /// unchanged non-members
    pub d: u64,
}

impl Contingency {
    /// Odds ratio with the Haldane-Anscombe correction when any cell is empty
    pub fn odds_ratio(&self) -> f64 {
        let cells = [self.a, self.b, self.c, self.d].map(|x| x as f64);
        let [a, b, c, d] = if cells.contains(&0.0) {
            cells.map(|x| x + 0.5)
        } else {
            cells
        };
        (a * d) / (b * c)
    }

    /// Two-sided Fisher's exact test
    ///
    /// Sums the probability of every table with the observed margins that is
    /// no more likely than the observed one.
    pub fn fisher_exact(&self) -> f64 {
        let population = self.a + self.b + self.c + self.d;
        let successes = self.a + self.c;
        let draws = self.a + self.b;
        if population == 0 {
            return f64::NAN;
        }
        if successes == 0 || successes == population || draws == 0 || draws == population {
            return 1.0;
        }
        let hyper = match Hypergeometric::new(population, successes, draws) {
            Ok(hyper) => hyper,
            Err(_) => return f64::NAN,
        };

        let observed = hyper.pmf(self.a);
        let lower = (draws + successes).saturating_sub(population);
        let upper = draws.min(successes);
        let pvalue = (lower..=upper)
            .map(|k| hyper.pmf(k))
            .filter(|&p| p < observed || relative_eq!(p, observed, max_relative = 1e-7))
            .sum::<f64>();
        pvalue.min(1.0)
    }
}
