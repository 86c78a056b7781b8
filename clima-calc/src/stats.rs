//! Statistics primitives
//!
//! Pure numeric functions over adjusted Likert scores. Nothing in here
//! rounds its output except [`round_half_up`] itself; callers decide the
//! precision they store.

use serde::{Deserialize, Serialize};

/// Scores at or above this value count as favorable on the 1-5 scale
pub const FAVORABLE_THRESHOLD: f64 = 4.0;

/// Minimum paired observations before a correlation is computed
pub const MIN_CORRELATION_N: usize = 10;

/// Minimum complete-case respondents for Cronbach's alpha
pub const MIN_ALPHA_N: usize = 10;

/// Minimum scores for rwg
pub const MIN_RWG_N: usize = 3;

/// Variance of a uniform null distribution over A = 5 response options:
/// (A² - 1) / 12
pub const RWG_NULL_VARIANCE: f64 = 2.0;

/// Arithmetic mean. NaN for an empty slice; callers guard.
pub fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation (n - 1). Returns 0.0 when fewer than two values.
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let variance = xs.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    variance.sqrt()
}

/// Percentage of values >= 4
pub fn favorability(xs: &[f64]) -> f64 {
    let favorable = xs.iter().filter(|&&v| v >= FAVORABLE_THRESHOLD).count();
    favorable as f64 / xs.len() as f64 * 100.0
}

/// Pearson correlation with an approximate two-tailed p-value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub r: f64,
    #[serde(rename = "pValue")]
    pub p_value: f64,
    pub n: usize,
}

impl Correlation {
    /// Result reported when the correlation is not computable
    pub fn undefined(n: usize) -> Self {
        Self { r: 0.0, p_value: 1.0, n }
    }

    /// Diagonal entry of a correlation matrix
    pub fn identity(n: usize) -> Self {
        Self { r: 1.0, p_value: 0.0, n }
    }

    /// Storage precision: r to 3 decimals, p to 4
    pub fn rounded(self) -> Self {
        Self {
            r: round_half_up(self.r, 3),
            p_value: round_half_up(self.p_value, 4),
            n: self.n,
        }
    }
}

/// Pearson correlation over paired, equal-length samples
///
/// Below [`MIN_CORRELATION_N`] pairs, or when either side has zero variance,
/// returns `{r: 0, p_value: 1}`.
///
/// The p-value uses the closed form `exp(-0.717|t| - 0.416 t² / df)` rather
/// than the Student-t CDF. Stored historical values depend on it.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Correlation {
    let n = xs.len();
    if n < MIN_CORRELATION_N {
        return Correlation::undefined(n);
    }

    let mx = mean(xs);
    let my = mean(ys);
    let (mut sum_xy, mut sum_x2, mut sum_y2) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sum_xy += dx * dy;
        sum_x2 += dx * dx;
        sum_y2 += dy * dy;
    }

    let denom = (sum_x2 * sum_y2).sqrt();
    if denom == 0.0 {
        return Correlation::undefined(n);
    }

    let r = sum_xy / denom;
    // 1e-10 keeps t finite at r = ±1
    let t = r * ((n as f64 - 2.0) / (1.0 - r * r + 1e-10)).sqrt();
    let df = (n - 2) as f64;
    let p_value = (-0.717 * t.abs() - 0.416 * t * t / df).exp();

    Correlation { r, p_value, n }
}

/// Cronbach's alpha over a respondent × item matrix
///
/// Rows must all have the same length. Returns `None` with fewer than two
/// items, fewer than [`MIN_ALPHA_N`] rows, or zero total-score variance.
pub fn cronbach_alpha(matrix: &[Vec<f64>]) -> Option<f64> {
    let n = matrix.len();
    let k = matrix.first().map_or(0, Vec::len);
    if k < 2 || n < MIN_ALPHA_N {
        return None;
    }

    let sample_variance = |values: &[f64]| {
        let m = mean(values);
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
    };

    let sum_item_variance: f64 = (0..k)
        .map(|j| {
            let column: Vec<f64> = matrix.iter().map(|row| row[j]).collect();
            sample_variance(&column)
        })
        .sum();

    let totals: Vec<f64> = matrix.iter().map(|row| row.iter().sum()).collect();
    let total_variance = sample_variance(&totals);
    if total_variance == 0.0 {
        return None;
    }

    let k = k as f64;
    Some((k / (k - 1.0)) * (1.0 - sum_item_variance / total_variance))
}

/// Within-group agreement rwg (James, Demaree & Wolf, 1984)
///
/// `1 - observed / expected`, where observed is the population variance (÷N)
/// of the scores and expected is [`RWG_NULL_VARIANCE`]. Clamped to [0, 1].
/// `None` with fewer than [`MIN_RWG_N`] scores.
pub fn rwg(scores: &[f64]) -> Option<f64> {
    if scores.len() < MIN_RWG_N {
        return None;
    }
    let m = mean(scores);
    let observed = scores.iter().map(|v| (v - m).powi(2)).sum::<f64>() / scores.len() as f64;
    Some((1.0 - observed / RWG_NULL_VARIANCE).clamp(0.0, 1.0))
}

/// Round half toward +∞ at the given number of decimal places
///
/// `f64::round` rounds half away from zero, which disagrees on negative
/// ties (-12.5 → -13). Stored values use the half-up rule (-12.5 → -12).
pub fn round_half_up(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor + 0.5).floor() / factor
}
