//! Ficha técnica (sampling frame)

use crate::stats::round_half_up;
use clima_common::db::SamplingFrame;

/// z for 95% confidence
const Z_95: f64 = 1.96;

/// Population, sample, response rate (%) and margin of error (%)
///
/// The margin of error assumes p = 0.5 and applies the finite-population
/// correction. Both percentages carry two decimals.
pub fn sampling_frame(employee_count: Option<i64>, valid_count: usize) -> SamplingFrame {
    let population = employee_count.unwrap_or(0);
    let sample = valid_count as i64;

    let response_rate = if population > 0 {
        round_half_up(sample as f64 / population as f64 * 10_000.0, 0) / 100.0
    } else {
        0.0
    };

    let margin_of_error = if sample > 0 && population > 1 {
        let (n, big_n) = (sample as f64, population as f64);
        let fpc = ((big_n - n) / (big_n - 1.0)).sqrt();
        round_half_up(Z_95 * (0.25 / n).sqrt() * fpc * 100.0 * 100.0, 0) / 100.0
    } else {
        0.0
    };

    SamplingFrame {
        population_n: population,
        sample_n: sample,
        response_rate,
        margin_of_error,
    }
}
