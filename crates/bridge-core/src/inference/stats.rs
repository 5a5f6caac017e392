//! Counting helpers for the hypergeometric factors.

use statrs::function::factorial::binomial;

/// `C(n, k)` with negative or out-of-range arguments treated as zero ways.
pub fn choose(n: i64, k: i64) -> f64 {
    if n < 0 || k < 0 || k > n {
        return 0.0;
    }
    binomial(n as u64, k as u64)
}

/// Probability of exactly `drawn` marked items when `draws` items are taken
/// without replacement from `population` items of which `marked` are marked.
pub fn hypergeometric(population: i64, marked: i64, draws: i64, drawn: i64) -> f64 {
    let total = choose(population, draws);
    if total == 0.0 {
        return 0.0;
    }
    choose(marked, drawn) * choose(population - marked, draws - drawn) / total
}
