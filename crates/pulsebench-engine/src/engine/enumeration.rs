//! Exhaustive conditioning on interfering symbol signs

use pulsebench_core::math::q_function;

/// Average of Q(d0 + Σ b_j c_j) over all 2^n sign patterns b.
/// Patterns are split into two half-tables of partial sums so memory stays O(2^(n/2)).
pub fn average_q(d0: f64, taps: &[f64]) -> f64 {
    let (lo, hi) = taps.split_at(taps.len() / 2);
    let lo_sums = partial_sums(lo);
    let hi_sums = partial_sums(hi);

    let mut total = 0.0;
    for &a in &hi_sums {
        let base = d0 + a;
        let row: f64 = lo_sums.iter().map(|&b| q_function(base + b)).sum();
        total += row;
    }
    total / (lo_sums.len() * hi_sums.len()) as f64
}

/// Signed sums Σ ±c_j for every pattern index; bit j of the index set selects +c_j
pub fn partial_sums(taps: &[f64]) -> Vec<f64> {
    let mut sums = Vec::with_capacity(1 << taps.len());
    sums.push(0.0);
    for &c in taps {
        let len = sums.len();
        for i in 0..len {
            let s = sums[i];
            sums[i] = s - c;
            sums.push(s + c);
        }
    }
    sums
}
