#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::{all_kinds, default_test_params, default_test_shape};

/// Asserts |actual / expected - 1| <= tol, with context on failure
pub fn assert_rel_eq(actual: f64, expected: f64, tol: f64, ctx: &str) {
    let rel = if expected == 0.0 { actual.abs() } else { (actual / expected - 1.0).abs() };
    assert!(
        rel <= tol,
        "{}: got {:e}, expected {:e}, relative error {:e} above {:e}",
        ctx,
        actual,
        expected,
        rel,
        tol
    );
}
