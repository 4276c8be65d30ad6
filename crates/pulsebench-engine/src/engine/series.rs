//! Fourier series evaluation of the averaged Gaussian tail

use pulsebench_core::BerError;
use pulsebench_core::math::bessel_j0;
use pulsebench_core::sample_consts::PI;

/// Noise standard deviations kept clear of the series half-period
const NOISE_GUARD: f64 = 8.0;

/// BER = 1/2 - (2/π)·Σ_{m odd < harmonics} exp(-(mω)²/2)/m · sin(mω·d0) · Π cos(mω·c_k) · Π J0(mω·r_i)
///
/// `fixed` taps carry an equiprobable sign, `uniform` taps additionally a uniformly distributed
/// carrier phase. The series represents a square wave of period 2π/ω, so the decision distance
/// plus all interference and the noise guard must stay below π/ω.
pub fn craig_series(d0: f64, fixed: &[f64], uniform: &[f64], harmonics: u32, omega: f64) -> Result<f64, BerError> {
    let excursion = d0.abs() + fixed.iter().chain(uniform).map(|c| c.abs()).sum::<f64>();
    let half_period = PI / omega;
    if excursion + NOISE_GUARD >= half_period {
        return Err(BerError::NumericDomain {
            quantity: "decision_excursion",
            value: excursion,
            reason: "leaves no noise guard below the series half-period pi/omega, lower omega or the SNR",
        });
    }

    let mut acc = 0.0;
    for m in (1..harmonics).step_by(2) {
        let x = m as f64 * omega;
        let mut term = (-(x * x) / 2.0).exp() * (x * d0).sin() / m as f64;
        for &c in fixed {
            term *= (x * c).cos();
        }
        for &r in uniform {
            term *= bessel_j0(x * r);
        }
        acc += term;
    }
    Ok(0.5 - 2.0 / PI * acc)
}
