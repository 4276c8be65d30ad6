//! Special functions used by the pulse and BER expressions

use std::f64::consts::{PI, SQRT_2};

/// Normalized sinc, sin(πx)/(πx), with sinc(0) = 1
#[inline]
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Gaussian tail probability Q(x) = P(N(0,1) > x)
#[inline]
pub fn q_function(x: f64) -> f64 {
    0.5 * libm::erfc(x / SQRT_2)
}

/// Bessel function of the first kind, order zero
#[inline]
pub fn bessel_j0(x: f64) -> f64 {
    libm::j0(x)
}

/// Textbook BPSK bit error probability in AWGN, ½·erfc(√(Eb/N0)), for a linear Eb/N0
#[inline]
pub fn bpsk_awgn_ber(ebn0: f64) -> f64 {
    0.5 * libm::erfc(ebn0.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sinc() {
        assert_eq!(sinc(0.0), 1.0);
        assert!(sinc(1.0).abs() < 1e-15);
        assert!(sinc(-3.0).abs() < 1e-15);
        assert!((sinc(0.5) - 2.0 / PI).abs() < 1e-15);
        assert_eq!(sinc(0.3), sinc(-0.3));
    }

    #[test]
    fn test_q_function() {
        assert!((q_function(0.0) - 0.5).abs() < 1e-15);
        // Q(1) and Q(3) reference values
        assert!((q_function(1.0) - 0.158_655_253_931_457).abs() < 1e-12);
        assert!((q_function(3.0) - 1.349_898_031_630_09e-3).abs() < 1e-14);
        assert!((q_function(-1.0) + q_function(1.0) - 1.0).abs() < 1e-15);
        // Deep tail keeps relative precision
        let q6 = q_function(6.0);
        assert!((q6 / 9.865_876_450_376_98e-10 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bpsk_awgn_matches_q() {
        for ebn0 in [0.5, 1.0, 4.0, 10.0] {
            let via_q = q_function((2.0_f64 * ebn0).sqrt());
            assert!((bpsk_awgn_ber(ebn0) / via_q - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_bessel_j0() {
        assert!((bessel_j0(0.0) - 1.0).abs() < 1e-15);
        // First zero of J0
        assert!(bessel_j0(2.404_825_557_695_773).abs() < 1e-12);
        assert!((bessel_j0(1.0) - 0.765_197_686_557_966_6).abs() < 1e-12);
    }
}
