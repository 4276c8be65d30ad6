use serde::{Deserialize, Serialize};

use crate::BerError;

/// Power ratio (SNR, SIR) given either in dB or as a linear factor.
/// Serialized as `{ db = 10.0 }` or `{ linear = 3.5 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerRatio {
    Db(f64),
    Linear(f64),
}

impl PowerRatio {
    /// Converts to a linear power ratio.
    /// Non-finite input is a NumericDomain error, a non-positive linear value is a Configuration error.
    pub fn to_linear(self, quantity: &'static str) -> Result<f64, BerError> {
        let lin = match self {
            PowerRatio::Db(db) => {
                crate::ensure_finite!(db, quantity);
                db_to_power(db)
            }
            PowerRatio::Linear(lin) => {
                crate::ensure_finite!(lin, quantity);
                crate::ensure_config!(lin > 0.0, quantity, "linear ratio must be positive, got {}", lin);
                lin
            }
        };
        // Large dB values overflow to +inf
        crate::ensure_finite!(lin, quantity);
        Ok(lin)
    }

    pub fn to_db(self) -> f64 {
        match self {
            PowerRatio::Db(db) => db,
            PowerRatio::Linear(lin) => power_to_db(lin),
        }
    }
}

impl Default for PowerRatio {
    fn default() -> Self {
        PowerRatio::Db(10.0)
    }
}

#[inline]
pub fn db_to_power(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

#[inline]
pub fn power_to_db(lin: f64) -> f64 {
    10.0 * lin.log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert!((db_to_power(10.0) - 10.0).abs() < 1e-12);
        assert!((db_to_power(-3.0) - 0.501_187_233_627_272_2).abs() < 1e-12);
        assert!((power_to_db(100.0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_to_linear() {
        assert!((PowerRatio::Db(0.0).to_linear("snr").unwrap() - 1.0).abs() < 1e-15);
        assert_eq!(PowerRatio::Linear(4.0).to_linear("snr").unwrap(), 4.0);
        assert!((PowerRatio::Linear(10.0).to_db() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_ratios() {
        assert_eq!(PowerRatio::Db(f64::NAN).to_linear("snr").unwrap_err().kind(), "NumericDomainError");
        assert_eq!(PowerRatio::Db(1e6).to_linear("snr").unwrap_err().kind(), "NumericDomainError");
        assert_eq!(PowerRatio::Linear(0.0).to_linear("sir").unwrap_err().kind(), "ConfigurationError");
        assert_eq!(PowerRatio::Linear(-2.0).to_linear("sir").unwrap_err().kind(), "ConfigurationError");
    }
}
