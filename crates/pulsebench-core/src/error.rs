use core::fmt;

/// Errors raised while building pulses, sampling taps or evaluating BER.
/// Raised where detected and propagated to the caller; values are never clamped or defaulted.
#[derive(Debug, Clone, PartialEq)]
pub enum BerError {
    /// Parameter outside its valid range, or an invalid combination of parameters
    Configuration { field: &'static str, reason: String },
    /// Exhaustive enumeration over `taps` interfering symbols exceeds the configured ceiling
    ResourceLimit { taps: usize, limit: usize },
    /// Numeric value that is non-finite or outside the domain of the evaluation method
    NumericDomain { quantity: &'static str, value: f64, reason: &'static str },
}

impl BerError {
    /// Short name of the error kind, as reported in sweep failures and logs
    pub fn kind(&self) -> &'static str {
        match self {
            BerError::Configuration { .. } => "ConfigurationError",
            BerError::ResourceLimit { .. } => "ResourceLimitError",
            BerError::NumericDomain { .. } => "NumericDomainError",
        }
    }
}

impl fmt::Display for BerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BerError::Configuration { field, reason } => {
                write!(f, "{}: invalid {}: {}", self.kind(), field, reason)
            }
            BerError::ResourceLimit { taps, limit } => {
                write!(
                    f,
                    "{}: enumerating {} interfering taps exceeds the ceiling of {} (2^{} sign patterns), lower the truncation window",
                    self.kind(),
                    taps,
                    limit,
                    taps
                )
            }
            BerError::NumericDomain { quantity, value, reason } => {
                write!(f, "{}: {} = {} {}", self.kind(), quantity, value, reason)
            }
        }
    }
}

impl std::error::Error for BerError {}

/// Checks a condition on a configuration value. If it does not hold, returns BerError::Configuration
/// from the enclosing function, with the formatted reason.
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $field:expr, $($arg:tt)+) => {{
        if !$cond {
            return Err($crate::BerError::Configuration {
                field: $field,
                reason: format!($($arg)+),
            });
        }
    }};
}

/// Checks that a value is finite. If not, returns BerError::NumericDomain from the enclosing function
#[macro_export]
macro_rules! ensure_finite {
    (@inner $value:expr, $quantity:expr) => {{
        let val: f64 = $value;
        if !val.is_finite() {
            return Err($crate::BerError::NumericDomain {
                quantity: $quantity,
                value: val,
                reason: "is not finite",
            });
        }
    }};

    ($value:ident) => {
        $crate::ensure_finite!(@inner $value, stringify!($value))
    };
    ($value:expr, $quantity:expr) => {
        $crate::ensure_finite!(@inner $value, $quantity)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_alpha(alpha: f64) -> Result<f64, BerError> {
        ensure_config!(alpha > 0.0 && alpha <= 1.0, "alpha", "roll-off must lie in (0, 1], got {}", alpha);
        Ok(alpha)
    }

    fn check_finite(snr: f64) -> Result<f64, BerError> {
        ensure_finite!(snr);
        Ok(snr)
    }

    #[test]
    fn test_ensure_config() {
        assert_eq!(check_alpha(0.35), Ok(0.35));
        let err = check_alpha(1.2).unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
        assert!(err.to_string().contains("alpha"));
        assert!(err.to_string().contains("1.2"));
    }

    #[test]
    fn test_ensure_finite() {
        assert!(check_finite(3.0).is_ok());
        match check_finite(f64::NAN) {
            Err(BerError::NumericDomain { quantity, .. }) => assert_eq!(quantity, "snr"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_resource_limit_message() {
        let err = BerError::ResourceLimit { taps: 30, limit: 24 };
        assert_eq!(err.kind(), "ResourceLimitError");
        assert!(err.to_string().contains("30"));
    }
}
