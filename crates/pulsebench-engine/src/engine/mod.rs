//! Closed-form BER of BPSK with ISI and CCI.
//!
//! The decision statistic for the desired symbol is
//! r = A·(p(tau) + Σ b_k h_k + a·Σ_i Σ_k b_ik c_ik) + n, with n ~ N(0, σ²),
//! A/σ = sqrt(2·SNR)/p(0) and a = SIR^(-1/2) per interferer. Conditioned on the
//! interfering symbols the error probability is Q of the noise-normalized distance;
//! the two methods average that over the symbols.

pub mod enumeration;
pub mod series;

use serde::Serialize;

use pulsebench_core::{BerError, ensure_config, ensure_finite};

use crate::params::{BerMethod, BerParameters};
use crate::pulse::PulseShape;
use crate::sampler::{CarrierPhase, InterferenceSampler, InterferenceTapSet, TapSource};

/// Round-off tolerated outside [0, 1] before a probability is rejected
const PROBABILITY_SLACK: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterferenceMode {
    Awgn,
    IsiOnly,
    CciOnly,
    Joint,
}

impl InterferenceMode {
    fn select(isi: bool, cci: bool) -> Self {
        match (isi, cci) {
            (false, false) => InterferenceMode::Awgn,
            (true, false) => InterferenceMode::IsiOnly,
            (false, true) => InterferenceMode::CciOnly,
            (true, true) => InterferenceMode::Joint,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterferenceMode::Awgn => "awgn",
            InterferenceMode::IsiOnly => "isi_only",
            InterferenceMode::CciOnly => "cci_only",
            InterferenceMode::Joint => "joint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BerResult {
    params: BerParameters,
    ber: f64,
    mode: InterferenceMode,
    enumerated_taps: usize,
}

impl BerResult {
    pub fn params(&self) -> &BerParameters {
        &self.params
    }

    /// Bit error probability in [0, 1]
    pub fn ber(&self) -> f64 {
        self.ber
    }

    pub fn mode(&self) -> InterferenceMode {
        self.mode
    }

    /// Number of interfering symbols the result averages over
    pub fn enumerated_taps(&self) -> usize {
        self.enumerated_taps
    }
}

/// Samples ISI and CCI taps for `params` and evaluates the BER.
/// The shape is rebuilt with the roll-off of `params` when the two differ.
pub fn evaluate_ber(shape: &PulseShape, params: &BerParameters) -> Result<BerResult, BerError> {
    let rebuilt;
    let shape = if shape.alpha() != params.alpha() {
        rebuilt = shape.with_alpha(params.alpha())?;
        &rebuilt
    } else {
        shape
    };

    params.check_tap_budget()?;
    let sampler = InterferenceSampler::new(shape);
    let isi = sampler.sample(params.tau(), params.window())?;
    let cci = sampler.sample_cci(&params.cci_sources(), params.cci_window())?;
    compute_ber(&isi, &cci, params)
}

/// BER from already sampled tap sets. `isi` supplies the cursor and reference amplitude,
/// `cci` holds one set per interferer.
pub fn compute_ber(isi: &InterferenceTapSet, cci: &[InterferenceTapSet], params: &BerParameters) -> Result<BerResult, BerError> {
    let snr = params.snr().to_linear("snr")?;
    let sir = params.sir().to_linear("sir")?;

    let Some(cursor) = isi.cursor() else {
        return Err(BerError::Configuration {
            field: "isi",
            reason: "expected an ISI tap set, got a CCI source".to_string(),
        });
    };
    ensure_config!(
        isi.taps().iter().all(|t| t.k != 0),
        "isi",
        "ISI taps must exclude the cursor k = 0, use sample() rather than sample_full()"
    );
    ensure_config!(
        cci.len() == params.interferers(),
        "interferers",
        "{} CCI tap sets given for {} interferers",
        cci.len(),
        params.interferers()
    );

    let reference = isi.reference();
    ensure_finite!(reference, "reference");
    ensure_finite!(cursor, "cursor");
    if reference.abs() < f64::MIN_POSITIVE {
        return Err(BerError::NumericDomain {
            quantity: "reference",
            value: reference,
            reason: "is zero, decision distance undefined",
        });
    }

    let scale = (2.0 * snr).sqrt() / reference;
    let d0 = scale * cursor;
    let cci_scale = scale / sir.sqrt();

    // Sign-averaged taps, and taps that are also averaged over a uniform carrier phase
    let mut signed: Vec<f64> = isi.values().map(|h| scale * h).collect();
    let mut uniform: Vec<f64> = Vec::new();
    for set in cci {
        match set.source() {
            TapSource::Cci(src) => match src.phase {
                CarrierPhase::Fixed(_) => signed.extend(set.values().map(|c| cci_scale * c)),
                CarrierPhase::Uniform => {
                    ensure_config!(
                        set.len() == 1,
                        "cci_window",
                        "uniform carrier phase needs single-tap interferers, got {} taps",
                        set.len()
                    );
                    uniform.extend(set.values().map(|c| cci_scale * c));
                }
            },
            TapSource::Isi { .. } => {
                return Err(BerError::Configuration {
                    field: "cci",
                    reason: "expected CCI tap sets, got an ISI source".to_string(),
                });
            }
        }
    }
    ensure_finite!(d0, "decision_distance");
    for &c in signed.iter().chain(&uniform) {
        ensure_finite!(c, "interference_tap");
    }

    let mode = InterferenceMode::select(!isi.is_empty(), cci.iter().any(|s| !s.is_empty()));
    let enumerated_taps = signed.len() + uniform.len();

    let raw = match params.method() {
        BerMethod::Enumeration { max_taps } => {
            ensure_config!(
                uniform.is_empty(),
                "cci_phases",
                "uniform carrier phase is only averaged by the series method"
            );
            if signed.len() > max_taps {
                return Err(BerError::ResourceLimit { taps: signed.len(), limit: max_taps });
            }
            enumeration::average_q(d0, &signed)
        }
        BerMethod::Series { harmonics, omega } => series::craig_series(d0, &signed, &uniform, harmonics, omega)?,
    };
    let ber = check_probability(raw)?;

    tracing::trace!(
        "{:?} d0={:.6} taps={} method={:?} ber={:.6e}",
        mode,
        d0,
        enumerated_taps,
        params.method(),
        ber
    );
    Ok(BerResult { params: params.clone(), ber, mode, enumerated_taps })
}

/// Accepts values within round-off of [0, 1], reported as the boundary value
fn check_probability(p: f64) -> Result<f64, BerError> {
    ensure_finite!(p, "ber");
    if !(-PROBABILITY_SLACK..=1.0 + PROBABILITY_SLACK).contains(&p) {
        return Err(BerError::NumericDomain {
            quantity: "ber",
            value: p,
            reason: "lies outside [0, 1]",
        });
    }
    Ok(p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CciLayout, PhaseRealization};
    use crate::pulse::PulseKind;
    use pulsebench_core::PowerRatio;
    use pulsebench_core::math::bpsk_awgn_ber;

    fn rc_shape() -> PulseShape {
        PulseShape::with_defaults(PulseKind::raised_cosine(0.35).unwrap()).unwrap()
    }

    #[test]
    fn test_awgn_reduces_to_textbook() {
        let shape = rc_shape();
        let params = BerParameters::new(0.0, 0.35, PowerRatio::Db(6.0)).unwrap().with_window(0).unwrap();
        let res = evaluate_ber(&shape, &params).unwrap();
        assert_eq!(res.mode(), InterferenceMode::Awgn);
        assert_eq!(res.enumerated_taps(), 0);
        let expected = bpsk_awgn_ber(10f64.powf(0.6));
        assert!((res.ber() / expected - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_modes() {
        let shape = rc_shape();
        let base = BerParameters::new(0.1, 0.35, PowerRatio::Db(8.0)).unwrap();
        assert_eq!(evaluate_ber(&shape, &base).unwrap().mode(), InterferenceMode::IsiOnly);

        let joint = base.clone().with_interferers(1).unwrap();
        let res = evaluate_ber(&shape, &joint).unwrap();
        assert_eq!(res.mode(), InterferenceMode::Joint);
        assert_eq!(res.enumerated_taps(), 10 + 1);

        let cci_only = joint.with_window(0).unwrap();
        assert_eq!(evaluate_ber(&shape, &cci_only).unwrap().mode(), InterferenceMode::CciOnly);
    }

    #[test]
    fn test_resource_limit() {
        let shape = rc_shape();
        let params = BerParameters::new(0.1, 0.35, PowerRatio::Db(8.0))
            .unwrap()
            .with_window(13)
            .unwrap();
        match evaluate_ber(&shape, &params) {
            Err(BerError::ResourceLimit { taps, limit }) => {
                assert_eq!(taps, 26);
                assert_eq!(limit, 24);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_cursor_in_isi_set_rejected() {
        let shape = rc_shape();
        let sampler = InterferenceSampler::new(&shape);
        let params = BerParameters::new(0.1, 0.35, PowerRatio::Db(8.0)).unwrap();
        let full = sampler.sample_full(0.1, 2).unwrap();
        assert_eq!(compute_ber(&full, &[], &params).unwrap_err().kind(), "ConfigurationError");
    }

    #[test]
    fn test_interferer_count_mismatch() {
        let shape = rc_shape();
        let sampler = InterferenceSampler::new(&shape);
        let params = BerParameters::new(0.1, 0.35, PowerRatio::Db(8.0)).unwrap();
        let isi = sampler.sample(0.1, 2).unwrap();
        let cci = sampler.sample_cci(&CciLayout::default().sources(1), 0).unwrap();
        assert!(compute_ber(&isi, &cci, &params).is_err());
    }

    #[test]
    fn test_uniform_phase_series() {
        let shape = rc_shape();
        let uniform = CciLayout { phases: PhaseRealization::Uniform, ..CciLayout::default() };
        let aligned = BerParameters::new(0.0, 0.35, PowerRatio::Db(8.0))
            .unwrap()
            .with_window(0)
            .unwrap()
            .with_sir(PowerRatio::Db(6.0))
            .unwrap()
            .with_method(BerMethod::series())
            .unwrap()
            .with_interferers(1)
            .unwrap();
        let random = aligned.clone().with_cci(uniform).unwrap();

        let ber_aligned = evaluate_ber(&shape, &aligned).unwrap().ber();
        let ber_random = evaluate_ber(&shape, &random).unwrap().ber();
        let awgn = bpsk_awgn_ber(10f64.powf(0.8));
        assert!(ber_random > awgn);
        assert!(ber_random < ber_aligned);
    }

    #[test]
    fn test_probability_check() {
        assert_eq!(check_probability(0.3).unwrap(), 0.3);
        assert_eq!(check_probability(-5e-13).unwrap(), 0.0);
        assert_eq!(check_probability(1.0 + 5e-13).unwrap(), 1.0);
        assert!(check_probability(-1e-6).is_err());
        assert!(check_probability(f64::NAN).is_err());
    }
}
