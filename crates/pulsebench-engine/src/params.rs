use serde::{Deserialize, Serialize};

use pulsebench_core::{BerError, PowerRatio, ensure_config, ensure_finite};

use crate::sampler::{CarrierPhase, CciSource};

/// Default ceiling on the number of enumerated interfering symbols
pub const DEFAULT_MAX_TAPS: usize = 24;
/// Largest ceiling that may be configured. Work doubles per tap,
/// 2^30 sign patterns take on the order of a minute on one core.
pub const HARD_MAX_TAPS: usize = 30;
/// Upper bound on the interfering taps sampled for either method
pub const MAX_INTERFERING_TAPS: usize = 1 << 16;
/// Default series cut-off, odd harmonics m < M are summed
pub const DEFAULT_SERIES_HARMONICS: u32 = 100;
/// Default series angular step
pub const DEFAULT_SERIES_OMEGA: f64 = 0.1;
/// Largest meaningful timing offset, in symbol periods
pub const MAX_TAU: f64 = 0.5;

pub const DEFAULT_WINDOW: usize = 5;
pub const DEFAULT_SIR: PowerRatio = PowerRatio::Db(20.0);

/// How the average over interfering symbol patterns is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum BerMethod {
    /// Exhaustive conditioning on all 2^n sign patterns, n <= max_taps
    Enumeration { max_taps: usize },
    /// Fourier series over odd harmonics m < harmonics with angular step omega
    Series { harmonics: u32, omega: f64 },
}

impl Default for BerMethod {
    fn default() -> Self {
        BerMethod::Enumeration { max_taps: DEFAULT_MAX_TAPS }
    }
}

impl BerMethod {
    pub fn series() -> Self {
        BerMethod::Series { harmonics: DEFAULT_SERIES_HARMONICS, omega: DEFAULT_SERIES_OMEGA }
    }

    fn validate(&self) -> Result<(), BerError> {
        match *self {
            BerMethod::Enumeration { max_taps } => {
                ensure_config!(
                    max_taps <= HARD_MAX_TAPS,
                    "max_taps",
                    "enumeration ceiling {} above the hard limit of {}",
                    max_taps,
                    HARD_MAX_TAPS
                );
            }
            BerMethod::Series { harmonics, omega } => {
                ensure_config!(harmonics >= 2, "harmonics", "series needs at least the first harmonic, got M = {}", harmonics);
                ensure_finite!(omega, "omega");
                ensure_config!(omega > 0.0, "omega", "series step must be positive, got {}", omega);
            }
        }
        Ok(())
    }
}

/// Carrier phases assigned to the interferers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseRealization {
    /// All interferers in phase with the desired carrier
    Aligned,
    /// Explicit phases in radians, repeated cyclically over the interferers
    Fixed(Vec<f64>),
    /// Uniformly distributed phases, averaged analytically
    Uniform,
}

/// Placement of the co-channel interferers, shared by all of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CciLayout {
    /// Timing offset in symbol periods
    pub tau: f64,
    pub phases: PhaseRealization,
    /// Carrier frequency offset in cycles per symbol
    pub freq_offset: f64,
}

impl Default for CciLayout {
    fn default() -> Self {
        Self { tau: 0.0, phases: PhaseRealization::Aligned, freq_offset: 0.0 }
    }
}

impl CciLayout {
    fn validate(&self) -> Result<(), BerError> {
        ensure_finite!(self.tau, "cci_tau");
        ensure_config!(self.tau.abs() <= MAX_TAU, "cci_tau", "interferer offset must satisfy |tau| <= 0.5, got {}", self.tau);
        ensure_finite!(self.freq_offset, "cci_freq_offset");
        if let PhaseRealization::Fixed(phases) = &self.phases {
            ensure_config!(!phases.is_empty(), "cci_phases", "fixed phase list is empty");
            for &p in phases {
                ensure_finite!(p, "cci_phase");
            }
        }
        Ok(())
    }

    /// Sources for `count` interferers
    pub fn sources(&self, count: usize) -> Vec<CciSource> {
        (0..count)
            .map(|i| {
                let phase = match &self.phases {
                    PhaseRealization::Aligned => CarrierPhase::Fixed(0.0),
                    PhaseRealization::Fixed(phases) => CarrierPhase::Fixed(phases[i % phases.len()]),
                    PhaseRealization::Uniform => CarrierPhase::Uniform,
                };
                CciSource { tau: self.tau, phase, freq_offset: self.freq_offset }
            })
            .collect()
    }
}

/// Validated inputs of one BER evaluation.
/// Every constructor and `with_*` setter re-checks the full parameter set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BerParameters {
    tau: f64,
    alpha: f64,
    snr: PowerRatio,
    sir: PowerRatio,
    interferers: usize,
    window: usize,
    cci_window: usize,
    cci: CciLayout,
    method: BerMethod,
}

impl BerParameters {
    /// ISI-only parameters with default window and enumeration
    pub fn new(tau: f64, alpha: f64, snr: PowerRatio) -> Result<Self, BerError> {
        let params = Self {
            tau,
            alpha,
            snr,
            sir: DEFAULT_SIR,
            interferers: 0,
            window: DEFAULT_WINDOW,
            cci_window: 0,
            cci: CciLayout::default(),
            method: BerMethod::default(),
        };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), BerError> {
        ensure_finite!(self.tau, "tau");
        ensure_config!(self.tau.abs() <= MAX_TAU, "tau", "timing offset must satisfy |tau| <= 0.5, got {}", self.tau);
        ensure_finite!(self.alpha, "alpha");
        ensure_config!(
            self.alpha > 0.0 && self.alpha <= 1.0,
            "alpha",
            "roll-off must lie in (0, 1], got {}",
            self.alpha
        );
        self.snr.to_linear("snr")?;
        self.sir.to_linear("sir")?;
        self.cci.validate()?;
        self.method.validate()?;

        let taps = self.interfering_taps();
        if taps > MAX_INTERFERING_TAPS {
            return Err(BerError::ResourceLimit { taps, limit: MAX_INTERFERING_TAPS });
        }

        if self.interferers > 0 && self.cci.phases == PhaseRealization::Uniform {
            ensure_config!(
                matches!(self.method, BerMethod::Series { .. }),
                "cci_phases",
                "uniform carrier phase is only averaged by the series method"
            );
            ensure_config!(
                self.cci_window == 0,
                "cci_window",
                "uniform carrier phase needs single-tap interferers, got a window of {}",
                self.cci_window
            );
        }
        Ok(())
    }

    fn checked(self) -> Result<Self, BerError> {
        self.validate()?;
        Ok(self)
    }

    pub fn with_tau(mut self, tau: f64) -> Result<Self, BerError> {
        self.tau = tau;
        self.checked()
    }

    pub fn with_alpha(mut self, alpha: f64) -> Result<Self, BerError> {
        self.alpha = alpha;
        self.checked()
    }

    pub fn with_snr(mut self, snr: PowerRatio) -> Result<Self, BerError> {
        self.snr = snr;
        self.checked()
    }

    /// Signal-to-interference ratio per interferer
    pub fn with_sir(mut self, sir: PowerRatio) -> Result<Self, BerError> {
        self.sir = sir;
        self.checked()
    }

    pub fn with_interferers(mut self, interferers: usize) -> Result<Self, BerError> {
        self.interferers = interferers;
        self.checked()
    }

    /// ISI taps retained on each side of the cursor
    pub fn with_window(mut self, window: usize) -> Result<Self, BerError> {
        self.window = window;
        self.checked()
    }

    /// Symbols retained on each side of each interferer's nearest symbol
    pub fn with_cci_window(mut self, cci_window: usize) -> Result<Self, BerError> {
        self.cci_window = cci_window;
        self.checked()
    }

    pub fn with_cci(mut self, cci: CciLayout) -> Result<Self, BerError> {
        self.cci = cci;
        self.checked()
    }

    pub fn with_method(mut self, method: BerMethod) -> Result<Self, BerError> {
        self.method = method;
        self.checked()
    }

    pub fn tau(&self) -> f64 {
        self.tau
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn snr(&self) -> PowerRatio {
        self.snr
    }

    pub fn sir(&self) -> PowerRatio {
        self.sir
    }

    pub fn interferers(&self) -> usize {
        self.interferers
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn cci_window(&self) -> usize {
        self.cci_window
    }

    pub fn cci(&self) -> &CciLayout {
        &self.cci
    }

    pub fn method(&self) -> BerMethod {
        self.method
    }

    pub fn cci_sources(&self) -> Vec<CciSource> {
        self.cci.sources(self.interferers)
    }

    /// Interfering terms the engine averages over: 2·window ISI taps plus
    /// 2·cci_window + 1 taps per interferer. Saturates instead of overflowing.
    pub fn interfering_taps(&self) -> usize {
        let per_interferer = self.cci_window.saturating_mul(2).saturating_add(1);
        self.window
            .saturating_mul(2)
            .saturating_add(self.interferers.saturating_mul(per_interferer))
    }

    /// Fails with ResourceLimit when enumeration would exceed its ceiling, checked before any tap is sampled
    pub fn check_tap_budget(&self) -> Result<(), BerError> {
        if let BerMethod::Enumeration { max_taps } = self.method {
            let taps = self.interfering_taps();
            if taps > max_taps {
                return Err(BerError::ResourceLimit { taps, limit: max_taps });
            }
        }
        Ok(())
    }
}
