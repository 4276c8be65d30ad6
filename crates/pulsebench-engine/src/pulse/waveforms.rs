use serde::Serialize;

use pulsebench_core::math::sinc;
use pulsebench_core::sample_consts::{LN_2, PI};
use pulsebench_core::{BerError, ensure_config, ensure_finite};

pub const DEFAULT_BTRC_MU: f64 = 1.0;
pub const DEFAULT_ELP_BETA: f64 = 0.1;
pub const DEFAULT_IPLCP_MU: f64 = 1.6;
pub const DEFAULT_IPLCP_GAMMA: u32 = 1;
pub const DEFAULT_IPLCP_EPSILON: f64 = 0.1;

/// Below this |1 - (2αt)²| the raised cosine uses its limiting value
const RC_POLE_EPS: f64 = 1e-8;
/// Below this |παt| the IPLCP bracket is taken as its limit B(0) = 1
const IPLCP_ORIGIN_EPS: f64 = 1e-8;

/// A time-domain pulse, time in symbol periods (T = 1).
/// Amplitudes are neither truncated nor normalized here, see `PulseShape`.
pub trait Waveform {
    fn amplitude(&self, t: f64) -> f64;
    fn alpha(&self) -> f64;
    fn label(&self) -> &'static str;
}

fn check_alpha(alpha: f64) -> Result<(), BerError> {
    ensure_finite!(alpha);
    ensure_config!(alpha > 0.0 && alpha <= 1.0, "alpha", "roll-off must lie in (0, 1], got {}", alpha);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RaisedCosine {
    alpha: f64,
}

impl RaisedCosine {
    pub fn new(alpha: f64) -> Result<Self, BerError> {
        check_alpha(alpha)?;
        Ok(Self { alpha })
    }
}

impl Waveform for RaisedCosine {
    fn amplitude(&self, t: f64) -> f64 {
        let x = 2.0 * self.alpha * t;
        let denom = 1.0 - x * x;
        if denom.abs() < RC_POLE_EPS {
            sinc(t) * PI / 4.0
        } else {
            sinc(t) * (PI * self.alpha * t).cos() / denom
        }
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn label(&self) -> &'static str {
        "RC"
    }
}

/// Better-than-raised-cosine pulse with β = 2·ln2/α.
/// `mu` blends between raised cosine (0) and the full BTRC correction (1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Btrc {
    alpha: f64,
    mu: f64,
}

impl Btrc {
    pub fn new(alpha: f64, mu: f64) -> Result<Self, BerError> {
        check_alpha(alpha)?;
        ensure_finite!(mu);
        ensure_config!((0.0..=1.0).contains(&mu), "mu", "BTRC weight must lie in [0, 1], got {}", mu);
        Ok(Self { alpha, mu })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    fn btrc(&self, t: f64) -> f64 {
        let beta = 2.0 * LN_2 / self.alpha;
        let pat = PI * self.alpha * t;
        let num = 4.0 * beta * PI * t * pat.sin() + 2.0 * beta * beta * pat.cos() - beta * beta;
        let den = 4.0 * PI * PI * t * t + beta * beta;
        sinc(t) * num / den
    }
}

impl Waveform for Btrc {
    fn amplitude(&self, t: f64) -> f64 {
        let rc = RaisedCosine { alpha: self.alpha }.amplitude(t);
        if self.mu == 0.0 {
            return rc;
        }
        rc + self.mu * (self.btrc(t) - rc)
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn label(&self) -> &'static str {
        "BTRC"
    }
}

/// Exponential linear pulse, exp(-πβ/2·t²)·sinc(t)·sinc(αt)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Elp {
    alpha: f64,
    beta: f64,
}

impl Elp {
    pub fn new(alpha: f64, beta: f64) -> Result<Self, BerError> {
        check_alpha(alpha)?;
        ensure_finite!(beta);
        ensure_config!(beta >= 0.0, "beta", "ELP decay must be non-negative, got {}", beta);
        Ok(Self { alpha, beta })
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}

impl Waveform for Elp {
    fn amplitude(&self, t: f64) -> f64 {
        (-PI * self.beta / 2.0 * t * t).exp() * sinc(t) * sinc(self.alpha * t)
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn label(&self) -> &'static str {
        "ELP"
    }
}

/// Improved parametric linear combination pulse,
/// exp(-επ²t²)·(sinc(t)·B(t))^γ with B(0) = 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Iplcp {
    alpha: f64,
    mu: f64,
    gamma: u32,
    epsilon: f64,
}

impl Iplcp {
    pub fn new(alpha: f64, mu: f64, gamma: u32, epsilon: f64) -> Result<Self, BerError> {
        check_alpha(alpha)?;
        ensure_finite!(mu);
        ensure_finite!(epsilon);
        ensure_config!(mu >= 0.0, "mu", "IPLCP mu must be non-negative, got {}", mu);
        ensure_config!(gamma >= 1, "gamma", "IPLCP exponent must be a positive integer");
        ensure_config!(epsilon >= 0.0, "epsilon", "IPLCP epsilon must be non-negative, got {}", epsilon);
        Ok(Self { alpha, mu, gamma, epsilon })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn gamma(&self) -> u32 {
        self.gamma
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn bracket(&self, t: f64) -> f64 {
        let pat = PI * self.alpha * t;
        if pat.abs() < IPLCP_ORIGIN_EPS {
            return 1.0;
        }
        let half = (pat / 2.0).sin();
        (4.0 * (1.0 - self.mu) * half * half + self.mu * pat * pat.sin()) / (pat * pat)
    }
}

impl Waveform for Iplcp {
    fn amplitude(&self, t: f64) -> f64 {
        let envelope = (-self.epsilon * PI * PI * t * t).exp();
        envelope * (sinc(t) * self.bracket(t)).powi(self.gamma as i32)
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn label(&self) -> &'static str {
        "IPLCP"
    }
}

/// Pulse family with its parameter set, dispatched by match
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PulseKind {
    RaisedCosine(RaisedCosine),
    Btrc(Btrc),
    Elp(Elp),
    Iplcp(Iplcp),
}

impl PulseKind {
    pub fn raised_cosine(alpha: f64) -> Result<Self, BerError> {
        Ok(PulseKind::RaisedCosine(RaisedCosine::new(alpha)?))
    }

    pub fn btrc(alpha: f64) -> Result<Self, BerError> {
        Ok(PulseKind::Btrc(Btrc::new(alpha, DEFAULT_BTRC_MU)?))
    }

    pub fn elp(alpha: f64) -> Result<Self, BerError> {
        Ok(PulseKind::Elp(Elp::new(alpha, DEFAULT_ELP_BETA)?))
    }

    pub fn iplcp(alpha: f64) -> Result<Self, BerError> {
        Ok(PulseKind::Iplcp(Iplcp::new(
            alpha,
            DEFAULT_IPLCP_MU,
            DEFAULT_IPLCP_GAMMA,
            DEFAULT_IPLCP_EPSILON,
        )?))
    }

    /// Same family and shape parameters with a different roll-off
    pub fn with_alpha(&self, alpha: f64) -> Result<Self, BerError> {
        Ok(match self {
            PulseKind::RaisedCosine(_) => PulseKind::RaisedCosine(RaisedCosine::new(alpha)?),
            PulseKind::Btrc(p) => PulseKind::Btrc(Btrc::new(alpha, p.mu)?),
            PulseKind::Elp(p) => PulseKind::Elp(Elp::new(alpha, p.beta)?),
            PulseKind::Iplcp(p) => PulseKind::Iplcp(Iplcp::new(alpha, p.mu, p.gamma, p.epsilon)?),
        })
    }

    fn waveform(&self) -> &dyn Waveform {
        match self {
            PulseKind::RaisedCosine(p) => p,
            PulseKind::Btrc(p) => p,
            PulseKind::Elp(p) => p,
            PulseKind::Iplcp(p) => p,
        }
    }
}

impl Waveform for PulseKind {
    fn amplitude(&self, t: f64) -> f64 {
        self.waveform().amplitude(t)
    }

    fn alpha(&self) -> f64 {
        self.waveform().alpha()
    }

    fn label(&self) -> &'static str {
        self.waveform().label()
    }
}
