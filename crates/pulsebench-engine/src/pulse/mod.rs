//! Pulse shapes with truncation, energy normalization and frequency responses

pub mod grid;
pub mod spectrum;
pub mod waveforms;

use serde::{Deserialize, Serialize};

use pulsebench_core::sample_consts::PI;
use pulsebench_core::{BerError, ComplexSample, ensure_config, ensure_finite};

pub use grid::{SampleGrid, SamplePoint};
pub use spectrum::{FrequencyPoint, FrequencyResponse, SpectrumPoint};
pub use waveforms::{Btrc, Elp, Iplcp, PulseKind, RaisedCosine, Waveform};

/// Default truncation half-width, in symbol periods
pub const DEFAULT_HALF_WIDTH: f64 = 10.0;
/// Default working grid resolution, in samples per symbol
pub const DEFAULT_OVERSAMPLE: u32 = 32;
/// Upper bound on the working grid length
pub const MAX_GRID_POINTS: usize = 1 << 22;

/// Slack when deciding whether a time lies inside the truncation window
const WINDOW_EPS: f64 = 1e-9;

/// Scaling applied to the truncated pulse, measured on the working grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Raw waveform amplitudes
    None,
    /// Sum of squared samples equals one
    #[default]
    Discrete,
    /// Trapezoidal energy integral with step 1/S equals one
    Continuous,
    /// Largest sample magnitude equals one
    Amplitude,
}

impl Normalization {
    /// Measure of the raw samples that the gain scales to one, None for unnormalized pulses
    fn measure(self, samples: &[f64], dt: f64) -> Option<f64> {
        let sum_sq = || samples.iter().map(|a| a * a).sum::<f64>();
        match self {
            Normalization::None => None,
            Normalization::Discrete => Some(sum_sq().sqrt()),
            Normalization::Continuous => {
                let ends = match (samples.first(), samples.last()) {
                    (Some(a), Some(b)) => 0.5 * (a * a + b * b),
                    _ => 0.0,
                };
                Some((dt * (sum_sq() - ends)).sqrt())
            }
            Normalization::Amplitude => Some(samples.iter().fold(0.0, |m: f64, a| m.max(a.abs()))),
        }
    }
}

/// A pulse waveform truncated to |t| <= W and scaled per its `Normalization`.
///
/// Truncation is an explicit approximation: `evaluate` returns exactly zero outside
/// the window, no matter how slowly the underlying waveform decays.
/// With the default discrete normalization, the sum of squared samples over the working grid
/// t_i = i/S, |t_i| <= W equals one. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseShape {
    kind: PulseKind,
    half_width: f64,
    oversample: u32,
    normalization: Normalization,
    gain: f64,
}

impl PulseShape {
    pub fn new(kind: PulseKind, half_width: f64, oversample: u32, normalization: Normalization) -> Result<Self, BerError> {
        ensure_finite!(half_width);
        ensure_config!(half_width > 0.0, "half_width", "truncation half-width must be positive, got {}", half_width);
        ensure_config!(oversample >= 1, "oversample", "working grid needs at least one sample per symbol");

        let per_side = samples_per_side(half_width, oversample);
        ensure_config!(
            2 * per_side < MAX_GRID_POINTS,
            "oversample",
            "working grid of {} points is too large",
            2 * per_side + 1
        );

        let mut shape = Self { kind, half_width, oversample, normalization, gain: 1.0 };
        let samples: Vec<f64> = shape.grid_times().map(|t| kind.amplitude(t)).collect();
        if let Some(measure) = normalization.measure(&samples, shape.sample_spacing()) {
            ensure_finite!(measure, "pulse_norm");
            if measure <= 0.0 {
                return Err(BerError::NumericDomain {
                    quantity: "pulse_norm",
                    value: measure,
                    reason: "is zero, pulse cannot be normalized",
                });
            }
            shape.gain = 1.0 / measure;
        }

        tracing::trace!(
            "{} alpha={} W={} S={} gain={:.6e}",
            kind.label(),
            kind.alpha(),
            half_width,
            oversample,
            shape.gain
        );
        Ok(shape)
    }

    /// Unit-energy pulse with the default window and resolution
    pub fn with_defaults(kind: PulseKind) -> Result<Self, BerError> {
        Self::new(kind, DEFAULT_HALF_WIDTH, DEFAULT_OVERSAMPLE, Normalization::Discrete)
    }

    /// Same pulse family, window and resolution with a different roll-off
    pub fn with_alpha(&self, alpha: f64) -> Result<Self, BerError> {
        Self::new(self.kind.with_alpha(alpha)?, self.half_width, self.oversample, self.normalization)
    }

    /// Amplitude at time t (symbol periods), zero outside the truncation window
    pub fn evaluate(&self, t: f64) -> f64 {
        if t.abs() > self.half_width + WINDOW_EPS {
            return 0.0;
        }
        self.gain * self.kind.amplitude(t)
    }

    pub fn kind(&self) -> &PulseKind {
        &self.kind
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn alpha(&self) -> f64 {
        self.kind.alpha()
    }

    pub fn half_width(&self) -> f64 {
        self.half_width
    }

    pub fn oversample(&self) -> u32 {
        self.oversample
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// floor(W·S), the number of working grid samples on each side of t = 0
    pub fn samples_per_side(&self) -> usize {
        samples_per_side(self.half_width, self.oversample)
    }

    /// Sample spacing of the working grid, 1/S
    pub fn sample_spacing(&self) -> f64 {
        1.0 / self.oversample as f64
    }

    /// Times of the working grid, ascending
    pub fn grid_times(&self) -> impl Iterator<Item = f64> + '_ {
        let n = self.samples_per_side() as i64;
        let s = self.oversample as f64;
        (-n..=n).map(move |i| i as f64 / s)
    }

    /// The working grid, 2·floor(W·S) + 1 points
    pub fn sample_grid(&self) -> SampleGrid {
        SampleGrid::from_shape(self)
    }

    /// Direct evaluation of the spectrum of the working grid samples,
    /// H(f) = dt·Σ p(t_i)·exp(-j2πf·t_i), f in cycles per symbol
    pub fn spectrum(&self, f: f64) -> SpectrumPoint {
        let dt = self.sample_spacing();
        let acc = self.grid_times().fold(ComplexSample::new(0.0, 0.0), |acc, t| {
            acc + ComplexSample::from_polar(self.evaluate(t), -2.0 * PI * f * t)
        });
        SpectrumPoint::from_response(acc * dt)
    }

    /// FFT-based frequency response of the working grid samples, zero-padded to `nfft`
    pub fn frequency_response(&self, nfft: usize) -> Result<FrequencyResponse, BerError> {
        FrequencyResponse::from_shape(self, nfft)
    }
}

fn samples_per_side(half_width: f64, oversample: u32) -> usize {
    (half_width * oversample as f64 + WINDOW_EPS).floor() as usize
}
