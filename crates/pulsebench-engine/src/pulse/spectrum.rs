use std::fmt::Write as _;

use serde::Serialize;

use pulsebench_core::sample_consts::PI;
use pulsebench_core::{BerError, ComplexSample, RealSample, ensure_config};

use super::PulseShape;

/// Floor applied to relative magnitudes before conversion to dB
const MAG_FLOOR: f64 = 1e-12;

/// One spectrum value in polar form
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumPoint {
    pub magnitude: f64,
    /// Radians, in (-π, π]
    pub phase: f64,
}

impl SpectrumPoint {
    pub fn from_response(h: ComplexSample) -> Self {
        Self { magnitude: h.norm(), phase: h.arg() }
    }

    pub fn to_complex(&self) -> ComplexSample {
        ComplexSample::from_polar(self.magnitude, self.phase)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyPoint {
    /// Frequency in cycles per symbol, f·T
    pub f_t: f64,
    /// Frequency relative to the Nyquist bandwidth B = 1/(2T)
    pub f_b: f64,
    pub magnitude: f64,
    /// Magnitude in dB relative to the peak, floored at -240 dB
    pub magnitude_db: f64,
    pub phase: f64,
}

/// FFT of the working grid samples, ordered by ascending frequency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyResponse {
    label: &'static str,
    nfft: usize,
    points: Vec<FrequencyPoint>,
}

impl FrequencyResponse {
    /// Zero-pads the working grid to `nfft` samples and transforms it.
    /// Each bin k is scaled by dt and re-referenced from the grid start to t = 0,
    /// so bin values equal `PulseShape::spectrum(f_k)` with f_k = k·S/nfft.
    pub fn from_shape(shape: &PulseShape, nfft: usize) -> Result<Self, BerError> {
        let grid = shape.sample_grid();
        ensure_config!(
            nfft >= grid.len(),
            "nfft",
            "FFT length {} is shorter than the working grid of {} samples",
            nfft,
            grid.len()
        );

        let mut buf: Vec<ComplexSample> = grid.amplitudes().map(|a| ComplexSample::new(a, 0.0)).collect();
        buf.resize(nfft, ComplexSample::ZERO);

        let mut fft_planner = rustfft::FftPlanner::<RealSample>::new();
        let fft = fft_planner.plan_fft_forward(nfft);
        fft.process(&mut buf);

        let dt = shape.sample_spacing();
        let t0 = -(shape.samples_per_side() as f64) * dt;
        let s = shape.oversample() as f64;

        let mut bins: Vec<(i64, ComplexSample)> = buf
            .into_iter()
            .enumerate()
            .map(|(k, x)| {
                let k = signed_bin(k, nfft);
                let f = k as f64 * s / nfft as f64;
                (k, x * ComplexSample::from_polar(dt, -2.0 * PI * f * t0))
            })
            .collect();
        bins.sort_by_key(|(k, _)| *k);

        let peak = bins.iter().map(|(_, h)| h.norm()).fold(0.0, f64::max);
        let points = bins
            .into_iter()
            .map(|(k, h)| {
                let f_t = k as f64 * s / nfft as f64;
                let magnitude = h.norm();
                let rel = if peak > 0.0 { magnitude / peak } else { 0.0 };
                FrequencyPoint {
                    f_t,
                    f_b: 2.0 * f_t,
                    magnitude,
                    magnitude_db: 20.0 * rel.max(MAG_FLOOR).log10(),
                    phase: h.arg(),
                }
            })
            .collect();

        tracing::debug!("{} frequency response: nfft={} peak={:.6e}", shape.label(), nfft, peak);
        Ok(Self { label: shape.label(), nfft, points })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn nfft(&self) -> usize {
        self.nfft
    }

    pub fn points(&self) -> &[FrequencyPoint] {
        &self.points
    }

    /// Point whose frequency is closest to `f_t`
    pub fn nearest(&self, f_t: f64) -> Option<&FrequencyPoint> {
        self.points
            .iter()
            .min_by(|a, b| (a.f_t - f_t).abs().total_cmp(&(b.f_t - f_t).abs()))
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("f_t,f_b,magnitude,magnitude_db,phase\n");
        for p in &self.points {
            let _ = writeln!(out, "{},{},{},{},{}", p.f_t, p.f_b, p.magnitude, p.magnitude_db, p.phase);
        }
        out
    }
}

/// FFT bin index to signed frequency index, matching the usual fftshift layout
fn signed_bin(k: usize, n: usize) -> i64 {
    if k < n.div_ceil(2) { k as i64 } else { k as i64 - n as i64 }
}
