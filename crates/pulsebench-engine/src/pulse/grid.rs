use std::fmt::Write as _;

use serde::Serialize;

use pulsebench_core::{BerError, ensure_config};

use super::PulseShape;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplePoint {
    /// Time in symbol periods
    pub t: f64,
    pub amplitude: f64,
}

/// Pulse samples at strictly increasing times.
/// Can only be constructed via `from_shape()` or `from_times()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleGrid {
    label: &'static str,
    points: Vec<SamplePoint>,
}

impl SampleGrid {
    /// Samples the working grid of a shape, t_i = i/S for |t_i| <= W
    pub fn from_shape(shape: &PulseShape) -> Self {
        let points = shape
            .grid_times()
            .map(|t| SamplePoint { t, amplitude: shape.evaluate(t) })
            .collect();
        Self { label: shape.label(), points }
    }

    /// Samples a shape at caller-chosen times, which must be finite and strictly increasing
    pub fn from_times(shape: &PulseShape, times: &[f64]) -> Result<Self, BerError> {
        for t in times {
            ensure_config!(t.is_finite(), "times", "sample time {} is not finite", t);
        }
        for pair in times.windows(2) {
            ensure_config!(
                pair[0] < pair[1],
                "times",
                "sample times must be strictly increasing, {} follows {}",
                pair[1],
                pair[0]
            );
        }
        let points = times
            .iter()
            .map(|&t| SamplePoint { t, amplitude: shape.evaluate(t) })
            .collect();
        Ok(Self { label: shape.label(), points })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn amplitudes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.amplitude)
    }

    /// Sum of squared amplitudes
    pub fn energy(&self) -> f64 {
        self.amplitudes().map(|a| a * a).sum()
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("t,amplitude\n");
        for p in &self.points {
            // Writing to a String cannot fail
            let _ = writeln!(out, "{},{}", p.t, p.amplitude);
        }
        out
    }
}
