//! Eye-diagram traces of a pulse-shaped symbol stream

use serde::Serialize;

use pulsebench_core::{BerError, ComplexSample, ensure_config, ensure_finite};

use crate::pulse::PulseShape;

/// Maps bits to BPSK symbols, 0 -> -1 and 1 -> +1
pub fn map_bpsk(bits: &[u8]) -> Result<Vec<ComplexSample>, BerError> {
    bits.iter()
        .map(|&b| Ok(ComplexSample::new(bit_to_level(b)?, 0.0)))
        .collect()
}

/// Maps bit pairs (I, Q) to QPSK symbols (2b_i - 1) + j(2b_q - 1)
pub fn map_qpsk(bits: &[u8]) -> Result<Vec<ComplexSample>, BerError> {
    ensure_config!(bits.len() % 2 == 0, "bits", "QPSK needs an even number of bits, got {}", bits.len());
    bits.chunks_exact(2)
        .map(|pair| Ok(ComplexSample::new(bit_to_level(pair[0])?, bit_to_level(pair[1])?)))
        .collect()
}

fn bit_to_level(bit: u8) -> Result<f64, BerError> {
    ensure_config!(bit <= 1, "bits", "bit values must be 0 or 1, got {}", bit);
    Ok(2.0 * bit as f64 - 1.0)
}

/// Overlaid symbol-centred traces of s(t) = Σ a_n p(t - n)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EyeDiagram {
    /// Trace time axis in symbol periods, -span/2 ..= +span/2
    pub t: Vec<f64>,
    pub traces: Vec<Vec<ComplexSample>>,
    /// Largest |s| over all traces
    pub peak_abs: f64,
    /// Largest |Re s| over all traces
    pub peak_real: f64,
}

impl EyeDiagram {
    /// Builds up to `max_traces` traces of `span` symbol periods, `samples_per_symbol` points per period.
    /// Traces are centred on symbols whose full truncation window lies inside the stream.
    pub fn build(
        shape: &PulseShape,
        symbols: &[ComplexSample],
        samples_per_symbol: u32,
        span: f64,
        max_traces: usize,
    ) -> Result<Self, BerError> {
        ensure_finite!(span);
        ensure_config!(span > 0.0, "span", "eye span must be positive, got {}", span);
        ensure_config!(samples_per_symbol >= 1, "samples_per_symbol", "need at least one sample per symbol");
        ensure_config!(max_traces >= 1, "max_traces", "need at least one trace");

        let fs = samples_per_symbol as f64;
        let npts = (span * fs).round() as usize + 1;
        let t: Vec<f64> = (0..npts).map(|m| -span / 2.0 + m as f64 / fs).collect();

        // Symbols closer than this to either end see a clipped interference window
        let margin = (shape.half_width() + span / 2.0).ceil() as usize;
        ensure_config!(
            symbols.len() > 2 * margin,
            "symbols",
            "{} symbols leave no fully interfered trace, need more than {}",
            symbols.len(),
            2 * margin
        );
        let count = (symbols.len() - 2 * margin).min(max_traces);
        let reach = shape.half_width().ceil() as i64;

        let traces: Vec<Vec<ComplexSample>> = (margin..margin + count)
            .map(|centre| {
                t.iter()
                    .map(|&u| {
                        let at = centre as f64 + u;
                        let nearest = at.round() as i64;
                        (nearest - reach - 1..=nearest + reach + 1)
                            .filter(|&n| n >= 0 && (n as usize) < symbols.len())
                            .map(|n| symbols[n as usize] * shape.evaluate(at - n as f64))
                            .sum()
                    })
                    .collect()
            })
            .collect();

        let peak_abs = traces.iter().flatten().map(|s| s.norm()).fold(0.0, f64::max);
        let peak_real = traces.iter().flatten().map(|s| s.re.abs()).fold(0.0, f64::max);

        tracing::debug!("{} eye: {} traces of {} points, peak {:.4}", shape.label(), traces.len(), npts, peak_abs);
        Ok(Self { t, traces, peak_abs, peak_real })
    }
}
