//! Samples a pulse at symbol-spaced instants to obtain ISI and CCI taps

use serde::{Deserialize, Serialize};

use pulsebench_core::sample_consts::PI;
use pulsebench_core::{BerError, assert_warn, ensure_finite};

use crate::params::MAX_INTERFERING_TAPS;
use crate::pulse::PulseShape;

/// Taps smaller than this fraction of the reference amplitude are ignored in decay checks
const DECAY_FLOOR: f64 = 1e-12;
/// Taps with |k| below this are treated as main lobe in decay checks
const MAIN_LOBE: usize = 1;

/// Carrier phase of a co-channel interferer relative to the desired signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierPhase {
    /// Known phase in radians, taps are projected onto the in-phase axis
    Fixed(f64),
    /// Uniformly distributed phase, averaged analytically by the engine
    Uniform,
}

/// One co-channel interferer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CciSource {
    /// Timing offset in symbol periods
    pub tau: f64,
    pub phase: CarrierPhase,
    /// Carrier frequency offset in cycles per symbol
    pub freq_offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TapSource {
    /// Neighbouring symbols of the desired signal sampled at timing offset `tau`,
    /// `cursor` is the desired symbol's own amplitude p(tau)
    Isi { tau: f64, cursor: f64 },
    Cci(CciSource),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tap {
    pub k: i64,
    pub value: f64,
}

/// Interference coefficients over a symbol window, tagged with their source.
/// `reference` is the pulse peak p(0) that scales the decision distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterferenceTapSet {
    source: TapSource,
    reference: f64,
    taps: Vec<Tap>,
}

impl InterferenceTapSet {
    pub fn new(source: TapSource, reference: f64, taps: Vec<Tap>) -> Self {
        Self { source, reference, taps }
    }

    pub fn source(&self) -> &TapSource {
        &self.source
    }

    pub fn reference(&self) -> f64 {
        self.reference
    }

    pub fn taps(&self) -> &[Tap] {
        &self.taps
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.taps.iter().map(|t| t.value)
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Cursor amplitude p(tau) for ISI sets
    pub fn cursor(&self) -> Option<f64> {
        match self.source {
            TapSource::Isi { cursor, .. } => Some(cursor),
            TapSource::Cci(_) => None,
        }
    }

    /// Whether |h_k| never exceeds the largest nearer tap on the same side, for |k| >= lobe.
    /// Taps below a tiny fraction of the reference are ignored.
    pub fn decays_from(&self, lobe: usize) -> bool {
        let floor = DECAY_FLOOR * self.reference.abs();
        let side_ok = |mut side: Vec<&Tap>| {
            side.sort_by_key(|t| t.k.unsigned_abs());
            let mut running_max: Option<f64> = None;
            for tap in side {
                if (tap.k.unsigned_abs() as usize) < lobe {
                    continue;
                }
                let mag = tap.value.abs();
                if mag <= floor {
                    continue;
                }
                match running_max {
                    Some(max) if mag > max * (1.0 + 1e-9) => return false,
                    Some(max) => running_max = Some(max.max(mag)),
                    None => running_max = Some(mag),
                }
            }
            true
        };
        side_ok(self.taps.iter().filter(|t| t.k > 0).collect())
            && side_ok(self.taps.iter().filter(|t| t.k < 0).collect())
    }
}

/// Samples a pulse shape at kT + tau
pub struct InterferenceSampler<'a> {
    shape: &'a PulseShape,
}

impl<'a> InterferenceSampler<'a> {
    pub fn new(shape: &'a PulseShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> &PulseShape {
        self.shape
    }

    /// Pulse peak p(0)
    pub fn reference(&self) -> f64 {
        self.shape.evaluate(0.0)
    }

    /// ISI taps p(k + tau) for k in [-window, window] \ {0}, with cursor p(tau).
    /// A window of zero yields an empty set.
    pub fn sample(&self, tau: f64, window: usize) -> Result<InterferenceTapSet, BerError> {
        self.sample_isi(tau, window, false)
    }

    /// Like `sample`, but includes the cursor itself as the k = 0 tap
    pub fn sample_full(&self, tau: f64, window: usize) -> Result<InterferenceTapSet, BerError> {
        self.sample_isi(tau, window, true)
    }

    fn sample_isi(&self, tau: f64, window: usize, with_cursor: bool) -> Result<InterferenceTapSet, BerError> {
        ensure_finite!(tau);
        let w = window_bound(window)?;
        let taps = (-w..=w)
            .filter(|&k| with_cursor || k != 0)
            .map(|k| Tap { k, value: self.shape.evaluate(k as f64 + tau) })
            .collect();

        let set = InterferenceTapSet {
            source: TapSource::Isi { tau, cursor: self.shape.evaluate(tau) },
            reference: self.reference(),
            taps,
        };
        tracing::trace!("isi tau={} window={} taps={:?}", tau, window, set.taps);
        assert_warn!(set.decays_from(MAIN_LOBE), "{} ISI taps at tau={} grow away from the main lobe", self.shape.label(), tau);
        Ok(set)
    }

    /// One tap set per interferer with taps p(tau_i + k) for k in [-window, window].
    /// Fixed phases project each tap by cos(theta_i + 2π·df_i·k); uniform phases leave taps unprojected.
    pub fn sample_cci(&self, sources: &[CciSource], window: usize) -> Result<Vec<InterferenceTapSet>, BerError> {
        let w = window_bound(window)?;
        let mut sets = Vec::with_capacity(sources.len());
        for src in sources {
            ensure_finite!(src.tau, "cci_tau");
            ensure_finite!(src.freq_offset, "cci_freq_offset");

            let taps = (-w..=w)
                .map(|k| {
                    let p = self.shape.evaluate(k as f64 + src.tau);
                    let value = match src.phase {
                        CarrierPhase::Fixed(theta) => p * (theta + 2.0 * PI * src.freq_offset * k as f64).cos(),
                        CarrierPhase::Uniform => p,
                    };
                    Tap { k, value }
                })
                .collect();

            let set = InterferenceTapSet { source: TapSource::Cci(*src), reference: self.reference(), taps };
            tracing::trace!("cci {:?} window={} taps={:?}", src, window, set.taps);
            assert_warn!(set.decays_from(MAIN_LOBE), "{} CCI taps grow away from the main lobe", self.shape.label());
            sets.push(set);
        }
        Ok(sets)
    }
}

/// Window as a signed tap index, bounded so that sampling stays within MAX_INTERFERING_TAPS
fn window_bound(window: usize) -> Result<i64, BerError> {
    i64::try_from(window)
        .ok()
        .filter(|_| window <= MAX_INTERFERING_TAPS / 2)
        .ok_or(BerError::ResourceLimit { taps: window.saturating_mul(2), limit: MAX_INTERFERING_TAPS })
}
