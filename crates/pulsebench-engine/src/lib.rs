//! Pulse-shape modelling and closed-form BER evaluation
//!
//! Leaf-first: `pulse` builds truncated, normalized waveforms; `sampler` turns them into
//! ISI/CCI tap sets; `engine` averages the Gaussian tail over the interfering symbols;
//! `sweep` drives the engine over parameter grids. `eye` provides eye-diagram traces.

pub mod engine;
pub mod eye;
pub mod params;
pub mod pulse;
pub mod sampler;
pub mod sweep;

pub use engine::{BerResult, InterferenceMode, compute_ber, evaluate_ber};
pub use params::{BerMethod, BerParameters, CciLayout, PhaseRealization};
pub use pulse::{Normalization, PulseKind, PulseShape};
pub use sampler::{CarrierPhase, CciSource, InterferenceSampler, InterferenceTapSet};
pub use sweep::{SweepAxis, SweepDriver, SweepFailure, SweepPoint, SweepTable};
