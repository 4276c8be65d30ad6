use pulsebench_core::PowerRatio;
use pulsebench_core::debug;
use pulsebench_engine::{BerParameters, PulseKind, PulseShape};

/// All four pulse families at roll-off `alpha` with their default shape parameters
pub fn all_kinds(alpha: f64) -> Vec<PulseKind> {
    vec![
        PulseKind::raised_cosine(alpha).unwrap(),
        PulseKind::btrc(alpha).unwrap(),
        PulseKind::elp(alpha).unwrap(),
        PulseKind::iplcp(alpha).unwrap(),
    ]
}

/// Normalized RC pulse with roll-off 0.35 and the default window.
/// Also sets up verbose logging, so failing tests show the engine trace.
pub fn default_test_shape() -> PulseShape {
    debug::setup_logging_verbose();
    PulseShape::with_defaults(PulseKind::raised_cosine(0.35).unwrap()).unwrap()
}

/// ISI-only parameters: tau = 0, alpha = 0.35, 10 dB, window +-5.
/// They can still be modified with the with_* setters as needed.
pub fn default_test_params() -> BerParameters {
    BerParameters::new(0.0, 0.35, PowerRatio::Db(10.0)).unwrap()
}
