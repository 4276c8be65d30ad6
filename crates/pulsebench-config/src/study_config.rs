use std::collections::HashSet;
use std::path::PathBuf;

use serde::Deserialize;

use pulsebench_core::BerError;
use pulsebench_engine::{BerParameters, PulseShape, SweepAxis, SweepDriver};

pub const DEFAULT_NFFT: usize = 2048;

/// Table format written by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgOutput {
    /// Directory all tables are written into
    pub dir: PathBuf,
    pub format: OutputFormat,
    /// FFT length for frequency response tables
    pub nfft: usize,
}

impl Default for CfgOutput {
    fn default() -> Self {
        Self { dir: PathBuf::from("results"), format: OutputFormat::Json, nfft: DEFAULT_NFFT }
    }
}

#[derive(Debug, Clone)]
pub struct CfgPulse {
    pub name: String,
    pub shape: PulseShape,
}

#[derive(Debug, Clone)]
pub struct CfgSweep {
    pub name: String,
    pub axis: SweepAxis,
    pub curves: Option<SweepAxis>,
    /// Evaluate grid points on the rayon pool
    pub parallel: bool,
}

#[derive(Debug, Clone)]
pub struct StudyConfig {
    pub debug_log: Option<String>,
    pub output: CfgOutput,
    pub pulses: Vec<CfgPulse>,
    /// Parameters every sweep starts from. The roll-off is replaced by each pulse's own.
    pub base: BerParameters,
    pub sweeps: Vec<CfgSweep>,
}

impl StudyConfig {
    /// Validate that the study can run and that its output file names are unambiguous.
    pub fn validate(&self) -> Result<(), String> {
        if self.pulses.is_empty() {
            return Err("study defines no [[pulse]]".to_string());
        }
        if self.sweeps.is_empty() {
            return Err("study defines no [[sweep]]".to_string());
        }
        check_names("pulse", self.pulses.iter().map(|p| p.name.as_str()))?;
        check_names("sweep", self.sweeps.iter().map(|s| s.name.as_str()))?;

        let grid = self.pulses.iter().map(|p| 2 * p.shape.samples_per_side() + 1).max().unwrap_or(0);
        if self.output.nfft < grid {
            return Err(format!(
                "output.nfft {} is shorter than the largest pulse grid of {} samples",
                self.output.nfft, grid
            ));
        }
        Ok(())
    }

    /// Base parameters with the roll-off of `pulse`
    pub fn params_for(&self, pulse: &CfgPulse) -> Result<BerParameters, BerError> {
        self.base.clone().with_alpha(pulse.shape.alpha())
    }

    /// Sweep driver for one sweep applied to one pulse
    pub fn driver(&self, sweep: &CfgSweep, pulse: &CfgPulse) -> Result<SweepDriver, BerError> {
        let driver = SweepDriver::new(pulse.shape.clone(), self.params_for(pulse)?, sweep.axis.clone());
        match &sweep.curves {
            Some(curves) => driver.with_curves(curves.clone()),
            None => Ok(driver),
        }
    }

    /// Output file stem for a sweep over a pulse
    pub fn table_name(sweep: &CfgSweep, pulse: &CfgPulse) -> String {
        format!("{}_{}", sweep.name, pulse.name)
    }
}

/// Names end up in file names: non-empty, unique, and limited to [A-Za-z0-9_-]
fn check_names<'a>(what: &str, names: impl Iterator<Item = &'a str>) -> Result<(), String> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(format!("{} name {:?} must be non-empty and use only letters, digits, '_' or '-'", what, name));
        }
        if !seen.insert(name) {
            return Err(format!("duplicate {} name {:?}", what, name));
        }
    }
    Ok(())
}
