use clap::Parser;
use serde::Serialize;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pulsebench_config::{CfgPulse, CfgSweep, OutputFormat, StudyConfig, toml_config};
use pulsebench_core::debug;
use pulsebench_engine::pulse::{FrequencyResponse, SampleGrid};
use pulsebench_engine::{SweepDriver, SweepTable};

/// Load study file
fn load_config_from_toml(cfg_path: &str) -> StudyConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load study from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

/// A table the CLI knows how to write in either output format
trait Table: Serialize {
    fn csv(&self) -> String;
}

impl Table for SweepTable {
    fn csv(&self) -> String {
        self.to_csv()
    }
}

impl Table for SampleGrid {
    fn csv(&self) -> String {
        self.to_csv()
    }
}

impl Table for FrequencyResponse {
    fn csv(&self) -> String {
        self.to_csv()
    }
}

fn write_table<T: Table>(dir: &Path, stem: &str, format: OutputFormat, table: &T) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = dir.join(format!("{}.{}", stem, format.extension()));
    let contents = match format {
        OutputFormat::Json => serde_json::to_string_pretty(table)?,
        OutputFormat::Csv => table.csv(),
    };
    fs::write(&path, contents)?;
    Ok(path)
}

/// Impulse and frequency response tables for every pulse
fn write_pulse_tables(cfg: &StudyConfig) -> Result<(), Box<dyn std::error::Error>> {
    for pulse in &cfg.pulses {
        let grid = pulse.shape.sample_grid();
        let path = write_table(&cfg.output.dir, &format!("{}_grid", pulse.name), cfg.output.format, &grid)?;
        tracing::info!("{}: {} grid samples -> {}", pulse.name, grid.len(), path.display());

        let resp = pulse.shape.frequency_response(cfg.output.nfft)?;
        let path = write_table(&cfg.output.dir, &format!("{}_freq", pulse.name), cfg.output.format, &resp)?;
        tracing::info!("{}: {} frequency bins -> {}", pulse.name, resp.points().len(), path.display());
    }
    Ok(())
}

/// Outcome of one sweep over one pulse
enum SweepOutcome {
    Complete(SweepTable),
    Interrupted(SweepTable),
    Failed(SweepTable, String),
}

/// Evaluate point by point so that Ctrl+C can stop between grid points
fn run_interruptible(driver: &SweepDriver, running: &AtomicBool) -> SweepOutcome {
    let mut table = SweepTable::new(driver.axis().name(), driver.curves().map(|c| c.name()));
    for point in driver.iter() {
        if !running.load(Ordering::SeqCst) {
            return SweepOutcome::Interrupted(table);
        }
        match point {
            Ok(p) => table.push(p),
            Err(failure) => {
                let msg = format!("sweep aborted after {} points at {}", table.len(), failure);
                return SweepOutcome::Failed(table, msg);
            }
        }
    }
    SweepOutcome::Complete(table)
}

fn run_sweep(cfg: &StudyConfig, sweep: &CfgSweep, pulse: &CfgPulse, parallel: bool, running: &AtomicBool) -> SweepOutcome {
    let driver = match cfg.driver(sweep, pulse) {
        Ok(d) => d,
        Err(e) => {
            let table = SweepTable::new(sweep.axis.name(), sweep.curves.as_ref().map(|c| c.name()));
            return SweepOutcome::Failed(table, e.to_string());
        }
    };
    tracing::info!(
        "sweep {} over {} ({}): {} points{}, base snr={:.1} dB sir={:.1} dB",
        sweep.name,
        pulse.name,
        pulse.shape.label(),
        driver.len(),
        if parallel { ", parallel" } else { "" },
        cfg.base.snr().to_db(),
        cfg.base.sir().to_db()
    );

    if parallel {
        match driver.run_parallel() {
            Ok(table) => SweepOutcome::Complete(table),
            Err(failure) => {
                let msg = failure.to_string();
                SweepOutcome::Failed(failure.partial, msg)
            }
        }
    } else {
        run_interruptible(&driver, running)
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Pulse-shape BER study runner",
    long_about = "Evaluates closed-form BER of Nyquist pulse shapes under ISI and CCI over the sweeps in a TOML study file"
)]
struct Args {
    /// Study file (required)
    #[arg(help = "TOML study with pulses, BER parameters and sweeps")]
    config: String,

    /// Also write impulse and frequency response tables for every pulse
    #[arg(long)]
    tables: bool,

    /// Run all sweeps point by point, ignoring per-sweep `parallel`
    #[arg(long)]
    sequential: bool,
}

fn main() {
    eprintln!("pulsebench {}", env!("CARGO_PKG_VERSION"));
    eprintln!(" -> closed-form BER of RC, BTRC, ELP and IPLCP pulses under ISI and CCI\n");

    let args = Args::parse();
    let cfg = load_config_from_toml(&args.config);
    let _log_guard = debug::setup_logging_default(cfg.debug_log.clone());

    if let Err(e) = fs::create_dir_all(&cfg.output.dir) {
        eprintln!("Failed to create output directory {}: {}", cfg.output.dir.display(), e);
        std::process::exit(1);
    }

    // Set up Ctrl+C handler, sweeps stop between grid points
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Failed to set Ctrl+C handler: {}", e);
        std::process::exit(1);
    }

    if args.tables {
        if let Err(e) = write_pulse_tables(&cfg) {
            eprintln!("Failed to write pulse tables: {}", e);
            std::process::exit(1);
        }
    }

    let mut failed = false;
    'sweeps: for sweep in &cfg.sweeps {
        for pulse in &cfg.pulses {
            if !running.load(Ordering::SeqCst) {
                break 'sweeps;
            }
            let parallel = sweep.parallel && !args.sequential;
            let stem = StudyConfig::table_name(sweep, pulse);
            let (table, complete) = match run_sweep(&cfg, sweep, pulse, parallel, &running) {
                SweepOutcome::Complete(t) => (t, true),
                SweepOutcome::Interrupted(t) => {
                    tracing::warn!("{}: interrupted after {} points", stem, t.len());
                    (t, false)
                }
                SweepOutcome::Failed(t, msg) => {
                    tracing::error!("{}: {}", stem, msg);
                    failed = true;
                    (t, false)
                }
            };

            // Partial tables are still written
            match write_table(&cfg.output.dir, &stem, cfg.output.format, &table) {
                Ok(path) if complete => tracing::info!("{}: {} points -> {}", stem, table.len(), path.display()),
                Ok(path) => tracing::info!("{}: partial table of {} points -> {}", stem, table.len(), path.display()),
                Err(e) => {
                    eprintln!("Failed to write {}: {}", stem, e);
                    std::process::exit(1);
                }
            }
        }
    }

    if !running.load(Ordering::SeqCst) {
        eprintln!("Interrupted, remaining sweeps skipped");
        std::process::exit(130);
    }
    if failed {
        std::process::exit(1);
    }
}
