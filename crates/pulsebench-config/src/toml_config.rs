use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use toml::Value;

use pulsebench_core::{AxisGrid, PowerRatio};
use pulsebench_engine::params::{DEFAULT_MAX_TAPS, DEFAULT_SERIES_HARMONICS, DEFAULT_SERIES_OMEGA, DEFAULT_WINDOW};
use pulsebench_engine::pulse::waveforms::{
    DEFAULT_BTRC_MU, DEFAULT_ELP_BETA, DEFAULT_IPLCP_EPSILON, DEFAULT_IPLCP_GAMMA, DEFAULT_IPLCP_MU,
};
use pulsebench_engine::pulse::{Btrc, DEFAULT_HALF_WIDTH, DEFAULT_OVERSAMPLE, Elp, Iplcp, RaisedCosine};
use pulsebench_engine::{
    BerMethod, BerParameters, CciLayout, Normalization, PhaseRealization, PulseKind, PulseShape, SweepAxis,
};

use super::study_config::{CfgOutput, CfgPulse, CfgSweep, DEFAULT_NFFT, OutputFormat, StudyConfig};

const EXPECTED_CONFIG_VERSION: &str = "0.1";

/// Build `StudyConfig` from a TOML study file
pub fn from_toml_str(toml_str: &str) -> Result<StudyConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    if root.config_version != EXPECTED_CONFIG_VERSION {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, EXPECTED_CONFIG_VERSION
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if let Some(ref out) = root.output {
        if !out.extra.is_empty() {
            return Err(format!("Unrecognized fields in output: {:?}", sorted_keys(&out.extra)).into());
        }
    }
    for pulse in &root.pulse {
        if !pulse.extra.is_empty() {
            return Err(format!("Unrecognized fields in pulse {}: {:?}", pulse.name, sorted_keys(&pulse.extra)).into());
        }
    }
    if !root.ber.extra.is_empty() {
        return Err(format!("Unrecognized fields in ber: {:?}", sorted_keys(&root.ber.extra)).into());
    }
    if let Some(ref cci) = root.ber.cci {
        if !cci.extra.is_empty() {
            return Err(format!("Unrecognized fields in ber.cci: {:?}", sorted_keys(&cci.extra)).into());
        }
    }
    for sweep in &root.sweep {
        if !sweep.extra.is_empty() {
            return Err(format!("Unrecognized fields in sweep {}: {:?}", sweep.name, sorted_keys(&sweep.extra)).into());
        }
        for axis in std::iter::once(&sweep.axis).chain(sweep.curves.as_ref()) {
            if !axis.extra.is_empty() {
                return Err(format!("Unrecognized fields in sweep {} axis: {:?}", sweep.name, sorted_keys(&axis.extra)).into());
            }
        }
    }

    let mut pulses = Vec::with_capacity(root.pulse.len());
    for dto in root.pulse {
        let name = dto.name.clone();
        let shape = build_pulse(dto).map_err(|e| format!("pulse {}: {}", name, e))?;
        pulses.push(CfgPulse { name, shape });
    }

    // Roll-off defaults to the first pulse's; every sweep replaces it with the swept pulse's own
    let alpha = match (root.ber.alpha, pulses.first()) {
        (Some(alpha), _) => alpha,
        (None, Some(first)) => first.shape.alpha(),
        (None, None) => return Err("study defines no [[pulse]]".into()),
    };
    let base = build_ber(root.ber, alpha).map_err(|e| format!("ber: {}", e))?;

    let mut sweeps = Vec::with_capacity(root.sweep.len());
    for dto in root.sweep {
        let axis = build_axis(dto.axis).map_err(|e| format!("sweep {}: {}", dto.name, e))?;
        let curves = match dto.curves {
            Some(c) => Some(build_axis(c).map_err(|e| format!("sweep {} curves: {}", dto.name, e))?),
            None => None,
        };
        sweeps.push(CfgSweep { name: dto.name, axis, curves, parallel: dto.parallel.unwrap_or(true) });
    }

    let output = match root.output {
        Some(out) => CfgOutput {
            dir: out.dir,
            format: out.format.unwrap_or(OutputFormat::Json),
            nfft: out.nfft.unwrap_or(DEFAULT_NFFT),
        },
        None => CfgOutput::default(),
    };

    let cfg = StudyConfig { debug_log: root.debug_log, output, pulses, base, sweeps };
    cfg.validate()?;
    tracing::debug!("loaded study: {} pulses, {} sweeps", cfg.pulses.len(), cfg.sweeps.len());
    Ok(cfg)
}

/// Build `StudyConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<StudyConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `StudyConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<StudyConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    from_reader(r)
}

fn build_pulse(dto: PulseDto) -> Result<PulseShape, Box<dyn std::error::Error>> {
    // Reject parameters the selected family does not take
    let unused: Vec<(&str, bool)> = match dto.shape {
        ShapeDto::RaisedCosine => vec![
            ("mu", dto.mu.is_some()),
            ("beta", dto.beta.is_some()),
            ("gamma", dto.gamma.is_some()),
            ("epsilon", dto.epsilon.is_some()),
        ],
        ShapeDto::Btrc => vec![("beta", dto.beta.is_some()), ("gamma", dto.gamma.is_some()), ("epsilon", dto.epsilon.is_some())],
        ShapeDto::Elp => vec![("mu", dto.mu.is_some()), ("gamma", dto.gamma.is_some()), ("epsilon", dto.epsilon.is_some())],
        ShapeDto::Iplcp => vec![("beta", dto.beta.is_some())],
    };
    if let Some((field, _)) = unused.iter().find(|(_, present)| *present) {
        return Err(format!("{:?} pulse takes no {}", dto.shape, field).into());
    }

    let kind = match dto.shape {
        ShapeDto::RaisedCosine => PulseKind::RaisedCosine(RaisedCosine::new(dto.alpha)?),
        ShapeDto::Btrc => PulseKind::Btrc(Btrc::new(dto.alpha, dto.mu.unwrap_or(DEFAULT_BTRC_MU))?),
        ShapeDto::Elp => PulseKind::Elp(Elp::new(dto.alpha, dto.beta.unwrap_or(DEFAULT_ELP_BETA))?),
        ShapeDto::Iplcp => PulseKind::Iplcp(Iplcp::new(
            dto.alpha,
            dto.mu.unwrap_or(DEFAULT_IPLCP_MU),
            dto.gamma.unwrap_or(DEFAULT_IPLCP_GAMMA),
            dto.epsilon.unwrap_or(DEFAULT_IPLCP_EPSILON),
        )?),
    };
    Ok(PulseShape::new(
        kind,
        dto.half_width.unwrap_or(DEFAULT_HALF_WIDTH),
        dto.oversample.unwrap_or(DEFAULT_OVERSAMPLE),
        match dto.normalization.unwrap_or(NormalizationDto::Discrete) {
            NormalizationDto::None => Normalization::None,
            NormalizationDto::Discrete => Normalization::Discrete,
            NormalizationDto::Continuous => Normalization::Continuous,
            NormalizationDto::Amplitude => Normalization::Amplitude,
        },
    )?)
}

fn build_ber(dto: BerDto, alpha: f64) -> Result<BerParameters, Box<dyn std::error::Error>> {
    let snr = ratio("snr", dto.snr_db, dto.snr_linear)?.unwrap_or(PowerRatio::Db(10.0));
    let sir = ratio("sir", dto.sir_db, dto.sir_linear)?;

    let method = match dto.method.unwrap_or(MethodDto::Enumeration) {
        MethodDto::Enumeration => {
            if dto.harmonics.is_some() || dto.omega.is_some() {
                return Err("harmonics and omega only apply to the Series method".into());
            }
            BerMethod::Enumeration { max_taps: dto.max_taps.unwrap_or(DEFAULT_MAX_TAPS) }
        }
        MethodDto::Series => {
            if dto.max_taps.is_some() {
                return Err("max_taps only applies to the Enumeration method".into());
            }
            BerMethod::Series {
                harmonics: dto.harmonics.unwrap_or(DEFAULT_SERIES_HARMONICS),
                omega: dto.omega.unwrap_or(DEFAULT_SERIES_OMEGA),
            }
        }
    };

    let cci = match dto.cci {
        Some(c) => {
            let phases = match (c.phases.unwrap_or(PhasesDto::Aligned), c.fixed_phases) {
                (PhasesDto::Fixed, Some(list)) => PhaseRealization::Fixed(list),
                (PhasesDto::Fixed, None) => return Err("cci.phases = \"Fixed\" needs cci.fixed_phases".into()),
                (_, Some(_)) => return Err("cci.fixed_phases only applies to phases = \"Fixed\"".into()),
                (PhasesDto::Aligned, None) => PhaseRealization::Aligned,
                (PhasesDto::Uniform, None) => PhaseRealization::Uniform,
            };
            CciLayout { tau: c.tau.unwrap_or(0.0), phases, freq_offset: c.freq_offset.unwrap_or(0.0) }
        }
        None => CciLayout::default(),
    };

    // Method first, so a uniform-phase layout is checked against the final method
    let mut params = BerParameters::new(dto.tau.unwrap_or(0.0), alpha, snr)?
        .with_method(method)?
        .with_window(count("window", dto.window, DEFAULT_WINDOW)?)?
        .with_cci_window(count("cci_window", dto.cci_window, 0)?)?
        .with_cci(cci)?
        .with_interferers(count("interferers", dto.interferers, 0)?)?;
    if let Some(sir) = sir {
        params = params.with_sir(sir)?;
    }
    Ok(params)
}

fn ratio(name: &str, db: Option<f64>, linear: Option<f64>) -> Result<Option<PowerRatio>, String> {
    match (db, linear) {
        (Some(_), Some(_)) => Err(format!("give either {}_db or {}_linear, not both", name, name)),
        (Some(db), None) => Ok(Some(PowerRatio::Db(db))),
        (None, Some(lin)) => Ok(Some(PowerRatio::Linear(lin))),
        (None, None) => Ok(None),
    }
}

/// Integer fields are read signed so that negative values are reported rather than wrapped
fn count(name: &str, value: Option<i64>, default: usize) -> Result<usize, String> {
    match value {
        None => Ok(default),
        Some(v) if v >= 0 => usize::try_from(v).map_err(|e| format!("{}: {}", name, e)),
        Some(v) => Err(format!("{} must be non-negative, got {}", name, v)),
    }
}

fn build_axis(dto: AxisDto) -> Result<SweepAxis, Box<dyn std::error::Error>> {
    let grid = match (dto.values, dto.start, dto.stop, dto.step) {
        (Some(values), None, None, None) => AxisGrid::from_values(values)?,
        (None, Some(start), Some(stop), Some(step)) => AxisGrid::stepped(start, stop, step)?,
        _ => return Err("axis needs either values or all of start, stop and step".into()),
    };
    Ok(match dto.param {
        ParamDto::Tau => SweepAxis::Tau(grid),
        ParamDto::Alpha => SweepAxis::Alpha(grid),
        ParamDto::SnrDb => SweepAxis::SnrDb(grid),
        ParamDto::SirDb => SweepAxis::SirDb(grid),
        ParamDto::Interferers => SweepAxis::Interferers(grid),
        ParamDto::Window => SweepAxis::Window(grid),
    })
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,

    #[serde(default)]
    output: Option<OutputDto>,

    #[serde(default)]
    pulse: Vec<PulseDto>,

    #[serde(default)]
    ber: BerDto,

    #[serde(default)]
    sweep: Vec<SweepDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct OutputDto {
    dir: PathBuf,
    format: Option<OutputFormat>,
    nfft: Option<usize>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
enum ShapeDto {
    RaisedCosine,
    Btrc,
    Elp,
    Iplcp,
}

#[derive(Deserialize)]
enum NormalizationDto {
    None,
    Discrete,
    Continuous,
    Amplitude,
}

#[derive(Deserialize)]
struct PulseDto {
    name: String,
    shape: ShapeDto,
    alpha: f64,

    half_width: Option<f64>,
    oversample: Option<u32>,
    normalization: Option<NormalizationDto>,

    mu: Option<f64>,
    beta: Option<f64>,
    gamma: Option<u32>,
    epsilon: Option<f64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
enum MethodDto {
    Enumeration,
    Series,
}

#[derive(Default, Deserialize)]
struct BerDto {
    tau: Option<f64>,
    alpha: Option<f64>,
    snr_db: Option<f64>,
    snr_linear: Option<f64>,
    sir_db: Option<f64>,
    sir_linear: Option<f64>,

    interferers: Option<i64>,
    window: Option<i64>,
    cci_window: Option<i64>,

    method: Option<MethodDto>,
    max_taps: Option<usize>,
    harmonics: Option<u32>,
    omega: Option<f64>,

    #[serde(default)]
    cci: Option<CciDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
enum PhasesDto {
    Aligned,
    Fixed,
    Uniform,
}

#[derive(Deserialize)]
struct CciDto {
    tau: Option<f64>,
    phases: Option<PhasesDto>,
    fixed_phases: Option<Vec<f64>>,
    freq_offset: Option<f64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
enum ParamDto {
    Tau,
    Alpha,
    SnrDb,
    SirDb,
    Interferers,
    Window,
}

#[derive(Deserialize)]
struct AxisDto {
    param: ParamDto,
    values: Option<Vec<f64>>,
    start: Option<f64>,
    stop: Option<f64>,
    step: Option<f64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct SweepDto {
    name: String,
    axis: AxisDto,
    curves: Option<AxisDto>,
    parallel: Option<bool>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsebench_engine::pulse::Waveform;

    const STUDY: &str = r#"
config_version = "0.1"
debug_log = "study.log"

[output]
dir = "out"
format = "Csv"

[[pulse]]
name = "rc"
shape = "RaisedCosine"
alpha = 0.35

[[pulse]]
name = "iplcp"
shape = "Iplcp"
alpha = 0.22
mu = 1.6
gamma = 2
half_width = 6.0
normalization = "Amplitude"

[ber]
tau = 0.1
snr_db = 8.0
sir_db = 12.0
interferers = 1
cci_window = 1

[ber.cci]
tau = 0.2
phases = "Fixed"
fixed_phases = [0.3, 1.0]

[[sweep]]
name = "snr_alpha"
parallel = false
axis = { param = "SnrDb", start = 0.0, stop = 15.0, step = 1.0 }
curves = { param = "Alpha", values = [0.5, 0.22, 0.35] }

[[sweep]]
name = "tau"
axis = { param = "Tau", values = [0.0, 0.05, 0.1, 0.2, 0.25] }
"#;

    #[test]
    fn test_parse_study() {
        let cfg = from_toml_str(STUDY).unwrap();
        assert_eq!(cfg.debug_log.as_deref(), Some("study.log"));
        assert_eq!(cfg.output.dir, PathBuf::from("out"));
        assert_eq!(cfg.output.format, OutputFormat::Csv);
        assert_eq!(cfg.output.nfft, DEFAULT_NFFT);

        assert_eq!(cfg.pulses.len(), 2);
        assert_eq!(cfg.pulses[0].shape.label(), "RC");
        match cfg.pulses[1].shape.kind() {
            PulseKind::Iplcp(p) => {
                assert_eq!(p.gamma(), 2);
                assert_eq!(p.alpha(), 0.22);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(cfg.pulses[1].shape.half_width(), 6.0);
        assert_eq!(cfg.pulses[1].shape.normalization(), Normalization::Amplitude);
        assert_eq!(cfg.pulses[0].shape.normalization(), Normalization::Discrete);

        assert_eq!(cfg.base.alpha(), 0.35);
        assert_eq!(cfg.base.tau(), 0.1);
        assert_eq!(cfg.base.snr(), PowerRatio::Db(8.0));
        assert_eq!(cfg.base.interferers(), 1);
        assert_eq!(cfg.base.window(), DEFAULT_WINDOW);
        assert_eq!(cfg.base.cci().phases, PhaseRealization::Fixed(vec![0.3, 1.0]));

        assert_eq!(cfg.sweeps.len(), 2);
        assert!(!cfg.sweeps[0].parallel);
        assert!(cfg.sweeps[1].parallel);
        assert_eq!(cfg.sweeps[0].axis.grid().len(), 16);
        let curves = cfg.sweeps[0].curves.as_ref().unwrap();
        assert_eq!(curves.name(), "alpha");
        assert_eq!(curves.grid().as_slice(), &[0.22, 0.35, 0.5]);
    }

    #[test]
    fn test_demo_study() {
        let cfg = from_toml_str(include_str!("../../../demos/study.toml")).unwrap();
        assert_eq!(cfg.pulses.len(), 4);
        assert_eq!(cfg.sweeps.len(), 4);
        assert_eq!(cfg.base.interferers(), 2);
        for sweep in &cfg.sweeps {
            for pulse in &cfg.pulses {
                assert!(cfg.driver(sweep, pulse).is_ok(), "{} / {}", sweep.name, pulse.name);
            }
        }
    }

    #[test]
    fn test_minimal_study() {
        let cfg = from_toml_str(
            r#"
config_version = "0.1"

[[pulse]]
name = "elp"
shape = "Elp"
alpha = 0.5

[[sweep]]
name = "window"
axis = { param = "Window", values = [0, 1, 2, 3] }
"#,
        )
        .unwrap();
        assert_eq!(cfg.output.dir, PathBuf::from("results"));
        assert_eq!(cfg.base.alpha(), 0.5);
        assert_eq!(cfg.base.method(), BerMethod::Enumeration { max_taps: DEFAULT_MAX_TAPS });
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let bad = STUDY.replace("snr_db = 8.0", "snr_db = 8.0\nsnr_dbb = 3.0");
        let err = from_toml_str(&bad).unwrap_err().to_string();
        assert!(err.contains("ber") && err.contains("snr_dbb"), "{}", err);

        let bad = STUDY.replace("debug_log", "verbose = true\ndebug_log");
        assert!(from_toml_str(&bad).unwrap_err().to_string().contains("verbose"));

        let bad = STUDY.replace("\"Amplitude\"", "\"Peak\"");
        assert!(from_toml_str(&bad).is_err());

        let bad = STUDY.replace("gamma = 2", "gamma = 2\nwidth = 3");
        assert!(from_toml_str(&bad).unwrap_err().to_string().contains("width"));
    }

    #[test]
    fn test_rejects_wrong_version() {
        let bad = STUDY.replace("config_version = \"0.1\"", "config_version = \"0.5\"");
        let err = from_toml_str(&bad).unwrap_err().to_string();
        assert!(err.contains("config_version"), "{}", err);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let bad = STUDY.replace("alpha = 0.35", "alpha = 1.2");
        let err = from_toml_str(&bad).unwrap_err().to_string();
        assert!(err.contains("pulse rc") && err.contains("ConfigurationError"), "{}", err);

        let bad = STUDY.replace("interferers = 1", "interferers = -1");
        assert!(from_toml_str(&bad).unwrap_err().to_string().contains("non-negative"));

        let bad = STUDY.replace("cci_window = 1", "cci_window = 1\nwindow = 8589934592");
        assert!(from_toml_str(&bad).unwrap_err().to_string().contains("ResourceLimitError"));

        let bad = STUDY.replace("step = 1.0 }", "step = 1e-300 }");
        assert!(from_toml_str(&bad).unwrap_err().to_string().contains("sweep snr_alpha"));

        let bad = STUDY.replace("snr_db = 8.0", "snr_db = 8.0\nsnr_linear = 4.0");
        assert!(from_toml_str(&bad).is_err());

        let bad = STUDY.replace("phases = \"Fixed\"", "phases = \"Aligned\"");
        assert!(from_toml_str(&bad).is_err());

        // Beta is an ELP parameter
        let bad = STUDY.replace("mu = 1.6", "beta = 0.2");
        assert!(from_toml_str(&bad).unwrap_err().to_string().contains("beta"));

        let bad = STUDY.replace("name = \"tau\"", "name = \"snr_alpha\"");
        assert!(from_toml_str(&bad).unwrap_err().to_string().contains("duplicate sweep"));
    }

    #[test]
    fn test_uniform_phase_needs_series() {
        let uniform = STUDY
            .replace("phases = \"Fixed\"\nfixed_phases = [0.3, 1.0]", "phases = \"Uniform\"")
            .replace("cci_window = 1", "cci_window = 0");
        assert!(from_toml_str(&uniform).is_err());

        let series = uniform.replace("interferers = 1", "interferers = 1\nmethod = \"Series\"");
        let cfg = from_toml_str(&series).unwrap();
        assert_eq!(cfg.base.cci().phases, PhaseRealization::Uniform);
        assert!(matches!(cfg.base.method(), BerMethod::Series { .. }));
    }
}
