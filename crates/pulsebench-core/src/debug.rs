use core::fmt;
use std::fs::OpenOptions;
use std::sync::Once;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, fmt as tracingfmt};

/// if `cond` is false, logs a warning with your message.
#[macro_export]
macro_rules! assert_warn {
    ($cond:expr, $($arg:tt)+) => {{
        if !$cond {
            tracing::warn!(
                target: module_path!(),
                "assertion warning: `{}` failed: {} at {}:{}",
                stringify!($cond),
                format_args!($($arg)+),
                file!(),
                line!(),
            );
        }
    }};
}

/// Shortens a source path to "[crate/module] file.rs", e.g.
/// "crates/pulsebench-engine/src/pulse/spectrum.rs" becomes "[engine/pulse] spectrum.rs"
fn short_location(file_path: &str) -> String {
    let Some(src_idx) = file_path.find("/src/") else {
        return file_path.to_string();
    };
    let before_src = &file_path[..src_idx];
    let after_src = &file_path[src_idx + 5..];

    let crate_dir = before_src.rsplit('/').next().unwrap_or("unknown");
    let crate_name = crate_dir.strip_prefix("pulsebench-").unwrap_or(crate_dir);

    match after_src.split_once('/') {
        Some((module, rest)) => {
            let filename = rest.rsplit('/').next().unwrap_or(rest);
            format!("[{}/{}] {}", crate_name, module, filename)
        }
        None => format!("[{}] {}", crate_name, after_src),
    }
}

struct AlignedFormatter;

/// Width of the point column when an event carries no `point` field
const POINT_COL: usize = 16;

/// Visitor to extract the `point` field, the grid point a sweep event belongs to
struct PointVisitor {
    point: Option<String>,
}

impl tracing::field::Visit for PointVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "point" {
            self.point = Some(format!("{:?}", value));
        }
    }
}

impl<S, N> FormatEvent<S, N> for AlignedFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: format::Writer<'_>, event: &tracing::Event<'_>) -> fmt::Result {
        let metadata = event.metadata();

        let mut visitor = PointVisitor { point: None };
        event.record(&mut visitor);
        let has_point = visitor.point.is_some();
        let point_str = format!("{:<width$}", visitor.point.unwrap_or_default(), width = POINT_COL);

        let (color_level, color_reset) = match *metadata.level() {
            tracing::Level::ERROR => ("\x1b[31m", "\x1b[0m"),
            tracing::Level::WARN => ("\x1b[33m", "\x1b[0m"),
            tracing::Level::INFO => ("\x1b[32m", "\x1b[0m"),
            tracing::Level::DEBUG => ("\x1b[34m", "\x1b[0m"),
            tracing::Level::TRACE => ("\x1b[35m", "\x1b[0m"),
        };

        let formatted_path = format!("{} {}", point_str, short_location(metadata.file().unwrap_or("unknown")));

        // Format: "LEVEL point [module] file:line: message"
        let location = format!(
            "{}{:<5}{} {}:{}:",
            color_level,
            metadata.level(),
            color_reset,
            formatted_path,
            metadata.line().unwrap_or(0)
        );

        let mut message_buf = String::new();
        let message_writer = format::Writer::new(&mut message_buf);
        ctx.field_format().format_fields(message_writer, event)?;

        // The point is already shown in its own column
        if has_point {
            if let Some(idx) = message_buf.find("point=") {
                if let Some(space_idx) = message_buf[idx..].find(' ') {
                    message_buf.replace_range(idx..idx + space_idx + 1, "");
                } else {
                    message_buf.truncate(idx);
                }
            }
        }

        write!(writer, "{:<width$} {}", location, message_buf.trim_end(), width = 72)?;
        writeln!(writer)
    }
}

static INIT_LOG: Once = Once::new();

/// Sets up logging with maximum verbosity (trace level)
/// Mainly for unit tests
pub fn setup_logging_verbose() {
    setup_logging(EnvFilter::new("trace"), None);
}

/// Sets up default logging to stdout and optionally, a verbose log file
/// Returns a guard, that needs to be kept alive for logging to file to work
pub fn setup_logging_default(verbose_logfile: Option<String>) -> Option<WorkerGuard> {
    let stdout_filter = get_default_stdout_filter();
    let logfile_and_filter = verbose_logfile.map(|file| (file, get_default_logfile_filter()));
    setup_logging(stdout_filter, logfile_and_filter)
}

pub fn get_default_stdout_filter() -> EnvFilter {
    EnvFilter::new(
        [
            "info",
            // Per-tap-set and per-point chatter
            "pulsebench_engine::sampler=info",
            "pulsebench_engine::engine=info",
            "pulsebench_engine::pulse=info",
            // Sweep progress
            "pulsebench_engine::sweep=info",
            "pulsebench_config=info",
        ]
        .join(","),
    )
}

fn get_default_logfile_filter() -> EnvFilter {
    EnvFilter::new("debug,pulsebench_engine::sampler=trace")
}

/// Sets up logging to stdout and optionally, a verbose log file
/// If an output file is requested and can be opened, returns Some<WorkerGuard>. Keep this value alive
/// or logging to file may cease working. Otherwise returns None and logs to stdout only.
fn setup_logging(stdout_filter: EnvFilter, outfile: Option<(String, EnvFilter)>) -> Option<WorkerGuard> {
    let file = outfile.and_then(|(path, filter)| {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some((file, filter)),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}, logging to stdout only", path, e);
                None
            }
        }
    });

    if let Some((file, outfile_filter)) = file {
        let (file_writer, guard) = tracing_appender::non_blocking(file);

        INIT_LOG.call_once(|| {
            let file_layer = tracingfmt::layer()
                .event_format(AlignedFormatter)
                .with_writer(file_writer)
                .with_ansi(false);
            let stdout_layer = tracingfmt::layer().event_format(AlignedFormatter);

            tracing_subscriber::registry()
                .with(file_layer.with_filter(outfile_filter))
                .with(stdout_layer.with_filter(stdout_filter))
                .init();
        });

        Some(guard)
    } else {
        INIT_LOG.call_once(|| {
            let stdout_layer = tracingfmt::layer().event_format(AlignedFormatter);

            tracing_subscriber::registry()
                .with(stdout_layer.with_filter(stdout_filter))
                .init();
        });
        None
    }
}
