//! Debug logging for git-commitflow.
//!
//! Both `log` records and `tracing` events end up in one optional log file.
//! Nothing is written until [`enable_logging`] is called, which the CLI
//! does for `--log`.

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const OWN_TARGET: &str = "git_commitflow";

#[derive(Default)]
struct LoggerState {
    enabled: bool,
    verbose: bool,
    to_stdout: bool,
    file: Option<File>,
}

impl LoggerState {
    fn accepts(&self, metadata: &Metadata) -> bool {
        if !self.enabled {
            return false;
        }
        // rustyline is chatty about terminal state at debug level
        if metadata.target().starts_with(OWN_TARGET) || self.verbose {
            metadata.level() <= Level::Debug
        } else {
            metadata.level() <= Level::Warn
        }
    }

    fn write_line(&mut self, line: &str) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
        if self.to_stdout {
            print!("{line}");
        }
    }
}

static STATE: std::sync::LazyLock<Mutex<LoggerState>> =
    std::sync::LazyLock::new(|| Mutex::new(LoggerState::default()));

struct CommitflowLogger;

static LOGGER: CommitflowLogger = CommitflowLogger;

impl log::Log for CommitflowLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        STATE.lock().accepts(metadata)
    }

    fn log(&self, record: &Record) {
        let mut state = STATE.lock();
        if !state.accepts(record.metadata()) {
            return;
        }
        let line = format!(
            "{} {} [{}] - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
        state.write_line(&line);
    }

    fn flush(&self) {}
}

/// Hands formatted `tracing` output to the log file
#[derive(Clone, Copy)]
struct TracingWriter;

impl Write for TracingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = STATE.lock();
        if state.enabled
            && let Some(file) = state.file.as_mut()
        {
            let _ = file.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = STATE.lock().file.as_mut() {
            let _ = file.flush();
        }
        Ok(())
    }
}

impl<'a> fmt::MakeWriter<'a> for TracingWriter {
    type Writer = TracingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        *self
    }
}

/// Installs the `log` logger and the `tracing` subscriber.
///
/// Safe to call more than once; later calls return the first result.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    static INIT_RESULT: OnceLock<Result<(), String>> = OnceLock::new();

    let result = INIT_RESULT.get_or_init(|| {
        let verbose_from_env = std::env::var("GIT_COMMITFLOW_VERBOSE").is_ok()
            || std::env::var("RUST_LOG").is_ok_and(|v| v.contains("debug") || v.contains("trace"));
        if verbose_from_env {
            set_verbose_logging(true);
        }

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{OWN_TARGET}=debug,warn").into());

        let fmt_layer = fmt::Layer::new()
            .with_target(true)
            .with_ansi(false)
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(TracingWriter);

        let tracing_result = Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
        let log_result = log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Debug));

        // `log` records go through LOGGER, not a LogTracer bridge, so the
        // subscriber crate is built without its `tracing-log` feature.
        match (tracing_result, log_result) {
            (_, Err(log_err)) => Err(format!("Failed to install the log logger: {log_err}")),
            (Err(tracing_err), Ok(())) => {
                eprintln!("Note: Using log-only logging (tracing setup failed: {tracing_err})");
                Ok(())
            }
            (Ok(()), Ok(())) => Ok(()),
        }
    });

    result.clone().map_err(Into::into)
}

pub fn enable_logging() {
    STATE.lock().enabled = true;
}

pub fn disable_logging() {
    STATE.lock().enabled = false;
}

pub fn is_logging_enabled() -> bool {
    STATE.lock().enabled
}

/// Include debug records of other crates, not only ours
pub fn set_verbose_logging(enabled: bool) {
    STATE.lock().verbose = enabled;
}

/// Appends log output to `file_path`, creating it if needed
pub fn set_log_file(file_path: &str) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;
    STATE.lock().file = Some(file);
    Ok(())
}

/// Echo log records on stdout as well
pub fn set_log_to_stdout(enabled: bool) {
    STATE.lock().to_stdout = enabled;
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! trace_debug {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! trace_info {
    ($($arg:tt)*) => {
        tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! trace_warn {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}
