use crate::{BOT_NAME, CONSOLE_TARGET, DECISION_TARGET, ERROR_TARGET, Error};
use std::path::Path;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    reload,
    util::SubscriberInitExt,
};

/// Log directory name
pub const LOG_DIR: &str = "logs";
/// Decision log file name
pub const DECISION_LOG_FILE: &str = "decisions";

/// Build the default filter: `info`, or `debug` for this crate in debug mode
fn default_filter(debug: bool) -> EnvFilter {
    let filter = EnvFilter::new("info");
    if !debug {
        return filter;
    }

    match format!("{BOT_NAME}=debug").parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(e) => {
            eprintln!("Invalid log directive, staying at info: {e}");
            filter
        }
    }
}

/// Filter layer whose directives can be swapped at runtime
pub type FilterLayer = reload::Layer<EnvFilter, Registry>;

/// Switches the installed filter between normal and debug verbosity
#[derive(Clone)]
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    /// Filter came from `RUST_LOG` and is left alone
    from_env: bool,
}

impl LogControl {
    /// Filter from `RUST_LOG` if set, otherwise the default for `debug`
    #[must_use]
    pub fn new(debug: bool) -> (FilterLayer, Self) {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Self::wrap(filter, true),
            Err(_) => Self::wrap(default_filter(debug), false),
        }
    }

    /// Default filter for `debug`, ignoring `RUST_LOG`
    #[must_use]
    pub fn from_default(debug: bool) -> (FilterLayer, Self) {
        Self::wrap(default_filter(debug), false)
    }

    fn wrap(filter: EnvFilter, from_env: bool) -> (FilterLayer, Self) {
        let (layer, handle) = reload::Layer::new(filter);
        (layer, Self { handle, from_env })
    }

    /// Apply the default filter for `debug`. Does nothing when `RUST_LOG` is set.
    pub fn set_debug(&self, debug: bool) -> Result<(), Error> {
        if self.from_env {
            return Ok(());
        }
        self.handle.reload(default_filter(debug))?;
        Ok(())
    }

    /// Directives currently in force
    #[must_use]
    pub fn current_filter(&self) -> Option<String> {
        self.handle.with_current(ToString::to_string).ok()
    }
}

/// Initialize the logging system with console and file outputs
pub fn init(debug: bool) -> Result<LogControl, Error> {
    // Create log directory if it doesn't exist
    if !Path::new(LOG_DIR).exists() {
        std::fs::create_dir_all(LOG_DIR)?;
    }

    let decision_file = RollingFileAppender::new(Rotation::DAILY, LOG_DIR, DECISION_LOG_FILE);

    // Human-readable console output
    let console_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(true);

    // JSON decision log
    let decision_layer = fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_ansi(false)
        .json()
        .with_writer(decision_file);

    // RUST_LOG wins over DebugMode when set
    let (filter_layer, control) = LogControl::new(debug);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(decision_layer)
        .try_init()?;

    info!("Logging system initialized");
    Ok(control)
}

/// Log a summary of one scan of the population
pub fn log_scan_summary(kind: &str, evaluated: usize, applied: usize) {
    info!(
        target: DECISION_TARGET,
        scan = kind,
        evaluated,
        applied,
        event = "scan",
        "Scan finished"
    );
}

/// Log an error that stops the daemon
pub fn log_fatal(error: &Error) {
    error!(
        target: ERROR_TARGET,
        error = %error,
        "Fatal error"
    );
}

pub fn log_console(message: String) {
    info!(
        target: CONSOLE_TARGET,
        message = %message,
        event = "console",
    );
}
