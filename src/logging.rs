//! Structured logging initialization for the `gkm` binary.
//!
//! Supports human-friendly and machine-readable (JSON) output, with TTY
//! detection and verbosity control.

use std::io::{self, IsTerminal};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default filter directive for a verbosity level.
///
/// `quiet` wins over `verbose`: 0 = info, 1 = debug, 2+ = trace.
pub const fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "gkm=error";
    }
    match verbose {
        0 => "gkm=info",
        1 => "gkm=debug",
        _ => "gkm=trace",
    }
}

/// Initialize the tracing subscriber based on CLI flags and environment.
///
/// # Environment Variables
///
/// * `RUST_LOG` - Override the default filter (e.g. `gkm::input=trace`)
///
/// # Output Behavior
///
/// | Mode | TTY | Output |
/// |------|-----|--------|
/// | Robot | any | JSON lines to stderr |
/// | Human | yes | Pretty colored output to stderr |
/// | Human | no | Compact plain output to stderr |
pub fn init_logging(robot_mode: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    if robot_mode {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else if io::stderr().is_terminal() {
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_thread_names(verbose > 1)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else {
        // Piped or redirected
        let fmt_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_span_events(FmtSpan::NONE)
            .compact()
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}
