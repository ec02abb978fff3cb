//! Central access point for logging. All components log through the types and
//! macros re-exported here so the backing implementation stays swappable.

pub use slog::{crit, debug, error, info, o, trace, warn, Discard, Drain, Logger};

use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

/// Build a terminal logger from plain level/destination names, as they appear
/// in the configuration file.
pub fn terminal(level: &str, destination: &str) -> Logger {
    let severity = match level {
        "trace" => Severity::Trace,
        "debug" => Severity::Debug,
        "info" => Severity::Info,
        "warning" => Severity::Warning,
        "error" => Severity::Error,
        "critical" => Severity::Critical,
        other => panic!("Unknown log level: {}", other),
    };

    let target = match destination {
        "stdout" => Destination::Stdout,
        "stderr" => Destination::Stderr,
        other => panic!("Unknown log destination: {}", other),
    };

    let mut builder = TerminalLoggerBuilder::new();
    builder.level(severity);
    builder.destination(target);
    builder.build().expect("Error building terminal logger")
}

/// Default logger: debug level, stderr.
pub fn init() -> Logger {
    terminal("debug", "stderr")
}
