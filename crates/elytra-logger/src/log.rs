use crate::severity::LogSeverity;
use crate::time::now;
use once_cell::sync::Lazy;

/// Environment variable holding the minimum severity that gets printed
pub const LOG_LEVEL_ENV: &str = "ELYTRA_LOG";

static THRESHOLD: Lazy<LogSeverity> = Lazy::new(|| {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LogSeverity::Info)
});

/// Whether a message of this severity would be printed. Lets callers skip building
/// expensive messages.
pub fn enabled(log_severity: LogSeverity) -> bool {
    log_severity >= *THRESHOLD
}

pub fn log(msg: String, log_severity: LogSeverity) {
    if enabled(log_severity) {
        println!("{}", format_line(&msg, log_severity, &now()));
    }
}

fn format_line(msg: &str, log_severity: LogSeverity, timestamp: &str) -> String {
    format!("[{}] {} {}", log_severity, timestamp, msg)
}
