use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Log severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

/// Display impl for LogSeverity
impl Display for LogSeverity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LogSeverity::Debug => write!(f, "DEBUG"),
            LogSeverity::Info => write!(f, "INFO"),
            LogSeverity::Warning => write!(f, "WARNING"),
            LogSeverity::Error => write!(f, "ERROR"),
            LogSeverity::Fatal => write!(f, "FATAL"),
        }
    }
}

impl FromStr for LogSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogSeverity::Debug),
            "info" => Ok(LogSeverity::Info),
            "warn" | "warning" => Ok(LogSeverity::Warning),
            "error" => Ok(LogSeverity::Error),
            "fatal" => Ok(LogSeverity::Fatal),
            other => Err(format!("Unknown log severity: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_log_severity_display() {
        assert_eq!(format!("{}", LogSeverity::Debug), "DEBUG");
        assert_eq!(format!("{}", LogSeverity::Info), "INFO");
        assert_eq!(format!("{}", LogSeverity::Warning), "WARNING");
        assert_eq!(format!("{}", LogSeverity::Error), "ERROR");
        assert_eq!(format!("{}", LogSeverity::Fatal), "FATAL");
    }

    #[test]
    fn test_log_severity_parse() {
        assert_eq!("debug".parse(), Ok(LogSeverity::Debug));
        assert_eq!(" WARN ".parse(), Ok(LogSeverity::Warning));
        assert_eq!("Warning".parse(), Ok(LogSeverity::Warning));
        assert_matches!("verbose".parse::<LogSeverity>(), Err(_));
    }

    #[test]
    fn test_log_severity_order() {
        assert!(LogSeverity::Debug < LogSeverity::Info);
        assert!(LogSeverity::Warning < LogSeverity::Error);
        assert!(LogSeverity::Error < LogSeverity::Fatal);
    }
}
