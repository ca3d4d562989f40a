use crate::error::Error;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Numeric log level.
///
/// Levels are totally ordered integers; higher means more severe. The named
/// constants line up with the [Cloud Logging severities], with
/// [`Level::NOTICE`] halfway between `INFO` and `WARN` and the levels above
/// `ERROR` spaced four apart. Any level in between two named levels maps to
/// the next-higher severity, see [`severity_for_level`].
///
/// [Cloud Logging severities]: https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry#logseverity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Level(pub i32);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const NOTICE: Level = Level((Self::INFO.0 + Self::WARN.0) / 2);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);
    pub const CRITICAL: Level = Level(Self::ERROR.0 + 4);
    pub const ALERT: Level = Level(Self::ERROR.0 + 8);
    pub const EMERGENCY: Level = Level(Self::ERROR.0 + 12);

    /// Cloud Logging severity name for this level.
    pub fn severity(self) -> &'static str {
        severity_for_level(self)
    }
}

/// Map a level to the name of the lowest Cloud Logging severity whose
/// threshold is at least `level`. Levels above [`Level::ALERT`] map to
/// `EMERGENCY`.
pub fn severity_for_level(level: Level) -> &'static str {
    const THRESHOLDS: [(Level, &str); 7] = [
        (Level::DEBUG, "DEBUG"),
        (Level::INFO, "INFO"),
        (Level::NOTICE, "NOTICE"),
        (Level::WARN, "WARNING"),
        (Level::ERROR, "ERROR"),
        (Level::CRITICAL, "CRITICAL"),
        (Level::ALERT, "ALERT"),
    ];

    THRESHOLDS
        .iter()
        .find(|(threshold, _)| level <= *threshold)
        .map(|(_, name)| *name)
        .unwrap_or("EMERGENCY")
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (base, name) = if *self < Level::INFO {
            (Level::DEBUG, "DEBUG")
        } else if *self < Level::WARN {
            (Level::INFO, "INFO")
        } else if *self < Level::ERROR {
            (Level::WARN, "WARN")
        } else {
            (Level::ERROR, "ERROR")
        };
        match self.0 - base.0 {
            0 => f.write_str(name),
            offset => write!(f, "{}{:+}", name, offset),
        }
    }
}

impl FromStr for Level {
    type Err = Error;

    /// Parse a severity name such as `info`, `NOTICE` or `warning`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::from(tracing::Level::TRACE)),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "notice" => Ok(Level::NOTICE),
            "warn" | "warning" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            "critical" => Ok(Level::CRITICAL),
            "alert" => Ok(Level::ALERT),
            "emergency" => Ok(Level::EMERGENCY),
            _ => Err(Error::UnknownLevel(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level(Level::DEBUG.0 - 4),
            tracing::Level::DEBUG => Level::DEBUG,
            tracing::Level::INFO => Level::INFO,
            tracing::Level::WARN => Level::WARN,
            tracing::Level::ERROR => Level::ERROR,
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
