//! Logging configuration and setup.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{TelemetryError, TelemetryResult};

/// Levels accepted by [`LogConfig::level`].
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// How often a file target starts a new file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    /// One file per day.
    #[default]
    Daily,
    /// One file per hour.
    Hourly,
    /// A single file that grows forever.
    Never,
}

impl From<FileRotation> for Rotation {
    fn from(rotation: FileRotation) -> Self {
        match rotation {
            FileRotation::Daily => Rotation::DAILY,
            FileRotation::Hourly => Rotation::HOURLY,
            FileRotation::Never => Rotation::NEVER,
        }
    }
}

/// Line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable output.
    Pretty,
    /// One line per event with span context folded in.
    #[default]
    Compact,
    /// Newline-delimited JSON objects.
    Json,
    /// Single-line format with all fields.
    Full,
}

impl LogFormat {
    /// All format names, as accepted by [`FromStr`].
    pub const NAMES: [&'static str; 4] = ["pretty", "compact", "json", "full"];

    /// The lowercase name of the format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown log format `{other}` (expected one of: {})",
                Self::NAMES.join(", ")
            ))),
        }
    }
}

/// Where log lines go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error, leaving stdout for command output.
    #[default]
    Stderr,
    /// Rolling files named `<prefix>.<period>` under `dir`.
    File {
        /// Directory holding the log files. Created on setup.
        dir: PathBuf,
        /// File name prefix.
        prefix: String,
        /// When to start a new file.
        #[serde(default)]
        rotation: FileRotation,
    },
}

/// Logging configuration.
///
/// Deserializes from a partial table; missing fields take the
/// [`Default`] values (info, compact, stderr, timestamps and colors on).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base level filter, one of [`LOG_LEVELS`].
    pub level: String,
    /// Line format.
    pub format: LogFormat,
    /// Output destination.
    pub target: LogTarget,
    /// Prefix each line with a timestamp.
    pub timestamps: bool,
    /// Include the source file and line of each event.
    pub source_location: bool,
    /// Color output. Always off for file targets.
    pub ansi: bool,
    /// Extra `target=level` directives (e.g. `satchel_plugins=trace`).
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

impl LogConfig {
    /// Compact stderr logging at `level`.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::Compact,
            target: LogTarget::Stderr,
            timestamps: true,
            source_location: false,
            ansi: true,
            directives: Vec::new(),
        }
    }

    /// Use `format` for every line.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Send output to `target`.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Write rolling files under `dir` instead of a terminal stream.
    #[must_use]
    pub fn with_file_logging(
        self,
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        rotation: FileRotation,
    ) -> Self {
        self.with_target(LogTarget::File {
            dir: dir.into(),
            prefix: prefix.into(),
            rotation,
        })
    }

    /// Append one directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Append several directives.
    #[must_use]
    pub fn with_directives<I, S>(mut self, directives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directives.extend(directives.into_iter().map(Into::into));
        self
    }

    /// Drop timestamps (useful when a supervisor adds its own).
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Show where each event was emitted.
    #[must_use]
    pub fn with_source_location(mut self) -> Self {
        self.source_location = true;
        self
    }

    /// Disable colors.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    /// Level plus directives as one `EnvFilter`.
    ///
    /// Each directive is parsed on its own first so an error names the
    /// offending entry.
    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        validate_level(&self.level)?;
        let mut filter = EnvFilter::new(self.level.trim().to_ascii_lowercase());
        for raw in &self.directives {
            let directive: Directive = raw.parse().map_err(|e: ParseError| {
                TelemetryError::ConfigError(format!("invalid directive `{raw}`: {e}"))
            })?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }

    /// The formatting layer for `writer`, boxed so every format and
    /// timestamp combination has one type.
    fn fmt_layer<W>(&self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let base = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_file(self.source_location)
            .with_line_number(self.source_location);

        match (self.format, self.timestamps) {
            (LogFormat::Json, true) => base.json().boxed(),
            (LogFormat::Json, false) => base.json().without_time().boxed(),
            (LogFormat::Pretty, true) => base.pretty().boxed(),
            (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
            (LogFormat::Compact, true) => base.compact().boxed(),
            (LogFormat::Compact, false) => base.compact().without_time().boxed(),
            (LogFormat::Full, true) => base.boxed(),
            (LogFormat::Full, false) => base.without_time().boxed(),
        }
    }
}

/// Check that `level` is one of [`LOG_LEVELS`] (case-insensitive).
///
/// # Errors
///
/// Returns [`TelemetryError::ConfigError`] for anything else.
pub fn validate_level(level: &str) -> TelemetryResult<()> {
    if LOG_LEVELS.contains(&level.trim().to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(TelemetryError::ConfigError(format!(
            "unknown log level `{level}` (expected one of: {})",
            LOG_LEVELS.join(", ")
        )))
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log directory cannot be
/// created, or a global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;

    let layer = match &config.target {
        LogTarget::Stdout => config.fmt_layer(std::io::stdout, config.ansi),
        LogTarget::Stderr => config.fmt_layer(std::io::stderr, config.ansi),
        LogTarget::File {
            dir,
            prefix,
            rotation,
        } => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::new((*rotation).into(), dir, prefix);
            config.fmt_layer(appender, false)
        },
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// Install [`LogConfig::default`].
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}
