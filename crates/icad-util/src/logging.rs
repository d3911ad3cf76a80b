//! Structured logging setup.
//!
//! `log_level` in the config file is either a single directive applied to
//! every subsystem, or a per-subsystem map; both resolve to a
//! [`LoggingConfig`], which builds a `tracing_subscriber::EnvFilter`.

use icad_model::LogLevelConfig;
use std::fmt::Display;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
	Error,
	Warn,
	Info,
	Debug,
	Trace,
}

impl Display for LogLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Self::Error => "error",
			Self::Warn => "warn",
			Self::Info => "info",
			Self::Debug => "debug",
			Self::Trace => "trace",
		};
		write!(f, "{s}")
	}
}

impl std::str::FromStr for LogLevel {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"error" => Ok(Self::Error),
			"warn" | "warning" => Ok(Self::Warn),
			"info" => Ok(Self::Info),
			"debug" => Ok(Self::Debug),
			"trace" => Ok(Self::Trace),
			other => Err(format!("unknown log level `{other}`")),
		}
	}
}

/// Per-subsystem log levels. Any subsystem not named in the config falls
/// back to `global`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
	pub global: LogLevel,
	pub mqtt: LogLevel,
	pub pipeline: LogLevel,
	pub archive: LogLevel,
	pub sinks: LogLevel,
	pub transcode: LogLevel,
	pub index: LogLevel,
}

impl LoggingConfig {
	pub fn from_config(config: &LogLevelConfig) -> Self {
		match config {
			LogLevelConfig::Single(level) => {
				let level: LogLevel = level.parse().unwrap_or(LogLevel::Info);
				Self {
					global: level,
					mqtt: level,
					pipeline: level,
					archive: level,
					sinks: level,
					transcode: level,
					index: level,
				}
			}
			LogLevelConfig::PerSubsystem(map) => {
				let global = map
					.get("global")
					.and_then(|s| s.parse().ok())
					.unwrap_or(LogLevel::Info);
				let sub = |key: &str| {
					map.get(key)
						.and_then(|s| s.parse().ok())
						.unwrap_or(global)
				};
				Self {
					global,
					mqtt: sub("mqtt"),
					pipeline: sub("pipeline"),
					archive: sub("archive"),
					sinks: sub("sinks"),
					transcode: sub("transcode"),
					index: sub("index"),
				}
			}
		}
	}

	pub fn into_env_filter(self) -> EnvFilter {
		let directives = format!(
			"{global},icad_broker={mqtt},icad_pipeline={pipeline},icad_archive={archive},icad_sinks={sinks},icad_transcode={transcode},icad_index={index}",
			global = self.global,
			mqtt = self.mqtt,
			pipeline = self.pipeline,
			archive = self.archive,
			sinks = self.sinks,
			transcode = self.transcode,
			index = self.index,
		);
		EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
	}
}

/// Initializes the global subscriber. Must run before any other subsystem
/// starts logging.
pub fn init_logging(config: &LogLevelConfig) {
	let filter = LoggingConfig::from_config(config).into_env_filter();
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(true)
		.init();
}
