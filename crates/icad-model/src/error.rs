//! Error kinds owned by the data/config layer (§7).

use std::path::PathBuf;

/// Missing or malformed configuration. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config file {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("config is missing required section: {0}")]
	MissingSection(String),
}

/// Malformed `CallRecord`: missing `short_name`, unknown system, or a
/// default `instance_id`. Per-message drop with warning, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
	#[error("instance_id is unset (default sentinel value)")]
	DefaultInstanceId,

	#[error("short_name is empty")]
	EmptyShortName,

	#[error("no system configuration for short_name `{0}`")]
	UnknownSystem(String),
}
