//! Pipeline-fatal error kinds (§7): temp-write, duplicate-store, and
//! transcode failures return early. Everything else is confined to the
//! specific sink/artifact that failed and only ever logged.

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
	#[error("scratch write failed: {0}")]
	ScratchWrite(#[source] std::io::Error),

	#[error("sidecar serialization failed: {0}")]
	SidecarSerialize(#[source] serde_json::Error),

	#[error("sidecar write failed: {0}")]
	SidecarWrite(#[source] std::io::Error),

	#[error("transcode failed: {0}")]
	Transcode(#[from] icad_transcode::TranscodeError),
}

/// Why a call never reached the sink fan-out, for logging (§8 invariant 1
/// and the Guard stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
	UnknownSystem,
	EmptyShortName,
	DefaultInstanceId,
	Duplicate,
}

impl std::fmt::Display for DropReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let label = match self {
			DropReason::UnknownSystem => "unknown_system",
			DropReason::EmptyShortName => "empty_short_name",
			DropReason::DefaultInstanceId => "default_instance_id",
			DropReason::Duplicate => "duplicate",
		};
		f.write_str(label)
	}
}

/// Outcome of [`crate::run_call`]: either the call ran every stage (sink
/// failures notwithstanding) or it was dropped before fan-out, with why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
	Completed,
	Dropped(DropReason),
}
