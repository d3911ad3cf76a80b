//! Optional Liquidsoap staging sink (§4.6, §9 Design Notes: kept out of
//! core, behind the same adapter contract). Stages the M4A (or WAV, if
//! M4A is absent) artifact into a directory Liquidsoap polls, and
//! schedules its deletion for `max(call_length, 90s) + 20s + delay`
//! after enqueue (§5).

use std::path::Path;
use std::time::Duration;

use icad_model::{CallRecord, LiquidsoapConfig};
use tracing::warn;

pub async fn stage(config: &LiquidsoapConfig, call: &CallRecord, artifact: &Path) {
	if !config.enabled {
		return;
	}
	let Some(file_name) = artifact.file_name() else {
		return;
	};
	let dst = config.staging_path.join(file_name);

	if let Err(err) = tokio::fs::copy(artifact, &dst).await {
		warn!(message = "liquidsoap staging copy failed", ?err);
		return;
	}

	let delay = call.call_length.max(90.0) + 20.0 + config.delay_seconds;
	let dst_for_task = dst.clone();
	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_secs_f64(delay)).await;
		if let Err(err) = tokio::fs::remove_file(&dst_for_task).await {
			warn!(message = "liquidsoap staged file cleanup failed", ?err);
		}
	});
}
