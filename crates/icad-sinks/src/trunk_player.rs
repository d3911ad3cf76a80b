//! Trunk Player sink (§4.6): JSON body `{auth_token, file_path, file_name, m4a: true}`.
//! `file_path` is the archive partition path, not the scratch path — the
//! scratch M4A is gone by the time Trunk Player would fetch it (Stage 14
//! cleanup runs right after fan-out).

use icad_model::{CallRecord, TrunkPlayerConfig};
use icad_util::partition_path;

use crate::common::{log_failure, send_json, SinkError};

pub async fn send(
	client: &reqwest::Client,
	config: &TrunkPlayerConfig,
	call: &CallRecord,
) -> Result<(), SinkError> {
	let result = try_send(client, config, call).await;
	if let Err(err) = &result {
		log_failure("trunk_player", &config.url, err);
	}
	result
}

async fn try_send(
	client: &reqwest::Client,
	config: &TrunkPlayerConfig,
	call: &CallRecord,
) -> Result<(), SinkError> {
	let file_path = format!("{}/{}", call.short_name, partition_path(call.start_time));
	let body = serde_json::json!({
		"auth_token": config.auth_token,
		"file_path": file_path,
		"file_name": call.sibling("m4a"),
		"m4a": true,
	});
	send_json(client, &config.url, &body, None).await
}
