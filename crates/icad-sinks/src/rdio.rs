//! RDIO-style sink (§4.6).

use icad_model::{CallRecord, RdioSystemConfig};
use icad_util::rdio_datetime;
use reqwest::multipart::{Form, Part};

use crate::common::{audio_part, log_failure, read_file, send_multipart, SinkError};

pub async fn send(
	client: &reqwest::Client,
	config: &RdioSystemConfig,
	call: &CallRecord,
	wav_path: &std::path::Path,
) -> Result<(), SinkError> {
	let result = try_send(client, config, call, wav_path).await;
	if let Err(err) = &result {
		log_failure("rdio", &config.url, err);
	}
	result
}

async fn try_send(
	client: &reqwest::Client,
	config: &RdioSystemConfig,
	call: &CallRecord,
	wav_path: &std::path::Path,
) -> Result<(), SinkError> {
	let frequencies: Vec<_> = call
		.freq_list
		.iter()
		.map(|f| serde_json::json!({"freq": f.freq, "time": f.time, "pos": f.pos, "len": f.len}))
		.collect();
	let sources: Vec<_> = call
		.src_list
		.iter()
		.map(|s| serde_json::json!({"src": s.src, "time": s.time, "pos": s.pos}))
		.collect();

	let mut form = Form::new()
		.text("key", config.key.clone())
		.text("system", config.short_name.clone())
		.text("systemLabel", config.system_label.clone())
		.text("dateTime", rdio_datetime(call.start_time))
		.text("frequencies", serde_json::to_string(&frequencies).unwrap_or_default())
		.text("frequency", call.freq.map(|f| f.to_string()).unwrap_or_default())
		.text("patches", serde_json::to_string(&call.patches).unwrap_or_default())
		.text("sources", serde_json::to_string(&sources).unwrap_or_default())
		.text("talkgroup", call.talkgroup.to_string())
		.text(
			"talkgroupGroup",
			call.talkgroup_group.clone().map(|s| s.to_string()).unwrap_or_default(),
		)
		.text(
			"talkgroupLabel",
			call.talkgroup_label.clone().map(|s| s.to_string()).unwrap_or_default(),
		)
		.text(
			"talkgroupTag",
			call.talkgroup_tag.clone().map(|s| s.to_string()).unwrap_or_default(),
		);

	// The WAV file is always attached, even when remote storage is
	// configured — `audioUrl` is an extra text field, not a substitute.
	let audio_url = if config.remote_storage {
		call.audio_m4a_url.clone().unwrap_or_default()
	} else {
		String::new()
	};
	let bytes = read_file(wav_path).await?;
	let part: Part = audio_part(bytes, call.filename.as_str())?;
	form = form
		.text("audioUrl", audio_url)
		.text("audioName", call.filename.to_string())
		.text("audioType", "audio/x-wav".to_string())
		.part("audio", part);

	send_multipart(client, &config.url, form, None).await
}
