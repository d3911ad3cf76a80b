//! Legacy tone-detect sink (§4.6): `multipart file = WAV` plus the call
//! record as form fields.

use icad_model::{CallRecord, LegacyToneDetectConfig};
use reqwest::multipart::Form;

use crate::common::{audio_part, log_failure, read_file, send_multipart, SinkError};

pub async fn send(
	client: &reqwest::Client,
	config: &LegacyToneDetectConfig,
	call: &CallRecord,
	wav_path: &std::path::Path,
) -> Result<(), SinkError> {
	let result = try_send(client, config, call, wav_path).await;
	if let Err(err) = &result {
		log_failure("icad_tone_detect_legacy", &config.url, err);
	}
	result
}

async fn try_send(
	client: &reqwest::Client,
	config: &LegacyToneDetectConfig,
	call: &CallRecord,
	wav_path: &std::path::Path,
) -> Result<(), SinkError> {
	let bytes = read_file(wav_path).await?;
	let mut form = Form::new().part("file", audio_part(bytes, call.filename.as_str())?);

	let record = serde_json::to_value(call).map_err(|e| SinkError::Build(e.to_string()))?;
	if let serde_json::Value::Object(map) = record {
		for (key, value) in map {
			let text = match value {
				serde_json::Value::String(s) => s,
				other => other.to_string(),
			};
			form = form.text(key, text);
		}
	}

	send_multipart(client, &config.url, form, config.api_key.as_deref()).await
}
