//! iCAD Cloud Detect sink (§4.6): multipart WAV + call record JSON, API
//! key as `Authorization` header, talkgroup-gated by the caller.

use icad_model::{CallRecord, GatedSinkConfig};
use reqwest::multipart::Form;

use crate::common::{audio_part, call_record_part, log_failure, read_file, send_multipart, SinkError};

pub async fn send(
	client: &reqwest::Client,
	config: &GatedSinkConfig,
	call: &CallRecord,
	wav_path: &std::path::Path,
) -> Result<(), SinkError> {
	let result = try_send(client, config, call, wav_path).await;
	if let Err(err) = &result {
		log_failure("icad_cloud_detect", &config.url, err);
	}
	result
}

async fn try_send(
	client: &reqwest::Client,
	config: &GatedSinkConfig,
	call: &CallRecord,
	wav_path: &std::path::Path,
) -> Result<(), SinkError> {
	let bytes = read_file(wav_path).await?;
	let form = Form::new()
		.part("audioFile", audio_part(bytes, call.filename.as_str())?)
		.part("jsonFile", call_record_part(call)?);

	send_multipart(client, &config.url, form, config.api_key.as_deref()).await
}
