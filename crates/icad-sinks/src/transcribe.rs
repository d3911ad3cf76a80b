//! Transcribe sink (§4.6): uploads WAV + call record JSON (and an
//! optional whisper config) and parses the returned transcript.

use icad_model::{CallRecord, Transcript, TranscribeConfig};
use reqwest::multipart::Form;

use crate::common::{audio_part, call_record_part, read_file, DEFAULT_TIMEOUT, SinkError};

pub async fn transcribe(
	client: &reqwest::Client,
	config: &TranscribeConfig,
	call: &CallRecord,
	wav_path: &std::path::Path,
) -> Result<Transcript, SinkError> {
	let wav_bytes = read_file(wav_path).await?;
	let mut form = Form::new()
		.part("audioFile", audio_part(wav_bytes, call.filename.as_str())?)
		.part("jsonFile", call_record_part(call)?);

	if let Some(whisper_config) = &config.whisper_config {
		form = form.text(
			"whisper_config_data",
			serde_json::to_string(whisper_config).map_err(|e| SinkError::Build(e.to_string()))?,
		);
	}

	let mut request = client
		.post(&config.url)
		.timeout(DEFAULT_TIMEOUT)
		.multipart(form);
	if let Some(key) = &config.api_key {
		request = request.header("Authorization", key);
	}

	let response = request.send().await.map_err(|e| SinkError::Request {
		url: config.url.clone(),
		source: e,
	})?;

	if !response.status().is_success() {
		return Err(SinkError::Status {
			url: config.url.clone(),
			status: response.status().as_u16(),
		});
	}

	response
		.json::<Transcript>()
		.await
		.map_err(|e| SinkError::Request {
			url: config.url.clone(),
			source: e,
		})
}
