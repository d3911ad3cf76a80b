use std::path::Path;
use std::time::Duration;

use icad_model::CallRecord;
use reqwest::multipart::{Form, Part};
use tracing::warn;

/// Default outbound HTTP timeout (§5): ≤10s.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// `SinkError` (§7): any outbound network failure. Isolated per sink;
/// never aborts other sinks. Sinks log this and move on — the type
/// exists so each adapter has something uniform to log.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
	#[error("request build failed: {0}")]
	Build(String),

	#[error("request to {url} failed: {source}")]
	Request {
		url: String,
		#[source]
		source: reqwest::Error,
	},

	#[error("{url} returned status {status}")]
	Status { url: String, status: u16 },
}

pub async fn read_file(path: &Path) -> Result<Vec<u8>, SinkError> {
	tokio::fs::read(path)
		.await
		.map_err(|e| SinkError::Build(format!("could not read {}: {e}", path.display())))
}

pub fn call_record_part(call: &CallRecord) -> Result<Part, SinkError> {
	let json = serde_json::to_vec(call).map_err(|e| SinkError::Build(e.to_string()))?;
	Ok(Part::bytes(json)
		.file_name("metadata.json")
		.mime_str("application/json")
		.map_err(|e| SinkError::Build(e.to_string()))?)
}

pub fn audio_part(bytes: Vec<u8>, filename: &str) -> Result<Part, SinkError> {
	Ok(Part::bytes(bytes)
		.file_name(filename.to_string())
		.mime_str("audio/x-wav")
		.map_err(|e| SinkError::Build(e.to_string()))?)
}

pub async fn send_multipart(
	client: &reqwest::Client,
	url: &str,
	form: Form,
	bearer: Option<&str>,
) -> Result<(), SinkError> {
	let mut request = client.post(url).timeout(DEFAULT_TIMEOUT).multipart(form);
	if let Some(token) = bearer {
		request = request.header("Authorization", token);
	}
	let response = request
		.send()
		.await
		.map_err(|e| SinkError::Request { url: url.to_string(), source: e })?;

	if !response.status().is_success() {
		return Err(SinkError::Status {
			url: url.to_string(),
			status: response.status().as_u16(),
		});
	}
	Ok(())
}

pub async fn send_json(
	client: &reqwest::Client,
	url: &str,
	body: &serde_json::Value,
	bearer: Option<&str>,
) -> Result<(), SinkError> {
	let mut request = client.post(url).timeout(DEFAULT_TIMEOUT).json(body);
	if let Some(token) = bearer {
		request = request.header("Authorization", token);
	}
	let response = request
		.send()
		.await
		.map_err(|e| SinkError::Request { url: url.to_string(), source: e })?;

	if !response.status().is_success() {
		return Err(SinkError::Status {
			url: url.to_string(),
			status: response.status().as_u16(),
		});
	}
	Ok(())
}

/// Logs a sink failure without aborting the pipeline (§4.2 error policy).
pub fn log_failure(sink: &'static str, url: &str, err: &SinkError) {
	warn!(message = "sink invocation failed", sink, url, %err);
}
