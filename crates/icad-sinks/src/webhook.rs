//! Webhook sink (§4.6): URL, headers, and body are rendered by the
//! Template Engine (§4.7) before posting as JSON.

use icad_model::{CallRecord, WebhookConfig};

use crate::common::{log_failure, SinkError, DEFAULT_TIMEOUT};

pub async fn send(
	client: &reqwest::Client,
	config: &WebhookConfig,
	call: &CallRecord,
) -> Result<(), SinkError> {
	let result = try_send(client, config, call).await;
	if let Err(err) = &result {
		log_failure("webhook", &config.url, err);
	}
	result
}

async fn try_send(
	client: &reqwest::Client,
	config: &WebhookConfig,
	call: &CallRecord,
) -> Result<(), SinkError> {
	let data = icad_template::build_data(call);
	let body = icad_template::render(&config.body, &data);

	let mut request = client
		.post(&config.url)
		.timeout(DEFAULT_TIMEOUT)
		.json(&body);

	for (key, value) in &config.headers {
		let rendered = icad_template::render(&serde_json::Value::String(value.clone()), &data);
		if let serde_json::Value::String(rendered) = rendered {
			request = request.header(key, rendered);
		}
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
	Ok(())
}
