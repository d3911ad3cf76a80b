//! Shared "JSON body = call record, `Authorization` header = API key"
//! adapter (§4.6 names this contract for Alerting/Player). The same shape
//! is reused for iCAD Player, OpenMHZ, and Broadcastify Calls, which §4.2's
//! stage-13 fan-out names as sinks but §4.6 does not separately specify a
//! wire contract for — see DESIGN.md for that grounding decision.

use icad_model::CallRecord;

use crate::common::{log_failure, send_json, SinkError};

pub async fn send(
	client: &reqwest::Client,
	label: &'static str,
	url: &str,
	api_key: Option<&str>,
	call: &CallRecord,
) -> Result<(), SinkError> {
	let result = try_send(client, url, api_key, call).await;
	if let Err(err) = &result {
		log_failure(label, url, err);
	}
	result
}

async fn try_send(
	client: &reqwest::Client,
	url: &str,
	api_key: Option<&str>,
	call: &CallRecord,
) -> Result<(), SinkError> {
	let body = serde_json::to_value(call).map_err(|e| SinkError::Build(e.to_string()))?;
	send_json(client, url, &body, api_key).await
}
