//! Index Client (§4.8): idempotently creates the fixed index set and
//! posts documents best-effort. Errors are logged, never propagated
//! (`IndexError` per §7 is non-fatal).

use icad_model::ElasticsearchConfig;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

/// The five indices this service ever writes to. `units` was added in the
/// full spec to match `spec.md` §6, which lists it explicitly even though
/// the legacy index set only had four.
pub const INDICES: [&str; 5] = ["transmissions", "rates", "recorders", "duplicates", "units"];

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
	#[error("index request to {0} failed: {1}")]
	Request(String, #[source] reqwest::Error),

	#[error("index store returned {status} for {url}")]
	Status { url: String, status: u16 },
}

pub struct IndexClient {
	client: Client,
	base_url: String,
	username: Option<String>,
	password: Option<String>,
}

impl IndexClient {
	pub fn new(config: &ElasticsearchConfig) -> Self {
		Self {
			client: Client::new(),
			base_url: config.url.trim_end_matches('/').to_string(),
			username: config.username.clone(),
			password: config.password.clone(),
		}
	}

	fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		match (&self.username, &self.password) {
			(Some(user), pass) => builder.basic_auth(user, pass.clone()),
			_ => builder,
		}
	}

	/// Idempotently creates every index this service writes to. Index
	/// creation failures (e.g. the index already exists) are logged and
	/// otherwise ignored.
	pub async fn ensure_indices(&self) {
		for index in INDICES {
			let url = format!("{}/{index}", self.base_url);
			let result = self
				.request(self.client.put(&url))
				.json(&serde_json::json!({}))
				.send()
				.await;
			if let Err(err) = result {
				warn!(message = "index creation request failed", index, ?err);
			}
		}
	}

	/// Posts `document` to `index`. Best-effort: failures are logged and
	/// swallowed.
	pub async fn index_document(&self, index: &str, document: &Value) {
		if let Err(err) = self.try_index_document(index, document).await {
			warn!(message = "index_document failed", index, ?err);
		}
	}

	async fn try_index_document(&self, index: &str, document: &Value) -> Result<(), IndexError> {
		let url = format!("{}/{index}/_doc", self.base_url);
		let response = self
			.request(self.client.post(&url))
			.json(document)
			.send()
			.await
			.map_err(|e| IndexError::Request(url.clone(), e))?;

		if !response.status().is_success() {
			return Err(IndexError::Status {
				url,
				status: response.status().as_u16(),
			});
		}
		Ok(())
	}
}
