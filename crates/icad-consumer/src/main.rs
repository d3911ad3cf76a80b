use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use icad_dedup::MessageHistory;
use icad_index::IndexClient;
use icad_model::{AppConfig, ConfigError};
use icad_pipeline::PipelineContext;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
enum AppError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Broker(#[from] icad_broker::BrokerError),
}

#[tokio::main]
async fn main() {
	let config_path = std::env::args()
		.nth(1)
		.unwrap_or_else(|| "./config.json".to_string());

	let config = match load_config(&config_path) {
		Ok(config) => config,
		Err(err) => {
			// Logging isn't initialized yet; this is the only place this
			// binary uses println! directly.
			println!("failed to load config from {config_path}: {err}");
			std::process::exit(1);
		}
	};

	icad_util::init_logging(&config.log_level);
	info!(message = "loaded config", path = %config_path, systems = config.systems.len());

	if let Err(err) = run(config).await {
		error!(message = "fatal error", ?err);
		std::process::exit(1);
	}
}

fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
	let path = PathBuf::from(path);
	let bytes = std::fs::read(&path).map_err(|source| ConfigError::Read {
		path: path.clone(),
		source,
	})?;
	let config: AppConfig =
		serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse { path, source })?;
	if config.systems.is_empty() {
		return Err(ConfigError::MissingSection("systems".to_string()));
	}
	Ok(config)
}

async fn run(config: AppConfig) -> Result<(), AppError> {
	let index = match &config.elasticsearch {
		Some(es_config) if es_config.stats_enabled => {
			let client = Arc::new(IndexClient::new(es_config));
			client.ensure_indices().await;
			Some(client)
		}
		_ => None,
	};

	let ctx = Arc::new(PipelineContext::new(
		config.temp_file_path.clone(),
		Arc::new(MessageHistory::new()),
		index.clone(),
		reqwest::Client::new(),
	));

	let systems: Arc<HashMap<_, _>> = Arc::new(config.systems.clone());

	icad_broker::run(&config.mqtt, systems, ctx, index).await?;
	Ok(())
}
