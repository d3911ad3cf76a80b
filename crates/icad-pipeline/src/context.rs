use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use icad_archive::ArchiveBackend;
use icad_dedup::MessageHistory;
use icad_index::IndexClient;
use icad_model::ArchiveConfig;
use tokio::sync::Mutex;

/// State shared across every worker (§5): the dedup window, the index
/// client connection, the HTTP client, and a cache of constructed archive
/// backends (SCP/S3/GCS clients are expensive to build per call).
pub struct PipelineContext {
	pub temp_dir: PathBuf,
	pub history: Arc<MessageHistory>,
	pub index: Option<Arc<IndexClient>>,
	pub http: reqwest::Client,
	archive_cache: Mutex<HashMap<String, Arc<dyn ArchiveBackend>>>,
}

impl PipelineContext {
	pub fn new(
		temp_dir: PathBuf,
		history: Arc<MessageHistory>,
		index: Option<Arc<IndexClient>>,
		http: reqwest::Client,
	) -> Self {
		Self {
			temp_dir,
			history,
			index,
			http,
			archive_cache: Mutex::new(HashMap::new()),
		}
	}

	pub async fn archive_backend(
		&self,
		short_name: &str,
		config: &ArchiveConfig,
	) -> Arc<dyn ArchiveBackend> {
		let mut cache = self.archive_cache.lock().await;
		if let Some(backend) = cache.get(short_name) {
			return backend.clone();
		}
		let backend: Arc<dyn ArchiveBackend> = Arc::from(icad_archive::build_backend(&config.backend).await);
		cache.insert(short_name.to_string(), backend.clone());
		backend
	}
}
