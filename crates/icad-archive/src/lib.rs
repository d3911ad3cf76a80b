//! Archive Subsystem (§4.5): uploads the artifacts a call produced to the
//! configured backend and, optionally, runs that backend's retention
//! sweep.

mod backend;
mod error;
mod gcs;
mod local;
mod s3;
mod scp;

pub use backend::ArchiveBackend;
pub use error::StorageError;
pub use gcs::GcsBackend;
pub use local::LocalFsBackend;
pub use s3::S3Backend;
pub use scp::ScpBackend;

use std::collections::HashMap;
use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use icad_model::{ArchiveBackendConfig, ArchiveConfig};
use icad_util::partition_path;
use url::Url;

/// Builds the concrete backend named by a system's archive config.
pub async fn build_backend(config: &ArchiveBackendConfig) -> Box<dyn ArchiveBackend> {
	match config {
		ArchiveBackendConfig::Local { base_path, base_url } => Box::new(LocalFsBackend {
			base_path: base_path.clone(),
			base_url: base_url.clone(),
		}),

		ArchiveBackendConfig::Scp {
			host,
			port,
			username,
			password,
			key_path,
			base_path,
			base_url,
		} => Box::new(ScpBackend {
			host: host.clone(),
			port: *port,
			username: username.clone(),
			password: password.clone(),
			key_path: key_path.clone(),
			base_path: base_path.clone(),
			base_url: base_url.clone(),
		}),

		ArchiveBackendConfig::S3 {
			bucket,
			region,
			endpoint_url,
			access_key_id,
			secret_access_key,
			base_url,
		} => {
			let credentials = Credentials::new(
				access_key_id,
				secret_access_key,
				None,
				None,
				"icad-archive",
			);
			let mut builder = aws_sdk_s3::config::Builder::new()
				.behavior_version(BehaviorVersion::v2024_03_28())
				.credentials_provider(credentials)
				.region(Region::new(region.clone().unwrap_or_else(|| "us-east-1".to_string())));
			if let Some(endpoint) = endpoint_url {
				builder = builder.endpoint_url(endpoint).force_path_style(true);
			}
			let client = aws_sdk_s3::Client::from_conf(builder.build());
			Box::new(S3Backend {
				client,
				bucket: bucket.clone(),
				base_url: base_url.clone(),
			})
		}

		ArchiveBackendConfig::Gcs {
			bucket,
			credentials_path,
			base_url,
		} => {
			// google-cloud-storage resolves credentials the same way the
			// official SDKs do: `GOOGLE_APPLICATION_CREDENTIALS`.
			std::env::set_var("GOOGLE_APPLICATION_CREDENTIALS", credentials_path);
			let gcs_config = google_cloud_storage::client::ClientConfig::default()
				.with_auth()
				.await
				.unwrap_or_default();
			let client = google_cloud_storage::client::Client::new(gcs_config);
			Box::new(GcsBackend {
				client,
				bucket: bucket.clone(),
				base_url: base_url.clone(),
			})
		}
	}
}

/// Stage 11 of the Call Pipeline: uploads every artifact the call
/// produced and returns a map from extension (`wav`/`m4a`/`mp3`/`json`)
/// to the URL the backend handed back.
pub async fn archive_artifacts(
	backend: &dyn ArchiveBackend,
	config: &ArchiveConfig,
	scratch_dir: &Path,
	short_name: &str,
	base_name: &str,
	start_time: f64,
) -> HashMap<String, Url> {
	let partition = format!("{short_name}/{}", partition_path(start_time));
	let mut urls = HashMap::new();

	for ext in &config.archive_extensions {
		let src = scratch_dir.join(format!("{base_name}.{ext}"));
		if !src.exists() {
			continue;
		}
		let dst_name = format!("{base_name}.{ext}");
		if let Some(url) = backend.upload_file(&src, &dst_name, &partition).await {
			urls.insert(ext.clone(), url);
		}
	}

	if config.archive_days >= 1 {
		let root = short_name.to_string();
		let _ = backend.clean_files(&root, config.archive_days).await;
	}

	urls
}
