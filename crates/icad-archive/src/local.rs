use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tracing::warn;
use url::Url;
use walkdir::WalkDir;

use crate::backend::ArchiveBackend;

pub struct LocalFsBackend {
	pub base_path: PathBuf,
	pub base_url: String,
}

#[async_trait]
impl ArchiveBackend for LocalFsBackend {
	async fn upload_file(&self, src: &Path, dst_path: &str, partition: &str) -> Option<Url> {
		let dst = self.base_path.join(partition).join(dst_path);
		let parent = dst.parent()?.to_path_buf();
		let src = src.to_path_buf();

		let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
			std::fs::create_dir_all(&parent)?;
			std::fs::copy(&src, &dst)?;
			Ok(())
		})
		.await;

		match result {
			Ok(Ok(())) => {
				let encoded = urlencoding_path(dst_path);
				Url::parse(&format!(
					"{}/{}/{}",
					self.base_url.trim_end_matches('/'),
					partition,
					encoded
				))
				.ok()
			}
			Ok(Err(err)) => {
				let err = crate::error::StorageError::LocalCopy(dst_path.to_string(), err);
				warn!(message = "local archive copy failed", %err);
				None
			}
			Err(err) => {
				warn!(message = "local archive copy task panicked", ?err);
				None
			}
		}
	}

	async fn clean_files(&self, root: &str, days: u32) -> Option<u64> {
		let root_path = self.base_path.join(root);
		let max_age = Duration::from_secs(u64::from(days) * 86_400);

		tokio::task::spawn_blocking(move || {
			let now = SystemTime::now();
			let mut deleted = 0u64;
			for entry in WalkDir::new(&root_path)
				.into_iter()
				.filter_map(Result::ok)
				.filter(|e| e.file_type().is_file())
			{
				let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
					continue;
				};
				let Ok(age) = now.duration_since(modified) else {
					continue;
				};
				if age >= max_age && std::fs::remove_file(entry.path()).is_ok() {
					deleted += 1;
				}
			}
			remove_empty_dirs(&root_path);
			deleted
		})
		.await
		.ok()
	}
}

fn remove_empty_dirs(root: &Path) {
	for entry in WalkDir::new(root)
		.contents_first(true)
		.into_iter()
		.filter_map(Result::ok)
		.filter(|e| e.file_type().is_dir())
	{
		let _ = std::fs::remove_dir(entry.path());
	}
}

fn urlencoding_path(s: &str) -> String {
	s.split('/')
		.map(|seg| url::form_urlencoded::byte_serialize(seg.as_bytes()).collect::<String>())
		.collect::<Vec<_>>()
		.join("/")
}
