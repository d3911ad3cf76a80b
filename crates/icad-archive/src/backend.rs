use std::path::Path;

use async_trait::async_trait;
use url::Url;

/// Capability interface every archive variant implements (§4.5, §9
/// Design Notes: "represent with a capability interface ... or a flat
/// enum + dispatch").
///
/// Both `upload_file` and `clean_files` return `None` on failure rather
/// than propagating an error: the caller (the Archive Subsystem) logs the
/// concrete [`crate::StorageError`] and keeps going per artifact.
#[async_trait]
pub trait ArchiveBackend: Send + Sync {
	/// Uploads `src` to `dst_path` under `partition` (the relative date
	/// path, e.g. `sys1/2023/11/14`). Returns a publicly reachable URL.
	async fn upload_file(&self, src: &Path, dst_path: &str, partition: &str) -> Option<Url>;

	/// Deletes files under `root` older than `days` days, removing
	/// resulting empty directories. Returns the count deleted.
	async fn clean_files(&self, root: &str, days: u32) -> Option<u64>;
}
