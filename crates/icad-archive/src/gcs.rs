use std::path::Path;

use async_trait::async_trait;
use google_cloud_storage::client::Client;
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::list::ListObjectsRequest;
use google_cloud_storage::http::objects::upload::{
	Media, PredefinedObjectAcl, UploadObjectRequest, UploadType,
};
use time::OffsetDateTime;
use tracing::warn;
use url::Url;

use crate::backend::ArchiveBackend;

pub struct GcsBackend {
	pub client: Client,
	pub bucket: String,
	pub base_url: Option<String>,
}

impl GcsBackend {
	fn object_url(&self, object_name: &str) -> Option<Url> {
		let url = match &self.base_url {
			Some(base) => format!("{}/{}", base.trim_end_matches('/'), object_name),
			None => format!(
				"https://storage.googleapis.com/{}/{}",
				self.bucket, object_name
			),
		};
		Url::parse(&url).ok()
	}
}

fn guess_content_type(path: &str) -> String {
	match path.rsplit('.').next() {
		Some("wav") => "audio/wav",
		Some("m4a") => "audio/mp4",
		Some("mp3") => "audio/mpeg",
		Some("json") => "application/json",
		_ => "application/octet-stream",
	}
	.to_string()
}

#[async_trait]
impl ArchiveBackend for GcsBackend {
	async fn upload_file(&self, src: &Path, dst_path: &str, partition: &str) -> Option<Url> {
		let object_name = format!("{partition}/{dst_path}");
		let bytes = match tokio::fs::read(src).await {
			Ok(bytes) => bytes,
			Err(err) => {
				warn!(message = "could not read file for gcs upload", ?err);
				return None;
			}
		};

		let mut media = Media::new(object_name.clone());
		media.content_type = guess_content_type(dst_path).into();

		let result = self
			.client
			.upload_object(
				&UploadObjectRequest {
					bucket: self.bucket.clone(),
					predefined_acl: Some(PredefinedObjectAcl::PublicRead),
					..Default::default()
				},
				bytes,
				&UploadType::Simple(media),
			)
			.await;

		match result {
			Ok(_) => self.object_url(&object_name),
			Err(err) => {
				let err = crate::error::StorageError::GcsUpload(object_name.clone(), err.to_string());
				warn!(message = "gcs upload failed", %err);
				None
			}
		}
	}

	async fn clean_files(&self, root: &str, days: u32) -> Option<u64> {
		let cutoff = OffsetDateTime::now_utc() - time::Duration::days(i64::from(days));
		let objects = self
			.client
			.list_objects(&ListObjectsRequest {
				bucket: self.bucket.clone(),
				prefix: Some(root.to_string()),
				..Default::default()
			})
			.await;

		let items = match objects {
			Ok(resp) => resp.items.unwrap_or_default(),
			Err(err) => {
				warn!(message = "gcs list_objects failed", ?err);
				return None;
			}
		};

		let mut deleted = 0u64;
		for item in items {
			let Ok(updated) = OffsetDateTime::parse(
				&item.updated.unwrap_or_default(),
				&time::format_description::well_known::Rfc3339,
			) else {
				continue;
			};
			if updated < cutoff {
				let result = self
					.client
					.delete_object(&DeleteObjectRequest {
						bucket: self.bucket.clone(),
						object: item.name.clone(),
						..Default::default()
					})
					.await;
				if result.is_ok() {
					deleted += 1;
				}
			}
		}

		Some(deleted)
	}
}
