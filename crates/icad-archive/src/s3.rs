use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use time::OffsetDateTime;
use tracing::warn;
use url::Url;

use crate::backend::ArchiveBackend;

pub struct S3Backend {
	pub client: Client,
	pub bucket: String,
	pub base_url: Option<String>,
}

impl S3Backend {
	fn object_url(&self, key: &str) -> Option<Url> {
		let url = match &self.base_url {
			Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
			None => format!("https://{}.s3.amazonaws.com/{}", self.bucket, key),
		};
		Url::parse(&url).ok()
	}
}

#[async_trait]
impl ArchiveBackend for S3Backend {
	async fn upload_file(&self, src: &Path, dst_path: &str, partition: &str) -> Option<Url> {
		let key = format!("{partition}/{dst_path}");
		let body = match ByteStream::from_path(src).await {
			Ok(body) => body,
			Err(err) => {
				warn!(message = "could not read file for s3 upload", ?err);
				return None;
			}
		};

		let result = self
			.client
			.put_object()
			.bucket(&self.bucket)
			.key(&key)
			.body(body)
			.acl(ObjectCannedAcl::PublicRead)
			.send()
			.await;

		match result {
			Ok(_) => self.object_url(&key),
			Err(err) => {
				let err = crate::error::StorageError::S3Upload(key.clone(), err.to_string());
				warn!(message = "s3 put_object failed", %err);
				None
			}
		}
	}

	async fn clean_files(&self, root: &str, days: u32) -> Option<u64> {
		let cutoff = OffsetDateTime::now_utc() - time::Duration::days(i64::from(days));
		let mut deleted = 0u64;
		let mut continuation_token: Option<String> = None;

		loop {
			let mut request = self.client.list_objects_v2().bucket(&self.bucket).prefix(root);
			if let Some(token) = &continuation_token {
				request = request.continuation_token(token);
			}
			let page = match request.send().await {
				Ok(page) => page,
				Err(err) => {
					warn!(message = "s3 list_objects_v2 failed", ?err);
					return Some(deleted);
				}
			};

			for object in page.contents() {
				let Some(key) = object.key() else { continue };
				let Some(last_modified) = object.last_modified() else {
					continue;
				};
				let modified = OffsetDateTime::from_unix_timestamp(last_modified.secs())
					.unwrap_or(OffsetDateTime::UNIX_EPOCH);
				if modified < cutoff {
					if self
						.client
						.delete_object()
						.bucket(&self.bucket)
						.key(key)
						.send()
						.await
						.is_ok()
					{
						deleted += 1;
					}
				}
			}

			continuation_token = page.next_continuation_token().map(str::to_string);
			if continuation_token.is_none() {
				break;
			}
		}

		Some(deleted)
	}
}
