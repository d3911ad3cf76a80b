//! `StorageError` (§7): upload or cleanup failed. Per-artifact, per-call;
//! logged, never fatal to the pipeline.

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
	#[error("local copy of {0} failed: {1}")]
	LocalCopy(String, #[source] std::io::Error),

	#[error("sftp session setup failed: {0}")]
	SftpSession(String),

	#[error("sftp upload of {0} failed after retries: {1}")]
	SftpUpload(String, String),

	#[error("s3 upload of {0} failed: {1}")]
	S3Upload(String, String),

	#[error("gcs upload of {0} failed: {1}")]
	GcsUpload(String, String),
}
