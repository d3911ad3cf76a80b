use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ssh2::Session;
use tracing::warn;
use url::Url;

use crate::backend::ArchiveBackend;
use crate::error::StorageError;

const UPLOAD_RETRIES: u32 = 3;
const RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);
const HANDSHAKE_TIMEOUT_MS: u32 = 15_000;

pub struct ScpBackend {
	pub host: String,
	pub port: u16,
	pub username: String,
	pub password: Option<String>,
	pub key_path: Option<PathBuf>,
	pub base_path: String,
	pub base_url: String,
}

impl ScpBackend {
	fn connect(&self) -> Result<Session, StorageError> {
		let session_err = |e: String| StorageError::SftpSession(e);
		let tcp = TcpStream::connect((self.host.as_str(), self.port))
			.map_err(|e| session_err(e.to_string()))?;
		let mut session = Session::new().map_err(|e| session_err(e.to_string()))?;
		session.set_timeout(HANDSHAKE_TIMEOUT_MS);
		session.set_tcp_stream(tcp);
		session.handshake().map_err(|e| session_err(e.to_string()))?;

		match (&self.key_path, &self.password) {
			(Some(key), _) => session
				.userauth_pubkey_file(&self.username, None, key, None)
				.map_err(|e| session_err(e.to_string()))?,
			(None, Some(password)) => session
				.userauth_password(&self.username, password)
				.map_err(|e| session_err(e.to_string()))?,
			(None, None) => return Err(session_err("no SFTP credentials configured".to_string())),
		}

		if !session.authenticated() {
			return Err(session_err("sftp authentication failed".to_string()));
		}
		Ok(session)
	}

	fn put(&self, session: &Session, src: &Path, remote_path: &str) -> Result<(), String> {
		let sftp = session.sftp().map_err(|e| e.to_string())?;
		let remote = Path::new(remote_path);
		if let Some(parent) = remote.parent() {
			mkdir_recursive(&sftp, parent);
		}

		let mut data = Vec::new();
		std::fs::File::open(src)
			.and_then(|mut f| f.read_to_end(&mut data))
			.map_err(|e| e.to_string())?;

		let mut remote_file = sftp.create(remote).map_err(|e| e.to_string())?;
		remote_file.write_all(&data).map_err(|e| e.to_string())?;
		Ok(())
	}
}

fn mkdir_recursive(sftp: &ssh2::Sftp, path: &Path) {
	let mut built = PathBuf::new();
	for component in path.components() {
		built.push(component);
		let _ = sftp.mkdir(&built, 0o755);
	}
}

#[async_trait]
impl ArchiveBackend for ScpBackend {
	async fn upload_file(&self, src: &Path, dst_path: &str, partition: &str) -> Option<Url> {
		let remote_path = format!(
			"{}/{}/{}",
			self.base_path.trim_end_matches('/'),
			partition,
			dst_path
		);
		let src = src.to_path_buf();
		let host = self.host.clone();
		let port = self.port;
		let username = self.username.clone();
		let password = self.password.clone();
		let key_path = self.key_path.clone();
		let remote_path_for_task = remote_path.clone();

		let result = tokio::task::spawn_blocking(move || {
			let backend = ScpBackend {
				host,
				port,
				username,
				password,
				key_path,
				base_path: String::new(),
				base_url: String::new(),
			};
			for attempt in 1..=UPLOAD_RETRIES {
				match backend
					.connect()
					.map_err(|e| e.to_string())
					.and_then(|session| backend.put(&session, &src, &remote_path_for_task))
				{
					Ok(()) => return Ok(()),
					Err(err) if attempt < UPLOAD_RETRIES => {
						warn!(message = "sftp upload attempt failed, retrying", attempt, ?err);
						std::thread::sleep(RETRY_DELAY);
					}
					Err(err) => return Err(err),
				}
			}
			unreachable!()
		})
		.await;

		match result {
			Ok(Ok(())) => Url::parse(&format!(
				"{}/{}/{}",
				self.base_url.trim_end_matches('/'),
				partition,
				dst_path
			))
			.ok(),
			Ok(Err(err)) => {
				let err = crate::error::StorageError::SftpUpload(dst_path.to_string(), err);
				warn!(message = "sftp upload failed", %err);
				None
			}
			Err(err) => {
				warn!(message = "sftp upload task panicked", ?err);
				None
			}
		}
	}

	async fn clean_files(&self, root: &str, days: u32) -> Option<u64> {
		let remote_root = format!("{}/{}", self.base_path.trim_end_matches('/'), root);
		let host = self.host.clone();
		let port = self.port;
		let username = self.username.clone();
		let password = self.password.clone();
		let key_path = self.key_path.clone();

		tokio::task::spawn_blocking(move || {
			let backend = ScpBackend {
				host,
				port,
				username,
				password,
				key_path,
				base_path: String::new(),
				base_url: String::new(),
			};
			let session = backend.connect().ok()?;
			// Remote cleanup uses the remote shell's own `find`, matching
			// the retention sweep described in §4.5.
			let find_cmd = format!(
				"find {remote_root} -type f -mtime +{days} -print -delete | wc -l && find {remote_root} -type d -empty -delete"
			);
			let mut channel = session.channel_session().ok()?;
			channel.exec(&find_cmd).ok()?;
			let mut output = String::new();
			channel.read_to_string(&mut output).ok()?;
			channel.wait_close().ok()?;
			output.lines().next()?.trim().parse::<u64>().ok()
		})
		.await
		.ok()
		.flatten()
	}
}
