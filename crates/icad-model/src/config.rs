//! Configuration tree, loaded from a single JSON file (§6).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
	true
}

fn default_wildcard() -> Vec<String> {
	vec!["*".to_string()]
}

/// Top-level configuration. One JSON file, path given on the command line.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
	#[serde(default)]
	pub log_level: LogLevelConfig,
	pub temp_file_path: PathBuf,
	pub mqtt: MqttConfig,
	#[serde(default)]
	pub elasticsearch: Option<ElasticsearchConfig>,
	#[serde(default)]
	pub systems: HashMap<String, SystemConfig>,
}

/// `log_level` may be a single directive or a per-subsystem map, mirroring
/// the teacher's `LoggingPreset`/`LoggingConfig` split.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LogLevelConfig {
	Single(String),
	PerSubsystem(HashMap<String, String>),
}

impl Default for LogLevelConfig {
	fn default() -> Self {
		Self::Single("info".to_string())
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqttAuthConfig {
	#[serde(default)]
	pub ca_cert: Option<PathBuf>,
	#[serde(default)]
	pub client_cert: Option<PathBuf>,
	#[serde(default)]
	pub client_key: Option<PathBuf>,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub password: Option<String>,
}

/// Resolved authentication mode, in the priority order §4.1 requires.
#[derive(Debug, Clone)]
pub enum MqttAuth {
	ClientCert {
		ca: PathBuf,
		cert: PathBuf,
		key: PathBuf,
	},
	Password {
		username: String,
		password: String,
	},
	Anonymous,
}

impl MqttAuthConfig {
	pub fn resolve(&self) -> MqttAuth {
		if let (Some(ca), Some(cert), Some(key)) =
			(&self.ca_cert, &self.client_cert, &self.client_key)
		{
			return MqttAuth::ClientCert {
				ca: ca.clone(),
				cert: cert.clone(),
				key: key.clone(),
			};
		}
		if let (Some(username), Some(password)) = (&self.username, &self.password) {
			return MqttAuth::Password {
				username: username.clone(),
				password: password.clone(),
			};
		}
		MqttAuth::Anonymous
	}
}

fn default_topic_prefix() -> String {
	"trunk_recorder/".to_string()
}

fn default_pool_size() -> usize {
	32
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqttConfig {
	pub host: String,
	#[serde(default = "default_mqtt_port")]
	pub port: u16,
	pub client_id: String,
	#[serde(default = "default_topic_prefix")]
	pub topic_prefix: String,
	#[serde(default)]
	pub auth: MqttAuthConfig,
	#[serde(default = "default_pool_size")]
	pub worker_pool_size: usize,
	#[serde(default)]
	pub tls: bool,
}

fn default_mqtt_port() -> u16 {
	1883
}

impl Default for MqttAuthConfig {
	fn default() -> Self {
		Self {
			ca_cert: None,
			client_cert: None,
			client_key: None,
			username: None,
			password: None,
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElasticsearchConfig {
	pub url: String,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub password: Option<String>,
	#[serde(default = "default_true")]
	pub stats_enabled: bool,
}

/// Per-`short_name` configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SystemConfig {
	#[serde(default)]
	pub duplicate_transmission_detection: Option<DuplicateConfig>,
	#[serde(default)]
	pub archive: Option<ArchiveConfig>,
	#[serde(default)]
	pub audio_compression: Option<AudioCompressionConfig>,
	#[serde(default)]
	pub icad_tone_detect_legacy: Vec<LegacyToneDetectConfig>,
	#[serde(default)]
	pub tone_detection: Option<ToneDetectionConfig>,
	#[serde(default)]
	pub transcribe: Option<TranscribeConfig>,
	#[serde(default)]
	pub openmhz: Option<SinkEndpointConfig>,
	#[serde(default)]
	pub broadcastify_calls: Option<SinkEndpointConfig>,
	#[serde(default)]
	pub icad_player: Option<GatedSinkConfig>,
	#[serde(default)]
	pub rdio_systems: Vec<RdioSystemConfig>,
	#[serde(default)]
	pub trunk_player_systems: Vec<TrunkPlayerConfig>,
	#[serde(default)]
	pub icad_cloud_detect: Vec<GatedSinkConfig>,
	#[serde(default)]
	pub icad_alerting: Option<GatedSinkConfig>,
	#[serde(default)]
	pub webhooks: Vec<WebhookConfig>,
	#[serde(default)]
	pub talkgroup_config: HashMap<String, TalkgroupConfig>,
	#[serde(default)]
	pub liquidsoap: Option<LiquidsoapConfig>,
}

impl SystemConfig {
	/// Looks up talkgroup config by decimal string, falling back to `"*"`.
	pub fn talkgroup(&self, talkgroup: i64) -> Option<&TalkgroupConfig> {
		self.talkgroup_config
			.get(&talkgroup.to_string())
			.or_else(|| self.talkgroup_config.get("*"))
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TalkgroupConfig {
	#[serde(default)]
	pub alpha_tag: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub tag: Option<String>,
	#[serde(default)]
	pub group: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DuplicateConfig {
	#[serde(default)]
	pub enabled: bool,
	/// `None` (or an empty config) disables the feature; see the Open
	/// Question resolution on default thresholds.
	#[serde(default)]
	pub start_difference_threshold: Option<f64>,
	#[serde(default)]
	pub length_threshold: Option<f64>,
	#[serde(default)]
	pub check_same_instance: bool,
	#[serde(default)]
	pub simulcast_talkgroups: Vec<Vec<i64>>,
}

impl DuplicateConfig {
	pub fn is_active(&self) -> bool {
		self.enabled
			&& self.start_difference_threshold.is_some()
			&& self.length_threshold.is_some()
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ArchiveBackendConfig {
	Local {
		base_path: PathBuf,
		base_url: String,
	},
	Scp {
		host: String,
		#[serde(default = "default_scp_port")]
		port: u16,
		username: String,
		#[serde(default)]
		password: Option<String>,
		#[serde(default)]
		key_path: Option<PathBuf>,
		base_path: String,
		base_url: String,
	},
	S3 {
		bucket: String,
		#[serde(default)]
		region: Option<String>,
		#[serde(default)]
		endpoint_url: Option<String>,
		access_key_id: String,
		secret_access_key: String,
		#[serde(default)]
		base_url: Option<String>,
	},
	Gcs {
		bucket: String,
		credentials_path: PathBuf,
		#[serde(default)]
		base_url: Option<String>,
	},
}

fn default_scp_port() -> u16 {
	22
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(flatten)]
	pub backend: ArchiveBackendConfig,
	#[serde(default)]
	pub archive_days: u32,
	#[serde(default = "default_archive_extensions")]
	pub archive_extensions: Vec<String>,
}

fn default_archive_extensions() -> Vec<String> {
	vec!["wav".to_string(), "m4a".to_string(), "json".to_string()]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioCompressionConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_sample_rate")]
	pub sample_rate: u32,
	#[serde(default = "default_bitrate")]
	pub bitrate: String,
	#[serde(default)]
	pub normalization: bool,
	#[serde(default)]
	pub use_loudnorm: bool,
	#[serde(default)]
	pub mp3: bool,
}

fn default_sample_rate() -> u32 {
	8000
}

fn default_bitrate() -> String {
	"32k".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LegacyToneDetectConfig {
	#[serde(default)]
	pub enabled: bool,
	pub url: String,
	#[serde(default)]
	pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToneDetectionConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_wildcard")]
	pub allowed_talkgroups: Vec<String>,
	#[serde(default)]
	pub matching_threshold: Option<f64>,
	#[serde(default)]
	pub time_resolution_ms: Option<u32>,
	#[serde(default)]
	pub tone_a_min_length: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscribeConfig {
	#[serde(default)]
	pub enabled: bool,
	pub url: String,
	#[serde(default)]
	pub api_key: Option<String>,
	#[serde(default = "default_wildcard")]
	pub allowed_talkgroups: Vec<String>,
	#[serde(default)]
	pub whisper_config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SinkEndpointConfig {
	#[serde(default)]
	pub enabled: bool,
	pub url: String,
	#[serde(default)]
	pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatedSinkConfig {
	#[serde(default)]
	pub enabled: bool,
	pub url: String,
	#[serde(default)]
	pub api_key: Option<String>,
	#[serde(default = "default_wildcard")]
	pub allowed_talkgroups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RdioSystemConfig {
	#[serde(default)]
	pub enabled: bool,
	pub url: String,
	pub key: String,
	pub short_name: String,
	pub system_label: String,
	#[serde(default)]
	pub remote_storage: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrunkPlayerConfig {
	#[serde(default)]
	pub enabled: bool,
	pub url: String,
	pub auth_token: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
	#[serde(default)]
	pub enabled: bool,
	pub url: String,
	#[serde(default)]
	pub headers: HashMap<String, String>,
	pub body: serde_json::Value,
	#[serde(default = "default_wildcard")]
	pub allowed_talkgroups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiquidsoapConfig {
	#[serde(default)]
	pub enabled: bool,
	pub staging_path: PathBuf,
	#[serde(default)]
	pub delay_seconds: f64,
}

/// Returns `true` iff `allowed` contains `"*"` or `talkgroup`'s decimal
/// string. Empty list admits nothing (§4.2).
pub fn talkgroup_allowed(allowed: &[String], talkgroup: i64) -> bool {
	let tg = talkgroup.to_string();
	allowed.iter().any(|a| a == "*" || *a == tg)
}
