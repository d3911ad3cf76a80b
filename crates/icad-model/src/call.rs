//! The call record: the unit of work passed through the pipeline.

use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use url::Url;

/// Sentinel `instance_id` sent by an unconfigured producer. Messages
/// carrying this value are rejected at the broker layer.
pub const DEFAULT_INSTANCE_ID: &str = "0";

pub type SmolStr = SmartString<LazyCompact>;

/// One entry of `freqList`/`srcList` as emitted by the recorder. Extra
/// fields the recorder may send are preserved in `extra` rather than
/// rejected, since this struct is not the authority on the recorder's
/// wire format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FreqListEntry {
	pub freq: u64,
	#[serde(default)]
	pub time: f64,
	#[serde(default)]
	pub pos: f64,
	#[serde(default)]
	pub len: f64,
	#[serde(default)]
	pub error_count: Option<i64>,
	#[serde(default)]
	pub spike_count: Option<i64>,
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SrcListEntry {
	pub src: i64,
	#[serde(default)]
	pub time: f64,
	#[serde(default)]
	pub pos: f64,
	#[serde(default)]
	pub emergency: bool,
	#[serde(default)]
	pub signal_system: Option<SmolStr>,
	#[serde(default)]
	pub tag: Option<SmolStr>,
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Result of inline tone detection (stage 7). Entry shape is left as
/// `serde_json::Value` since the detection algorithm produces a variable
/// number of fields per tone kind (frequencies, lengths, timestamps) and
/// the pipeline only ever needs to report, not re-interpret, the result.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Tones {
	#[serde(default)]
	pub hi_low_tone: Vec<serde_json::Value>,
	#[serde(default)]
	pub two_tone: Vec<serde_json::Value>,
	#[serde(default)]
	pub long_tone: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranscriptSegment {
	pub text: String,
	#[serde(default)]
	pub start: Option<f64>,
	#[serde(default)]
	pub end: Option<f64>,
}

/// Result of transcription (stage 8), or the disabled-feature stub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
	pub transcript: String,
	#[serde(default)]
	pub segments: Vec<TranscriptSegment>,
	#[serde(default)]
	pub process_time_seconds: f64,
	#[serde(default)]
	pub addresses: Vec<String>,
}

impl Default for Transcript {
	fn default() -> Self {
		Self {
			transcript: "No Transcribe configured".to_string(),
			segments: Vec::new(),
			process_time_seconds: 0.0,
			addresses: Vec::new(),
		}
	}
}

/// The unit of work. Append-only within a worker: enrichment stages add
/// fields, never remove them, before dispatch (§3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
	pub instance_id: SmolStr,
	pub short_name: SmolStr,
	pub talkgroup: i64,
	/// Copy of `talkgroup`, injected by the broker layer on receive.
	#[serde(default)]
	pub talkgroup_decimal: i64,

	pub start_time: f64,
	#[serde(default)]
	pub stop_time: Option<f64>,
	#[serde(default)]
	pub call_length: f64,

	pub filename: SmolStr,

	#[serde(default)]
	pub freq: Option<u64>,
	#[serde(default)]
	pub freq_error: Option<i64>,
	#[serde(default)]
	pub signal: Option<i64>,
	#[serde(default)]
	pub noise: Option<i64>,

	#[serde(rename = "freqList", default)]
	pub freq_list: Vec<FreqListEntry>,
	#[serde(rename = "srcList", default)]
	pub src_list: Vec<SrcListEntry>,
	#[serde(default)]
	pub patches: Vec<i64>,

	#[serde(default)]
	pub talkgroup_tag: Option<SmolStr>,
	#[serde(default)]
	pub talkgroup_description: Option<SmolStr>,
	#[serde(default)]
	pub talkgroup_group: Option<SmolStr>,
	#[serde(default)]
	pub talkgroup_label: Option<SmolStr>,

	#[serde(default)]
	pub encrypted: bool,
	#[serde(default)]
	pub emergency: bool,
	#[serde(default)]
	pub call_num: Option<u64>,
	#[serde(default)]
	pub recorder: Option<SmolStr>,

	/// Receive timestamp injected by the broker layer, epoch seconds.
	#[serde(default)]
	pub received_at: Option<f64>,

	// Enrichment slots, filled during the pipeline.
	#[serde(default)]
	pub tones: Tones,
	#[serde(default)]
	pub transcript: Option<Transcript>,
	#[serde(default)]
	pub play_length: f64,
	#[serde(default)]
	pub audio_wav_url: Option<Url>,
	#[serde(default)]
	pub audio_m4a_url: Option<Url>,
	#[serde(default)]
	pub audio_mp3_url: Option<Url>,
	#[serde(default)]
	pub audio_url: Option<Url>,
}

impl CallRecord {
	/// `filename` minus its extension; sibling artifact names are derived
	/// by substituting the extension onto this base.
	pub fn base_name(&self) -> &str {
		self.filename
			.strip_suffix(".wav")
			.unwrap_or(&self.filename)
	}

	pub fn sibling(&self, ext: &str) -> String {
		format!("{}.{ext}", self.base_name())
	}

	pub fn is_default_instance(&self) -> bool {
		self.instance_id == DEFAULT_INSTANCE_ID
	}

	/// Sum of `freqList[i].len` (§8, invariant 3).
	pub fn compute_play_length(&self) -> f64 {
		self.freq_list.iter().map(|f| f.len).sum()
	}
}

/// Raw WAV bytes, obtained by base64-decoding the inbound payload.
/// Lifetime is a single pipeline invocation.
pub struct AudioPayload(pub Vec<u8>);

impl AudioPayload {
	pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
		use base64::Engine;
		base64::engine::general_purpose::STANDARD
			.decode(encoded)
			.map(AudioPayload)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Inbound `feeds/audio` message envelope.
#[derive(Debug, Deserialize)]
pub struct AudioMessage {
	pub instance_id: SmolStr,
	pub call: AudioMessageCall,
}

#[derive(Debug, Deserialize)]
pub struct AudioMessageCall {
	pub audio_wav_base64: String,
	pub metadata: CallRecord,
}
