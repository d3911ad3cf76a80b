//! Sink Adapters (§4.6): one module per downstream service shape. Each
//! adapter is independently failable; callers in `icad-pipeline` invoke
//! them in the fixed stage-13 order and never let one failure affect
//! another.

mod alerting;
mod cloud_detect;
mod common;
mod legacy_tone;
mod liquidsoap;
mod rdio;
mod transcribe;
mod trunk_player;
mod webhook;

pub use common::SinkError;

pub mod sinks {
	pub use crate::alerting::send as send_json_body;
	pub use crate::cloud_detect::send as cloud_detect;
	pub use crate::legacy_tone::send as legacy_tone_detect;
	pub use crate::liquidsoap::stage as liquidsoap_stage;
	pub use crate::rdio::send as rdio;
	pub use crate::transcribe::transcribe;
	pub use crate::trunk_player::send as trunk_player;
	pub use crate::webhook::send as webhook;
}
