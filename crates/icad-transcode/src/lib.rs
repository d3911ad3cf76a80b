//! Transcoder Driver (§4.4): converts `<file>.wav` to `<file>.m4a` (and
//! optionally `<file>.mp3`) via an external `ffmpeg` subprocess, with
//! optional two-pass loudness normalization.

use std::path::Path;
use std::process::Stdio;

use icad_model::{AudioCompressionConfig, CallRecord};
use icad_util::iso8601_date;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
	#[error("source file does not exist: {0}")]
	SourceMissing(String),

	#[error("failed to spawn encoder: {0}")]
	EncoderMissing(#[source] std::io::Error),

	#[error("encoder exited with status {status}: {stage}")]
	SubprocessFailed { stage: &'static str, status: i32 },

	#[error("could not parse loudnorm measurement block from encoder output")]
	LoudnormParseFailed,
}

/// Binary name on `PATH`. Exposed for tests that substitute a stub.
const ENCODER_BIN: &str = "ffmpeg";

struct LoudnormMeasurement {
	input_i: String,
	input_tp: String,
	input_lra: String,
	input_thresh: String,
	target_offset: String,
}

fn metadata_args(call: &CallRecord) -> Vec<(String, String)> {
	let comment = format!(
		"Freq: {} Signal: {} Noise: {} Length: {}",
		call.freq.map(|f| f.to_string()).unwrap_or_default(),
		call.signal.map(|s| s.to_string()).unwrap_or_default(),
		call.noise.map(|n| n.to_string()).unwrap_or_default(),
		call.call_length,
	);
	vec![
		("album".to_string(), call.short_name.to_string()),
		(
			"artist".to_string(),
			call.talkgroup_label
				.clone()
				.map(|s| s.to_string())
				.unwrap_or_else(|| call.talkgroup.to_string()),
		),
		("date".to_string(), iso8601_date(call.start_time)),
		("genre".to_string(), "Radio Traffic".to_string()),
		(
			"title".to_string(),
			call.talkgroup_description
				.clone()
				.map(|s| s.to_string())
				.unwrap_or_else(|| call.filename.to_string()),
		),
		("comment".to_string(), comment),
	]
}

fn push_metadata(cmd: &mut Command, call: &CallRecord) {
	for (k, v) in metadata_args(call) {
		cmd.arg("-metadata").arg(format!("{k}={v}"));
	}
}

async fn run(cmd: &mut Command, stage: &'static str) -> Result<std::process::Output, TranscodeError> {
	let output = cmd
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.output()
		.await
		.map_err(TranscodeError::EncoderMissing)?;
	if !output.status.success() {
		return Err(TranscodeError::SubprocessFailed {
			stage,
			status: output.status.code().unwrap_or(-1),
		});
	}
	Ok(output)
}

fn loudnorm_filter_measure() -> &'static str {
	"loudnorm=I=-16:TP=-1.5:LRA=11:print_format=json"
}

fn loudnorm_filter_apply(m: &LoudnormMeasurement) -> String {
	format!(
		"loudnorm=I=-16:TP=-1.5:LRA=11:measured_I={}:measured_TP={}:measured_LRA={}:measured_thresh={}:offset={}:linear=true:print_format=summary",
		m.input_i, m.input_tp, m.input_lra, m.input_thresh, m.target_offset
	)
}

fn parse_loudnorm_json(stderr: &str) -> Result<LoudnormMeasurement, TranscodeError> {
	let start = stderr.rfind('{').ok_or(TranscodeError::LoudnormParseFailed)?;
	let end = stderr[start..]
		.find('}')
		.map(|e| start + e + 1)
		.ok_or(TranscodeError::LoudnormParseFailed)?;
	let value: serde_json::Value =
		serde_json::from_str(&stderr[start..end]).map_err(|_| TranscodeError::LoudnormParseFailed)?;

	let field = |name: &str| -> Result<String, TranscodeError> {
		value
			.get(name)
			.and_then(|v| v.as_str())
			.map(|s| s.to_string())
			.ok_or(TranscodeError::LoudnormParseFailed)
	};

	Ok(LoudnormMeasurement {
		input_i: field("input_i")?,
		input_tp: field("input_tp")?,
		input_lra: field("input_lra")?,
		input_thresh: field("input_thresh")?,
		target_offset: field("target_offset")?,
	})
}

/// Runs the measurement pass and returns the parsed loudnorm block.
async fn measure_loudness(src: &Path) -> Result<LoudnormMeasurement, TranscodeError> {
	let mut cmd = Command::new(ENCODER_BIN);
	cmd.arg("-i")
		.arg(src)
		.arg("-af")
		.arg(loudnorm_filter_measure())
		.arg("-f")
		.arg("null")
		.arg("-");
	let output = run(&mut cmd, "loudnorm-measure").await?;
	let stderr = String::from_utf8_lossy(&output.stderr);
	parse_loudnorm_json(&stderr)
}

async fn encode(
	src: &Path,
	dst: &Path,
	call: &CallRecord,
	config: &AudioCompressionConfig,
	loudnorm: Option<&LoudnormMeasurement>,
) -> Result<(), TranscodeError> {
	let mut cmd = Command::new(ENCODER_BIN);
	cmd.arg("-y").arg("-i").arg(src);
	if let Some(m) = loudnorm {
		cmd.arg("-af").arg(loudnorm_filter_apply(m));
	}
	cmd.arg("-ac")
		.arg("1")
		.arg("-ar")
		.arg(config.sample_rate.to_string())
		.arg("-b:a")
		.arg(&config.bitrate);
	push_metadata(&mut cmd, call);
	cmd.arg(dst);
	run(&mut cmd, "encode").await?;
	Ok(())
}

pub struct TranscodeOutcome {
	pub m4a_path: std::path::PathBuf,
	pub mp3_path: Option<std::path::PathBuf>,
}

/// Stage 5 of the Call Pipeline. `dst_m4a`'s extension drives the
/// container; `config.mp3` additionally requests `dst_mp3`.
pub async fn transcode(
	src_wav: &Path,
	dst_m4a: &Path,
	dst_mp3: Option<&Path>,
	call: &CallRecord,
	config: &AudioCompressionConfig,
) -> Result<TranscodeOutcome, TranscodeError> {
	if !src_wav.exists() {
		return Err(TranscodeError::SourceMissing(
			src_wav.display().to_string(),
		));
	}

	let loudnorm = if config.normalization && config.use_loudnorm {
		debug!(message = "running loudnorm measurement pass", src = %src_wav.display());
		Some(measure_loudness(src_wav).await?)
	} else {
		None
	};

	encode(src_wav, dst_m4a, call, config, loudnorm.as_ref()).await?;

	let mp3_path = if config.mp3 {
		match dst_mp3 {
			Some(dst) => match encode(src_wav, dst, call, config, loudnorm.as_ref()).await {
				Ok(()) => Some(dst.to_path_buf()),
				Err(err) => {
					warn!(message = "mp3 encode failed, continuing without it", ?err);
					None
				}
			},
			None => None,
		}
	} else {
		None
	};

	Ok(TranscodeOutcome {
		m4a_path: dst_m4a.to_path_buf(),
		mp3_path,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_loudnorm_json_block_from_noisy_stderr() {
		let stderr = r#"
[Parsed_loudnorm_0 @ 0x0] some preamble text
{
	"input_i" : "-23.45",
	"input_tp" : "-3.50",
	"input_lra" : "4.20",
	"input_thresh" : "-33.60",
	"output_i" : "-16.00",
	"output_tp" : "-1.50",
	"output_lra" : "5.00",
	"output_thresh" : "-26.00",
	"normalization_type" : "dynamic",
	"target_offset" : "0.10"
}
"#;
		let m = parse_loudnorm_json(stderr).unwrap();
		assert_eq!(m.input_i, "-23.45");
		assert_eq!(m.target_offset, "0.10");
	}

	#[test]
	fn rejects_output_with_no_json_block() {
		let err = parse_loudnorm_json("no json here").unwrap_err();
		assert!(matches!(err, TranscodeError::LoudnormParseFailed));
	}
}
