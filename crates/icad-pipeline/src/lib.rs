//! Call Pipeline (§4.2): the orchestrator. Runs the fixed 14-stage
//! sequence for one call and fans out to every configured sink.

mod context;
mod error;
mod tones;
mod wav;

pub use context::PipelineContext;
pub use error::{CallOutcome, DropReason, PipelineError};

use std::collections::HashMap;

use icad_model::{talkgroup_allowed, AudioPayload, CallRecord, SystemConfig, Transcript, ValidationError};
use icad_sinks::sinks;
use tracing::{info, warn};

/// Runs every stage for one call. Returns [`CallOutcome::Dropped`] for a
/// Guard or duplicate rejection; [`CallOutcome::Completed`] means the
/// pipeline ran every stage (individual sink failures do not change this).
pub async fn run_call(
	ctx: &PipelineContext,
	systems: &HashMap<String, SystemConfig>,
	mut call: CallRecord,
	audio: AudioPayload,
) -> Result<CallOutcome, PipelineError> {
	// Stage 1: Guard.
	if call.short_name.is_empty() {
		let err = ValidationError::EmptyShortName;
		warn!(message = "dropping call", %err);
		return Ok(CallOutcome::Dropped(DropReason::EmptyShortName));
	}
	let Some(system) = systems.get(call.short_name.as_str()) else {
		let err = ValidationError::UnknownSystem(call.short_name.clone());
		warn!(message = "dropping call", %err);
		return Ok(CallOutcome::Dropped(DropReason::UnknownSystem));
	};

	// Stage 2: Duplicate check.
	if let Some(dup_config) = &system.duplicate_transmission_detection {
		if ctx.history.check_and_insert(&call, dup_config) {
			info!(message = "duplicate call rejected", short_name = %call.short_name, talkgroup = call.talkgroup);
			if let Some(index) = &ctx.index {
				let doc = serde_json::json!({
					"short_name": call.short_name,
					"talkgroup": call.talkgroup,
					"start_time": call.start_time,
					"instance_id": call.instance_id,
				});
				index.index_document("duplicates", &doc).await;
			}
			return Ok(CallOutcome::Dropped(DropReason::Duplicate));
		}
	}

	// Stage 3: Initialize enrichment slots.
	call.tones = Default::default();
	call.transcript = None;

	// Stage 4: Persist to scratch.
	let base = call.base_name().to_string();
	let wav_path = ctx.temp_dir.join(format!("{base}.wav"));
	let json_path = ctx.temp_dir.join(format!("{base}.json"));
	tokio::fs::write(&wav_path, &audio.0)
		.await
		.map_err(PipelineError::ScratchWrite)?;
	write_sidecar_fatal(&json_path, &call).await?;

	// Stage 5: Transcode to M4A (and optionally MP3).
	let mut m4a_path = None;
	let mut mp3_path = None;
	if let Some(compression) = &system.audio_compression {
		if compression.enabled {
			let dst_m4a = ctx.temp_dir.join(format!("{base}.m4a"));
			let dst_mp3 = ctx.temp_dir.join(format!("{base}.mp3"));
			let outcome = icad_transcode::transcode(
				&wav_path,
				&dst_m4a,
				compression.mp3.then_some(dst_mp3.as_path()),
				&call,
				compression,
			)
			.await?;
			m4a_path = Some(outcome.m4a_path);
			mp3_path = outcome.mp3_path;
		}
	}

	// Stage 6: Legacy tone-detect fan-out.
	for legacy in &system.icad_tone_detect_legacy {
		if legacy.enabled {
			let _ = sinks::legacy_tone_detect(&ctx.http, legacy, &call, &wav_path).await;
		}
	}

	// Stage 7: Inline tone detection.
	if let Some(tone_config) = &system.tone_detection {
		if tone_config.enabled && talkgroup_allowed(&tone_config.allowed_talkgroups, call.talkgroup) {
			if let Some(parsed) = wav::parse_wav(&audio.0) {
				call.tones = tones::detect(&parsed);
			}
		}
	}

	// Stage 8: Transcribe.
	call.transcript = Some(match &system.transcribe {
		Some(transcribe_config)
			if transcribe_config.enabled
				&& talkgroup_allowed(&transcribe_config.allowed_talkgroups, call.talkgroup) =>
		{
			match sinks::transcribe(&ctx.http, transcribe_config, &call, &wav_path).await {
				Ok(transcript) => transcript,
				Err(_) => Transcript::default(),
			}
		}
		_ => Transcript::default(),
	});

	// Stage 9: Compute play length.
	call.play_length = call.compute_play_length();

	// Stage 10: Rewrite JSON sidecar (best effort).
	write_sidecar(&json_path, &call).await;

	// Stage 11: Archive.
	if let Some(archive_config) = &system.archive {
		if archive_config.enabled {
			let backend = ctx.archive_backend(&call.short_name, archive_config).await;
			let urls = icad_archive::archive_artifacts(
				backend.as_ref(),
				archive_config,
				&ctx.temp_dir,
				&call.short_name,
				&base,
				call.start_time,
			)
			.await;

			call.audio_wav_url = urls.get("wav").cloned();
			call.audio_m4a_url = urls.get("m4a").cloned();
			call.audio_mp3_url = urls.get("mp3").cloned();
			call.audio_url = call
				.audio_m4a_url
				.clone()
				.or_else(|| call.audio_wav_url.clone());
		}
	}

	// Stage 12: Index the call record.
	if let Some(index) = &ctx.index {
		let doc = serde_json::to_value(&call).unwrap_or(serde_json::Value::Null);
		index.index_document("transmissions", &doc).await;
	}

	// Stage 13: Sink fan-out, each independent and isolated.
	fan_out(ctx, system, &call, &wav_path, m4a_path.as_deref(), mp3_path.as_deref()).await;

	// Stage 14: Cleanup scratch files.
	let _ = tokio::fs::remove_file(&wav_path).await;
	let _ = tokio::fs::remove_file(&json_path).await;
	if let Some(path) = &m4a_path {
		let _ = tokio::fs::remove_file(path).await;
	}
	if let Some(path) = &mp3_path {
		let _ = tokio::fs::remove_file(path).await;
	}

	Ok(CallOutcome::Completed)
}

/// Stage 4's sidecar write: the call's persisted record, not a convenience
/// artifact. A failure here aborts the pipeline (§4.2 Stage 4).
async fn write_sidecar_fatal(path: &std::path::Path, call: &CallRecord) -> Result<(), PipelineError> {
	let bytes = serde_json::to_vec_pretty(call).map_err(PipelineError::SidecarSerialize)?;
	tokio::fs::write(path, bytes)
		.await
		.map_err(PipelineError::SidecarWrite)?;
	Ok(())
}

/// Stage 10's rewrite of the same sidecar, after enrichment. Best-effort:
/// the call already fanned past the point where losing this file matters.
async fn write_sidecar(path: &std::path::Path, call: &CallRecord) {
	match serde_json::to_vec_pretty(call) {
		Ok(bytes) => {
			if let Err(err) = tokio::fs::write(path, bytes).await {
				warn!(message = "sidecar write failed", ?err);
			}
		}
		Err(err) => warn!(message = "sidecar serialization failed", ?err),
	}
}

async fn fan_out(
	ctx: &PipelineContext,
	system: &SystemConfig,
	call: &CallRecord,
	wav_path: &std::path::Path,
	m4a_path: Option<&std::path::Path>,
	mp3_path: Option<&std::path::Path>,
) {
	let _ = mp3_path;

	if let (Some(openmhz), Some(_)) = (&system.openmhz, m4a_path) {
		if openmhz.enabled {
			let _ = sinks::send_json_body(&ctx.http, "openmhz", &openmhz.url, openmhz.api_key.as_deref(), call).await;
		}
	}

	if let (Some(broadcastify), Some(_)) = (&system.broadcastify_calls, m4a_path) {
		if broadcastify.enabled {
			let _ = sinks::send_json_body(
				&ctx.http,
				"broadcastify_calls",
				&broadcastify.url,
				broadcastify.api_key.as_deref(),
				call,
			)
			.await;
		}
	}

	if let Some(player) = &system.icad_player {
		if player.enabled
			&& call.audio_m4a_url.is_some()
			&& talkgroup_allowed(&player.allowed_talkgroups, call.talkgroup)
		{
			let _ = sinks::send_json_body(&ctx.http, "icad_player", &player.url, player.api_key.as_deref(), call).await;
		}
	}

	for rdio in &system.rdio_systems {
		if !rdio.enabled {
			continue;
		}
		if wav_path.exists() {
			let _ = sinks::rdio(&ctx.http, rdio, call, wav_path).await;
		}
	}

	for trunk_player in &system.trunk_player_systems {
		if trunk_player.enabled && m4a_path.is_some() {
			let _ = sinks::trunk_player(&ctx.http, trunk_player, call).await;
		}
	}

	for cloud_detect in &system.icad_cloud_detect {
		if cloud_detect.enabled && talkgroup_allowed(&cloud_detect.allowed_talkgroups, call.talkgroup) {
			let _ = sinks::cloud_detect(&ctx.http, cloud_detect, call, wav_path).await;
		}
	}

	if let Some(alerting) = &system.icad_alerting {
		if alerting.enabled && talkgroup_allowed(&alerting.allowed_talkgroups, call.talkgroup) {
			let _ = sinks::send_json_body(&ctx.http, "icad_alerting", &alerting.url, alerting.api_key.as_deref(), call)
				.await;
		}
	}

	for webhook in &system.webhooks {
		if webhook.enabled && talkgroup_allowed(&webhook.allowed_talkgroups, call.talkgroup) {
			let _ = sinks::webhook(&ctx.http, webhook, call).await;
		}
	}

	if let Some(liquidsoap) = &system.liquidsoap {
		if liquidsoap.enabled {
			if let Some(m4a) = m4a_path {
				sinks::liquidsoap_stage(liquidsoap, call, m4a).await;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	use icad_dedup::MessageHistory;
	use icad_model::{ArchiveBackendConfig, ArchiveConfig, DuplicateConfig, GatedSinkConfig, SystemConfig};
	use wiremock::matchers::{method, path as path_matcher};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn test_ctx(temp_dir: &std::path::Path) -> PipelineContext {
		PipelineContext::new(
			temp_dir.to_path_buf(),
			Arc::new(MessageHistory::new()),
			None,
			reqwest::Client::new(),
		)
	}

	fn test_call(short_name: &str, talkgroup: i64, instance_id: &str, start_time: f64) -> CallRecord {
		serde_json::from_value(serde_json::json!({
			"instance_id": instance_id,
			"short_name": short_name,
			"talkgroup": talkgroup,
			"start_time": start_time,
			"call_length": 5.0,
			"filename": format!("{short_name}_{instance_id}.wav"),
		}))
		.unwrap()
	}

	fn wav_bytes() -> Vec<u8> {
		vec![0u8; 32]
	}

	fn count_files_with_extension(dir: &std::path::Path, ext: &str) -> usize {
		walkdir_count(dir, ext)
	}

	fn walkdir_count(dir: &std::path::Path, ext: &str) -> usize {
		let mut count = 0;
		let mut stack = vec![dir.to_path_buf()];
		while let Some(current) = stack.pop() {
			let Ok(entries) = std::fs::read_dir(&current) else {
				continue;
			};
			for entry in entries.flatten() {
				let path = entry.path();
				if path.is_dir() {
					stack.push(path);
				} else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
					count += 1;
				}
			}
		}
		count
	}

	// E1: a call with no dedup/tone/transcode/sink config archives its WAV
	// and sidecar and reaches completion.
	#[tokio::test]
	async fn e1_happy_path_archives_and_completes() {
		let scratch = tempfile::tempdir().unwrap();
		let archive_dir = tempfile::tempdir().unwrap();
		let ctx = test_ctx(scratch.path());

		let mut systems = HashMap::new();
		systems.insert(
			"sys1".to_string(),
			SystemConfig {
				archive: Some(ArchiveConfig {
					enabled: true,
					backend: ArchiveBackendConfig::Local {
						base_path: archive_dir.path().to_path_buf(),
						base_url: "https://archive.example".to_string(),
					},
					archive_days: 0,
					archive_extensions: vec!["wav".to_string(), "json".to_string()],
				}),
				..Default::default()
			},
		);

		let call = test_call("sys1", 100, "a", 1_700_000_000.0);
		let outcome = run_call(&ctx, &systems, call, AudioPayload(wav_bytes()))
			.await
			.unwrap();

		assert_eq!(outcome, CallOutcome::Completed);
		assert_eq!(count_files_with_extension(archive_dir.path(), "wav"), 1);
		assert_eq!(count_files_with_extension(archive_dir.path(), "json"), 1);
		// Stage 14 cleanup removed the scratch copies.
		assert_eq!(count_files_with_extension(scratch.path(), "wav"), 0);
	}

	// E2: a second call within the configured thresholds on the same
	// (short_name, talkgroup) is rejected as a duplicate.
	#[tokio::test]
	async fn e2_duplicate_rejected() {
		let scratch = tempfile::tempdir().unwrap();
		let ctx = test_ctx(scratch.path());

		let mut systems = HashMap::new();
		systems.insert(
			"sys1".to_string(),
			SystemConfig {
				duplicate_transmission_detection: Some(DuplicateConfig {
					enabled: true,
					start_difference_threshold: Some(1.0),
					length_threshold: Some(0.5),
					check_same_instance: false,
					simulcast_talkgroups: vec![],
				}),
				..Default::default()
			},
		);

		let first = test_call("sys1", 100, "a", 1_700_000_000.0);
		let first_outcome = run_call(&ctx, &systems, first, AudioPayload(wav_bytes()))
			.await
			.unwrap();
		assert_eq!(first_outcome, CallOutcome::Completed);

		let second = test_call("sys1", 100, "b", 1_700_000_000.5);
		let second_outcome = run_call(&ctx, &systems, second, AudioPayload(wav_bytes()))
			.await
			.unwrap();
		assert_eq!(second_outcome, CallOutcome::Dropped(DropReason::Duplicate));
	}

	// E3: a gated sink configured for a talkgroup that doesn't match the
	// call is never invoked; a matching talkgroup does invoke it.
	#[tokio::test]
	async fn e3_talkgroup_gate_skips_non_matching_sink() {
		let scratch = tempfile::tempdir().unwrap();
		let ctx = test_ctx(scratch.path());
		let mock_server = MockServer::start().await;

		Mock::given(method("POST"))
			.and(path_matcher("/alert"))
			.respond_with(ResponseTemplate::new(200))
			.expect(0)
			.mount(&mock_server)
			.await;

		let mut systems = HashMap::new();
		systems.insert(
			"sys1".to_string(),
			SystemConfig {
				icad_alerting: Some(GatedSinkConfig {
					enabled: true,
					url: format!("{}/alert", mock_server.uri()),
					api_key: None,
					allowed_talkgroups: vec!["999".to_string()],
				}),
				..Default::default()
			},
		);

		let call = test_call("sys1", 100, "a", 1_700_000_000.0);
		let outcome = run_call(&ctx, &systems, call, AudioPayload(wav_bytes()))
			.await
			.unwrap();
		assert_eq!(outcome, CallOutcome::Completed);

		// `mock_server`'s mounted mock carries `.expect(0)`; wiremock
		// verifies and panics on drop if that expectation wasn't met.
	}

	// Complementary check: a matching talkgroup does invoke the sink.
	#[tokio::test]
	async fn e3_talkgroup_gate_allows_matching_sink() {
		let scratch = tempfile::tempdir().unwrap();
		let ctx = test_ctx(scratch.path());
		let mock_server = MockServer::start().await;

		Mock::given(method("POST"))
			.and(path_matcher("/alert"))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&mock_server)
			.await;

		let mut systems = HashMap::new();
		systems.insert(
			"sys1".to_string(),
			SystemConfig {
				icad_alerting: Some(GatedSinkConfig {
					enabled: true,
					url: format!("{}/alert", mock_server.uri()),
					api_key: None,
					allowed_talkgroups: vec!["100".to_string()],
				}),
				..Default::default()
			},
		);

		let call = test_call("sys1", 100, "a", 1_700_000_000.0);
		let outcome = run_call(&ctx, &systems, call, AudioPayload(wav_bytes()))
			.await
			.unwrap();
		assert_eq!(outcome, CallOutcome::Completed);

		// `mock_server`'s mounted mock carries `.expect(1)`; wiremock
		// verifies and panics on drop if that expectation wasn't met.
	}

	#[tokio::test]
	async fn empty_short_name_is_dropped() {
		let scratch = tempfile::tempdir().unwrap();
		let ctx = test_ctx(scratch.path());
		let systems = HashMap::new();

		let call = test_call("", 100, "a", 1_700_000_000.0);
		let outcome = run_call(&ctx, &systems, call, AudioPayload(wav_bytes()))
			.await
			.unwrap();
		assert_eq!(outcome, CallOutcome::Dropped(DropReason::EmptyShortName));
	}

	#[tokio::test]
	async fn unknown_system_is_dropped() {
		let scratch = tempfile::tempdir().unwrap();
		let ctx = test_ctx(scratch.path());
		let systems = HashMap::new();

		let call = test_call("sys-unknown", 100, "a", 1_700_000_000.0);
		let outcome = run_call(&ctx, &systems, call, AudioPayload(wav_bytes()))
			.await
			.unwrap();
		assert_eq!(outcome, CallOutcome::Dropped(DropReason::UnknownSystem));
	}
}
