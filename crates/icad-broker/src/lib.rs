//! Broker Consumer (§4.1): connects to the MQTT broker, subscribes under
//! the configured topic prefix, and routes inbound messages to the call
//! pipeline through a bounded worker pool. Grounded on `original_source`'s
//! `mqtt_handler.py` (topic-suffix routing, `TrackingThreadPoolExecutor`
//! dispatch) and on the teacher's `copperd/bin/piper/src/main.rs` daemon
//! bootstrap (connect, log every error variant, let the process die on a
//! fatal one).

mod error;
mod pool;

pub use error::BrokerError;
pub use pool::{PoolMetrics, WorkerPool};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use icad_index::IndexClient;
use icad_model::{AudioMessage, AudioPayload, MqttAuth, MqttConfig, SystemConfig, ValidationError};
use icad_pipeline::{CallOutcome, PipelineContext};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tracing::{debug, error, info, warn};

/// Runs the consumer loop until the connection is lost or a subscription
/// fails; both are fatal (§7, `BrokerError`).
pub async fn run(
	config: &MqttConfig,
	systems: Arc<HashMap<String, SystemConfig>>,
	ctx: Arc<PipelineContext>,
	index: Option<Arc<IndexClient>>,
) -> Result<(), BrokerError> {
	let mut options = MqttOptions::new(config.client_id.as_str(), config.host.clone(), config.port);
	options.set_keep_alive(Duration::from_secs(30));

	match config.auth.resolve() {
		MqttAuth::ClientCert { ca, cert, key } => {
			let ca_bytes = std::fs::read(&ca).unwrap_or_default();
			let cert_bytes = std::fs::read(&cert).unwrap_or_default();
			let key_bytes = std::fs::read(&key).unwrap_or_default();
			options.set_transport(rumqttc::Transport::tls(
				ca_bytes,
				Some((cert_bytes, rumqttc::Key::RSA(key_bytes))),
				None,
			));
		}
		MqttAuth::Password { username, password } => {
			options.set_credentials(username, password);
			if config.tls {
				options.set_transport(rumqttc::Transport::tls_with_default_config());
			}
		}
		MqttAuth::Anonymous => {
			if config.tls {
				options.set_transport(rumqttc::Transport::tls_with_default_config());
			}
		}
	}

	let (client, mut event_loop) = AsyncClient::new(options, 256);

	let topic = format!("{}#", config.topic_prefix);
	client
		.subscribe(&topic, QoS::AtLeastOnce)
		.await
		.map_err(|e| BrokerError::Subscribe(topic.clone(), e))?;
	info!(message = "subscribed", topic = %topic);

	let pool = WorkerPool::new(config.worker_pool_size);

	loop {
		let notification = tokio::select! {
			notification = event_loop.poll() => notification.map_err(BrokerError::ConnectionLost)?,
			_ = tokio::signal::ctrl_c() => {
				info!(message = "shutdown signal received, stopping consumer loop");
				return Ok(());
			}
		};

		if let Event::Incoming(Packet::Publish(publish)) = notification {
			let metrics = pool.metrics();
			debug!(
				message = "message received",
				topic = %publish.topic,
				pending = metrics.pending,
				running = metrics.running,
				waiting = metrics.waiting,
			);

			let topic = publish.topic.clone();
			let payload = publish.payload.to_vec();
			let prefix = config.topic_prefix.clone();
			let systems = systems.clone();
			let ctx = ctx.clone();
			let index = index.clone();

			pool.spawn(async move {
				route(&prefix, &topic, &payload, &systems, &ctx, &index).await;
			});
		}
	}
}

/// Dispatches one inbound message by its topic suffix (§4.1, §6).
async fn route(
	prefix: &str,
	topic: &str,
	payload: &[u8],
	systems: &HashMap<String, SystemConfig>,
	ctx: &PipelineContext,
	index: &Option<Arc<IndexClient>>,
) {
	let Some(suffix) = topic.strip_prefix(prefix) else {
		debug!(message = "ignoring message outside topic prefix", topic);
		return;
	};

	match suffix {
		"feeds/audio" => handle_audio(payload, systems, ctx).await,
		"feeds/rates" => project_stats(payload, index, "rates").await,
		"feeds/recorders" => project_stats(payload, index, "recorders").await,
		"units/call" | "units/end" | "status/calls_active" | "feeds/call_end" => {
			project_stats(payload, index, "units").await
		}
		other => debug!(message = "unhandled topic suffix", suffix = other),
	}
}

async fn handle_audio(payload: &[u8], systems: &HashMap<String, SystemConfig>, ctx: &PipelineContext) {
	let message: AudioMessage = match serde_json::from_slice(payload) {
		Ok(m) => m,
		Err(err) => {
			warn!(message = "failed to parse feeds/audio message", ?err);
			return;
		}
	};

	if message.instance_id == icad_model::DEFAULT_INSTANCE_ID {
		let err = ValidationError::DefaultInstanceId;
		warn!(message = "rejecting message", %err);
		return;
	}

	let mut call = message.call.metadata;
	call.instance_id = message.instance_id;
	call.talkgroup_decimal = call.talkgroup;
	call.received_at = Some(now_epoch());

	let audio = match AudioPayload::from_base64(&message.call.audio_wav_base64) {
		Ok(audio) => audio,
		Err(err) => {
			warn!(message = "failed to decode audio payload", short_name = %call.short_name, ?err);
			return;
		}
	};

	match icad_pipeline::run_call(ctx, systems, call, audio).await {
		Ok(CallOutcome::Dropped(reason)) => {
			debug!(message = "call dropped", reason = %reason);
		}
		Ok(CallOutcome::Completed) => {}
		Err(err) => {
			error!(message = "pipeline run failed", ?err);
		}
	}
}

/// Projects a stats/status message into a small index document (§4.8).
/// Best-effort: only runs when an index client and `stats_enabled` are
/// configured.
async fn project_stats(payload: &[u8], index: &Option<Arc<IndexClient>>, into: &str) {
	let Some(index) = index else {
		return;
	};
	let document: serde_json::Value = match serde_json::from_slice(payload) {
		Ok(v) => v,
		Err(err) => {
			warn!(message = "failed to parse stats message", ?err);
			return;
		}
	};
	index.index_document(into, &document).await;
}

fn now_epoch() -> f64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs_f64())
		.unwrap_or(0.0)
}
