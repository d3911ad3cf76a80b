//! `BrokerError` (§7): disconnection or subscription failure. Fatal to
//! the process — the only other error kind that leaves `main`.

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
	#[error("failed to subscribe to {0}: {1}")]
	Subscribe(String, #[source] rumqttc::ClientError),

	#[error("connection lost: {0}")]
	ConnectionLost(#[source] rumqttc::ConnectionError),
}
