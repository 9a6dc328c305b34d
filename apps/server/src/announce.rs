use crate::router::DOWNLOAD_PATH;
use rumqttc::{AsyncClient, ConnectionError, Event, Incoming, MqttOptions, QoS};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

/// Default broker port when `MQTT_ADDRESS` does not name one.
const DEFAULT_BROKER_PORT: u16 = 1883;
/// How long to wait for the broker to acknowledge the connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Capacity of the client-side request queue.
const CLIENT_QUEUE_CAPACITY: usize = 10;

/// Errors from the MQTT announcement path.
#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    /// TCP or MQTT-level connection failure.
    #[error("failed to connect to MQTT broker {address}: {source}")]
    Connect { address: String, source: ConnectionError },

    /// The broker did not acknowledge the connection in time.
    #[error("MQTT broker {address} did not acknowledge the connection within {CONNECT_TIMEOUT:?}")]
    ConnectTimeout { address: String },

    /// The client-side request channel closed before the publish was queued.
    #[error("failed to queue MQTT publish: {0}")]
    Publish(#[from] rumqttc::ClientError),
}

/// Publishes the firmware download URL to the update topic.
///
/// The connection is established up front so an unreachable broker aborts
/// startup before any serving begins. The publish itself is fire-and-forget
/// (QoS 0): no delivery confirmation is awaited; the message is handed to
/// the connection and the event loop flushes it in the background.
#[derive(Debug)]
pub struct UpdateAnnouncer {
    client: AsyncClient,
}

impl UpdateAnnouncer {
    /// Connects to the broker at `address` (`host[:port]`) and waits for its
    /// acknowledgment.
    ///
    /// # Errors
    /// Returns [`AnnounceError::Connect`] when the broker is unreachable and
    /// [`AnnounceError::ConnectTimeout`] when it never acknowledges.
    pub async fn connect(address: &str) -> Result<Self, AnnounceError> {
        let (host, port) = split_host_port(address);
        let options = MqttOptions::new(env!("CARGO_PKG_NAME"), host, port);
        let (client, mut event_loop) = AsyncClient::new(options, CLIENT_QUEUE_CAPACITY);

        // Drive the event loop by hand until the broker's CONNACK arrives.
        loop {
            let event = timeout(CONNECT_TIMEOUT, event_loop.poll())
                .await
                .map_err(|_| AnnounceError::ConnectTimeout { address: address.to_owned() })?
                .map_err(|source| AnnounceError::Connect { address: address.to_owned(), source })?;

            if let Event::Incoming(Incoming::ConnAck(ack)) = event {
                debug!(code = ?ack.code, "Broker acknowledged connection");
                break;
            }
        }
        info!(broker = address, "Connected to MQTT broker");

        // The event loop must keep running for queued publishes to reach the wire.
        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(event) => trace!(?event, "MQTT event"),
                    Err(err) => {
                        warn!(error = %err, "MQTT connection closed");
                        break;
                    }
                }
            }
        });

        Ok(Self { client })
    }

    /// Publishes `payload` to `topic` once.
    ///
    /// Fire-and-forget: a successful return means the message was queued on
    /// the connection, not that any subscriber received it.
    ///
    /// # Errors
    /// Returns [`AnnounceError::Publish`] when the connection is already gone.
    pub async fn publish(&self, topic: &str, payload: &str) -> Result<(), AnnounceError> {
        self.client.publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec()).await?;
        Ok(())
    }
}

/// Builds the URL announced to the device.
#[must_use]
pub fn download_url(address: &str, port: u16) -> String {
    format!("http://{address}:{port}{DOWNLOAD_PATH}")
}

/// Splits `host[:port]`, falling back to the standard broker port.
fn split_host_port(address: &str) -> (String, u16) {
    match address.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_owned(), port),
            Err(_) => (address.to_owned(), DEFAULT_BROKER_PORT),
        },
        None => (address.to_owned(), DEFAULT_BROKER_PORT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_embeds_address_port_and_route() {
        assert_eq!(download_url("10.0.0.5", 3333), "http://10.0.0.5:3333/firmware.bin");
    }

    #[test]
    fn broker_port_defaults_when_absent() {
        assert_eq!(split_host_port("broker.local"), ("broker.local".to_owned(), 1883));
    }

    #[test]
    fn explicit_broker_port_is_used() {
        assert_eq!(split_host_port("broker.local:1884"), ("broker.local".to_owned(), 1884));
    }

    #[test]
    fn non_numeric_suffix_is_part_of_the_host() {
        assert_eq!(split_host_port("broker:local"), ("broker:local".to_owned(), 1883));
    }
}
