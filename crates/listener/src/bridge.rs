//! MQTT driver for the event bridge.

use std::sync::Arc;
use std::time::Duration;

use responder::{BrokerError, ConnectionConfig, OccupancyQuery, ReplyDelivery};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Publish, QoS, Transport};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::handler::{MessageHandler, Outcome};
use crate::session::{Session, Step};

/// Host of the hosted pub/sub broker.
pub const BROKER_HOST: &str = "mqtt.beebotte.com";

/// MQTT over TLS port.
pub const BROKER_TLS_PORT: u16 = 8883;

/// Broker username prefix; the channel token follows it.
const TOKEN_USERNAME_PREFIX: &str = "token:";

/// Capacity of the client's outgoing request queue.
const REQUEST_QUEUE_CAPACITY: usize = 10;

/// How long a clean shutdown waits for the DISCONNECT to be written.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Where and how to reach the broker.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// Broker host name.
    pub host: String,
    /// Broker TLS port.
    pub port: u16,
    /// PEM bundle to trust instead of the platform roots.
    pub ca_certificate: Option<Vec<u8>>,
    /// MQTT keep-alive interval.
    pub keep_alive: Duration,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: BROKER_HOST.to_owned(),
            port: BROKER_TLS_PORT,
            ca_certificate: None,
            keep_alive: Duration::from_secs(60),
        }
    }
}

impl BrokerSettings {
    /// Trusts only the given PEM bundle for the broker's certificate.
    pub fn with_ca_certificate(mut self, pem: Vec<u8>) -> Self {
        self.ca_certificate = Some(pem);
        self
    }
}

/// Owns the broker connection and turns every status request into a reply.
pub struct EventBridge {
    config: ConnectionConfig,
    settings: BrokerSettings,
    handler: MessageHandler,
}

impl EventBridge {
    /// Wires the bridge to its configuration and ports.
    pub fn new(
        config: ConnectionConfig,
        settings: BrokerSettings,
        query: Arc<dyn OccupancyQuery>,
        delivery: Arc<dyn ReplyDelivery>,
    ) -> Self {
        let handler = MessageHandler::new(query, delivery, config.status_endpoint().clone());
        Self {
            config,
            settings,
            handler,
        }
    }

    /// MQTT options: TLS transport, token-derived username, empty password.
    pub fn mqtt_options(&self) -> MqttOptions {
        let client_id = format!("bou-{}", &Uuid::new_v4().simple().to_string()[..12]);
        let mut options = MqttOptions::new(client_id, &self.settings.host, self.settings.port);
        options.set_keep_alive(self.settings.keep_alive);
        options.set_clean_session(true);
        options.set_credentials(
            format!("{TOKEN_USERNAME_PREFIX}{}", self.config.broker_token().expose()),
            "",
        );

        let transport = match &self.settings.ca_certificate {
            Some(pem) => Transport::tls(pem.clone(), None, None),
            None => Transport::tls_with_default_config(),
        };
        options.set_transport(transport);
        options
    }

    /// Connects, subscribes and serves requests until `shutdown` fires or the
    /// session fails.
    ///
    /// In-flight requests are aborted on return and the client is dropped.
    ///
    /// # Errors
    ///
    /// Returns the [`BrokerError`] that moved the session to `Failed`. A
    /// shutdown request returns `Ok(())`.
    #[instrument(
        name = "event_bridge",
        skip_all,
        fields(
            host = %self.settings.host,
            port = self.settings.port,
            topic = %self.config.subscription_topic(),
        )
    )]
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), BrokerError> {
        let topic = self.config.subscription_topic();
        let mut session = Session::new(topic.clone());
        let (client, mut eventloop) = AsyncClient::new(self.mqtt_options(), REQUEST_QUEUE_CAPACITY);
        let mut in_flight = JoinSet::new();

        session.start();
        info!("connecting to broker");

        let result = loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!(in_flight = in_flight.len(), "shutdown requested");
                    break Ok(());
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "event handler task failed");
                    }
                }
                event = eventloop.poll() => {
                    let event = match event {
                        Ok(event) => event,
                        Err(e) => break Err(session.connection_failed(&e)),
                    };

                    match session.on_event(event) {
                        Ok(Step::Continue) => {}
                        Ok(Step::Subscribe) => {
                            info!("connected to broker");
                            if let Err(e) = client.subscribe(topic.as_str(), QoS::AtLeastOnce).await {
                                break Err(session.fail(BrokerError::Subscribe(e.to_string())));
                            }
                        }
                        Ok(Step::Listening(granted)) => match granted.segments() {
                            Some((channel, resource)) => {
                                info!(channel, resource, qos = ?granted.qos, "subscribed");
                            }
                            None => {
                                info!(topic = %granted.topic, qos = ?granted.qos, "subscribed");
                            }
                        },
                        Ok(Step::Dispatch(publish)) => {
                            dispatch(&mut in_flight, &self.handler, publish);
                        }
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        if !in_flight.is_empty() {
            debug!(count = in_flight.len(), "aborting in-flight requests");
        }
        in_flight.shutdown().await;

        match &result {
            Ok(()) if session.is_connected() => disconnect(&client, &mut eventloop).await,
            Ok(()) => {}
            Err(e) => error!(error = %e, state = ?session.state(), "event bridge failed"),
        }
        result
    }
}

/// Hands one inbound message to its own handler task.
fn dispatch(in_flight: &mut JoinSet<Outcome>, handler: &MessageHandler, publish: Publish) {
    let handler = handler.clone();
    in_flight.spawn(async move { handler.handle(&publish.topic, &publish.payload).await });
}

/// Sends DISCONNECT and drives the event loop until it has been written.
async fn disconnect(client: &AsyncClient, eventloop: &mut EventLoop) {
    if let Err(e) = client.try_disconnect() {
        debug!(error = %e, "could not queue disconnect");
        return;
    }

    let drain = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    if tokio::time::timeout(DISCONNECT_GRACE, drain).await.is_err() {
        warn!("disconnect was not flushed before the grace period ended");
    } else {
        info!("broker session closed");
    }
}
