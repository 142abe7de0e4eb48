//! MQTT publisher using rumqttc.
//!
//! Connects once, queues every outbound message, drives the event loop until
//! the broker has acknowledged all of them, then disconnects.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, TlsConfiguration, Transport};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use upsbridge_core::config::mqtt;
use upsbridge_core::error::Result;
use upsbridge_core::{config_err, publish_err};

use crate::assembler::OutboundMessage;
use crate::publisher::Publisher;

/// MQTT QoS level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Qos {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl Default for Qos {
    fn default() -> Self {
        Self::AtLeastOnce
    }
}

impl TryFrom<u8> for Qos {
    type Error = String;

    fn try_from(level: u8) -> std::result::Result<Self, Self::Error> {
        match level {
            0 => Ok(Qos::AtMostOnce),
            1 => Ok(Qos::AtLeastOnce),
            2 => Ok(Qos::ExactlyOnce),
            other => Err(format!("invalid QoS level {} (expected 0, 1 or 2)", other)),
        }
    }
}

impl From<Qos> for rumqttc::QoS {
    fn from(qos: Qos) -> Self {
        match qos {
            Qos::AtMostOnce => rumqttc::QoS::AtMostOnce,
            Qos::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            Qos::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

/// Network transport to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MqttTransport {
    #[default]
    Tcp,
    Websockets,
}

impl FromStr for MqttTransport {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(MqttTransport::Tcp),
            "websockets" | "websocket" | "ws" => Ok(MqttTransport::Websockets),
            other => Err(format!("unknown transport {:?} (expected tcp or websockets)", other)),
        }
    }
}

/// PEM files for a TLS connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsFiles {
    /// CA certificate used to verify the broker
    pub ca_cert: PathBuf,
    /// Client certificate and key for mutual TLS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_auth: Option<(PathBuf, PathBuf)>,
}

/// MQTT broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker address.
    pub broker: String,

    /// Broker port.
    pub port: u16,

    /// Client ID (generated when absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// TLS material; plain connection when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsFiles>,

    #[serde(default)]
    pub transport: MqttTransport,

    #[serde(default)]
    pub qos: Qos,

    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u64,

    /// Deadline in seconds for connecting and collecting every acknowledgement.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_keep_alive() -> u64 {
    mqtt::DEFAULT_KEEP_ALIVE_SECS
}

fn default_timeout() -> u64 {
    mqtt::DEFAULT_TIMEOUT_SECS
}

impl MqttConfig {
    /// Create a new MQTT configuration.
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            port: mqtt::DEFAULT_PORT,
            client_id: None,
            username: None,
            password: None,
            tls: None,
            transport: MqttTransport::default(),
            qos: Qos::default(),
            keep_alive: default_keep_alive(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set authentication. The password may be absent.
    pub fn with_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }

    pub fn with_tls(mut self, tls: TlsFiles) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_transport(mut self, transport: MqttTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_qos(mut self, qos: Qos) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Get the full broker address.
    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.broker, self.port)
    }

    /// Check option combinations before any network activity.
    pub fn validate(&self) -> Result<()> {
        if self.password.is_some() && self.username.is_none() {
            return Err(config_err!("an MQTT password requires a username"));
        }
        if self.broker.is_empty() {
            return Err(config_err!("MQTT broker host is empty"));
        }
        if let Some(client_id) = &self.client_id {
            if client_id.trim().is_empty() || client_id.starts_with(' ') {
                return Err(config_err!("MQTT client ID must not be blank"));
            }
        }
        Ok(())
    }

    /// Client ID to connect with.
    pub fn effective_client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("{}_{}", mqtt::CLIENT_ID_PREFIX, uuid::Uuid::new_v4()))
    }

    /// Build rumqttc options, reading TLS files from disk.
    pub async fn to_options(&self) -> Result<MqttOptions> {
        self.validate()?;

        let host = match self.transport {
            MqttTransport::Tcp => self.broker.clone(),
            MqttTransport::Websockets => {
                let scheme = if self.tls.is_some() { "wss" } else { "ws" };
                format!("{}://{}:{}{}", scheme, self.broker, self.port, mqtt::WEBSOCKET_PATH)
            }
        };

        let mut opts = MqttOptions::new(self.effective_client_id(), host, self.port);
        opts.set_keep_alive(Duration::from_secs(self.keep_alive));
        opts.set_clean_session(true);

        if let Some(username) = &self.username {
            opts.set_credentials(username.clone(), self.password.clone().unwrap_or_default());
        }

        let tls = match &self.tls {
            Some(files) => Some(load_tls(files).await?),
            None => None,
        };

        let transport = match (self.transport, tls) {
            (MqttTransport::Tcp, None) => Transport::Tcp,
            (MqttTransport::Tcp, Some(tls)) => Transport::Tls(tls),
            (MqttTransport::Websockets, None) => Transport::Ws,
            (MqttTransport::Websockets, Some(tls)) => Transport::Wss(tls),
        };
        opts.set_transport(transport);

        Ok(opts)
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self::new(mqtt::DEFAULT_HOST)
    }
}

async fn load_tls(files: &TlsFiles) -> Result<TlsConfiguration> {
    let ca = read_pem(&files.ca_cert).await?;
    let client_auth = match &files.client_auth {
        Some((cert, key)) => Some((read_pem(cert).await?, read_pem(key).await?)),
        None => None,
    };
    Ok(TlsConfiguration::Simple {
        ca,
        alpn: None,
        client_auth,
    })
}

async fn read_pem(path: &PathBuf) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| config_err!("failed to read {}: {}", path.display(), e))
}

/// Publishes outbound messages to an MQTT broker.
pub struct MqttPublisher {
    config: MqttConfig,
}

impl MqttPublisher {
    pub fn new(config: MqttConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    async fn drive(
        &self,
        client: &AsyncClient,
        eventloop: &mut EventLoop,
        expected: usize,
    ) -> Result<()> {
        let mut pending = expected;
        let mut disconnecting = false;

        if pending == 0 {
            client
                .disconnect()
                .await
                .map_err(|e| publish_err!("disconnect failed: {}", e))?;
            disconnecting = true;
        }

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    debug!(code = ?ack.code, "Connected to broker");
                }
                Ok(Event::Incoming(Packet::PubAck(ack))) if self.config.qos == Qos::AtLeastOnce => {
                    debug!(pkid = ack.pkid, "Publish acknowledged");
                    pending = pending.saturating_sub(1);
                }
                Ok(Event::Incoming(Packet::PubComp(comp))) if self.config.qos == Qos::ExactlyOnce => {
                    debug!(pkid = comp.pkid, "Publish completed");
                    pending = pending.saturating_sub(1);
                }
                Ok(Event::Outgoing(Outgoing::Publish(_))) if self.config.qos == Qos::AtMostOnce => {
                    pending = pending.saturating_sub(1);
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => return Ok(()),
                Ok(_) => {}
                Err(e) if disconnecting => {
                    debug!(error = %e, "Connection closed after disconnect");
                    return Ok(());
                }
                Err(e) => {
                    return Err(publish_err!("{}: {}", self.config.broker_addr(), e));
                }
            }

            if pending == 0 && !disconnecting {
                client
                    .disconnect()
                    .await
                    .map_err(|e| publish_err!("disconnect failed: {}", e))?;
                disconnecting = true;
            }
        }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    fn name(&self) -> &str {
        "mqtt"
    }

    async fn publish(&self, messages: &[OutboundMessage]) -> Result<()> {
        let opts = self.config.to_options().await?;

        // Room for every publish plus the disconnect so queuing never blocks
        // before the event loop is polled.
        let (client, mut eventloop) = AsyncClient::new(opts, messages.len() + 1);

        for message in messages {
            client
                .publish(
                    message.topic.clone(),
                    self.config.qos.into(),
                    message.retain,
                    message.payload.clone(),
                )
                .await
                .map_err(|e| publish_err!("failed to queue {}: {}", message.topic, e))?;
        }

        let deadline = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(deadline, self.drive(&client, &mut eventloop, messages.len())).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(broker = %self.config.broker_addr(), "Publish deadline elapsed");
                return Err(publish_err!(
                    "{}: not acknowledged within {}s",
                    self.config.broker_addr(),
                    self.config.timeout_secs
                ));
            }
        }

        info!(
            broker = %self.config.broker_addr(),
            count = messages.len(),
            "Published messages"
        );
        Ok(())
    }
}
