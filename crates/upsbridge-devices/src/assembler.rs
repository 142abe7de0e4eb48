//! Turns a raw status report into the messages of one polling round.
//!
//! ```text
//! raw Report ──normalize──▶ Report ──┬──▶ data message (state topic)
//!                                    └──▶ discovery messages (optional)
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use upsbridge_core::error::Result;
use upsbridge_core::{normalize, NormalizeOptions, Report};

use crate::hass_discovery::{describe_report, DiscoveryConfig, DiscoveryDescriptor};
use crate::nis::NisClient;
use crate::publisher::Publisher;

/// A message ready to hand to a publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl OutboundMessage {
    /// Retained message, the only kind this bridge sends.
    pub fn retained(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: true,
        }
    }

    /// Payload as text; payloads built here are always JSON.
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Pipeline switches for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Topic the JSON report is published on
    pub state_topic: String,
    #[serde(default)]
    pub normalize: NormalizeOptions,
    /// Publish Home Assistant discovery descriptors when set
    #[serde(default)]
    pub discovery: Option<DiscoveryConfig>,
}

impl AssemblerConfig {
    pub fn new(state_topic: impl Into<String>) -> Self {
        Self {
            state_topic: state_topic.into(),
            normalize: NormalizeOptions::default(),
            discovery: None,
        }
    }

    pub fn with_normalize(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    /// Enable discovery. The config's state topic is replaced by ours.
    pub fn with_discovery(mut self, mut discovery: DiscoveryConfig) -> Self {
        discovery.state_topic = self.state_topic.clone();
        self.discovery = Some(discovery);
        self
    }
}

/// Outcome of assembling one report.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    /// Normalized report
    pub report: Report,
    /// Data message first, then discovery messages in report order
    pub messages: Vec<OutboundMessage>,
}

/// Builds the outbound messages for a report.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    config: AssemblerConfig,
}

impl ReportAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Normalize `raw` and build the message list.
    pub fn assemble(&self, raw: &Report) -> Result<Assembly> {
        let report = normalize(raw, &self.config.normalize);

        let mut messages = vec![OutboundMessage::retained(
            self.config.state_topic.clone(),
            report.to_json_pretty()?,
        )];

        if let Some(discovery) = &self.config.discovery {
            let descriptors = describe_report(&report, discovery);
            debug!(count = descriptors.len(), "Built discovery descriptors");
            for descriptor in &descriptors {
                messages.push(discovery_message(descriptor)?);
            }
        }

        info!(
            fields = report.len(),
            messages = messages.len(),
            "Assembled report"
        );
        Ok(Assembly { report, messages })
    }
}

/// One polling round: fetch, assemble, publish.
///
/// Nothing is published when the fetch fails.
pub async fn run_once(
    client: &NisClient,
    assembler: &ReportAssembler,
    publisher: &dyn Publisher,
) -> Result<Assembly> {
    let raw = client.fetch_status().await?;
    let assembly = assembler.assemble(&raw)?;
    debug!(publisher = publisher.name(), "Handing messages to publisher");
    publisher.publish(&assembly.messages).await?;
    Ok(assembly)
}

fn discovery_message(descriptor: &DiscoveryDescriptor) -> Result<OutboundMessage> {
    Ok(OutboundMessage::retained(
        descriptor.config_topic.clone(),
        descriptor.to_json_pretty()?,
    ))
}
