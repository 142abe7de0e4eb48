//! Publisher interface and the dry-run implementation.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use upsbridge_core::error::Result;

use crate::assembler::OutboundMessage;

/// Destination for the messages of one polling round.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Deliver every message, in order. Returns once all are accepted.
    async fn publish(&self, messages: &[OutboundMessage]) -> Result<()>;
}

/// Prints messages to stdout instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunPublisher;

impl DryRunPublisher {
    pub fn new() -> Self {
        Self
    }

    /// Render messages as a JSON array with text payloads.
    pub fn render(messages: &[OutboundMessage]) -> Result<String> {
        #[derive(Serialize)]
        struct Printable<'a> {
            topic: &'a str,
            retain: bool,
            payload: std::borrow::Cow<'a, str>,
        }

        let printable: Vec<Printable<'_>> = messages
            .iter()
            .map(|m| Printable {
                topic: &m.topic,
                retain: m.retain,
                payload: m.payload_str(),
            })
            .collect();
        Ok(serde_json::to_string_pretty(&printable)?)
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn publish(&self, messages: &[OutboundMessage]) -> Result<()> {
        println!("{}", Self::render(messages)?);
        info!(count = messages.len(), "Dry run, messages printed");
        Ok(())
    }
}
