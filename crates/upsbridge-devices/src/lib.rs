//! UPS status acquisition and publishing.
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `mqtt` | ✅ | MQTT publisher (rumqttc) |
//!
//! ## Architecture
//!
//! - **NisClient**: framed `status` exchange with apcupsd
//! - **hass_discovery**: Home Assistant sensor descriptors
//! - **ReportAssembler**: normalized report and outbound message list
//! - **Publisher**: MQTT or dry-run sink for the messages

pub mod assembler;
pub mod hass_discovery;
pub mod nis;
pub mod publisher;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use assembler::{run_once, AssemblerConfig, Assembly, OutboundMessage, ReportAssembler};
pub use hass_discovery::{describe, DiscoveryConfig, DiscoveryDescriptor, SENSOR_REGISTRY};
pub use nis::{fetch_status, NisClient};
pub use publisher::{DryRunPublisher, Publisher};

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttPublisher, MqttTransport, Qos, TlsFiles};
