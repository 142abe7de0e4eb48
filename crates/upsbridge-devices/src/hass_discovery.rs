//! Home Assistant MQTT Discovery descriptors for UPS status fields.
//!
//! Each known field gets a retained config message so Home Assistant creates
//! a sensor entity for it without manual setup.
//!
//! ## Example
//!
//! ```json
//! // Topic: homeassistant/sensor/UPS-linev/config
//! {
//!   "device_class": "voltage",
//!   "name": "UPS line voltage",
//!   "state_topic": "ups/status",
//!   "unit_of_measurement": "V",
//!   "value_template": "{{ value_json.LINEV.value }}"
//! }
//! ```

use serde::{Deserialize, Serialize};
use upsbridge_core::config::hass;
use upsbridge_core::{FieldValue, Report};

/// Where and how discovery messages are published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Topic prefix Home Assistant listens on
    pub discovery_prefix: String,
    /// Node identifier used in config topics
    pub node_id: String,
    /// Friendly name prepended to every sensor name
    pub node_name: String,
    /// Topic carrying the JSON report
    pub state_topic: String,
}

impl DiscoveryConfig {
    pub fn new(state_topic: impl Into<String>) -> Self {
        Self {
            discovery_prefix: hass::DEFAULT_DISCOVERY_PREFIX.to_string(),
            node_id: hass::DEFAULT_NODE_ID.to_string(),
            node_name: hass::DEFAULT_NODE_NAME.to_string(),
            state_topic: state_topic.into(),
        }
    }

    pub fn with_discovery_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.discovery_prefix = prefix.into();
        self
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = node_id.into();
        self
    }

    pub fn with_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = node_name.into();
        self
    }
}

/// Static description of one known sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorTemplate {
    /// Field name as sent by the daemon
    pub field: &'static str,
    pub device_class: Option<&'static str>,
    /// Appended to the node name
    pub name_suffix: &'static str,
    pub unit: Option<&'static str>,
}

const fn sensor(
    field: &'static str,
    device_class: Option<&'static str>,
    name_suffix: &'static str,
    unit: Option<&'static str>,
) -> SensorTemplate {
    SensorTemplate {
        field,
        device_class,
        name_suffix,
        unit,
    }
}

/// Every field that gets a discovery descriptor.
pub const SENSOR_REGISTRY: &[SensorTemplate] = &[
    sensor("STATUS", Some("enum"), "status", None),
    sensor("LINEV", Some("voltage"), "line voltage", Some("V")),
    sensor("LOADPCT", None, "load percentage", Some("%")),
    sensor("BCHARGE", Some("battery"), "battery charge", Some("%")),
    sensor("TIMELEFT", Some("duration"), "time left", Some("min")),
    sensor("MBATTCHG", None, "shutdown at battery percentage", Some("%")),
    sensor("MINTIMEL", Some("duration"), "shutdown at remaining time", Some("min")),
    sensor("SENSE", Some("enum"), "sensitivity", None),
    sensor("LOTRANS", Some("voltage"), "low voltage threshold", Some("V")),
    sensor("HITRANS", Some("voltage"), "high voltage threshold", Some("V")),
    sensor("BATTV", Some("voltage"), "battery voltage", Some("V")),
    sensor("LASTXFER", None, "last transfer reason", None),
    sensor("NUMXFERS", None, "number of transfers", None),
    sensor("XONBATT", Some("timestamp"), "last transfer to battery", None),
    sensor("TONBATT", Some("duration"), "last duration on battery", Some("s")),
    sensor("CUMONBATT", Some("duration"), "total duration on battery", Some("s")),
    sensor("XOFFBATT", Some("timestamp"), "last transfer to mains", None),
    sensor("SELFTEST", Some("enum"), "selftest running", None),
    sensor("SERIALNO", None, "serial number", None),
    sensor("NOMINV", Some("voltage"), "nominal voltage", Some("V")),
    sensor("NOMBATTV", Some("voltage"), "nominal battery voltage", Some("V")),
    sensor("NOMPOWER", Some("power"), "nominal power", Some("W")),
    sensor(
        "CURRPWR_CALC",
        Some("power"),
        "current power consumption load (calculated)",
        Some("W"),
    ),
];

/// Case-insensitive registry lookup.
pub fn lookup(field: &str) -> Option<&'static SensorTemplate> {
    SENSOR_REGISTRY
        .iter()
        .find(|t| t.field.eq_ignore_ascii_case(field))
}

/// Discovery config message for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDescriptor {
    /// Topic the descriptor is published on (not part of the payload)
    #[serde(skip)]
    pub config_topic: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,

    /// Friendly name
    pub name: String,

    pub state_topic: String,

    #[serde(rename = "unit_of_measurement")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Jinja2 template evaluated by Home Assistant against the state payload
    pub value_template: String,
}

impl DiscoveryDescriptor {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Build the descriptor for `field`, or `None` if it is not a known sensor.
pub fn describe(
    field: &str,
    value: &FieldValue,
    config: &DiscoveryConfig,
) -> Option<DiscoveryDescriptor> {
    let template = lookup(field)?;

    Some(DiscoveryDescriptor {
        config_topic: config_topic(config, field),
        device_class: template.device_class.map(str::to_string),
        name: format!("{} {}", config.node_name, template.name_suffix),
        state_topic: config.state_topic.clone(),
        unit: template.unit.map(str::to_string),
        value_template: value_template(field, value),
    })
}

/// Descriptors for every known field of `report`, in report order.
pub fn describe_report(report: &Report, config: &DiscoveryConfig) -> Vec<DiscoveryDescriptor> {
    report
        .iter()
        .filter_map(|(field, value)| describe(field, value, config))
        .collect()
}

/// `{prefix}/sensor/{node_id}-{field}/config` with the field lowercased.
pub fn config_topic(config: &DiscoveryConfig, field: &str) -> String {
    format!(
        "{}/sensor/{}-{}/config",
        config.discovery_prefix,
        config.node_id,
        field.to_lowercase()
    )
}

fn value_template(field: &str, value: &FieldValue) -> String {
    if value.is_measurement() {
        format!("{{{{ value_json.{}.value }}}}", field)
    } else {
        format!("{{{{ value_json.{} }}}}", field)
    }
}
