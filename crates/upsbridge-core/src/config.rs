//! Default values and environment variable names shared by all crates.

/// Status daemon (apcupsd NIS) defaults.
pub mod apcupsd {
    pub const DEFAULT_HOST: &str = "localhost";
    pub const DEFAULT_PORT: u16 = 3551;
    /// The only request this client issues.
    pub const STATUS_COMMAND: &str = "status";
}

/// MQTT broker defaults.
pub mod mqtt {
    pub const DEFAULT_HOST: &str = "localhost";
    pub const DEFAULT_PORT: u16 = 1883;
    pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 60;
    /// Deadline for connecting and getting every publish acknowledged.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_QOS: u8 = 1;
    pub const CLIENT_ID_PREFIX: &str = "apcupsd2mqtt";
    /// Path appended to the broker address for WebSocket transport.
    pub const WEBSOCKET_PATH: &str = "/mqtt";
}

/// Home Assistant discovery defaults.
pub mod hass {
    pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";
    pub const DEFAULT_NODE_ID: &str = "UPS";
    pub const DEFAULT_NODE_NAME: &str = "UPS";
}

/// Environment variable names.
pub mod env_vars {
    pub const APCUPSD_HOST: &str = "APCUPSD2MQTT_APCUPSD_HOST";
    pub const APCUPSD_PORT: &str = "APCUPSD2MQTT_APCUPSD_PORT";
    pub const MQTT_HOST: &str = "APCUPSD2MQTT_MQTT_HOST";
    pub const MQTT_PORT: &str = "APCUPSD2MQTT_MQTT_PORT";
    pub const MQTT_CLIENT_ID: &str = "APCUPSD2MQTT_MQTT_CLIENT_ID";
    pub const MQTT_USER: &str = "APCUPSD2MQTT_MQTT_USER";
    pub const MQTT_PASSWORD: &str = "APCUPSD2MQTT_MQTT_PASSWORD";
    pub const MQTT_TLS_CACERT: &str = "APCUPSD2MQTT_MQTT_TLS_CACERT";
    pub const MQTT_TLS_CERT: &str = "APCUPSD2MQTT_MQTT_TLS_CERT";
    pub const MQTT_TLS_KEY: &str = "APCUPSD2MQTT_MQTT_TLS_KEY";
    pub const MQTT_TRANSPORT: &str = "APCUPSD2MQTT_MQTT_TRANSPORT";
    pub const MQTT_QOS: &str = "APCUPSD2MQTT_MQTT_QOS";
    pub const MQTT_TIMEOUT: &str = "APCUPSD2MQTT_MQTT_TIMEOUT";
    pub const MQTT_TOPIC: &str = "APCUPSD2MQTT_MQTT_TOPIC";
    pub const HASS_DISCOVERY_PREFIX: &str = "APCUPSD2MQTT_HASS_DISCOVERY_PREFIX";
    pub const HASS_NODE_ID: &str = "APCUPSD2MQTT_HASS_NODE_ID";
    pub const HASS_NODE_NAME: &str = "APCUPSD2MQTT_HASS_NODE_NAME";
    pub const HASS_CONFIG: &str = "APCUPSD2MQTT_HASS_CONFIG";
    pub const CALCULATE_POWER: &str = "APCUPSD2MQTT_CALCULATE_POWER";
    pub const DATE_TIME_ISO: &str = "APCUPSD2MQTT_DATE_TIME_ISO";
    pub const DRY_RUN: &str = "APCUPSD2MQTT_DRY_RUN";
    pub const VERBOSE: &str = "APCUPSD2MQTT_VERBOSE";
    /// Emit JSON log lines instead of the compact human format.
    pub const LOG_JSON: &str = "APCUPSD2MQTT_LOG_JSON";
}

/// Whether JSON logging was requested through the environment.
pub fn json_logging_requested() -> bool {
    std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false)
}
