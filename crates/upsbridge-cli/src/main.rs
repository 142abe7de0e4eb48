//! Command-line interface for the apcupsd to MQTT bridge.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::debug;

use upsbridge_core::config::{apcupsd, env_vars, hass, json_logging_requested, mqtt};
use upsbridge_core::NormalizeOptions;
use upsbridge_devices::{
    run_once, AssemblerConfig, DiscoveryConfig, DryRunPublisher, MqttConfig, MqttPublisher,
    MqttTransport, NisClient, Publisher, Qos, ReportAssembler, TlsFiles,
};

/// Polls data from apcupsd and publishes it to an MQTT server as JSON.
#[derive(Parser, Debug)]
#[command(name = "apcupsd2mqtt")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// apcupsd NIS host.
    #[arg(long, env = env_vars::APCUPSD_HOST, default_value = apcupsd::DEFAULT_HOST)]
    apcupsd_host: String,

    /// apcupsd NIS port.
    #[arg(long, env = env_vars::APCUPSD_PORT, default_value_t = apcupsd::DEFAULT_PORT)]
    apcupsd_port: u16,

    /// MQTT broker host.
    #[arg(long, env = env_vars::MQTT_HOST, default_value = mqtt::DEFAULT_HOST)]
    mqtt_host: String,

    /// MQTT broker port.
    #[arg(long, env = env_vars::MQTT_PORT, default_value_t = mqtt::DEFAULT_PORT)]
    mqtt_port: u16,

    /// MQTT client ID (generated when omitted).
    #[arg(long, env = env_vars::MQTT_CLIENT_ID)]
    mqtt_client_id: Option<String>,

    /// MQTT username.
    #[arg(long, env = env_vars::MQTT_USER)]
    mqtt_user: Option<String>,

    /// MQTT password.
    #[arg(long, env = env_vars::MQTT_PASSWORD, requires = "mqtt_user", hide_env_values = true)]
    mqtt_password: Option<String>,

    /// CA certificate (PEM); enables TLS.
    #[arg(long, env = env_vars::MQTT_TLS_CACERT)]
    mqtt_tls_cacert: Option<PathBuf>,

    /// Client certificate (PEM) for mutual TLS.
    #[arg(long, env = env_vars::MQTT_TLS_CERT, requires_all = ["mqtt_tls_key", "mqtt_tls_cacert"])]
    mqtt_tls_cert: Option<PathBuf>,

    /// Client private key (PEM) for mutual TLS.
    #[arg(long, env = env_vars::MQTT_TLS_KEY, requires = "mqtt_tls_cert")]
    mqtt_tls_key: Option<PathBuf>,

    /// MQTT transport: tcp or websockets.
    #[arg(long, env = env_vars::MQTT_TRANSPORT, default_value = "tcp")]
    mqtt_transport: MqttTransport,

    /// MQTT QoS level for every publish.
    #[arg(
        long,
        env = env_vars::MQTT_QOS,
        default_value_t = mqtt::DEFAULT_QOS,
        value_parser = clap::value_parser!(u8).range(0..=2)
    )]
    mqtt_qos: u8,

    /// Seconds to wait for the broker to acknowledge every message.
    #[arg(long, env = env_vars::MQTT_TIMEOUT, default_value_t = mqtt::DEFAULT_TIMEOUT_SECS)]
    mqtt_timeout: u64,

    /// Topic the JSON report is published on.
    #[arg(long, env = env_vars::MQTT_TOPIC)]
    mqtt_topic: String,

    /// Publish Home Assistant discovery configs.
    #[arg(long, env = env_vars::HASS_CONFIG, action = ArgAction::SetTrue)]
    hass_config: bool,

    /// Home Assistant discovery prefix.
    #[arg(long, env = env_vars::HASS_DISCOVERY_PREFIX, default_value = hass::DEFAULT_DISCOVERY_PREFIX)]
    hass_discovery_prefix: String,

    /// Node ID used in discovery topics.
    #[arg(long, env = env_vars::HASS_NODE_ID, default_value = hass::DEFAULT_NODE_ID)]
    hass_node_id: String,

    /// Name prefix of the discovered sensors.
    #[arg(long, env = env_vars::HASS_NODE_NAME, default_value = hass::DEFAULT_NODE_NAME)]
    hass_node_name: String,

    /// Add the calculated current power (NOMPOWER * LOADPCT / 100).
    #[arg(
        long,
        env = env_vars::CALCULATE_POWER,
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    calculate_power: bool,

    /// Rewrite timestamps as ISO-8601.
    #[arg(
        long,
        env = env_vars::DATE_TIME_ISO,
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    date_time_iso: bool,

    /// Print the messages instead of publishing them.
    #[arg(long, env = env_vars::DRY_RUN, action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Verbose output.
    #[arg(short, long, env = env_vars::VERBOSE, action = ArgAction::SetTrue)]
    verbose: bool,
}

impl Args {
    fn assembler_config(&self) -> AssemblerConfig {
        let normalize = NormalizeOptions::default()
            .with_compute_power(self.calculate_power)
            .with_iso_timestamps(self.date_time_iso);
        let config = AssemblerConfig::new(self.mqtt_topic.clone()).with_normalize(normalize);

        if self.hass_config {
            config.with_discovery(
                DiscoveryConfig::new(self.mqtt_topic.clone())
                    .with_discovery_prefix(self.hass_discovery_prefix.clone())
                    .with_node_id(self.hass_node_id.clone())
                    .with_node_name(self.hass_node_name.clone()),
            )
        } else {
            config
        }
    }

    fn mqtt_config(&self) -> Result<MqttConfig> {
        let qos = Qos::try_from(self.mqtt_qos).map_err(anyhow::Error::msg)?;
        let mut config = MqttConfig::new(self.mqtt_host.clone())
            .with_port(self.mqtt_port)
            .with_transport(self.mqtt_transport)
            .with_qos(qos)
            .with_timeout(self.mqtt_timeout);

        if let Some(client_id) = &self.mqtt_client_id {
            config = config.with_client_id(client_id.clone());
        }
        if let Some(user) = &self.mqtt_user {
            config = config.with_auth(user.clone(), self.mqtt_password.clone());
        }
        if let Some(ca_cert) = &self.mqtt_tls_cacert {
            let client_auth = self.mqtt_tls_cert.clone().zip(self.mqtt_tls_key.clone());
            config = config.with_tls(TlsFiles {
                ca_cert: ca_cert.clone(),
                client_auth,
            });
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args).await
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    if json_logging_requested() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(args: Args) -> Result<()> {
    let client = NisClient::new(args.apcupsd_host.clone(), args.apcupsd_port);
    let assembler = ReportAssembler::new(args.assembler_config());

    let publisher: Box<dyn Publisher> = if args.dry_run {
        Box::new(DryRunPublisher::new())
    } else {
        Box::new(MqttPublisher::new(args.mqtt_config()?))
    };
    debug!(publisher = publisher.name(), apcupsd = %client.addr(), "Starting polling round");

    run_once(&client, &assembler, publisher.as_ref())
        .await
        .with_context(|| format!("Polling {} failed", client.addr()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["apcupsd2mqtt", "--mqtt-topic", "ups/status"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.apcupsd_host, "localhost");
        assert_eq!(args.apcupsd_port, 3551);
        assert_eq!(args.mqtt_port, 1883);
        assert_eq!(args.mqtt_transport, MqttTransport::Tcp);
        assert!(args.calculate_power);
        assert!(args.date_time_iso);
        assert!(!args.hass_config);
        assert!(!args.dry_run);

        let config = args.assembler_config();
        assert_eq!(config.state_topic, "ups/status");
        assert!(config.discovery.is_none());
        assert_eq!(config.normalize, NormalizeOptions::default());
    }

    #[test]
    fn test_topic_required() {
        assert!(Args::try_parse_from(["apcupsd2mqtt"]).is_err());
    }

    #[test]
    fn test_boolean_switches() {
        let args = parse(&["--calculate-power", "false", "--date-time-iso=false"]);
        let config = args.assembler_config();
        assert!(!config.normalize.compute_power);
        assert!(!config.normalize.iso_timestamps);

        let args = parse(&["--calculate-power"]);
        assert!(args.calculate_power);
    }

    #[test]
    fn test_hass_discovery_config() {
        let args = parse(&["--hass-config", "--hass-node-id", "rack", "--hass-node-name", "Rack"]);
        let discovery = args.assembler_config().discovery.unwrap();
        assert_eq!(discovery.discovery_prefix, "homeassistant");
        assert_eq!(discovery.node_id, "rack");
        assert_eq!(discovery.node_name, "Rack");
        assert_eq!(discovery.state_topic, "ups/status");
    }

    #[test]
    fn test_mqtt_config() {
        let args = parse(&[
            "--mqtt-host",
            "broker.lan",
            "--mqtt-port",
            "8883",
            "--mqtt-user",
            "ups",
            "--mqtt-password",
            "secret",
            "--mqtt-tls-cacert",
            "/etc/ssl/ca.pem",
            "--mqtt-qos",
            "2",
            "--mqtt-transport",
            "websockets",
        ]);
        let config = args.mqtt_config().unwrap();
        assert_eq!(config.broker_addr(), "broker.lan:8883");
        assert_eq!(config.username.as_deref(), Some("ups"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.qos, Qos::ExactlyOnce);
        assert_eq!(config.transport, MqttTransport::Websockets);
        let tls = config.tls.unwrap();
        assert_eq!(tls.ca_cert, PathBuf::from("/etc/ssl/ca.pem"));
        assert!(tls.client_auth.is_none());
    }

    #[test]
    fn test_invalid_option_combinations() {
        let base = ["apcupsd2mqtt", "--mqtt-topic", "t"];

        let mut argv = base.to_vec();
        argv.extend(["--mqtt-password", "secret"]);
        assert!(Args::try_parse_from(argv).is_err());

        let mut argv = base.to_vec();
        argv.extend(["--mqtt-tls-cacert", "ca.pem", "--mqtt-tls-cert", "c.pem"]);
        assert!(Args::try_parse_from(argv).is_err());

        let mut argv = base.to_vec();
        argv.extend(["--mqtt-tls-cert", "c.pem", "--mqtt-tls-key", "k.pem"]);
        assert!(Args::try_parse_from(argv).is_err());

        let mut argv = base.to_vec();
        argv.extend(["--mqtt-qos", "3"]);
        assert!(Args::try_parse_from(argv).is_err());

        let mut argv = base.to_vec();
        argv.extend(["--mqtt-transport", "udp"]);
        assert!(Args::try_parse_from(argv).is_err());
    }
}
