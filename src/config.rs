// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller configuration.
//!
//! [`MqttConfig`] describes the broker connection and is built with
//! [`MqttConfig::builder`]. [`ControllerConfig`] adds the topic prefix and
//! loop timing, and can be loaded from `AQUACTL_*` environment variables:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `AQUACTL_BROKER` | `mqtt://broker.hivemq.com:1883` |
//! | `AQUACTL_USERNAME` / `AQUACTL_PASSWORD` | none |
//! | `AQUACTL_CLIENT_ID` | `aquactl-<uuid>` |
//! | `AQUACTL_KEEP_ALIVE_SECS` | `60` |
//! | `AQUACTL_TOPIC_PREFIX` | `aquaponics` |
//! | `AQUACTL_MONITOR_COMMANDS` | `false` |

use std::time::Duration;

use crate::controller::DEFAULT_LIVENESS_INTERVAL;
use crate::error::ConfigError;
use crate::protocol::{DEFAULT_TOPIC_PREFIX, Topics};

/// Public broker the node firmware connects to out of the box.
pub const DEFAULT_BROKER_HOST: &str = "broker.hivemq.com";

/// Standard MQTT port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// The node publishes status every 5 seconds.
pub const NODE_PUBLISH_INTERVAL: Duration = Duration::from_secs(5);

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    client_id: Option<String>,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BROKER_HOST.to_string(),
            port: DEFAULT_BROKER_PORT,
            credentials: None,
            client_id: None,
            keep_alive: Duration::from_secs(60),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl MqttConfig {
    /// Creates a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> MqttConfigBuilder {
        MqttConfigBuilder::default()
    }

    /// Broker host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Username and password, if configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_ref()
            .map(|(u, p)| (u.as_str(), p.as_str()))
    }

    /// Returns the configured client id or generates a unique one.
    ///
    /// Several controllers may watch the same node, so generated ids must
    /// never collide.
    #[must_use]
    pub fn client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("aquactl-{}", uuid::Uuid::new_v4().simple()))
    }

    /// MQTT keep-alive interval.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// How long to wait for the broker to acknowledge the connection.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }
}

/// Builder for [`MqttConfig`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use aquactl::config::MqttConfig;
///
/// let config = MqttConfig::builder()
///     .broker_url("mqtt://192.168.1.50:1884")
///     .unwrap()
///     .credentials("user", "password")
///     .keep_alive(Duration::from_secs(30))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.host(), "192.168.1.50");
/// assert_eq!(config.port(), 1884);
/// ```
#[derive(Debug, Default)]
pub struct MqttConfigBuilder {
    config: MqttConfig,
}

impl MqttConfigBuilder {
    /// Sets the broker host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets host and port from a `mqtt://host:port`, `tcp://host:port` or
    /// bare `host[:port]` address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the port is not a number.
    pub fn broker_url(mut self, url: &str) -> Result<Self, ConfigError> {
        let (host, port) = parse_broker_url(url)?;
        self.config.host = host;
        self.config.port = port;
        Ok(self)
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets a fixed client id.
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = Some(id.into());
        self
    }

    /// Sets the keep-alive interval (default: 60 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the host is empty, or if the keep-alive is
    /// shorter than one second without being zero (MQTT counts it in whole
    /// seconds; zero disables it).
    pub fn build(self) -> Result<MqttConfig, ConfigError> {
        if self.config.host.is_empty() {
            return Err(ConfigError::Empty("broker host"));
        }
        let keep_alive = self.config.keep_alive;
        if !keep_alive.is_zero() && keep_alive < Duration::from_secs(1) {
            return Err(ConfigError::InvalidValue {
                key: "keep_alive".to_string(),
                value: format!("{keep_alive:?}"),
            });
        }
        Ok(self.config)
    }
}

/// Everything a console controller needs to start.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Broker connection settings.
    pub mqtt: MqttConfig,
    /// Status and command topics.
    pub topics: Topics,
    /// Also subscribe to the command topic and report commands seen there.
    pub monitor_commands: bool,
    /// Interval between liveness ticks while waiting for the first status.
    pub liveness_interval: Duration,
    /// Age after which a snapshot is considered stale.
    pub stale_after: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            topics: Topics::default(),
            monitor_commands: false,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
            stale_after: NODE_PUBLISH_INTERVAL * 3,
        }
    }
}

impl ControllerConfig {
    /// Loads the configuration from `AQUACTL_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable holds an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, which maps a variable name to
    /// its value. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable holds an unparseable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut mqtt = MqttConfig::builder();
        if let Some(url) = get("AQUACTL_BROKER") {
            mqtt = mqtt.broker_url(&url)?;
        }
        if let (Some(user), Some(pass)) = (get("AQUACTL_USERNAME"), get("AQUACTL_PASSWORD")) {
            mqtt = mqtt.credentials(user, pass);
        }
        if let Some(id) = get("AQUACTL_CLIENT_ID") {
            mqtt = mqtt.client_id(id);
        }
        if let Some(secs) = get("AQUACTL_KEEP_ALIVE_SECS") {
            mqtt = mqtt.keep_alive(Duration::from_secs(parse_value(
                "AQUACTL_KEEP_ALIVE_SECS",
                &secs,
            )?));
        }

        let topics = get("AQUACTL_TOPIC_PREFIX")
            .map_or_else(|| Topics::new(DEFAULT_TOPIC_PREFIX), |p| Topics::new(&p));

        let monitor_commands = match get("AQUACTL_MONITOR_COMMANDS") {
            Some(v) => parse_flag("AQUACTL_MONITOR_COMMANDS", &v)?,
            None => false,
        };

        Ok(Self {
            mqtt: mqtt.build()?,
            topics,
            monitor_commands,
            ..Self::default()
        })
    }

    /// Topics the transport should subscribe to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics = vec![self.topics.status().to_string()];
        if self.monitor_commands {
            topics.push(self.topics.command().to_string());
        }
        topics
    }
}

/// Parses a broker URL into host and port.
fn parse_broker_url(url: &str) -> Result<(String, u16), ConfigError> {
    let address = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url)
        .trim_end_matches('/');

    let (host, port) = match address.rsplit_once(':') {
        Some((h, p)) => (h, parse_value("broker port", p)?),
        None => (address, DEFAULT_BROKER_PORT),
    };

    if host.is_empty() {
        return Err(ConfigError::Empty("broker host"));
    }
    Ok((host.to_string(), port))
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn parse_url_with_scheme_and_port() {
        assert_eq!(
            parse_broker_url("mqtt://192.168.1.50:1884").unwrap(),
            ("192.168.1.50".to_string(), 1884)
        );
        assert_eq!(
            parse_broker_url("tcp://broker.local:8883").unwrap(),
            ("broker.local".to_string(), 8883)
        );
    }

    #[test]
    fn parse_url_default_port() {
        assert_eq!(
            parse_broker_url("broker.hivemq.com").unwrap(),
            ("broker.hivemq.com".to_string(), 1883)
        );
    }

    #[test]
    fn parse_url_invalid_port() {
        assert!(matches!(
            parse_broker_url("mqtt://host:abc"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(
            parse_broker_url("mqtt://:1883"),
            Err(ConfigError::Empty("broker host"))
        );
    }

    #[test]
    fn builder_defaults() {
        let config = MqttConfig::builder().build().unwrap();
        assert_eq!(config.host(), DEFAULT_BROKER_HOST);
        assert_eq!(config.port(), 1883);
        assert_eq!(config.keep_alive(), Duration::from_secs(60));
        assert_eq!(config.connection_timeout(), Duration::from_secs(10));
        assert!(config.credentials().is_none());
    }

    #[test]
    fn builder_empty_host_fails() {
        assert_eq!(
            MqttConfig::builder().host("").build(),
            Err(ConfigError::Empty("broker host"))
        );
    }

    #[test]
    fn builder_rejects_sub_second_keep_alive() {
        assert_eq!(
            MqttConfig::builder()
                .keep_alive(Duration::from_millis(500))
                .build(),
            Err(ConfigError::InvalidValue {
                key: "keep_alive".to_string(),
                value: "500ms".to_string(),
            })
        );
    }

    #[test]
    fn builder_accepts_zero_and_whole_second_keep_alive() {
        let disabled = MqttConfig::builder()
            .keep_alive(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(disabled.keep_alive(), Duration::ZERO);

        let one = MqttConfig::builder()
            .keep_alive(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(one.keep_alive(), Duration::from_secs(1));
    }

    #[test]
    fn generated_client_ids_are_unique() {
        let config = MqttConfig::default();
        let a = config.client_id();
        let b = config.client_id();
        assert!(a.starts_with("aquactl-"));
        assert_ne!(a, b);
    }

    #[test]
    fn fixed_client_id_is_kept() {
        let config = MqttConfig::builder().client_id("controller").build().unwrap();
        assert_eq!(config.client_id(), "controller");
    }

    #[test]
    fn from_lookup_defaults() {
        let config = ControllerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.mqtt, MqttConfig::default());
        assert_eq!(config.topics, Topics::default());
        assert!(!config.monitor_commands);
        assert_eq!(config.subscriptions(), vec!["aquaponics/status".to_string()]);
    }

    #[test]
    fn from_lookup_overrides() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("AQUACTL_BROKER", "mqtt://10.0.0.2:1885"),
            ("AQUACTL_USERNAME", "grower"),
            ("AQUACTL_PASSWORD", "secret"),
            ("AQUACTL_KEEP_ALIVE_SECS", "15"),
            ("AQUACTL_TOPIC_PREFIX", "device"),
            ("AQUACTL_MONITOR_COMMANDS", "yes"),
        ]))
        .unwrap();

        assert_eq!(config.mqtt.host(), "10.0.0.2");
        assert_eq!(config.mqtt.port(), 1885);
        assert_eq!(config.mqtt.credentials(), Some(("grower", "secret")));
        assert_eq!(config.mqtt.keep_alive(), Duration::from_secs(15));
        assert_eq!(
            config.subscriptions(),
            vec!["device/status".to_string(), "device/cmd".to_string()]
        );
    }

    #[test]
    fn from_lookup_rejects_bad_values() {
        let err = ControllerConfig::from_lookup(lookup(&[("AQUACTL_KEEP_ALIVE_SECS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "AQUACTL_KEEP_ALIVE_SECS".to_string(),
                value: "soon".to_string(),
            }
        );

        assert!(
            ControllerConfig::from_lookup(lookup(&[("AQUACTL_MONITOR_COMMANDS", "maybe")]))
                .is_err()
        );
    }

    #[test]
    fn from_lookup_ignores_empty_values() {
        let config =
            ControllerConfig::from_lookup(lookup(&[("AQUACTL_BROKER", "  ")])).unwrap();
        assert_eq!(config.mqtt.host(), DEFAULT_BROKER_HOST);
    }
}
