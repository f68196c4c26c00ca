//! Receiver Configuration
//!
//! Loaded from a TOML file with `NAV_`-prefixed environment overrides. Nested keys use a
//! double underscore: `NAV_UDP__LOCAL_PORT=10111`, `NAV_LOGGING__LEVEL=debug`.

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use nav_codec::EncodeMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Largest UDP payload over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Top-level configuration for the receiver service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub udp: UdpConfig,
    /// Absent when no serial device is attached
    pub serial: Option<SerialConfig>,
    pub outbound: OutboundConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpConfig {
    pub local_address: String,
    pub local_port: u16,
    pub remote_address: Option<String>,
    pub remote_port: Option<u16>,
    pub pool_size: usize,
    pub max_datagram_size: usize,
    pub read_timeout_ms: u64,
    pub idle_delay_ms: u64,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            local_address: "0.0.0.0".to_string(),
            local_port: 10110,
            remote_address: None,
            remote_port: None,
            pool_size: 32,
            max_datagram_size: 1500,
            read_timeout_ms: 100,
            idle_delay_ms: 20,
        }
    }
}

impl UdpConfig {
    /// Remote endpoint when both halves are configured
    pub fn remote(&self) -> Option<(&str, u16)> {
        match (&self.remote_address, self.remote_port) {
            (Some(address), Some(port)) => Some((address.as_str(), port)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub pool_size: usize,
    pub max_sentence_size: usize,
    pub read_timeout_ms: u64,
    pub idle_delay_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 4800,
            pool_size: 10,
            max_sentence_size: 128,
            read_timeout_ms: 100,
            idle_delay_ms: 20,
        }
    }
}

/// Periodic transmission; disabled while `message` is unset or `interval_ms` is zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Binary message name (`ComputedPosition`) or sentence formatter (`GGA`)
    pub message: Option<String>,
    pub source: EncodeMode,
    pub interval_ms: u64,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            message: None,
            source: EncodeMode::Manual,
            interval_ms: 0,
        }
    }
}

impl OutboundConfig {
    pub fn is_enabled(&self) -> bool {
        self.message.is_some() && self.interval_ms > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub level: String,
    pub json: bool,
    /// How often the service logs listener metrics; zero disables
    pub metrics_interval_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            metrics_interval_secs: 30,
        }
    }
}

impl ReceiverConfig {
    /// Load `path` (optional when `required` is false) plus `NAV_` environment overrides
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        Self::load_with_prefix(path, required, "NAV")
    }

    pub(crate) fn load_with_prefix(path: &Path, required: bool, prefix: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path.display()))?;

        let parsed: ReceiverConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        parsed.validate()?;

        info!("Loaded receiver configuration from {}", path.display());
        debug!(?parsed, "Effective configuration");
        Ok(parsed)
    }

    /// Parse a TOML document without consulting the environment
    pub fn from_toml(text: &str) -> Result<Self> {
        let parsed: ReceiverConfig = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .context("Failed to parse configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Render as TOML, e.g. to seed a configuration file
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Reject values the listeners cannot run with
    pub fn validate(&self) -> Result<()> {
        let udp = &self.udp;
        if udp.pool_size == 0 {
            bail!("udp.pool_size must be positive");
        }
        if udp.max_datagram_size == 0 {
            bail!("udp.max_datagram_size must be positive");
        }
        if udp.max_datagram_size > MAX_UDP_PAYLOAD {
            bail!(
                "udp.max_datagram_size {} exceeds the UDP limit of {MAX_UDP_PAYLOAD}",
                udp.max_datagram_size
            );
        }
        if udp.read_timeout_ms == 0 {
            bail!("udp.read_timeout_ms must be positive");
        }
        if udp.remote_address.is_some() != udp.remote_port.is_some() {
            bail!("udp.remote_address and udp.remote_port must be set together");
        }

        if let Some(serial) = &self.serial {
            if serial.port.is_empty() {
                bail!("serial.port must name a device");
            }
            if serial.baud_rate == 0 {
                bail!("serial.baud_rate must be positive");
            }
            if serial.pool_size == 0 {
                bail!("serial.pool_size must be positive");
            }
            if serial.max_sentence_size == 0 {
                bail!("serial.max_sentence_size must be positive");
            }
            if serial.read_timeout_ms == 0 {
                bail!("serial.read_timeout_ms must be positive");
            }
        }

        if let Some(message) = &self.outbound.message {
            if message.trim().is_empty() {
                bail!("outbound.message must not be empty");
            }
        }
        Ok(())
    }
}
