//! # Receiver Configuration
//!
//! Loads [`ReceiverConfig`] (UDP and serial listener settings, periodic transmission and
//! logging) and installs the process-wide `tracing` subscriber.
//!
//! ```rust,no_run
//! use nav_config::{init_logging, ReceiverConfig};
//! use std::path::Path;
//!
//! let config = ReceiverConfig::load(Path::new("config/receiver.toml"), false)?;
//! init_logging(&config.logging)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod logging;
pub mod receiver_config;

pub use logging::{env_filter, init_logging};
pub use receiver_config::{
    LoggingConfig, OutboundConfig, ReceiverConfig, SerialConfig, UdpConfig, MAX_UDP_PAYLOAD,
};
