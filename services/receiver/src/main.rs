//! Navigation receiver service
//!
//! Opens the configured UDP listener (and serial listener, when one is configured), feeds
//! every decoded frame into a logging sink and optionally transmits a message on a fixed
//! interval. Runs until the process is terminated.

mod sink;

use anyhow::{bail, Context, Result};
use clap::Parser;
use nav_config::{init_logging, ReceiverConfig, SerialConfig, UdpConfig};
use nav_network::{Dispatcher, ListenerSettings, SerialListener, UdpListener};
use nav_types::{BinaryMessageType, SentenceId};
use sink::TracingSink;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "NAV_CONFIG", default_value = "config/receiver.toml")]
    config: PathBuf,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn udp_settings(config: &UdpConfig) -> ListenerSettings {
    ListenerSettings {
        pool_size: config.pool_size,
        max_frame_size: config.max_datagram_size,
        read_timeout: Duration::from_millis(config.read_timeout_ms),
        idle_delay: Duration::from_millis(config.idle_delay_ms),
    }
}

fn serial_settings(config: &SerialConfig) -> ListenerSettings {
    ListenerSettings {
        pool_size: config.pool_size,
        max_frame_size: config.max_sentence_size,
        read_timeout: Duration::from_millis(config.read_timeout_ms),
        idle_delay: Duration::from_millis(config.idle_delay_ms),
    }
}

/// Message id for a binary type name or a sentence formatter
fn resolve_message(name: &str) -> Option<u32> {
    let name = name.trim();
    BinaryMessageType::ALL
        .iter()
        .find(|ty| ty.name().eq_ignore_ascii_case(name))
        .map(|ty| ty.id())
        .or_else(|| {
            (name.len() == 3)
                .then(|| SentenceId::parse(name.to_ascii_uppercase().as_bytes()))
                .flatten()
                .map(SentenceId::id)
        })
}

fn log_metrics(
    udp: &UdpListener,
    serial: Option<&SerialListener>,
    dispatcher: &Dispatcher,
    tracing_sink: &TracingSink,
) {
    info!(udp = ?udp.metrics(), "UDP listener metrics");
    if let Some(serial) = serial {
        info!(serial = ?serial.metrics(), "Serial listener metrics");
    }
    let latest = tracing_sink.latest();
    info!(dispatch = ?dispatcher.stats(), ?latest, "Dispatch");
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = ReceiverConfig::load(&args.config, false)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&config.logging)?;
    info!("Starting navigation receiver");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let dispatcher = Arc::new(Dispatcher::with_standard_codecs());
    let tracing_sink = Arc::new(TracingSink::new());
    dispatcher.add_sink(tracing_sink.clone());
    info!("Codec registry: {:?}", dispatcher.registry());

    let mut udp = UdpListener::new("udp", udp_settings(&config.udp), dispatcher.clone())?;
    let status = udp.open(
        &config.udp.local_address,
        config.udp.local_port,
        config.udp.remote(),
    );
    if !udp.state().is_active() {
        bail!("UDP listener failed to start: {}", status.message);
    }
    if !status.is_ok() {
        warn!("UDP listener degraded: {}", status.message);
    }

    let serial = match &config.serial {
        Some(serial_config) => {
            let mut listener =
                SerialListener::new("serial", serial_settings(serial_config), dispatcher.clone())?;
            let status = listener.open(&serial_config.port, serial_config.baud_rate);
            if status.is_ok() {
                Some(listener)
            } else {
                warn!("Serial listener unavailable: {}", status.message);
                None
            }
        }
        None => None,
    };

    let transmit_interval = match &config.outbound.message {
        Some(name) if config.outbound.is_enabled() => {
            let id = resolve_message(name)
                .with_context(|| format!("Unknown outbound message {name:?}"))?;
            dispatcher.select_outbound(id)?;
            dispatcher.set_data_source(config.outbound.source);
            info!(
                "Transmitting {} every {} ms ({:?} source)",
                name, config.outbound.interval_ms, config.outbound.source
            );
            Some(Duration::from_millis(config.outbound.interval_ms))
        }
        _ => None,
    };
    let metrics_interval = (config.logging.metrics_interval_secs > 0)
        .then(|| Duration::from_secs(config.logging.metrics_interval_secs));

    if transmit_interval.is_none() && metrics_interval.is_none() {
        info!("Receiving; nothing scheduled on the main thread");
        loop {
            thread::park();
        }
    }

    let started = Instant::now();
    let mut next_transmit = transmit_interval.map(|interval| started + interval);
    let mut next_metrics = metrics_interval.map(|interval| started + interval);

    loop {
        let wake = [next_transmit, next_metrics]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(60));
        thread::sleep(wake.saturating_duration_since(Instant::now()));
        let now = Instant::now();

        if let (Some(due), Some(interval)) = (next_transmit, transmit_interval) {
            if now >= due {
                match dispatcher.transmit() {
                    Ok(statuses) => {
                        for status in statuses.iter().filter(|status| !status.is_ok()) {
                            warn!("Transmit failed: {}", status.message);
                        }
                    }
                    Err(e) => warn!("Transmit failed: {}", e),
                }
                next_transmit = Some(due + interval);
            }
        }

        if let (Some(due), Some(interval)) = (next_metrics, metrics_interval) {
            if now >= due {
                log_metrics(&udp, serial.as_ref(), &dispatcher, &tracing_sink);
                next_metrics = Some(due + interval);
            }
        }
    }
}
