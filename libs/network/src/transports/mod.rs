//! Transport listeners
//!
//! A listener owns one inbound endpoint and one receive thread. The thread blocks on the
//! endpoint with an OS read timeout so it can observe the stop flag:
//!
//! ```text
//! loop:
//!   stop set?            → exit
//!   receiving disabled?  → sleep idle_delay
//!   read into scratch    → timeout: loop again
//!   stop set?            → exit (bytes read during shutdown are discarded)
//!   acquire slot, fill, stamp receipt time, dispatch, release
//!   sleep idle_delay
//! ```
//!
//! Outbound data goes the other way: the dispatcher encodes a payload and hands it to every
//! registered [`TransmitListener`].

pub mod serial;
pub mod udp;

pub use serial::{AssemblerEvent, SentenceAssembler, SerialListener};
pub use udp::UdpListener;

use crate::dispatcher::Dispatcher;
use crate::error::{Result, TransportError};
use crate::metrics::ListenerMetrics;
use crate::pool::MessageSlotPool;
use crate::status::TransportStatus;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{trace, warn};

/// Lifecycle of a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ListenerState {
    /// Constructed, nothing bound
    Idle,
    /// Local endpoint bound, receive thread not started
    LocalBound,
    /// Local endpoint bound and a destination configured
    RemoteConfigured,
    /// Receive thread running
    Active,
    /// Thread joined and endpoint released
    Closed,
}

impl ListenerState {
    pub fn is_active(&self) -> bool {
        matches!(self, ListenerState::Active)
    }
}

/// Outbound side of a listener, as seen by the dispatcher
pub trait TransmitListener: Send + Sync {
    fn name(&self) -> &str;

    /// Send one encoded payload; failures are reported, never raised
    fn transmit(&self, payload: &[u8]) -> TransportStatus;
}

/// Tuning for one listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerSettings {
    /// Frames preallocated in the receive pool
    pub pool_size: usize,
    /// Largest accepted datagram or sentence, in bytes
    pub max_frame_size: usize,
    /// OS read timeout; bounds how long `close` waits for the receive thread
    #[serde(with = "millis")]
    pub read_timeout: Duration,
    /// Pause after each received frame and while receiving is disabled
    #[serde(with = "millis")]
    pub idle_delay: Duration,
}

impl ListenerSettings {
    pub fn udp() -> Self {
        Self {
            pool_size: 32,
            max_frame_size: 1500,
            read_timeout: Duration::from_millis(100),
            idle_delay: Duration::from_millis(20),
        }
    }

    pub fn serial() -> Self {
        Self {
            pool_size: 10,
            max_frame_size: 128,
            read_timeout: Duration::from_millis(100),
            idle_delay: Duration::from_millis(20),
        }
    }

    /// Reject settings no listener can run with
    ///
    /// A zero read timeout is refused by the OS on sockets and makes serial reads return
    /// immediately, so the receive thread would never block.
    pub fn validate(&self) -> Result<()> {
        if self.max_frame_size == 0 {
            return Err(TransportError::configuration(
                "max frame size must be positive",
                Some("max_frame_size"),
            ));
        }
        if self.read_timeout.is_zero() {
            return Err(TransportError::configuration(
                "read timeout must be positive",
                Some("read_timeout"),
            ));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Flags shared between a listener's control surface and its receive thread
#[derive(Debug)]
pub(crate) struct ListenerFlags {
    receiving: AtomicBool,
    transmitting: AtomicBool,
    stop: AtomicBool,
}

impl ListenerFlags {
    pub(crate) fn new() -> Self {
        Self {
            receiving: AtomicBool::new(true),
            transmitting: AtomicBool::new(true),
            stop: AtomicBool::new(false),
        }
    }

    pub(crate) fn receiving(&self) -> bool {
        self.receiving.load(Ordering::Acquire)
    }

    pub(crate) fn set_receiving(&self, enabled: bool) {
        self.receiving.store(enabled, Ordering::Release);
    }

    pub(crate) fn transmitting(&self) -> bool {
        self.transmitting.load(Ordering::Acquire)
    }

    pub(crate) fn set_transmitting(&self, enabled: bool) {
        self.transmitting.store(enabled, Ordering::Release);
    }

    pub(crate) fn stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Clear a previous stop and enable both directions; only with no thread running
    pub(crate) fn rearm(&self) {
        self.stop.store(false, Ordering::Release);
        self.set_receiving(true);
        self.set_transmitting(true);
    }
}

/// Move one received unit through a pooled frame and the dispatcher
pub(crate) fn dispatch_received(
    pool: &mut MessageSlotPool,
    dispatcher: &Dispatcher,
    metrics: &ListenerMetrics,
    bytes: &[u8],
) {
    metrics.record_receive(bytes.len());

    let mut lease = pool.acquire();
    let frame = pool.frame_mut(&mut lease);
    match frame.fill(bytes) {
        Ok(()) => {
            frame.stamp_receipt(Utc::now());
            let outcome = dispatcher.dispatch(frame);
            trace!(?outcome, bytes = bytes.len(), "Frame dispatched");
        }
        Err(error) => {
            metrics.record_dropped();
            warn!(%error, bytes = bytes.len(), "Frame does not fit a pool slot, dropped");
        }
    }
    pool.release(lease);
}
