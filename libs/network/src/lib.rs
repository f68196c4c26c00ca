//! Navigation Network
//!
//! Receive and transmit plumbing for navigation telemetry:
//!
//! - [`UdpListener`]: binary frames, one per datagram, plus an outbound path to a
//!   configured remote endpoint
//! - [`SerialListener`]: NMEA 0183 sentences reassembled from a serial byte stream
//! - [`MessageSlotPool`]: preallocated receive frames, one pool per listener
//! - [`Dispatcher`]: identifies each frame, decodes it through the codec registry and
//!   forwards the decoded fields to every registered [`nav_types::ChannelSink`]
//!
//! ## Threading
//!
//! Each listener runs one OS thread that blocks on its endpoint with a read timeout.
//! The thread owns its pool outright; listeners share the dispatcher through an `Arc`.
//! Control calls (`open`, `close`, `set_*`) come from the owning thread and report
//! expected failures as [`TransportStatus`] values instead of errors.

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod status;
pub mod transports;

pub use dispatcher::{DispatchOutcome, DispatchStats, Dispatcher, RegistrationId};
pub use error::{Result, TransportError};
pub use metrics::{ListenerMetrics, MetricsSnapshot};
pub use pool::{FrameLease, MessageSlotPool, PoolStats};
pub use status::TransportStatus;
pub use transports::{
    ListenerSettings, ListenerState, SentenceAssembler, SerialListener, TransmitListener,
    UdpListener,
};
