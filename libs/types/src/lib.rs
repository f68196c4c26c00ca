//! # Navigation Types
//!
//! Shared vocabulary for the telemetry pipeline:
//!
//! - **Field values**: [`NavFields`] (complete set used when encoding) and
//!   [`NavUpdate`] (sparse set produced by decoding one frame)
//! - **Message identifiers**: [`BinaryMessageType`] for UDP frames and
//!   [`SentenceId`] for NMEA 0183 sentences, both flattened to `u32` keys
//! - **Consumer contract**: [`ChannelSink`], implemented by display/telemetry layers
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → libs/codec → libs/network → services/receiver
//!     ↑            ↓             ↓
//! Field values  Wire rules   Listeners, pool,
//! Sink trait    Codecs       dispatcher
//! ```
//!
//! This crate carries no I/O and no wire knowledge; codecs and transports import it.

pub mod navigation;
pub mod protocol;
pub mod sink;

pub use navigation::{NavFields, NavUpdate, Position};
pub use protocol::{BinaryMessageType, SentenceId};
pub use sink::{fan_out, ChannelSink, RecordingSink, SinkEvent};
