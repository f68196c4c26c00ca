//! # Navigation Codec - Wire Rules for Telemetry Frames
//!
//! ## Purpose
//!
//! This crate is the "rules" layer of the receiver: it knows how every supported message
//! looks on the wire and nothing about sockets or threads.
//!
//! - **Buffers**: [`RawBuffer`], the fixed-capacity storage behind every receive slot
//! - **Frames**: [`ReceivedFrame`], one slot's raw bytes plus its decode results
//! - **Binary layouts**: big-endian fixed-offset frames with an 8-byte type/length header
//! - **NMEA 0183 sentences**: checksummed `$TTFFF,...*HH` text sentences
//! - **Registry**: [`CodecRegistry`], a total `u32` → [`MessageCodec`] lookup with a
//!   [`DefaultCodec`] arm for unknown ids
//! - **Field sources**: live, manual and random values for outbound encoding
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → libs/network
//!     ↑           ↓            ↓
//! NavFields   Identify,     Listeners feed frames,
//! NavUpdate   decode,       dispatcher routes updates
//!             encode        to sinks
//! ```
//!
//! ## Failure Model
//!
//! Decoding never fails outward. A short, malformed or out-of-range frame becomes a hex
//! dump in the frame's decoded text plus a processing note, and the codec returns an
//! empty [`NavUpdate`](nav_types::NavUpdate). Only encoding and identification return
//! [`ProtocolError`].

pub mod binary;
pub mod buffers;
pub mod default_codec;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod nmea;
pub mod registry;
pub mod source;
pub mod wire;

pub use binary::{BinaryCodec, BinaryLayout};
pub use buffers::{BufferError, RawBuffer};
pub use default_codec::DefaultCodec;
pub use diagnostics::hex_dump;
pub use error::{ProtocolError, ProtocolResult};
pub use frame::{ReceivedFrame, WireFormat};
pub use nmea::{Sentence, SentenceCodec, SentenceLayout};
pub use registry::{CodecRegistry, MessageCodec, SizeConstraint};
pub use source::{random_fields, EncodeMode, FieldSource};
pub use wire::{FrameHeader, HEADER_SIZE, MAX_DATAGRAM_SIZE};
