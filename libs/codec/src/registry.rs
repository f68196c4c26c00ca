//! Codec contract and the id → codec registry
//!
//! Every received frame is keyed by a `u32` id. The registry maps ids to codecs and falls
//! back to [`DefaultCodec`] for anything unmapped, so [`CodecRegistry::resolve`] is total:
//! callers never handle a "no codec" case.
//!
//! Binary message types and NMEA formatters share one table; registered ids never collide
//! (see [`nav_types::SentenceId`]). A binary header can still carry any id, so receive
//! paths use [`CodecRegistry::lookup`], which also checks the frame's wire format.

use crate::binary::{
    BinaryCodec, ComputedPositionLayout, DepthSoundingLayout, HeartbeatLayout,
    WaterReferencedMotionLayout,
};
use crate::buffers::RawBuffer;
use crate::default_codec::DefaultCodec;
use crate::error::ProtocolResult;
use crate::frame::{ReceivedFrame, WireFormat};
use crate::nmea::{
    self, DptLayout, GgaLayout, HdtLayout, RmcLayout, SentenceCodec, VhwLayout, VtgLayout,
};
use crate::wire;
use nav_types::{NavFields, NavUpdate};
use std::collections::HashMap;
use std::fmt;

/// Accepted size of a message
///
/// Binary codecs count bytes on the wire (header included); sentence codecs count the
/// comma-separated fields after the address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeConstraint {
    Fixed(usize),
    Fields { min: usize, max: usize },
    Variable,
}

impl SizeConstraint {
    pub fn accepts(&self, size: usize) -> bool {
        match *self {
            SizeConstraint::Fixed(expected) => size == expected,
            SizeConstraint::Fields { min, max } => size >= min && size <= max,
            SizeConstraint::Variable => true,
        }
    }

    /// Smallest acceptable size
    pub fn minimum(&self) -> usize {
        match *self {
            SizeConstraint::Fixed(expected) => expected,
            SizeConstraint::Fields { min, .. } => min,
            SizeConstraint::Variable => 0,
        }
    }
}

/// Encode/decode contract for one message type
///
/// Codecs are shared between receive threads and must be re-entrant; any per-codec
/// state (sequence counters) lives behind atomics.
pub trait MessageCodec: Send + Sync {
    fn message_id(&self) -> u32;

    fn name(&self) -> &'static str;

    fn size_constraint(&self) -> SizeConstraint;

    /// Whether frames framed as `format` belong to this codec
    fn accepts_format(&self, format: WireFormat) -> bool;

    /// Decode `frame`, writing decoded text and notes into it
    ///
    /// Never fails: malformed input becomes a diagnostic record in the frame and an
    /// empty update.
    fn decode(&self, frame: &mut ReceivedFrame) -> NavUpdate;

    /// Encode `fields` into `out`, replacing its contents; returns the payload length
    fn encode(&self, fields: &NavFields, out: &mut RawBuffer) -> ProtocolResult<usize>;
}

/// Table of codecs keyed by message id
pub struct CodecRegistry {
    codecs: HashMap<u32, Box<dyn MessageCodec>>,
    fallback: DefaultCodec,
}

impl CodecRegistry {
    /// Registry with no codecs; every id resolves to the default codec
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
            fallback: DefaultCodec::new(),
        }
    }

    /// Registry holding every binary and sentence codec this crate provides
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(BinaryCodec::new(ComputedPositionLayout));
        registry.register(BinaryCodec::new(WaterReferencedMotionLayout::default()));
        registry.register(BinaryCodec::new(DepthSoundingLayout));
        registry.register(BinaryCodec::new(HeartbeatLayout::default()));

        registry.register(SentenceCodec::new(GgaLayout));
        registry.register(SentenceCodec::new(RmcLayout));
        registry.register(SentenceCodec::new(VtgLayout));
        registry.register(SentenceCodec::new(HdtLayout));
        registry.register(SentenceCodec::new(VhwLayout));
        registry.register(SentenceCodec::new(DptLayout));
        registry
    }

    /// Add a codec, returning any codec previously registered under the same id
    pub fn register<C: MessageCodec + 'static>(&mut self, codec: C) -> Option<Box<dyn MessageCodec>> {
        self.codecs.insert(codec.message_id(), Box::new(codec))
    }

    /// Codec for `id`, falling back to the default codec
    pub fn resolve(&self, id: u32) -> &dyn MessageCodec {
        match self.codecs.get(&id) {
            Some(codec) => codec.as_ref(),
            None => &self.fallback,
        }
    }

    /// Codec that handles frames with no registered codec
    pub fn fallback(&self) -> &dyn MessageCodec {
        &self.fallback
    }

    /// Registered codec for `id`, without the fallback
    pub fn get(&self, id: u32) -> Option<&dyn MessageCodec> {
        self.codecs.get(&id).map(|codec| codec.as_ref())
    }

    /// Registered codec for `id` that also handles `format`
    ///
    /// A binary type id can collide with a packed sentence formatter; such a frame has no
    /// codec of its own and belongs to the default codec.
    pub fn lookup(&self, format: WireFormat, id: u32) -> Option<&dyn MessageCodec> {
        self.get(id).filter(|codec| codec.accepts_format(format))
    }

    pub fn contains(&self, id: u32) -> bool {
        self.codecs.contains_key(&id)
    }

    /// Registered ids in ascending order
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.codecs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Establish the id of a filled frame from its framing
    ///
    /// Binary frames are identified by their header; sentences by their formatter, after
    /// the checksum has been verified.
    pub fn identify(&self, frame: &mut ReceivedFrame) -> ProtocolResult<u32> {
        match frame.format() {
            WireFormat::Binary => wire::identify(frame),
            WireFormat::Nmea => nmea::identify(frame),
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<(u32, &'static str)> = self
            .ids()
            .into_iter()
            .filter_map(|id| self.get(id).map(|codec| (id, codec.name())))
            .collect();
        f.debug_struct("CodecRegistry").field("codecs", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_types::{BinaryMessageType, SentenceId};

    #[test]
    fn test_size_constraint() {
        assert!(SizeConstraint::Fixed(56).accepts(56));
        assert!(!SizeConstraint::Fixed(56).accepts(55));
        assert!(SizeConstraint::Fields { min: 2, max: 3 }.accepts(3));
        assert!(!SizeConstraint::Fields { min: 2, max: 3 }.accepts(4));
        assert!(SizeConstraint::Variable.accepts(0));
        assert_eq!(SizeConstraint::Fields { min: 8, max: 9 }.minimum(), 8);
    }

    #[test]
    fn test_standard_registry_holds_both_id_spaces() {
        let registry = CodecRegistry::standard();
        assert_eq!(registry.len(), 10);
        for ty in BinaryMessageType::ALL {
            assert_eq!(registry.resolve(ty.id()).name(), ty.name());
        }
        for id in [SentenceId::GGA, SentenceId::RMC, SentenceId::VTG] {
            assert!(registry.contains(id.id()));
        }
        assert_eq!(registry.resolve(SentenceId::DPT.id()).name(), "DPT");
    }

    #[test]
    fn test_resolve_is_total() {
        let registry = CodecRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(1).is_none());
        assert_eq!(registry.resolve(1).name(), "Default");
        assert_eq!(registry.resolve(u32::MAX).name(), "Default");
    }

    #[test]
    fn test_register_replaces_existing_codec() {
        let mut registry = CodecRegistry::new();
        assert!(registry.register(BinaryCodec::new(DepthSoundingLayout)).is_none());
        let previous = registry.register(BinaryCodec::new(DepthSoundingLayout));
        assert_eq!(previous.map(|codec| codec.name()), Some("DepthSounding"));
        assert_eq!(registry.ids(), vec![3]);
    }

    #[test]
    fn test_lookup_respects_wire_format() {
        let registry = CodecRegistry::standard();
        let gga = SentenceId::GGA.id();
        assert_eq!(registry.lookup(WireFormat::Nmea, gga).map(|c| c.name()), Some("GGA"));
        assert!(registry.lookup(WireFormat::Binary, gga).is_none());

        let depth = BinaryMessageType::DepthSounding.id();
        assert!(registry.lookup(WireFormat::Binary, depth).is_some());
        assert!(registry.lookup(WireFormat::Nmea, depth).is_none());
    }
}
