//! Message identifiers
//!
//! Every received frame is keyed by a `u32` message id. Binary UDP frames carry the id
//! in their header; NMEA 0183 sentences are keyed by their 3-letter formatter packed into
//! the low three bytes of a `u32` (`GGA` → `0x0047_4741`). The two spaces never collide
//! because packed formatters are always ≥ `0x0041_4141`.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// Binary message types carried over UDP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum BinaryMessageType {
    /// Position, true heading, course and speed over ground
    ComputedPosition = 1,
    /// Course and speed through water plus heading
    WaterReferencedMotion = 2,
    /// Depth below transducer
    DepthSounding = 3,
    /// Station liveness, no navigation fields
    Heartbeat = 4,
}

impl BinaryMessageType {
    pub const ALL: [BinaryMessageType; 4] = [
        BinaryMessageType::ComputedPosition,
        BinaryMessageType::WaterReferencedMotion,
        BinaryMessageType::DepthSounding,
        BinaryMessageType::Heartbeat,
    ];

    pub fn id(self) -> u32 {
        self.into()
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryMessageType::ComputedPosition => "ComputedPosition",
            BinaryMessageType::WaterReferencedMotion => "WaterReferencedMotion",
            BinaryMessageType::DepthSounding => "DepthSounding",
            BinaryMessageType::Heartbeat => "Heartbeat",
        }
    }
}

/// NMEA 0183 sentence formatter (`GGA`, `RMC`, ...) as a packed id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentenceId(u32);

impl SentenceId {
    pub const GGA: SentenceId = SentenceId::from_formatter(*b"GGA");
    pub const RMC: SentenceId = SentenceId::from_formatter(*b"RMC");
    pub const VTG: SentenceId = SentenceId::from_formatter(*b"VTG");
    pub const HDT: SentenceId = SentenceId::from_formatter(*b"HDT");
    pub const VHW: SentenceId = SentenceId::from_formatter(*b"VHW");
    pub const DPT: SentenceId = SentenceId::from_formatter(*b"DPT");

    pub const fn from_formatter(formatter: [u8; 3]) -> Self {
        Self(u32::from_be_bytes([0, formatter[0], formatter[1], formatter[2]]))
    }

    /// Parse a formatter from the start of `bytes`; must be three uppercase ASCII letters
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [a, b, c, ..] if [a, b, c].iter().all(|ch| ch.is_ascii_uppercase()) => {
                Some(Self::from_formatter([*a, *b, *c]))
            }
            _ => None,
        }
    }

    pub const fn id(self) -> u32 {
        self.0
    }

    /// Recover a sentence id from a frame id, if the id lies in the sentence space
    pub fn from_id(id: u32) -> Option<Self> {
        let [zero, a, b, c] = id.to_be_bytes();
        (zero == 0 && [a, b, c].iter().all(|ch| ch.is_ascii_uppercase())).then_some(Self(id))
    }

    pub fn formatter(self) -> [u8; 3] {
        let [_, a, b, c] = self.0.to_be_bytes();
        [a, b, c]
    }
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatter = self.formatter();
        write!(f, "{}", String::from_utf8_lossy(&formatter))
    }
}
