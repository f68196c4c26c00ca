//! Protocol-level errors for frame and sentence processing
//!
//! Every variant carries enough context to be written into a frame's processing notes.
//! None of these escape a receive loop: the dispatcher turns them into diagnostics.

use crate::buffers::BufferError;
use thiserror::Error;

/// Decode/encode errors with diagnostic context
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// Frame is too small to contain the expected structure
    #[error("Message too small: need {need} bytes, got {got} (context: {context})")]
    MessageTooSmall {
        need: usize,
        got: usize,
        context: String,
    },

    /// Raw buffer could not hold the data
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// Sentence checksum does not match its body
    #[error("Checksum mismatch: sentence says {expected:#04x}, body computes {calculated:#04x}")]
    ChecksumMismatch { expected: u8, calculated: u8 },

    /// Sentence has no `*HH` checksum suffix
    #[error("Sentence has no checksum")]
    MissingChecksum,

    /// Sentence framing is broken (start delimiter, address field, encoding)
    #[error("Malformed sentence: {reason}")]
    MalformedSentence { reason: String },

    /// Sentence field count outside the formatter's accepted range
    #[error("{sentence} carries {got} fields, expected {min}..={max}")]
    FieldCount {
        sentence: String,
        got: usize,
        min: usize,
        max: usize,
    },

    /// A field could not be parsed
    #[error("Invalid {field} at field {index}: {value:?}")]
    InvalidField {
        field: &'static str,
        index: usize,
        value: String,
    },

    /// A decoded value lies outside its physical range
    #[error("{field} out of range: {value}")]
    ValueOutOfRange { field: &'static str, value: f64 },

    /// The codec has no wire representation to produce
    #[error("Message type {message_id:#x} cannot be encoded: {reason}")]
    EncodeUnsupported { message_id: u32, reason: String },
}

/// Result type for codec operations
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

impl ProtocolError {
    pub fn message_too_small(need: usize, got: usize, context: impl Into<String>) -> Self {
        Self::MessageTooSmall {
            need,
            got,
            context: context.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSentence {
            reason: reason.into(),
        }
    }

    pub fn invalid_field(field: &'static str, index: usize, value: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            index,
            value: value.into(),
        }
    }

    /// True for errors raised while framing a message, before any codec ran
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::MessageTooSmall { .. }
                | Self::ChecksumMismatch { .. }
                | Self::MissingChecksum
                | Self::MalformedSentence { .. }
        )
    }
}
