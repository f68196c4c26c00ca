//! Fallback codec for ids with no registered codec

use crate::buffers::RawBuffer;
use crate::diagnostics;
use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::{ReceivedFrame, WireFormat};
use crate::registry::{MessageCodec, SizeConstraint};
use nav_types::{NavFields, NavUpdate};

/// Reports unknown frames as a hex dump and never produces field updates
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCodec;

impl DefaultCodec {
    pub const fn new() -> Self {
        Self
    }
}

impl MessageCodec for DefaultCodec {
    fn message_id(&self) -> u32 {
        0
    }

    fn name(&self) -> &'static str {
        "Default"
    }

    fn size_constraint(&self) -> SizeConstraint {
        SizeConstraint::Variable
    }

    fn accepts_format(&self, _format: WireFormat) -> bool {
        true
    }

    fn decode(&self, frame: &mut ReceivedFrame) -> NavUpdate {
        let id = frame.message_id();
        let len = frame.bytes().len();
        frame.add_note(format_args!(
            "unrecognized message type {id:#010x} ({len} bytes)"
        ));
        let (bytes, text, _) = frame.decode_parts();
        diagnostics::write_hex_dump(text, bytes);
        NavUpdate::empty()
    }

    fn encode(&self, _fields: &NavFields, out: &mut RawBuffer) -> ProtocolResult<usize> {
        out.clear();
        Err(ProtocolError::EncodeUnsupported {
            message_id: 0,
            reason: "no codec registered for the selected message".to_string(),
        })
    }
}
