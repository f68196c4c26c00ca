//! Fixed-layout binary message codecs
//!
//! Each binary message type is described by a [`BinaryLayout`]: its type id, its total
//! wire length and how its fields map to and from fixed offsets. [`BinaryCodec`] wraps a
//! layout with the framing rules shared by all of them:
//!
//! - a frame shorter than the layout is dumped, never read
//! - a declared length that disagrees with the layout is noted but the frame is still
//!   decoded, since every field lies within the received bytes
//! - field readers are bounds checked, so nothing reads past the received bytes

mod computed_position;
mod depth_sounding;
mod heartbeat;
mod water_motion;

pub use computed_position::ComputedPositionLayout;
pub use depth_sounding::DepthSoundingLayout;
pub use heartbeat::HeartbeatLayout;
pub use water_motion::WaterReferencedMotionLayout;

use crate::buffers::RawBuffer;
use crate::diagnostics;
use crate::error::ProtocolResult;
use crate::frame::{ReceivedFrame, WireFormat};
use crate::registry::{MessageCodec, SizeConstraint};
use crate::wire::{FieldReader, FieldWriter, FrameHeader, HEADER_SIZE};
use nav_types::{BinaryMessageType, NavFields, NavUpdate};

/// Field layout of one binary message type
pub trait BinaryLayout: Send + Sync + 'static {
    const MESSAGE_TYPE: BinaryMessageType;

    /// Total frame length, header included
    const WIRE_LENGTH: usize;

    /// Extract fields from a frame at least `WIRE_LENGTH` bytes long
    fn read_fields(&self, reader: &FieldReader<'_>, text: &mut String) -> ProtocolResult<NavUpdate>;

    /// Write fields into a zeroed region of exactly `WIRE_LENGTH` bytes
    fn write_fields(&self, fields: &NavFields, writer: &mut FieldWriter<'_>) -> ProtocolResult<()>;
}

/// Payload length carried in the header of a layout's frames
pub const fn declared_length<L: BinaryLayout>() -> u32 {
    (L::WIRE_LENGTH - HEADER_SIZE) as u32
}

/// Codec for one binary layout
#[derive(Debug, Default)]
pub struct BinaryCodec<L> {
    layout: L,
}

impl<L: BinaryLayout> BinaryCodec<L> {
    pub fn new(layout: L) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }
}

impl<L: BinaryLayout> MessageCodec for BinaryCodec<L> {
    fn message_id(&self) -> u32 {
        L::MESSAGE_TYPE.id()
    }

    fn name(&self) -> &'static str {
        L::MESSAGE_TYPE.name()
    }

    fn size_constraint(&self) -> SizeConstraint {
        SizeConstraint::Fixed(L::WIRE_LENGTH)
    }

    fn accepts_format(&self, format: WireFormat) -> bool {
        format == WireFormat::Binary
    }

    fn decode(&self, frame: &mut ReceivedFrame) -> NavUpdate {
        let name = self.name();
        if frame.bytes().len() < L::WIRE_LENGTH {
            diagnostics::record_short_frame(frame, name, L::WIRE_LENGTH);
            return NavUpdate::empty();
        }

        let declared = frame.declared_length();
        if declared != declared_length::<L>() {
            frame.add_note(format_args!(
                "{name}: declared length {declared} differs from layout length {}",
                declared_length::<L>()
            ));
        }

        let result = {
            let (bytes, text, _) = frame.decode_parts();
            self.layout.read_fields(&FieldReader::new(bytes), text)
        };
        match result {
            Ok(update) => update,
            Err(error) => {
                diagnostics::record_failure(frame, name, &error);
                NavUpdate::empty()
            }
        }
    }

    fn encode(&self, fields: &NavFields, out: &mut RawBuffer) -> ProtocolResult<usize> {
        out.clear();
        let region = out.extend_zeroed(L::WIRE_LENGTH)?;
        let mut writer = FieldWriter::new(region);
        let written = writer
            .header(&FrameHeader::new(L::MESSAGE_TYPE.id(), declared_length::<L>()))
            .and_then(|()| self.layout.write_fields(fields, &mut writer));
        if let Err(error) = written {
            out.clear();
            return Err(error);
        }
        Ok(L::WIRE_LENGTH)
    }
}
