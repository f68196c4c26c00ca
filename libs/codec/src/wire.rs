//! Binary wire format
//!
//! Every binary frame starts with an 8-byte header in network byte order:
//!
//! ```text
//! ┌────────────────┬────────────────────┬──────────────────────────────┐
//! │ [0:4) u32 type │ [4:8) u32 declared │ fixed-offset payload fields  │
//! │                │ payload length     │ (declared length bytes)      │
//! └────────────────┴────────────────────┴──────────────────────────────┘
//! ```
//!
//! Payload fields sit at offsets fixed per message type: `f64` (8 bytes), `f32` (4),
//! `i32` (4) and fixed-width ASCII strings padded with NUL bytes. Offsets used by the
//! readers and writers below are absolute offsets within the frame, header included.

use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::ReceivedFrame;
use std::mem::size_of;
use zerocopy::byteorder::{BigEndian, F32, F64, I32, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

/// Header size in bytes
pub const HEADER_SIZE: usize = 8;

/// Largest UDP payload over IPv4
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Binary frame header
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes, Unaligned)]
pub struct FrameHeader {
    message_type: U32<BigEndian>,
    declared_length: U32<BigEndian>,
}

impl FrameHeader {
    pub fn new(message_type: u32, declared_length: u32) -> Self {
        Self {
            message_type: U32::new(message_type),
            declared_length: U32::new(declared_length),
        }
    }

    /// Read the header from the front of `bytes`
    pub fn parse(bytes: &[u8]) -> ProtocolResult<Self> {
        Self::read_from_prefix(bytes).ok_or_else(|| {
            ProtocolError::message_too_small(HEADER_SIZE, bytes.len(), "frame header")
        })
    }

    pub fn message_type(&self) -> u32 {
        self.message_type.get()
    }

    pub fn declared_length(&self) -> u32 {
        self.declared_length.get()
    }
}

/// Establish the message id and declared length of a binary frame
pub fn identify(frame: &mut ReceivedFrame) -> ProtocolResult<u32> {
    let header = FrameHeader::parse(frame.bytes())?;
    frame.set_identity(header.message_type(), header.declared_length());
    Ok(header.message_type())
}

/// Bounds-checked big-endian field reader
pub struct FieldReader<'a> {
    bytes: &'a [u8],
}

impl<'a> FieldReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn slice(&self, offset: usize, width: usize, field: &'static str) -> ProtocolResult<&'a [u8]> {
        let end = offset.saturating_add(width);
        self.bytes
            .get(offset..end)
            .ok_or_else(|| ProtocolError::message_too_small(end, self.bytes.len(), field))
    }

    fn read<T: FromBytes>(&self, offset: usize, field: &'static str) -> ProtocolResult<T> {
        let width = size_of::<T>();
        self.slice(offset, width, field).and_then(|raw| {
            T::read_from(raw).ok_or_else(|| {
                let end = offset.saturating_add(width);
                ProtocolError::message_too_small(end, self.bytes.len(), field)
            })
        })
    }

    pub fn f64_at(&self, offset: usize, field: &'static str) -> ProtocolResult<f64> {
        self.read::<F64<BigEndian>>(offset, field).map(|value| value.get())
    }

    pub fn f32_at(&self, offset: usize, field: &'static str) -> ProtocolResult<f32> {
        self.read::<F32<BigEndian>>(offset, field).map(|value| value.get())
    }

    pub fn i32_at(&self, offset: usize, field: &'static str) -> ProtocolResult<i32> {
        self.read::<I32<BigEndian>>(offset, field).map(|value| value.get())
    }

    /// Fixed-width string; trailing NUL and space padding is stripped
    pub fn str_at(&self, offset: usize, width: usize, field: &'static str) -> ProtocolResult<String> {
        let raw = self.slice(offset, width, field)?;
        let end = raw
            .iter()
            .rposition(|b| *b != 0 && *b != b' ')
            .map_or(0, |i| i + 1);
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}

/// Big-endian field writer over a zeroed frame region
pub struct FieldWriter<'a> {
    bytes: &'a mut [u8],
}

impl<'a> FieldWriter<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    fn slice(&mut self, offset: usize, width: usize) -> ProtocolResult<&mut [u8]> {
        let len = self.bytes.len();
        let end = offset.saturating_add(width);
        self.bytes
            .get_mut(offset..end)
            .ok_or_else(|| ProtocolError::message_too_small(end, len, "field write"))
    }

    fn put<T: AsBytes>(&mut self, offset: usize, value: T) -> ProtocolResult<()> {
        let bytes = value.as_bytes();
        self.slice(offset, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn header(&mut self, header: &FrameHeader) -> ProtocolResult<()> {
        self.put(0, *header)
    }

    pub fn f64_at(&mut self, offset: usize, value: f64) -> ProtocolResult<()> {
        self.put(offset, F64::<BigEndian>::new(value))
    }

    pub fn f32_at(&mut self, offset: usize, value: f32) -> ProtocolResult<()> {
        self.put(offset, F32::<BigEndian>::new(value))
    }

    pub fn i32_at(&mut self, offset: usize, value: i32) -> ProtocolResult<()> {
        self.put(offset, I32::<BigEndian>::new(value))
    }

    /// Write `value` NUL-padded to `width`; longer strings are truncated
    pub fn str_at(&mut self, offset: usize, width: usize, value: &str) -> ProtocolResult<()> {
        let target = self.slice(offset, width)?;
        target.fill(0);
        let n = value.len().min(width);
        target[..n].copy_from_slice(&value.as_bytes()[..n]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::WireFormat;

    #[test]
    fn test_header_layout_is_big_endian() {
        let header = FrameHeader::new(1, 48);
        assert_eq!(header.as_bytes(), &[0, 0, 0, 1, 0, 0, 0, 48]);

        let parsed = FrameHeader::parse(&[0, 0, 0, 3, 0, 0, 0, 16, 0xAA]).unwrap();
        assert_eq!(parsed.message_type(), 3);
        assert_eq!(parsed.declared_length(), 16);
    }

    #[test]
    fn test_header_parse_rejects_short_input() {
        let err = FrameHeader::parse(&[0, 0, 0]).unwrap_err();
        assert_eq!(err, ProtocolError::message_too_small(8, 3, "frame header"));
    }

    #[test]
    fn test_identify_sets_frame_identity() {
        let mut frame = ReceivedFrame::new(WireFormat::Binary, 64);
        frame.fill(FrameHeader::new(2, 16).as_bytes()).unwrap();
        assert_eq!(identify(&mut frame).unwrap(), 2);
        assert_eq!(frame.message_id(), 2);
        assert_eq!(frame.declared_length(), 16);
    }

    #[test]
    fn test_field_round_trip_at_fixed_offsets() {
        let mut bytes = [0u8; 40];
        {
            let mut writer = FieldWriter::new(&mut bytes);
            writer.f64_at(8, -110.25).unwrap();
            writer.f32_at(16, 12.5).unwrap();
            writer.i32_at(20, -7).unwrap();
            writer.str_at(24, 16, "GPS-1").unwrap();
        }
        let reader = FieldReader::new(&bytes);
        assert_eq!(reader.f64_at(8, "lon").unwrap(), -110.25);
        assert_eq!(reader.f32_at(16, "speed").unwrap(), 12.5);
        assert_eq!(reader.i32_at(20, "quality").unwrap(), -7);
        assert_eq!(reader.str_at(24, 16, "name").unwrap(), "GPS-1");
        assert_eq!(&bytes[29..40], &[0u8; 11]);
        assert_eq!(&bytes[8..16], &(-110.25f64).to_be_bytes());
    }

    #[test]
    fn test_reader_never_reads_past_end() {
        let bytes = [0u8; 10];
        let reader = FieldReader::new(&bytes);
        assert!(reader.f64_at(4, "x").is_err());
        assert!(reader.f32_at(8, "x").is_err());
        assert!(reader.str_at(usize::MAX - 2, 4, "x").is_err());
    }
}
