use super::BinaryLayout;
use crate::error::ProtocolResult;
use crate::wire::{FieldReader, FieldWriter};
use nav_types::{BinaryMessageType, NavFields, NavUpdate};
use std::fmt::Write;
use std::sync::atomic::{AtomicI32, Ordering};

const COURSE_THROUGH_WATER: usize = 8;
const SPEED_THROUGH_WATER: usize = 12;
const HEADING: usize = 16;
const SEQUENCE: usize = 20;

/// Course and speed through water plus heading (type 2, 24 bytes)
///
/// The encoder stamps each frame with a wrapping sequence number.
#[derive(Debug, Default)]
pub struct WaterReferencedMotionLayout {
    sequence: AtomicI32,
}

impl BinaryLayout for WaterReferencedMotionLayout {
    const MESSAGE_TYPE: BinaryMessageType = BinaryMessageType::WaterReferencedMotion;
    const WIRE_LENGTH: usize = 24;

    fn read_fields(&self, reader: &FieldReader<'_>, text: &mut String) -> ProtocolResult<NavUpdate> {
        let course = reader.f32_at(COURSE_THROUGH_WATER, "course through water")?;
        let speed = reader.f32_at(SPEED_THROUGH_WATER, "speed through water")?;
        let heading = reader.f32_at(HEADING, "heading")?;
        let sequence = reader.i32_at(SEQUENCE, "sequence")?;

        let _ = write!(
            text,
            "WaterReferencedMotion seq={sequence} ctw={course:.2} stw={speed:.2} hdg={heading:.2}"
        );

        Ok(NavUpdate {
            true_heading: Some(f64::from(heading)),
            course_through_water: Some(f64::from(course)),
            speed_through_water: Some(f64::from(speed)),
            ..NavUpdate::empty()
        })
    }

    fn write_fields(&self, fields: &NavFields, writer: &mut FieldWriter<'_>) -> ProtocolResult<()> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        writer.f32_at(COURSE_THROUGH_WATER, fields.course_through_water as f32)?;
        writer.f32_at(SPEED_THROUGH_WATER, fields.speed_through_water as f32)?;
        writer.f32_at(HEADING, fields.true_heading as f32)?;
        writer.i32_at(SEQUENCE, sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryCodec;
    use crate::buffers::RawBuffer;
    use crate::registry::MessageCodec;

    #[test]
    fn test_sequence_advances_per_encode() {
        let codec = BinaryCodec::new(WaterReferencedMotionLayout::default());
        let mut out = RawBuffer::with_capacity(32);
        codec.encode(&NavFields::manual(), &mut out).unwrap();
        assert_eq!(&out.as_slice()[20..24], &0i32.to_be_bytes());
        codec.encode(&NavFields::manual(), &mut out).unwrap();
        assert_eq!(&out.as_slice()[20..24], &1i32.to_be_bytes());
        assert_eq!(&out.as_slice()[8..12], &130.0f32.to_be_bytes());
    }
}
