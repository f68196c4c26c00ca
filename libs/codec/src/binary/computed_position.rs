use super::BinaryLayout;
use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::{FieldReader, FieldWriter};
use nav_types::{BinaryMessageType, NavFields, NavUpdate, Position};
use std::fmt::Write;

const LATITUDE: usize = 8;
const LONGITUDE: usize = 16;
const TRUE_HEADING: usize = 24;
const COURSE_OVER_GROUND: usize = 28;
const SPEED_OVER_GROUND: usize = 32;
const FIX_QUALITY: usize = 36;
const SOURCE_NAME: usize = 40;
const SOURCE_NAME_WIDTH: usize = 16;

/// Fix quality written by the encoder (autonomous GNSS fix)
const ENCODED_FIX_QUALITY: i32 = 1;
const ENCODED_SOURCE_NAME: &str = "NAV-RECEIVER";

/// Position, true heading, course and speed over ground (type 1, 56 bytes)
#[derive(Debug, Default, Clone, Copy)]
pub struct ComputedPositionLayout;

impl BinaryLayout for ComputedPositionLayout {
    const MESSAGE_TYPE: BinaryMessageType = BinaryMessageType::ComputedPosition;
    const WIRE_LENGTH: usize = 56;

    fn read_fields(&self, reader: &FieldReader<'_>, text: &mut String) -> ProtocolResult<NavUpdate> {
        let latitude = reader.f64_at(LATITUDE, "latitude")?;
        let longitude = reader.f64_at(LONGITUDE, "longitude")?;
        let heading = reader.f32_at(TRUE_HEADING, "true heading")?;
        let course = reader.f32_at(COURSE_OVER_GROUND, "course over ground")?;
        let speed = reader.f32_at(SPEED_OVER_GROUND, "speed over ground")?;
        let quality = reader.i32_at(FIX_QUALITY, "fix quality")?;
        let source = reader.str_at(SOURCE_NAME, SOURCE_NAME_WIDTH, "source name")?;

        let _ = write!(
            text,
            "ComputedPosition source={source:?} quality={quality} lat={latitude:.6} \
             lon={longitude:.6} hdg={heading:.2} cog={course:.2} sog={speed:.2}"
        );

        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ProtocolError::ValueOutOfRange {
                field: "latitude",
                value: latitude,
            });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ProtocolError::ValueOutOfRange {
                field: "longitude",
                value: longitude,
            });
        }

        Ok(NavUpdate {
            position: Some(Position::new(latitude, longitude)),
            true_heading: Some(f64::from(heading)),
            course_over_ground: Some(f64::from(course)),
            speed_over_ground: Some(f64::from(speed)),
            ..NavUpdate::empty()
        })
    }

    fn write_fields(&self, fields: &NavFields, writer: &mut FieldWriter<'_>) -> ProtocolResult<()> {
        writer.f64_at(LATITUDE, fields.latitude)?;
        writer.f64_at(LONGITUDE, fields.longitude)?;
        writer.f32_at(TRUE_HEADING, fields.true_heading as f32)?;
        writer.f32_at(COURSE_OVER_GROUND, fields.course_over_ground as f32)?;
        writer.f32_at(SPEED_OVER_GROUND, fields.speed_over_ground as f32)?;
        writer.i32_at(FIX_QUALITY, ENCODED_FIX_QUALITY)?;
        writer.str_at(SOURCE_NAME, SOURCE_NAME_WIDTH, ENCODED_SOURCE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryCodec;
    use crate::buffers::RawBuffer;
    use crate::frame::{ReceivedFrame, WireFormat};
    use crate::registry::MessageCodec;
    use crate::wire;

    #[test]
    fn test_field_offsets() {
        let codec = BinaryCodec::new(ComputedPositionLayout);
        let mut out = RawBuffer::with_capacity(64);
        codec.encode(&NavFields::manual(), &mut out).unwrap();
        let bytes = out.as_slice();

        assert_eq!(&bytes[0..8], &[0, 0, 0, 1, 0, 0, 0, 48]);
        assert_eq!(&bytes[8..16], &45.0f64.to_be_bytes());
        assert_eq!(&bytes[16..24], &(-110.0f64).to_be_bytes());
        assert_eq!(&bytes[24..28], &129.0f32.to_be_bytes());
        assert_eq!(&bytes[36..40], &1i32.to_be_bytes());
        assert_eq!(&bytes[40..52], b"NAV-RECEIVER");
        assert_eq!(&bytes[52..56], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_out_of_range_latitude_is_rejected() {
        let codec = BinaryCodec::new(ComputedPositionLayout);
        let fields = NavFields {
            latitude: 91.0,
            ..NavFields::manual()
        };
        let mut out = RawBuffer::with_capacity(64);
        codec.encode(&fields, &mut out).unwrap();

        let mut frame = ReceivedFrame::new(WireFormat::Binary, 64);
        frame.fill(out.as_slice()).unwrap();
        wire::identify(&mut frame).unwrap();

        assert!(codec.decode(&mut frame).is_empty());
        assert!(frame.notes().contains("latitude out of range: 91"));
        assert!(frame.decoded_text().contains("0000  00 00 00 01"));
    }
}
