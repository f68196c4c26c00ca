use super::BinaryLayout;
use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::{FieldReader, FieldWriter};
use nav_types::{BinaryMessageType, NavFields, NavUpdate};
use std::fmt::Write;

const DEPTH: usize = 8;
const TRANSDUCER_OFFSET: usize = 12;
const RANGE_SCALE: usize = 16;
const QUALITY: usize = 20;

/// Sounder range scales in metres, smallest first
const RANGE_SCALES: [f32; 7] = [10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0];
const ENCODED_QUALITY: i32 = 100;

/// Depth below transducer (type 3, 24 bytes)
#[derive(Debug, Default, Clone, Copy)]
pub struct DepthSoundingLayout;

fn range_scale_for(depth: f32) -> f32 {
    RANGE_SCALES
        .iter()
        .copied()
        .find(|scale| depth <= *scale)
        .unwrap_or(RANGE_SCALES[RANGE_SCALES.len() - 1])
}

impl BinaryLayout for DepthSoundingLayout {
    const MESSAGE_TYPE: BinaryMessageType = BinaryMessageType::DepthSounding;
    const WIRE_LENGTH: usize = 24;

    fn read_fields(&self, reader: &FieldReader<'_>, text: &mut String) -> ProtocolResult<NavUpdate> {
        let depth = reader.f32_at(DEPTH, "depth")?;
        let offset = reader.f32_at(TRANSDUCER_OFFSET, "transducer offset")?;
        let range = reader.f32_at(RANGE_SCALE, "range scale")?;
        let quality = reader.i32_at(QUALITY, "quality")?;

        let _ = write!(
            text,
            "DepthSounding depth={depth:.2} offset={offset:.2} range={range:.0} quality={quality}"
        );

        if !depth.is_finite() || depth < 0.0 {
            return Err(ProtocolError::ValueOutOfRange {
                field: "depth",
                value: f64::from(depth),
            });
        }

        Ok(NavUpdate {
            depth: Some(f64::from(depth)),
            ..NavUpdate::empty()
        })
    }

    fn write_fields(&self, fields: &NavFields, writer: &mut FieldWriter<'_>) -> ProtocolResult<()> {
        let depth = fields.depth as f32;
        writer.f32_at(DEPTH, depth)?;
        writer.f32_at(TRANSDUCER_OFFSET, fields.transducer_offset as f32)?;
        writer.f32_at(RANGE_SCALE, range_scale_for(depth))?;
        writer.i32_at(QUALITY, ENCODED_QUALITY)
    }
}
