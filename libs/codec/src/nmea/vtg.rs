use super::{Sentence, SentenceLayout, SentenceWriter};
use crate::error::ProtocolResult;
use nav_types::{NavFields, NavUpdate, SentenceId};
use std::fmt::Write;

const COURSE_TRUE: usize = 0;
const SPEED_KNOTS: usize = 4;

const KMH_PER_KNOT: f64 = 1.852;

/// Course over ground and ground speed
#[derive(Debug, Default, Clone, Copy)]
pub struct VtgLayout;

impl SentenceLayout for VtgLayout {
    const ID: SentenceId = SentenceId::VTG;
    const TALKER: [u8; 2] = *b"GP";
    const MIN_FIELDS: usize = 8;
    const MAX_FIELDS: usize = 9;

    fn read(
        &self,
        sentence: &Sentence<'_>,
        text: &mut String,
        _notes: &mut String,
    ) -> ProtocolResult<NavUpdate> {
        let course = sentence.opt_f64_field(COURSE_TRUE, "course over ground")?;
        let speed = sentence.opt_f64_field(SPEED_KNOTS, "speed over ground")?;
        if let Some(course) = course {
            let _ = write!(text, "cog={course:.2} ");
        }
        if let Some(speed) = speed {
            let _ = write!(text, "sog={speed:.2}");
        }

        Ok(NavUpdate {
            course_over_ground: course,
            speed_over_ground: speed,
            ..NavUpdate::empty()
        })
    }

    fn write(&self, fields: &NavFields, writer: &mut SentenceWriter<'_>) -> ProtocolResult<()> {
        writer
            .decimal(fields.course_over_ground)?
            .field(format_args!("T"))?
            .empty(1)?
            .field(format_args!("M"))?
            .decimal(fields.speed_over_ground)?
            .field(format_args!("N"))?
            .decimal(fields.speed_over_ground * KMH_PER_KNOT)?
            .field(format_args!("K"))?
            .field(format_args!("A"))?;
        Ok(())
    }
}
