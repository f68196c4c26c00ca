use super::{Sentence, SentenceLayout, SentenceWriter};
use crate::error::ProtocolResult;
use nav_types::{NavFields, NavUpdate, SentenceId};
use std::fmt::Write;

const HEADING_TRUE: usize = 0;
const SPEED_KNOTS: usize = 4;

const KMH_PER_KNOT: f64 = 1.852;

/// Water speed and heading
///
/// The true heading field is reported to sinks as course through water.
#[derive(Debug, Default, Clone, Copy)]
pub struct VhwLayout;

impl SentenceLayout for VhwLayout {
    const ID: SentenceId = SentenceId::VHW;
    const TALKER: [u8; 2] = *b"VW";
    const MIN_FIELDS: usize = 8;
    const MAX_FIELDS: usize = 8;

    fn read(
        &self,
        sentence: &Sentence<'_>,
        text: &mut String,
        _notes: &mut String,
    ) -> ProtocolResult<NavUpdate> {
        let course = sentence.opt_f64_field(HEADING_TRUE, "course through water")?;
        let speed = sentence.opt_f64_field(SPEED_KNOTS, "speed through water")?;
        if let Some(course) = course {
            let _ = write!(text, "ctw={course:.2} ");
        }
        if let Some(speed) = speed {
            let _ = write!(text, "stw={speed:.2}");
        }

        Ok(NavUpdate {
            course_through_water: course,
            speed_through_water: speed,
            ..NavUpdate::empty()
        })
    }

    fn write(&self, fields: &NavFields, writer: &mut SentenceWriter<'_>) -> ProtocolResult<()> {
        writer
            .decimal(fields.course_through_water)?
            .field(format_args!("T"))?
            .empty(1)?
            .field(format_args!("M"))?
            .decimal(fields.speed_through_water)?
            .field(format_args!("N"))?
            .decimal(fields.speed_through_water * KMH_PER_KNOT)?
            .field(format_args!("K"))?;
        Ok(())
    }
}
