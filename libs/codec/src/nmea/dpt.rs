use super::{Sentence, SentenceLayout, SentenceWriter};
use crate::error::{ProtocolError, ProtocolResult};
use nav_types::{NavFields, NavUpdate, SentenceId};
use std::fmt::Write;

const DEPTH: usize = 0;
const OFFSET: usize = 1;

/// Depth below transducer and transducer offset
#[derive(Debug, Default, Clone, Copy)]
pub struct DptLayout;

impl SentenceLayout for DptLayout {
    const ID: SentenceId = SentenceId::DPT;
    const TALKER: [u8; 2] = *b"SD";
    const MIN_FIELDS: usize = 2;
    const MAX_FIELDS: usize = 3;

    fn read(
        &self,
        sentence: &Sentence<'_>,
        text: &mut String,
        _notes: &mut String,
    ) -> ProtocolResult<NavUpdate> {
        let depth = sentence.f64_field(DEPTH, "depth")?;
        if depth < 0.0 {
            return Err(ProtocolError::ValueOutOfRange {
                field: "depth",
                value: depth,
            });
        }
        let offset = sentence.opt_f64_field(OFFSET, "transducer offset")?;
        let _ = write!(text, "depth={depth:.2}");
        if let Some(offset) = offset {
            let _ = write!(text, " offset={offset:.2}");
        }

        Ok(NavUpdate {
            depth: Some(depth),
            ..NavUpdate::empty()
        })
    }

    fn write(&self, fields: &NavFields, writer: &mut SentenceWriter<'_>) -> ProtocolResult<()> {
        writer
            .decimal(fields.depth)?
            .decimal(fields.transducer_offset)?
            .empty(1)?;
        Ok(())
    }
}
