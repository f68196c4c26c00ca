use super::{Sentence, SentenceLayout, SentenceWriter};
use crate::error::ProtocolResult;
use nav_types::{NavFields, NavUpdate, SentenceId};
use std::fmt::Write;

/// True heading
#[derive(Debug, Default, Clone, Copy)]
pub struct HdtLayout;

impl SentenceLayout for HdtLayout {
    const ID: SentenceId = SentenceId::HDT;
    const TALKER: [u8; 2] = *b"HE";
    const MIN_FIELDS: usize = 2;
    const MAX_FIELDS: usize = 2;

    fn read(
        &self,
        sentence: &Sentence<'_>,
        text: &mut String,
        _notes: &mut String,
    ) -> ProtocolResult<NavUpdate> {
        let heading = sentence.f64_field(0, "true heading")?;
        let _ = write!(text, "hdg={heading:.2}");
        Ok(NavUpdate {
            true_heading: Some(heading),
            ..NavUpdate::empty()
        })
    }

    fn write(&self, fields: &NavFields, writer: &mut SentenceWriter<'_>) -> ProtocolResult<()> {
        writer.decimal(fields.true_heading)?.field(format_args!("T"))?;
        Ok(())
    }
}
