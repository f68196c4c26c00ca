use super::{note, Sentence, SentenceLayout, SentenceWriter};
use crate::error::{ProtocolError, ProtocolResult};
use chrono::Utc;
use nav_types::{NavFields, NavUpdate, Position, SentenceId};
use std::fmt::Write;

const TIME: usize = 0;
const LATITUDE: usize = 1;
const LONGITUDE: usize = 3;
const QUALITY: usize = 5;
const SATELLITES: usize = 6;

/// Global positioning system fix data
#[derive(Debug, Default, Clone, Copy)]
pub struct GgaLayout;

impl SentenceLayout for GgaLayout {
    const ID: SentenceId = SentenceId::GGA;
    const TALKER: [u8; 2] = *b"GP";
    const MIN_FIELDS: usize = 6;
    const MAX_FIELDS: usize = 14;

    fn read(
        &self,
        sentence: &Sentence<'_>,
        text: &mut String,
        notes: &mut String,
    ) -> ProtocolResult<NavUpdate> {
        let quality = sentence.field(QUALITY);
        let quality: u8 = quality
            .parse()
            .map_err(|_| ProtocolError::invalid_field("fix quality", QUALITY, quality))?;
        let _ = write!(
            text,
            "time={} quality={quality} satellites={}",
            sentence.field(TIME),
            sentence.field(SATELLITES)
        );
        if quality == 0 {
            note(notes, format_args!("GGA: no fix (quality 0), position ignored"));
            return Ok(NavUpdate::empty());
        }

        let latitude = sentence.coordinate_field(LATITUDE, "latitude")?;
        let longitude = sentence.coordinate_field(LONGITUDE, "longitude")?;
        let _ = write!(text, " lat={latitude:.6} lon={longitude:.6}");

        Ok(NavUpdate {
            position: Some(Position::new(latitude, longitude)),
            ..NavUpdate::empty()
        })
    }

    fn write(&self, fields: &NavFields, writer: &mut SentenceWriter<'_>) -> ProtocolResult<()> {
        let now = Utc::now();
        writer
            .field(format_args!("{}.00", now.format("%H%M%S")))?
            .latitude(fields.latitude)?
            .longitude(fields.longitude)?
            .field(format_args!("1"))?
            .field(format_args!("08"))?
            .field(format_args!("0.9"))?
            .field(format_args!("0.0"))?
            .field(format_args!("M"))?
            .field(format_args!("0.0"))?
            .field(format_args!("M"))?
            .empty(2)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::checksum;

    fn parse(body: &str) -> String {
        format!("${body}*{:02X}", checksum(body.as_bytes()))
    }

    #[test]
    fn test_reference_fix() {
        let raw = parse("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        let sentence = Sentence::parse(&raw).unwrap();
        let (mut text, mut notes) = (String::new(), String::new());
        let update = GgaLayout.read(&sentence, &mut text, &mut notes).unwrap();

        let position = update.position.unwrap();
        assert!((position.latitude - 48.1173).abs() < 1e-4);
        assert!((position.longitude - 11.516_666).abs() < 1e-4);
        assert!(notes.is_empty());
        assert!(text.starts_with("time=123519 quality=1 satellites=08"));
    }

    #[test]
    fn test_no_fix_is_noted_without_update() {
        let raw = parse("GPGGA,123519,,,,,0,00,,,M,,M,,");
        let sentence = Sentence::parse(&raw).unwrap();
        let (mut text, mut notes) = (String::new(), String::new());
        let update = GgaLayout.read(&sentence, &mut text, &mut notes).unwrap();
        assert!(update.is_empty());
        assert_eq!(notes, "GGA: no fix (quality 0), position ignored");
    }
}
