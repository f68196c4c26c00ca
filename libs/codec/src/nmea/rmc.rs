use super::{note, Sentence, SentenceLayout, SentenceWriter};
use crate::error::{ProtocolError, ProtocolResult};
use chrono::Utc;
use nav_types::{NavFields, NavUpdate, Position, SentenceId};
use std::fmt::Write;

const TIME: usize = 0;
const STATUS: usize = 1;
const LATITUDE: usize = 2;
const LONGITUDE: usize = 4;
const SPEED_OVER_GROUND: usize = 6;
const COURSE_OVER_GROUND: usize = 7;
const DATE: usize = 8;

/// Recommended minimum navigation data
#[derive(Debug, Default, Clone, Copy)]
pub struct RmcLayout;

impl SentenceLayout for RmcLayout {
    const ID: SentenceId = SentenceId::RMC;
    const TALKER: [u8; 2] = *b"GP";
    const MIN_FIELDS: usize = 11;
    const MAX_FIELDS: usize = 13;

    fn read(
        &self,
        sentence: &Sentence<'_>,
        text: &mut String,
        notes: &mut String,
    ) -> ProtocolResult<NavUpdate> {
        let status = sentence.field(STATUS);
        let _ = write!(
            text,
            "time={} date={} status={status}",
            sentence.field(TIME),
            sentence.field(DATE)
        );
        match status {
            "A" => {}
            "V" => {
                note(notes, format_args!("RMC: receiver warning (status V), data ignored"));
                return Ok(NavUpdate::empty());
            }
            other => return Err(ProtocolError::invalid_field("status", STATUS, other)),
        }

        let latitude = sentence.coordinate_field(LATITUDE, "latitude")?;
        let longitude = sentence.coordinate_field(LONGITUDE, "longitude")?;
        let speed = sentence.opt_f64_field(SPEED_OVER_GROUND, "speed over ground")?;
        let course = sentence.opt_f64_field(COURSE_OVER_GROUND, "course over ground")?;
        let _ = write!(text, " lat={latitude:.6} lon={longitude:.6}");
        if let Some(speed) = speed {
            let _ = write!(text, " sog={speed:.2}");
        }
        if let Some(course) = course {
            let _ = write!(text, " cog={course:.2}");
        }

        Ok(NavUpdate {
            position: Some(Position::new(latitude, longitude)),
            speed_over_ground: speed,
            course_over_ground: course,
            ..NavUpdate::empty()
        })
    }

    fn write(&self, fields: &NavFields, writer: &mut SentenceWriter<'_>) -> ProtocolResult<()> {
        let now = Utc::now();
        writer
            .field(format_args!("{}.00", now.format("%H%M%S")))?
            .field(format_args!("A"))?
            .latitude(fields.latitude)?
            .longitude(fields.longitude)?
            .decimal(fields.speed_over_ground)?
            .decimal(fields.course_over_ground)?
            .field(format_args!("{}", now.format("%d%m%y")))?
            .empty(2)?
            .field(format_args!("A"))?;
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
    fn test_active_fix() {
        let raw = parse("GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W");
        let sentence = Sentence::parse(&raw).unwrap();
        let (mut text, mut notes) = (String::new(), String::new());
        let update = RmcLayout.read(&sentence, &mut text, &mut notes).unwrap();
        assert_eq!(update.speed_over_ground, Some(22.4));
        assert_eq!(update.course_over_ground, Some(84.4));
        assert!(update.position.is_some());
        assert!(notes.is_empty());
    }

    #[test]
    fn test_void_status_is_noted() {
        let raw = parse("GPRMC,123519,V,,,,,,,230394,,");
        let sentence = Sentence::parse(&raw).unwrap();
        let (mut text, mut notes) = (String::new(), String::new());
        let update = RmcLayout.read(&sentence, &mut text, &mut notes).unwrap();
        assert!(update.is_empty());
        assert!(notes.contains("status V"));
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        let raw = parse("GPRMC,123519,Q,,,,,,,230394,,");
        let sentence = Sentence::parse(&raw).unwrap();
        let (mut text, mut notes) = (String::new(), String::new());
        assert!(RmcLayout.read(&sentence, &mut text, &mut notes).is_err());
    }
}
