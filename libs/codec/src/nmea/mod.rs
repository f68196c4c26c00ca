//! NMEA 0183 sentence codecs
//!
//! Sentence framing:
//!
//! ```text
//! $GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n
//! ^^ ^   ^                                                      ^
//! || |   comma-separated fields                                 XOR checksum
//! || formatter (message id)
//! |talker
//! start delimiter ('$', or '!' for encapsulated sentences)
//! ```
//!
//! The checksum is the XOR of every byte between the start delimiter and `*`. A sentence
//! without a valid checksum is rejected during identification, before any codec runs.

mod dpt;
mod gga;
mod hdt;
mod rmc;
mod vhw;
mod vtg;

pub use dpt::DptLayout;
pub use gga::GgaLayout;
pub use hdt::HdtLayout;
pub use rmc::RmcLayout;
pub use vhw::VhwLayout;
pub use vtg::VtgLayout;

use crate::buffers::{BufferError, RawBuffer};
use crate::diagnostics;
use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::{ReceivedFrame, WireFormat};
use crate::registry::{MessageCodec, SizeConstraint};
use nav_types::{NavFields, NavUpdate, SentenceId};
use std::fmt::{self, Write};

/// Most fields any supported sentence carries
pub const MAX_FIELDS: usize = 24;

/// Longest sentence NMEA 0183 allows, delimiters included
pub const MAX_SENTENCE_LENGTH: usize = 82;

/// XOR of every byte in `body`
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |acc, b| acc ^ b)
}

/// Borrowed view of one checksummed sentence
#[derive(Debug)]
pub struct Sentence<'a> {
    talker: &'a str,
    id: SentenceId,
    fields: [&'a str; MAX_FIELDS],
    count: usize,
}

impl<'a> Sentence<'a> {
    /// Parse and checksum-verify one sentence; trailing `\r\n` is optional
    pub fn parse(text: &'a str) -> ProtocolResult<Self> {
        let text = text.trim_end_matches(['\r', '\n']);
        let body = match text.as_bytes().first() {
            Some(b'$') | Some(b'!') => &text[1..],
            Some(_) => return Err(ProtocolError::malformed("missing '$' or '!' start delimiter")),
            None => return Err(ProtocolError::malformed("empty sentence")),
        };

        let (body, suffix) = body.rsplit_once('*').ok_or(ProtocolError::MissingChecksum)?;
        let expected = parse_checksum(suffix)?;
        let calculated = checksum(body.as_bytes());
        if expected != calculated {
            return Err(ProtocolError::ChecksumMismatch {
                expected,
                calculated,
            });
        }

        let mut parts = body.split(',');
        let address = parts.next().unwrap_or_default();
        if address.len() != 5 || !address.is_ascii() {
            return Err(ProtocolError::malformed(format!(
                "address field {address:?} is not talker + formatter"
            )));
        }
        let (talker, formatter) = address.split_at(2);
        let id = SentenceId::parse(formatter.as_bytes()).ok_or_else(|| {
            ProtocolError::malformed(format!("formatter {formatter:?} is not three letters"))
        })?;

        let mut fields = [""; MAX_FIELDS];
        let mut count = 0;
        for field in parts {
            if count == MAX_FIELDS {
                return Err(ProtocolError::FieldCount {
                    sentence: id.to_string(),
                    got: body.split(',').count() - 1,
                    min: 0,
                    max: MAX_FIELDS,
                });
            }
            fields[count] = field;
            count += 1;
        }

        Ok(Self {
            talker,
            id,
            fields,
            count,
        })
    }

    pub fn talker(&self) -> &'a str {
        self.talker
    }

    pub fn id(&self) -> SentenceId {
        self.id
    }

    /// Number of fields after the address field
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Field `index` (0-based after the address); missing fields read as empty
    pub fn field(&self, index: usize) -> &'a str {
        if index < self.count {
            self.fields[index]
        } else {
            ""
        }
    }

    /// Required numeric field
    pub fn f64_field(&self, index: usize, name: &'static str) -> ProtocolResult<f64> {
        let raw = self.field(index);
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ProtocolError::invalid_field(name, index, raw))
    }

    /// Optional numeric field; empty reads as `None`, garbage is an error
    pub fn opt_f64_field(&self, index: usize, name: &'static str) -> ProtocolResult<Option<f64>> {
        if self.field(index).is_empty() {
            Ok(None)
        } else {
            self.f64_field(index, name).map(Some)
        }
    }

    /// Latitude or longitude in `(d)ddmm.mmmm` form followed by its hemisphere field
    pub fn coordinate_field(&self, index: usize, name: &'static str) -> ProtocolResult<f64> {
        let magnitude = self.f64_field(index, name)?;
        let (positive, negative, limit) = match name {
            "latitude" => ("N", "S", 90.0),
            _ => ("E", "W", 180.0),
        };
        let sign = match self.field(index + 1) {
            h if h == positive => 1.0,
            h if h == negative => -1.0,
            h => return Err(ProtocolError::invalid_field("hemisphere", index + 1, h)),
        };

        let degrees = (magnitude / 100.0).trunc();
        let minutes = magnitude - degrees * 100.0;
        let value = sign * (degrees + minutes / 60.0);
        if !(-limit..=limit).contains(&value) {
            return Err(ProtocolError::ValueOutOfRange { field: name, value });
        }
        Ok(value)
    }
}

fn parse_checksum(suffix: &str) -> ProtocolResult<u8> {
    let digits = suffix.get(..2).filter(|_| suffix.len() == 2);
    digits
        .and_then(|hex| u8::from_str_radix(hex, 16).ok())
        .ok_or_else(|| ProtocolError::malformed(format!("bad checksum suffix {suffix:?}")))
}

/// Establish the id of a sentence frame; the checksum is verified on the way
pub fn identify(frame: &mut ReceivedFrame) -> ProtocolResult<u32> {
    let (id, count) = {
        let text = frame.raw().as_text()?;
        let sentence = Sentence::parse(text)?;
        (sentence.id(), sentence.len())
    };
    frame.set_identity(id.id(), count as u32);
    Ok(id.id())
}

/// Builds one sentence into a [`RawBuffer`] and appends its checksum
pub struct SentenceWriter<'a> {
    out: &'a mut RawBuffer,
}

impl<'a> SentenceWriter<'a> {
    /// Clear `out` and write the start delimiter and address field
    pub fn begin(out: &'a mut RawBuffer, talker: [u8; 2], id: SentenceId) -> ProtocolResult<Self> {
        out.clear();
        out.push(b'$')?;
        out.append(&talker)?;
        out.append(&id.formatter())?;
        Ok(Self { out })
    }

    fn overflow(&self) -> ProtocolError {
        ProtocolError::Buffer(BufferError::MessageTooLarge {
            message_size: self.out.capacity() + 1,
            buffer_size: self.out.capacity(),
        })
    }

    /// Append `,` and a formatted value
    pub fn field(&mut self, value: fmt::Arguments<'_>) -> ProtocolResult<&mut Self> {
        self.out.push(b',')?;
        if self.out.write_fmt(value).is_err() {
            return Err(self.overflow());
        }
        Ok(self)
    }

    /// Append one or more empty fields
    pub fn empty(&mut self, count: usize) -> ProtocolResult<&mut Self> {
        for _ in 0..count {
            self.out.push(b',')?;
        }
        Ok(self)
    }

    /// Decimal value with three fractional digits
    pub fn decimal(&mut self, value: f64) -> ProtocolResult<&mut Self> {
        self.field(format_args!("{value:.3}"))
    }

    /// Latitude as `ddmm.mmmmmm,N|S`
    pub fn latitude(&mut self, value: f64) -> ProtocolResult<&mut Self> {
        let (degrees, minutes) = split_degrees(value);
        let hemisphere = if value < 0.0 { 'S' } else { 'N' };
        self.field(format_args!("{degrees:02}{minutes:09.6}"))?
            .field(format_args!("{hemisphere}"))
    }

    /// Longitude as `dddmm.mmmmmm,E|W`
    pub fn longitude(&mut self, value: f64) -> ProtocolResult<&mut Self> {
        let (degrees, minutes) = split_degrees(value);
        let hemisphere = if value < 0.0 { 'W' } else { 'E' };
        self.field(format_args!("{degrees:03}{minutes:09.6}"))?
            .field(format_args!("{hemisphere}"))
    }

    /// Append `*HH\r\n` and return the sentence length
    pub fn finish(self) -> ProtocolResult<usize> {
        let sum = checksum(&self.out.as_slice()[1..]);
        if write!(self.out, "*{sum:02X}\r\n").is_err() {
            return Err(self.overflow());
        }
        Ok(self.out.len())
    }
}

fn split_degrees(value: f64) -> (u32, f64) {
    let magnitude = value.abs();
    let degrees = magnitude.trunc();
    (degrees as u32, (magnitude - degrees) * 60.0)
}

/// Field layout of one sentence type
pub trait SentenceLayout: Send + Sync + 'static {
    const ID: SentenceId;
    const TALKER: [u8; 2];
    const MIN_FIELDS: usize;
    const MAX_FIELDS: usize;

    /// Extract fields; conditions that are valid but carry no data go to `notes`
    fn read(
        &self,
        sentence: &Sentence<'_>,
        text: &mut String,
        notes: &mut String,
    ) -> ProtocolResult<NavUpdate>;

    fn write(&self, fields: &NavFields, writer: &mut SentenceWriter<'_>) -> ProtocolResult<()>;
}

/// Codec for one sentence layout
#[derive(Debug)]
pub struct SentenceCodec<L> {
    layout: L,
    name: &'static str,
}

impl<L: SentenceLayout> SentenceCodec<L> {
    pub fn new(layout: L) -> Self {
        Self {
            layout,
            name: formatter_name(L::ID),
        }
    }
}

fn formatter_name(id: SentenceId) -> &'static str {
    match id {
        SentenceId::GGA => "GGA",
        SentenceId::RMC => "RMC",
        SentenceId::VTG => "VTG",
        SentenceId::HDT => "HDT",
        SentenceId::VHW => "VHW",
        SentenceId::DPT => "DPT",
        _ => "Sentence",
    }
}

impl<L: SentenceLayout> SentenceCodec<L> {
    fn decode_sentence(&self, bytes: &[u8], text: &mut String, notes: &mut String) -> ProtocolResult<NavUpdate> {
        let raw = std::str::from_utf8(bytes).map_err(|e| BufferError::InvalidText {
            offset: e.valid_up_to(),
        })?;
        let sentence = Sentence::parse(raw)?;
        if !(L::MIN_FIELDS..=L::MAX_FIELDS).contains(&sentence.len()) {
            return Err(ProtocolError::FieldCount {
                sentence: sentence.id().to_string(),
                got: sentence.len(),
                min: L::MIN_FIELDS,
                max: L::MAX_FIELDS,
            });
        }
        let _ = write!(text, "{}{} ", sentence.talker(), sentence.id());
        self.layout.read(&sentence, text, notes)
    }
}

impl<L: SentenceLayout> MessageCodec for SentenceCodec<L> {
    fn message_id(&self) -> u32 {
        L::ID.id()
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn size_constraint(&self) -> SizeConstraint {
        SizeConstraint::Fields {
            min: L::MIN_FIELDS,
            max: L::MAX_FIELDS,
        }
    }

    fn accepts_format(&self, format: WireFormat) -> bool {
        format == WireFormat::Nmea
    }

    fn decode(&self, frame: &mut ReceivedFrame) -> NavUpdate {
        let result = {
            let (bytes, text, notes) = frame.decode_parts();
            self.decode_sentence(bytes, text, notes)
        };
        match result {
            Ok(update) => update,
            Err(error) => {
                diagnostics::record_failure(frame, self.name, &error);
                NavUpdate::empty()
            }
        }
    }

    fn encode(&self, fields: &NavFields, out: &mut RawBuffer) -> ProtocolResult<usize> {
        let written = SentenceWriter::begin(out, L::TALKER, L::ID).and_then(|mut writer| {
            self.layout.write(fields, &mut writer)?;
            writer.finish()
        });
        if written.is_err() {
            out.clear();
        }
        written
    }
}

/// Append a note line to a notes accumulator
pub(crate) fn note(notes: &mut String, args: fmt::Arguments<'_>) {
    if !notes.is_empty() {
        notes.push('\n');
    }
    let _ = notes.write_fmt(args);
}
