//! Received frame - one pooled receive slot
//!
//! A frame holds the raw bytes of one datagram or sentence together with everything the
//! decode step produces for it. Frames are created once, when their pool is built, and
//! reset on every release so that a free frame carries no residual state.

use crate::buffers::{BufferError, RawBuffer};
use chrono::{DateTime, Utc};
use std::fmt::{self, Write};

/// How the raw bytes of a frame are framed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFormat {
    /// Fixed-layout binary frame with an 8-byte type/length header
    Binary,
    /// NMEA 0183 style delimited text sentence
    Nmea,
}

/// One receive slot
#[derive(Debug)]
pub struct ReceivedFrame {
    format: WireFormat,
    raw: RawBuffer,
    in_use: bool,
    message_id: u32,
    declared_length: u32,
    time_of_receipt: Option<DateTime<Utc>>,
    decoded_text: String,
    notes: String,
    failed: bool,
}

impl ReceivedFrame {
    pub fn new(format: WireFormat, capacity: usize) -> Self {
        Self {
            format,
            raw: RawBuffer::with_capacity(capacity),
            in_use: false,
            message_id: 0,
            declared_length: 0,
            time_of_receipt: None,
            decoded_text: String::new(),
            notes: String::new(),
            failed: false,
        }
    }

    #[inline]
    pub fn format(&self) -> WireFormat {
        self.format
    }

    #[inline]
    pub fn raw(&self) -> &RawBuffer {
        &self.raw
    }

    #[inline]
    pub fn raw_mut(&mut self) -> &mut RawBuffer {
        &mut self.raw
    }

    /// Valid received bytes
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.raw.as_slice()
    }

    #[inline]
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    #[inline]
    pub fn message_id(&self) -> u32 {
        self.message_id
    }

    #[inline]
    pub fn declared_length(&self) -> u32 {
        self.declared_length
    }

    pub fn time_of_receipt(&self) -> Option<DateTime<Utc>> {
        self.time_of_receipt
    }

    pub fn decoded_text(&self) -> &str {
        &self.decoded_text
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }

    /// True once a decode step gave up on the frame; notes alone are informational
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// Mark the frame as handed out by its pool
    pub fn mark_in_use(&mut self) {
        self.in_use = true;
    }

    /// Return the frame to its free state
    ///
    /// Every mutable field is cleared; string and buffer capacity is kept for reuse.
    pub fn reset(&mut self) {
        self.raw.clear();
        self.in_use = false;
        self.message_id = 0;
        self.declared_length = 0;
        self.time_of_receipt = None;
        self.decoded_text.clear();
        self.notes.clear();
        self.failed = false;
    }

    /// Copy received bytes into the frame
    pub fn fill(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.raw.copy_from(bytes)
    }

    pub fn stamp_receipt(&mut self, at: DateTime<Utc>) {
        self.time_of_receipt = Some(at);
    }

    /// Record the identity established by framing
    pub fn set_identity(&mut self, message_id: u32, declared_length: u32) {
        self.message_id = message_id;
        self.declared_length = declared_length;
    }

    pub fn write_text(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.decoded_text.write_fmt(args);
    }

    /// Append one line to the processing notes
    pub fn add_note(&mut self, args: fmt::Arguments<'_>) {
        if !self.notes.is_empty() {
            self.notes.push('\n');
        }
        let _ = self.notes.write_fmt(args);
    }

    /// Split borrow for decoders: raw bytes plus the two text accumulators
    pub fn decode_parts(&mut self) -> (&[u8], &mut String, &mut String) {
        (self.raw.as_slice(), &mut self.decoded_text, &mut self.notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_all_state() {
        let mut frame = ReceivedFrame::new(WireFormat::Binary, 64);
        frame.mark_in_use();
        frame.fill(&[1, 2, 3]).unwrap();
        frame.set_identity(7, 3);
        frame.stamp_receipt(Utc::now());
        frame.write_text(format_args!("decoded"));
        frame.add_note(format_args!("note one"));
        frame.add_note(format_args!("note two"));
        frame.mark_failed();
        assert_eq!(frame.notes(), "note one\nnote two");

        frame.reset();
        assert!(!frame.is_in_use());
        assert!(frame.bytes().is_empty());
        assert_eq!(frame.message_id(), 0);
        assert_eq!(frame.declared_length(), 0);
        assert!(frame.time_of_receipt().is_none());
        assert!(frame.decoded_text().is_empty());
        assert!(!frame.has_notes());
        assert!(!frame.is_failed());
        assert_eq!(frame.raw().capacity(), 64);
    }

    #[test]
    fn test_fill_rejects_oversized_payload() {
        let mut frame = ReceivedFrame::new(WireFormat::Nmea, 4);
        assert!(frame.fill(b"$GPGGA").is_err());
        assert!(frame.bytes().is_empty());
    }
}
