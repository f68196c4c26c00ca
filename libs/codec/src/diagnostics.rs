//! Diagnostic records for frames that cannot be decoded
//!
//! A failed decode never escapes the receive loop. Instead the frame's decoded text gets a
//! hex dump of the raw bytes and its processing notes get one line naming the failure.

use crate::error::ProtocolError;
use crate::frame::ReceivedFrame;
use std::fmt::Write;
use tracing::{debug, warn};

const BYTES_PER_ROW: usize = 16;

/// Render `bytes` as an offset/hex/ASCII dump, 16 bytes per row
///
/// ```text
/// 0000  00 00 00 01 00 00 00 30 40 46 80 00 00 00 00 00  .......0@F......
/// ```
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4 + 8);
    write_hex_dump(&mut out, bytes);
    out
}

/// Append a hex dump of `bytes` to `out`
pub fn write_hex_dump(out: &mut String, bytes: &[u8]) {
    for (row, chunk) in bytes.chunks(BYTES_PER_ROW).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{:04x} ", row * BYTES_PER_ROW);

        let encoded = hex::encode(chunk);
        for pair in encoded.as_bytes().chunks(2) {
            out.push(' ');
            out.push(char::from(pair[0]));
            out.push(char::from(pair[1]));
        }
        for _ in chunk.len()..BYTES_PER_ROW {
            out.push_str("   ");
        }

        out.push_str("  ");
        out.extend(chunk.iter().map(|b| {
            if b.is_ascii_graphic() || *b == b' ' {
                char::from(*b)
            } else {
                '.'
            }
        }));
    }
}

/// Record a frame that is shorter than the minimum its codec accepts
pub fn record_short_frame(frame: &mut ReceivedFrame, codec: &str, need: usize) {
    let got = frame.bytes().len();
    debug!(codec, need, got, "Short frame, dumping raw bytes");
    frame.add_note(format_args!(
        "{codec}: frame too short, need {need} bytes, got {got}"
    ));
    frame.mark_failed();
    dump_into_text(frame);
}

/// Record a decode failure together with a dump of the raw bytes
pub fn record_failure(frame: &mut ReceivedFrame, codec: &str, error: &ProtocolError) {
    // Line noise breaks framing routinely; a well-framed message with bad fields is worth
    // surfacing
    if error.is_framing() {
        debug!(codec, %error, message_id = frame.message_id(), "Decode failed");
    } else {
        warn!(codec, %error, message_id = frame.message_id(), "Decode failed");
    }
    frame.add_note(format_args!("{codec}: {error}"));
    frame.mark_failed();
    dump_into_text(frame);
}

fn dump_into_text(frame: &mut ReceivedFrame) {
    let (bytes, text, _) = frame.decode_parts();
    if !text.is_empty() {
        text.push('\n');
    }
    write_hex_dump(text, bytes);
}
