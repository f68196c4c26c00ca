//! Fixed-capacity raw buffers for receive slots and outbound payloads
//!
//! ## Purpose
//!
//! A [`RawBuffer`] is allocated once with the largest datagram or sentence it will ever
//! hold and then reused for every message that passes through its slot. Appends that
//! would exceed the capacity are rejected whole instead of growing the allocation, so the
//! receive hot path never reallocates.
//!
//! ```text
//! capacity ─────────────────────────────────────────────┐
//! ┌──────────────── len ───────────────┬────────────────┤
//! │ valid bytes (as_slice)             │ spare capacity │
//! └────────────────────────────────────┴────────────────┘
//! ```
//!
//! The same type carries binary frames and ASCII sentences; [`RawBuffer::as_text`] views
//! the valid bytes as UTF-8.

use std::io;

/// Errors that can occur during buffer operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("Message too large for buffer: {message_size} bytes > {buffer_size} bytes")]
    MessageTooLarge {
        message_size: usize,
        buffer_size: usize,
    },

    #[error("Buffer does not hold valid text (invalid byte at offset {offset})")]
    InvalidText { offset: usize },
}

/// Fixed-capacity byte buffer
#[derive(Debug, Clone)]
pub struct RawBuffer {
    data: Vec<u8>,
    len: usize,
}

impl RawBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity],
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    /// Valid bytes
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Valid bytes viewed as text
    pub fn as_text(&self) -> Result<&str, BufferError> {
        std::str::from_utf8(self.as_slice()).map_err(|e| BufferError::InvalidText {
            offset: e.valid_up_to(),
        })
    }

    /// Forget the contents; capacity is kept
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Append `bytes` in full or not at all
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        if bytes.len() > self.remaining() {
            return Err(BufferError::MessageTooLarge {
                message_size: self.len + bytes.len(),
                buffer_size: self.capacity(),
            });
        }
        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<(), BufferError> {
        self.append(&[byte])
    }

    /// Replace the contents with `bytes`
    pub fn copy_from(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.clear();
        self.append(bytes)
    }

    /// Append `n` zero bytes and return them for in-place writing
    pub fn extend_zeroed(&mut self, n: usize) -> Result<&mut [u8], BufferError> {
        if n > self.remaining() {
            return Err(BufferError::MessageTooLarge {
                message_size: self.len + n,
                buffer_size: self.capacity(),
            });
        }
        let start = self.len;
        self.len += n;
        let region = &mut self.data[start..self.len];
        region.fill(0);
        Ok(region)
    }

    /// Fill the buffer from a reader-like call that writes into the full capacity
    ///
    /// `read` receives the whole backing storage and returns the byte count it wrote,
    /// which becomes the new length. Used for `recv`-style calls that must not allocate.
    pub fn fill_with<F>(&mut self, read: F) -> io::Result<usize>
    where
        F: FnOnce(&mut [u8]) -> io::Result<usize>,
    {
        self.len = 0;
        let n = read(&mut self.data)?;
        self.len = n.min(self.capacity());
        Ok(self.len)
    }

    /// Change the capacity; outside the hot path only
    ///
    /// Shrinking below the current length truncates the contents.
    pub fn resize(&mut self, new_capacity: usize) {
        self.data.resize(new_capacity, 0);
        self.len = self.len.min(new_capacity);
    }
}

impl std::fmt::Write for RawBuffer {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.append(s.as_bytes()).map_err(|_| std::fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_clear_keep_capacity() {
        let mut buf = RawBuffer::with_capacity(16);
        buf.append(b"hello").unwrap();
        buf.append(b" world").unwrap();
        assert_eq!(buf.as_slice(), b"hello world");
        assert_eq!(buf.remaining(), 5);

        let ptr = buf.as_slice().as_ptr();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 16);
        buf.append(b"again").unwrap();
        assert_eq!(buf.as_slice().as_ptr(), ptr);
    }

    #[test]
    fn test_append_rejects_overflow_without_partial_write() {
        let mut buf = RawBuffer::with_capacity(4);
        buf.append(b"ab").unwrap();
        let err = buf.append(b"cde").unwrap_err();
        assert_eq!(
            err,
            BufferError::MessageTooLarge {
                message_size: 5,
                buffer_size: 4
            }
        );
        assert_eq!(buf.as_slice(), b"ab");
    }

    #[test]
    fn test_extend_zeroed_clears_stale_bytes() {
        let mut buf = RawBuffer::with_capacity(8);
        buf.append(&[0xFF; 8]).unwrap();
        buf.clear();
        let region = buf.extend_zeroed(4).unwrap();
        assert_eq!(region, &[0, 0, 0, 0]);
        assert_eq!(buf.len(), 4);
        assert!(buf.extend_zeroed(5).is_err());
    }

    #[test]
    fn test_fill_with_sets_length() {
        let mut buf = RawBuffer::with_capacity(8);
        let n = buf
            .fill_with(|storage| {
                storage[..3].copy_from_slice(b"abc");
                Ok(3)
            })
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(buf.as_text().unwrap(), "abc");

        let err = buf.fill_with(|_| Err(io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(err.is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_as_text_reports_invalid_offset() {
        let mut buf = RawBuffer::with_capacity(8);
        buf.append(&[b'o', b'k', 0xFF]).unwrap();
        assert_eq!(buf.as_text(), Err(BufferError::InvalidText { offset: 2 }));
    }

    #[test]
    fn test_resize_truncates() {
        let mut buf = RawBuffer::with_capacity(8);
        buf.append(b"abcdef").unwrap();
        buf.resize(3);
        assert_eq!(buf.as_slice(), b"abc");
        buf.resize(32);
        assert_eq!(buf.capacity(), 32);
        assert_eq!(buf.as_slice(), b"abc");
    }
}
