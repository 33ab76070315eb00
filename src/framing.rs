//! NUL-delimited message framing.
//!
//! A message is any run of bytes terminated by a single `0x00`. There is no
//! length prefix and no size limit; payloads are opaque.
//!
//! ```text
//! wire:     hello\0world\0par
//! frames:   "hello", "world"
//! buffered: "par"   (kept for the next read)
//! ```

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::EncodeError;

/// Message terminator.
pub const DELIMITER: u8 = 0x00;

/// Per-session receive buffer.
///
/// Only the consumed prefix (payload plus delimiter) is ever removed, so a
/// partial message received alongside a complete one survives until the
/// next read completes it.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    /// Bytes at the front of `buf` already known to hold no delimiter.
    scanned: usize,
    /// Capacity reserved ahead of each read.
    chunk: usize,
}

impl FrameBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            scanned: 0,
            chunk: capacity.max(1),
        }
    }

    /// Split off the next complete message, without its delimiter.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        match find_delimiter(&self.buf[self.scanned..]) {
            Some(offset) => {
                let end = self.scanned + offset;
                let mut frame = self.buf.split_to(end + 1);
                frame.truncate(end);
                self.scanned = 0;
                Some(frame.freeze())
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Perform one read from `reader`, appending to the buffer.
    ///
    /// Returns the number of bytes read; `0` means end of stream.
    pub async fn read_from<R>(&mut self, reader: &mut R) -> std::io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        self.buf.reserve(self.chunk);
        reader.read_buf(&mut self.buf).await
    }

    /// Bytes received but not yet terminated by a delimiter.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Frame `payload` for the wire by appending the delimiter.
pub fn encode(payload: &[u8]) -> Result<Bytes, EncodeError> {
    if let Some(position) = find_delimiter(payload) {
        return Err(EncodeError { position });
    }
    let mut out = BytesMut::with_capacity(payload.len() + 1);
    out.extend_from_slice(payload);
    out.extend_from_slice(&[DELIMITER]);
    Ok(out.freeze())
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer.iter().position(|&b| b == DELIMITER)
}
