use super::base::ByteStream;
use crate::error::CosResult;

/// A buffered, single-byte-oriented façade over a [`ByteStream`].
///
/// Grounded on the `CosStreamReader` primitive in the original C library:
/// a fixed-size read-ahead buffer plus `getc`/`peek`/`ungetc` of exactly one
/// byte. `position()` always reports the absolute offset of the *next* byte
/// that `getc` would return, computed from the buffer's recorded start
/// offset rather than by asking the underlying stream on every call.
///
/// Once the underlying stream reports end-of-data, that state is "sticky":
/// further reads keep returning `None` even if nothing else changed. Call
/// [`StreamReader::reset`] after repositioning the underlying stream
/// (e.g. via an external seek) to clear this latch and resynchronize.
pub struct StreamReader {
    stream: Box<dyn ByteStream>,
    buffer: Vec<u8>,
    buf_pos: usize,
    buf_len: usize,
    buffer_start_offset: u64,
    pushback: Option<u8>,
    last_consumed_offset: Option<u64>,
    eof_latched: bool,
}

impl StreamReader {
    /// `capacity` is clamped up to a minimum of 256 bytes, per the
    /// documented minimum buffer size.
    pub fn new(stream: Box<dyn ByteStream>, capacity: usize) -> Self {
        let capacity = capacity.max(256);
        StreamReader {
            stream,
            buffer: vec![0u8; capacity],
            buf_pos: 0,
            buf_len: 0,
            buffer_start_offset: 0,
            pushback: None,
            last_consumed_offset: None,
            eof_latched: false,
        }
    }

    fn refill(&mut self) -> CosResult<()> {
        self.buffer_start_offset = self.stream.tell()?;
        let n = self.stream.read(&mut self.buffer)?;
        self.buf_pos = 0;
        self.buf_len = n;
        if n == 0 {
            self.eof_latched = true;
        }
        Ok(())
    }

    /// Reads and consumes one byte, or returns `None` at end-of-data.
    pub fn getc(&mut self) -> CosResult<Option<u8>> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }
        if self.buf_pos >= self.buf_len {
            if self.eof_latched {
                return Ok(None);
            }
            self.refill()?;
            if self.buf_len == 0 {
                return Ok(None);
            }
        }
        let b = self.buffer[self.buf_pos];
        self.last_consumed_offset = Some(self.buffer_start_offset + self.buf_pos as u64);
        self.buf_pos += 1;
        Ok(Some(b))
    }

    /// Returns the next byte without consuming it.
    pub fn peek(&mut self) -> CosResult<Option<u8>> {
        if let Some(b) = self.pushback {
            return Ok(Some(b));
        }
        if self.buf_pos >= self.buf_len {
            if self.eof_latched {
                return Ok(None);
            }
            self.refill()?;
            if self.buf_len == 0 {
                return Ok(None);
            }
        }
        Ok(Some(self.buffer[self.buf_pos]))
    }

    /// Pushes a single byte back so the next `getc`/`peek` returns it.
    /// Only one level of pushback is supported, matching the spec's
    /// `ungetc(1)` contract.
    pub fn ungetc(&mut self, byte: u8) {
        self.pushback = Some(byte);
    }

    /// Absolute offset of the next byte `getc` would return.
    pub fn position(&self) -> u64 {
        if self.pushback.is_some() {
            return self.last_consumed_offset.unwrap_or(self.buffer_start_offset);
        }
        self.buffer_start_offset + self.buf_pos as u64
    }

    pub fn is_eof(&self) -> bool {
        self.pushback.is_none() && self.eof_latched && self.buf_pos >= self.buf_len
    }

    /// Clears the buffer and the sticky-EOF latch and resynchronizes to the
    /// underlying stream's current position. Call this after seeking the
    /// underlying stream externally.
    pub fn reset(&mut self) -> CosResult<()> {
        self.buf_pos = 0;
        self.buf_len = 0;
        self.pushback = None;
        self.eof_latched = false;
        self.buffer_start_offset = self.stream.tell()?;
        Ok(())
    }

    pub fn stream_mut(&mut self) -> &mut dyn ByteStream {
        self.stream.as_mut()
    }
}
