use super::base::ByteStream;
use crate::error::CosResult;
use std::io::SeekFrom;
use std::sync::Arc;

/// An in-memory, `Arc`-shared byte stream.
///
/// Mirrors the teacher repository's `Stream` type: the backing buffer is
/// wrapped in an `Arc` so that sub-ranges (e.g. a stream object's payload, or
/// an object's byte range located via the xref table) can be handed out
/// without copying. `start`/`length` carve out the visible window into
/// `bytes`; `pos` is relative to that window, not to the backing buffer.
pub struct MemoryByteStream {
    bytes: Arc<Vec<u8>>,
    start: usize,
    length: usize,
    pos: u64,
    at_eof: bool,
}

impl MemoryByteStream {
    pub fn new(bytes: Vec<u8>) -> Self {
        let length = bytes.len();
        MemoryByteStream {
            bytes: Arc::new(bytes),
            start: 0,
            length,
            pos: 0,
            at_eof: false,
        }
    }

    pub fn from_arc(bytes: Arc<Vec<u8>>) -> Self {
        let length = bytes.len();
        MemoryByteStream {
            bytes,
            start: 0,
            length,
            pos: 0,
            at_eof: false,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[self.start..self.start + self.length]
    }

    /// Shares the backing buffer with a new stream restricted to
    /// `[start, start+length)` of this stream's own visible window.
    pub fn sub_stream(&self, start: usize, length: usize) -> CosResult<MemoryByteStream> {
        let end = start
            .checked_add(length)
            .ok_or_else(|| crate::error::CosError::out_of_range("sub-stream range overflow"))?;
        if end > self.length {
            return Err(crate::error::CosError::out_of_range(format!(
                "sub-stream [{start},{end}) exceeds length {}",
                self.length
            )));
        }
        Ok(MemoryByteStream {
            bytes: Arc::clone(&self.bytes),
            start: self.start + start,
            length,
            pos: 0,
            at_eof: false,
        })
    }
}

impl ByteStream for MemoryByteStream {
    fn read(&mut self, buf: &mut [u8]) -> CosResult<usize> {
        let pos = self.pos as usize;
        if pos >= self.length {
            self.at_eof = true;
            return Ok(0);
        }
        let n = buf.len().min(self.length - pos);
        let base = self.start + pos;
        buf[..n].copy_from_slice(&self.bytes[base..base + n]);
        self.pos += n as u64;
        if self.pos as usize >= self.length {
            self.at_eof = true;
        }
        Ok(n)
    }

    fn seek(&mut self, pos: SeekFrom) -> CosResult<u64> {
        let len = self.length as i64;
        let base = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
            SeekFrom::End(offset) => len + offset,
        };
        if base < 0 {
            return Err(crate::error::CosError::invalid_argument(
                "seek to negative position",
            ));
        }
        self.pos = base as u64;
        self.at_eof = false;
        Ok(self.pos)
    }

    fn tell(&mut self) -> CosResult<u64> {
        Ok(self.pos)
    }

    fn eof(&self) -> bool {
        self.at_eof
    }

    fn close(&mut self) -> CosResult<()> {
        Ok(())
    }

    fn len(&mut self) -> CosResult<u64> {
        Ok(self.length as u64)
    }
}
