use crate::error::CosResult;
use std::io::SeekFrom;

/// A random-access byte source.
///
/// This is the lowest layer of the pipeline: everything else (the buffered
/// [`crate::stream::StreamReader`], the decoding filters, the tokenizer) is
/// built on top of a `ByteStream`. Implementations are not required to
/// support `seek`; a nonseekable stream should fail with
/// [`crate::error::CosError::InvalidArgument`].
pub trait ByteStream {
    /// Reads into `buf`, returning the number of bytes actually read. `0`
    /// means end of stream, not an error.
    fn read(&mut self, buf: &mut [u8]) -> CosResult<usize>;

    /// Repositions the stream. `pos` may carry a negative offset relative
    /// to the current position or the end, per [`SeekFrom`].
    fn seek(&mut self, pos: SeekFrom) -> CosResult<u64>;

    /// Returns the current absolute offset.
    fn tell(&mut self) -> CosResult<u64>;

    /// Returns whether the stream has observed end-of-data on its last
    /// read. Does not itself perform I/O.
    fn eof(&self) -> bool;

    /// Releases any resources the stream owns (file handles, buffers).
    /// Idempotent.
    fn close(&mut self) -> CosResult<()>;

    /// Total length of the stream, if known ahead of time.
    fn len(&mut self) -> CosResult<u64> {
        let current = self.tell()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current))?;
        Ok(end)
    }

    fn is_empty(&mut self) -> CosResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads exactly `buf.len()` bytes, or fails with `Io` if the stream
    /// runs out first.
    fn read_exact(&mut self, buf: &mut [u8]) -> CosResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(crate::error::CosError::io("unexpected end of stream"));
            }
            filled += n;
        }
        Ok(())
    }
}
