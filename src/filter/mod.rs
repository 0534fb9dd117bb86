mod ascii85;
mod ascii_hex;
mod run_length;

pub use ascii85::Ascii85Decoder;
pub use ascii_hex::AsciiHexDecoder;
pub use run_length::RunLengthDecoder;

use crate::stream::ByteStream;

/// A stream whose bytes are produced by decoding an attached upstream
/// source. Concrete decoders (ASCIIHex, ASCII85, RunLength) implement
/// [`ByteStream`] directly and additionally support being detached from
/// one source and attached to another, the way the original filter-object
/// vtable supported re-initializing a filter instance.
pub trait FilterStream: ByteStream {
    fn attach_source(&mut self, source: Box<dyn ByteStream>);
    fn detach_source(&mut self) -> Option<Box<dyn ByteStream>>;
}

/// Shared decode-buffer bookkeeping used by every concrete filter: a small
/// ring of already-decoded bytes plus an end-of-data latch. `read_decoded`
/// implements the generic "refill if empty and not at end, then copy"
/// loop from the specification; filters only need to implement `refill`.
pub(crate) struct DecodeBuffer {
    pub buf: Vec<u8>,
    pub pos: usize,
    pub len: usize,
    pub at_end: bool,
}

impl DecodeBuffer {
    pub fn new(capacity: usize) -> Self {
        DecodeBuffer {
            buf: vec![0u8; capacity.max(256)],
            pos: 0,
            len: 0,
            at_end: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.len
    }

    pub fn reset(&mut self) {
        self.pos = 0;
        self.len = 0;
        self.at_end = false;
    }

    pub fn take(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.len - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        n
    }
}
