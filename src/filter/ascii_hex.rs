use super::{DecodeBuffer, FilterStream};
use crate::error::CosResult;
use crate::stream::ByteStream;
use std::io::SeekFrom;

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn is_ws(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// Decodes an `ASCIIHexDecode` filter stream: pairs of hex digits become
/// one byte each (most-significant nibble first), whitespace between
/// digits is ignored, `>` terminates the stream, and a lone trailing digit
/// is completed with an implicit `0` low nibble.
pub struct AsciiHexDecoder {
    source: Option<Box<dyn ByteStream>>,
    buffer: DecodeBuffer,
    pending_high_nibble: Option<u8>,
}

impl AsciiHexDecoder {
    pub fn new(capacity: usize) -> Self {
        AsciiHexDecoder {
            source: None,
            buffer: DecodeBuffer::new(capacity),
            pending_high_nibble: None,
        }
    }

    fn read_source_byte(&mut self) -> CosResult<Option<u8>> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| crate::error::CosError::invalid_state("no source attached"))?;
        let mut b = [0u8; 1];
        let n = source.read(&mut b)?;
        if n == 0 { Ok(None) } else { Ok(Some(b[0])) }
    }

    fn refill(&mut self) -> CosResult<()> {
        self.buffer.reset();
        while self.buffer.len < self.buffer.buf.len() {
            let Some(byte) = self.read_source_byte()? else {
                if let Some(high) = self.pending_high_nibble.take() {
                    self.buffer.buf[self.buffer.len] = high << 4;
                    self.buffer.len += 1;
                }
                self.buffer.at_end = true;
                break;
            };
            if is_ws(byte) {
                continue;
            }
            if byte == b'>' {
                if let Some(high) = self.pending_high_nibble.take() {
                    self.buffer.buf[self.buffer.len] = high << 4;
                    self.buffer.len += 1;
                }
                self.buffer.at_end = true;
                break;
            }
            let Some(nibble) = hex_digit(byte) else {
                log::warn!("ASCIIHexDecode: non-hex byte {byte:#x}, aborting block");
                self.buffer.at_end = true;
                break;
            };
            match self.pending_high_nibble.take() {
                Some(high) => {
                    self.buffer.buf[self.buffer.len] = (high << 4) | nibble;
                    self.buffer.len += 1;
                }
                None => self.pending_high_nibble = Some(nibble),
            }
        }
        Ok(())
    }
}

impl FilterStream for AsciiHexDecoder {
    fn attach_source(&mut self, source: Box<dyn ByteStream>) {
        self.source = Some(source);
        self.buffer.reset();
        self.pending_high_nibble = None;
    }

    fn detach_source(&mut self) -> Option<Box<dyn ByteStream>> {
        self.source.take()
    }
}

impl ByteStream for AsciiHexDecoder {
    fn read(&mut self, buf: &mut [u8]) -> CosResult<usize> {
        let mut total = 0;
        while total < buf.len() {
            if self.buffer.is_empty() {
                if self.buffer.at_end {
                    break;
                }
                self.refill()?;
                if self.buffer.is_empty() && self.buffer.at_end {
                    break;
                }
            }
            let n = self.buffer.take(&mut buf[total..]);
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    fn seek(&mut self, _pos: SeekFrom) -> CosResult<u64> {
        Err(crate::error::CosError::invalid_argument(
            "AsciiHexDecoder does not support seeking",
        ))
    }

    fn tell(&mut self) -> CosResult<u64> {
        Err(crate::error::CosError::invalid_argument(
            "AsciiHexDecoder does not support tell",
        ))
    }

    fn eof(&self) -> bool {
        self.buffer.at_end && self.buffer.is_empty()
    }

    fn close(&mut self) -> CosResult<()> {
        if let Some(mut source) = self.source.take() {
            source.close()?;
        }
        Ok(())
    }
}
