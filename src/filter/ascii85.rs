use super::{DecodeBuffer, FilterStream};
use crate::error::CosResult;
use crate::stream::ByteStream;
use std::io::SeekFrom;

const PAD_DIGIT: u64 = 84; // 'u' (117) - '!' (33) == 84, the PDF-spec padding digit.

fn is_ws(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// Decodes an `ASCII85Decode` filter stream. Five characters in `[!..u]`
/// decode to four big-endian base-85 bytes; `z` alone (only valid at the
/// start of a group) expands to four zero bytes; `~>` terminates the
/// stream; a final partial group of `k` characters (1 < k <= 4) is padded
/// with the literal character `u` (base-85 digit 84) and decodes to `k-1`
/// bytes.
///
/// Note: some ASCII85 implementations pad the final group with the raw
/// byte value of `u` (117) rather than the base-85 digit 84 — those two
/// happen to be the same value, so this decoder's behavior matches both
/// the PDF specification and any source that makes that conflation.
pub struct Ascii85Decoder {
    source: Option<Box<dyn ByteStream>>,
    buffer: DecodeBuffer,
    group: [u64; 5],
    group_len: usize,
    terminated: bool,
}

impl Ascii85Decoder {
    pub fn new(capacity: usize) -> Self {
        Ascii85Decoder {
            source: None,
            buffer: DecodeBuffer::new(capacity),
            group: [0; 5],
            group_len: 0,
            terminated: false,
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

    fn emit_group(&mut self, digits: &[u64], out_len: usize) {
        let mut value: u64 = 0;
        for &d in digits {
            value = value * 85 + d;
        }
        let bytes = (value as u32).to_be_bytes();
        for &b in &bytes[..out_len] {
            self.buffer.buf[self.buffer.len] = b;
            self.buffer.len += 1;
        }
    }

    fn flush_partial_group(&mut self) {
        if self.group_len == 0 {
            return;
        }
        let mut digits = self.group;
        for d in digits.iter_mut().skip(self.group_len) {
            *d = PAD_DIGIT;
        }
        self.emit_group(&digits, self.group_len - 1);
        self.group_len = 0;
    }

    fn refill(&mut self) -> CosResult<()> {
        self.buffer.reset();
        while self.buffer.len + 4 <= self.buffer.buf.len() {
            let Some(byte) = self.read_source_byte()? else {
                self.flush_partial_group();
                self.buffer.at_end = true;
                break;
            };
            if is_ws(byte) {
                continue;
            }
            if byte == b'~' {
                // Expect '>' next; tolerate anything by simply terminating.
                let _ = self.read_source_byte()?;
                self.flush_partial_group();
                self.terminated = true;
                self.buffer.at_end = true;
                break;
            }
            if byte == b'z' && self.group_len == 0 {
                self.buffer.buf[self.buffer.len..self.buffer.len + 4].fill(0);
                self.buffer.len += 4;
                continue;
            }
            if !(b'!'..=b'u').contains(&byte) {
                log::warn!("ASCII85Decode: invalid byte {byte:#x}, aborting block");
                self.flush_partial_group();
                self.buffer.at_end = true;
                break;
            }
            self.group[self.group_len] = (byte - b'!') as u64;
            self.group_len += 1;
            if self.group_len == 5 {
                self.emit_group(&self.group.clone(), 4);
                self.group_len = 0;
            }
        }
        Ok(())
    }
}

impl FilterStream for Ascii85Decoder {
    fn attach_source(&mut self, source: Box<dyn ByteStream>) {
        self.source = Some(source);
        self.buffer.reset();
        self.group_len = 0;
        self.terminated = false;
    }

    fn detach_source(&mut self) -> Option<Box<dyn ByteStream>> {
        self.source.take()
    }
}

impl ByteStream for Ascii85Decoder {
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
            "Ascii85Decoder does not support seeking",
        ))
    }

    fn tell(&mut self) -> CosResult<u64> {
        Err(crate::error::CosError::invalid_argument(
            "Ascii85Decoder does not support tell",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryByteStream;

    fn decode_all(input: &[u8]) -> Vec<u8> {
        let mut f = Ascii85Decoder::new(256);
        f.attach_source(Box::new(MemoryByteStream::new(input.to_vec())));
        let mut out = Vec::new();
        let mut buf = [0u8; 16];
        loop {
            let n = f.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn decodes_alphabet() {
        let decoded = decode_all(b"@:E_WAS,RgBkhF\"D/O92EH6,BF`qtRH$T~>");
        assert_eq!(decoded, b"abcdefghijklmnopqrstuvwxyz");
    }

    #[test]
    fn z_expands_to_four_zero_bytes() {
        let decoded = decode_all(b"z~>");
        assert_eq!(decoded, vec![0, 0, 0, 0]);
    }

    #[test]
    fn partial_final_group_of_two_decodes_to_one_byte() {
        // "!!" -> digits [0,0] padded to [0,0,84,84,84]
        let decoded = decode_all(b"!!~>");
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn whitespace_between_characters_is_ignored() {
        let a = decode_all(b"87cURD_*#4DfTZ)+T~>");
        let b = decode_all(b"87cURD_*#4D\nfTZ)+T~>");
        assert_eq!(a, b);
    }
}
