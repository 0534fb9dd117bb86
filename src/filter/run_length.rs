use super::{DecodeBuffer, FilterStream};
use crate::error::CosResult;
use crate::stream::ByteStream;
use std::io::SeekFrom;

enum RunState {
    /// Waiting for the next length byte.
    Idle,
    /// Copying `remaining` more literal bytes verbatim.
    Literal(usize),
    /// Emitting `remaining` more copies of `byte`.
    Replicate(u8, usize),
}

/// Decodes a `RunLengthDecode` filter stream. Each run begins with a length
/// byte `L`: `128` marks end-of-data, `0..=127` introduces a literal run of
/// `L+1` verbatim bytes, and `129..=255` introduces a replicated run of one
/// byte repeated `257-L` times. A run that doesn't fully fit in one refill
/// resumes across refills via the stored [`RunState`].
pub struct RunLengthDecoder {
    source: Option<Box<dyn ByteStream>>,
    buffer: DecodeBuffer,
    state: RunState,
}

impl RunLengthDecoder {
    pub fn new(capacity: usize) -> Self {
        RunLengthDecoder {
            source: None,
            buffer: DecodeBuffer::new(capacity),
            state: RunState::Idle,
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
            match self.state {
                RunState::Idle => {
                    let Some(length_byte) = self.read_source_byte()? else {
                        self.buffer.at_end = true;
                        break;
                    };
                    match length_byte {
                        128 => {
                            self.buffer.at_end = true;
                            break;
                        }
                        0..=127 => self.state = RunState::Literal(length_byte as usize + 1),
                        _ => {
                            let Some(byte) = self.read_source_byte()? else {
                                log::warn!("RunLengthDecode: truncated replicate run");
                                self.buffer.at_end = true;
                                break;
                            };
                            self.state = RunState::Replicate(byte, 257 - length_byte as usize);
                        }
                    }
                }
                RunState::Literal(remaining) => {
                    let Some(byte) = self.read_source_byte()? else {
                        log::warn!("RunLengthDecode: truncated literal run");
                        self.buffer.at_end = true;
                        break;
                    };
                    self.buffer.buf[self.buffer.len] = byte;
                    self.buffer.len += 1;
                    self.state = if remaining > 1 {
                        RunState::Literal(remaining - 1)
                    } else {
                        RunState::Idle
                    };
                }
                RunState::Replicate(byte, remaining) => {
                    self.buffer.buf[self.buffer.len] = byte;
                    self.buffer.len += 1;
                    self.state = if remaining > 1 {
                        RunState::Replicate(byte, remaining - 1)
                    } else {
                        RunState::Idle
                    };
                }
            }
        }
        Ok(())
    }
}

impl FilterStream for RunLengthDecoder {
    fn attach_source(&mut self, source: Box<dyn ByteStream>) {
        self.source = Some(source);
        self.buffer.reset();
        self.state = RunState::Idle;
    }

    fn detach_source(&mut self) -> Option<Box<dyn ByteStream>> {
        self.source.take()
    }
}

impl ByteStream for RunLengthDecoder {
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
            "RunLengthDecoder does not support seeking",
        ))
    }

    fn tell(&mut self) -> CosResult<u64> {
        Err(crate::error::CosError::invalid_argument(
            "RunLengthDecoder does not support tell",
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
