use super::base::ByteStream;
use crate::error::CosResult;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A `ByteStream` backed directly by a filesystem file.
///
/// Unlike the teacher repository's `FileChunkedStream`, this does not do
/// progressive chunk loading or LRU chunk eviction — that machinery exists
/// to support network/progressive loading, which is out of scope here. This
/// is a thin, synchronous wrapper over `std::fs::File`.
pub struct FileByteStream {
    file: Option<File>,
    at_eof: bool,
}

impl FileByteStream {
    pub fn open<P: AsRef<Path>>(path: P) -> CosResult<Self> {
        let file = File::open(path)?;
        Ok(FileByteStream {
            file: Some(file),
            at_eof: false,
        })
    }

    pub fn from_file(file: File) -> Self {
        FileByteStream {
            file: Some(file),
            at_eof: false,
        }
    }

    fn file_mut(&mut self) -> CosResult<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| crate::error::CosError::invalid_state("stream has been closed"))
    }
}

impl ByteStream for FileByteStream {
    fn read(&mut self, buf: &mut [u8]) -> CosResult<usize> {
        let n = self.file_mut()?.read(buf)?;
        if n == 0 {
            self.at_eof = true;
        }
        Ok(n)
    }

    fn seek(&mut self, pos: SeekFrom) -> CosResult<u64> {
        let offset = self.file_mut()?.seek(pos)?;
        self.at_eof = false;
        Ok(offset)
    }

    fn tell(&mut self) -> CosResult<u64> {
        Ok(self.file_mut()?.stream_position()?)
    }

    fn eof(&self) -> bool {
        self.at_eof
    }

    fn close(&mut self) -> CosResult<()> {
        self.file = None;
        Ok(())
    }
}
