mod base;
mod file;
mod memory;
mod reader;

pub use base::ByteStream;
pub use file::FileByteStream;
pub use memory::MemoryByteStream;
pub use reader::StreamReader;
