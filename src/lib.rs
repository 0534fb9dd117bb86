//! A COS (Carousel Object System) parser: the tokenizer, recursive-descent
//! object grammar, decoding filter chain, and cross-reference model that
//! together read the object layer of a PDF file.
//!
//! This crate stops at the object layer by design — it has no page tree,
//! content-stream interpreter, font or graphics semantics, and no
//! encryption or image-codec support. See `DESIGN.md` for the full
//! rationale and the scope this crate was distilled down to.

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod file_parser;
pub mod filter;
pub mod object;
pub mod parser;
pub mod resolver;
pub mod stream;
pub mod token;
pub mod tokenizer;
pub mod xref;

pub use config::ParserConfig;
pub use diagnostic::{DiagnosticHandler, LoggingDiagnosticHandler, NullDiagnosticHandler, Severity};
pub use error::{CosError, CosResult};
pub use file_parser::FileParser;
pub use object::{Dictionary, ObjId, Object};
pub use parser::{ParseEvent, Parser};
pub use resolver::{NoResolver, ObjectResolver};
pub use stream::{ByteStream, FileByteStream, MemoryByteStream, StreamReader};
pub use tokenizer::Tokenizer;
pub use xref::{Section, Subsection, Trailer, XrefEntry, XrefTable};
