use crate::config::ParserConfig;
use crate::diagnostic::{DiagnosticHandler, NullDiagnosticHandler};
use crate::error::{CosError, CosResult};
use crate::object::{ObjId, Object};
use crate::parser::{ParseEvent, Parser};
use crate::resolver::ObjectResolver;
use crate::stream::{MemoryByteStream, StreamReader};
use crate::tokenizer::Tokenizer;
use crate::xref::{Section, Subsection, Trailer, XrefEntry, XrefTable};
use lru::LruCache;
use rustc_hash::FxBuildHasher;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Orchestrates the whole-file parse: locates the header and the trailer
/// tail, drives the xref-table reader across the `/Prev` chain, and
/// resolves indirect objects on demand, caching the results.
///
/// Grounded on the teacher repository's `XRef::fetch`, but replaces its
/// unsafe self-referential reference-resolver pointer with plain recursive
/// calls: because the whole file is held as a shared `Arc<Vec<u8>>`, a
/// nested resolution (e.g. for an indirect `/Length`) builds its own
/// independent `StreamReader` over a fresh view of that same buffer rather
/// than re-entering the in-progress parser's cursor.
pub struct FileParser {
    data: Arc<Vec<u8>>,
    config: ParserConfig,
    diagnostics: Arc<dyn DiagnosticHandler>,
    table: XrefTable,
    trailer: Option<Trailer>,
    cache: LruCache<ObjId, Object, FxBuildHasher>,
}

impl FileParser {
    pub fn open(data: Vec<u8>, config: ParserConfig, diagnostics: Arc<dyn DiagnosticHandler>) -> CosResult<Self> {
        let capacity = NonZeroUsize::new(config.object_cache_capacity.max(1)).unwrap();
        let mut parser = FileParser {
            data: Arc::new(data),
            config,
            diagnostics,
            table: XrefTable::new(),
            trailer: None,
            cache: LruCache::with_hasher(capacity, FxBuildHasher),
        };
        parser.check_header()?;
        let start = parser.locate_startxref()?;
        parser.load_xref_chain(start)?;
        Ok(parser)
    }

    pub fn with_default_diagnostics(data: Vec<u8>, config: ParserConfig) -> CosResult<Self> {
        Self::open(data, config, Arc::new(NullDiagnosticHandler))
    }

    pub fn trailer(&self) -> Option<&Trailer> {
        self.trailer.as_ref()
    }

    pub fn xref_table(&self) -> &XrefTable {
        &self.table
    }

    /// Looks up `/Root` in the (possibly chained) trailer dictionary.
    pub fn catalog_reference(&self) -> Option<ObjId> {
        self.trailer
            .as_ref()
            .and_then(|t| t.dict.get(b"Root"))
            .and_then(Object::as_reference)
    }

    pub fn get_object(&mut self, id: ObjId) -> CosResult<Object> {
        self.resolve(id)
    }

    // ---- §4.6 step 1: header -------------------------------------------------

    fn check_header(&self) -> CosResult<()> {
        let needle = b"%PDF-";
        // Strict mode never tolerates leading garbage before the header, so
        // only byte 0 is even a candidate match; lenient mode searches up to
        // `max_header_garbage` bytes in, per §4.6 step 1.
        let window_len = if self.config.strict {
            needle.len()
        } else {
            self.config.max_header_garbage + needle.len()
        };
        let search_window = &self.data[..self.data.len().min(window_len)];
        let pos = search_window
            .windows(needle.len())
            .position(|w| w == needle)
            .ok_or_else(|| CosError::syntax("no '%PDF-M.N' header found", 0))?;
        if pos != 0 && self.config.strict {
            return Err(CosError::syntax(
                "header must begin at byte 0 in strict mode",
                0,
            ));
        }
        let rest = &self.data[pos + needle.len()..];
        let major = rest.first().filter(|b| b.is_ascii_digit());
        let minor = rest.get(2).filter(|b| b.is_ascii_digit());
        if rest.get(1) != Some(&b'.') || major.is_none() || minor.is_none() {
            return Err(CosError::syntax("malformed '%PDF-M.N' header", pos));
        }
        Ok(())
    }

    // ---- §4.6 step 2: locate the trailer tail --------------------------------

    fn locate_startxref(&self) -> CosResult<usize> {
        let tail_start = self.data.len().saturating_sub(256);
        let tail = &self.data[tail_start..];
        let eof_pos = tail
            .windows(5)
            .rposition(|w| w == b"%%EOF")
            .ok_or_else(|| CosError::xref("no '%%EOF' marker found near end of file"))?;

        let before_eof = &tail[..eof_pos];
        let digits_end = before_eof
            .iter()
            .rposition(|b| b.is_ascii_digit())
            .ok_or_else(|| CosError::xref("no startxref offset found before '%%EOF'"))?;
        let digits_start = before_eof[..=digits_end]
            .iter()
            .rposition(|b| !b.is_ascii_digit())
            .map(|p| p + 1)
            .unwrap_or(0);
        let offset_text = std::str::from_utf8(&before_eof[digits_start..=digits_end])
            .map_err(|_| CosError::xref("startxref offset is not ASCII"))?;
        let offset: usize = offset_text
            .parse()
            .map_err(|_| CosError::xref(format!("invalid startxref offset '{offset_text}'")))?;

        let keyword_region = &before_eof[..digits_start];
        if !keyword_region
            .windows(b"startxref".len())
            .any(|w| w == b"startxref")
        {
            return Err(CosError::xref("'startxref' keyword not found before offset"));
        }
        if offset > self.data.len() {
            return Err(CosError::xref("startxref offset is past end of file"));
        }
        Ok(offset)
    }

    // ---- §4.6 step 3: drive the xref chain -----------------------------------

    fn load_xref_chain(&mut self, start_offset: usize) -> CosResult<()> {
        let mut next = Some(start_offset);
        let mut seen_offsets = std::collections::HashSet::new();
        let mut chain: Vec<Trailer> = Vec::new();

        while let Some(offset) = next {
            if !seen_offsets.insert(offset) {
                self.diagnostics
                    .warn("cyclic '/Prev' chain detected, stopping xref traversal");
                break;
            }
            let (section, trailer_dict, prev_offset) = self.parse_one_xref_section(offset)?;
            self.table.push_newest(section);
            let trailer = Trailer {
                dict: trailer_dict,
                last_xref_offset: offset as u32,
                previous: None,
            };
            chain.push(trailer);
            next = prev_offset;
        }

        // Thread the `previous` links (newest at index 0).
        let mut iter = chain.into_iter().rev();
        let mut linked: Option<Trailer> = None;
        for mut t in iter.by_ref() {
            t.previous = linked.take().map(Box::new);
            linked = Some(t);
        }
        self.trailer = linked;
        if self.trailer.is_none() {
            return Err(CosError::xref("no trailer found"));
        }
        Ok(())
    }

    fn parse_one_xref_section(
        &mut self,
        offset: usize,
    ) -> CosResult<(Section, crate::object::Dictionary, Option<usize>)> {
        if offset >= self.data.len() {
            return Err(CosError::xref("xref offset is past end of file"));
        }
        let mut pos = offset;
        pos = skip_ws(&self.data, pos);
        if !self.data[pos..].starts_with(b"xref") {
            return Err(CosError::xref(
                "xref-stream objects are not supported by this parser; expected classical 'xref' keyword",
            ));
        }
        pos += b"xref".len();

        let mut section = Section::default();
        loop {
            pos = skip_ws(&self.data, pos);
            if self.data[pos..].starts_with(b"trailer") {
                pos += b"trailer".len();
                break;
            }
            let (first, count, new_pos) = parse_subsection_header(&self.data, pos)?;
            pos = new_pos;
            let mut entries = Vec::with_capacity(count);
            for _ in 0..count {
                if pos + 20 > self.data.len() {
                    return Err(CosError::xref("xref subsection truncated"));
                }
                let line = &self.data[pos..pos + 20];
                entries.push(XrefEntry::parse_classical(line, self.config.strict)?);
                pos += 20;
            }
            section.subsections.push(Subsection::new(first, entries));
        }

        pos = skip_ws(&self.data, pos);
        let sub_stream = MemoryByteStream::new(self.data[pos..].to_vec());
        let reader = StreamReader::new(Box::new(sub_stream), self.config.stream_reader_buffer_size);
        let tokenizer = Tokenizer::new(reader, self.config, self.diagnostics.clone());
        let mut trailer_parser = Parser::new(tokenizer, self.config, self.diagnostics.clone());
        let mut no_resolver = crate::resolver::NoResolver;
        let trailer_dict = match trailer_parser.next_object(&mut no_resolver)? {
            ParseEvent::Object(Object::Dictionary(d)) => d,
            other => return Err(CosError::xref(format!("expected trailer dictionary, found {other:?}"))),
        };

        let prev = trailer_dict
            .get(b"Prev")
            .and_then(Object::as_integer)
            .map(|v| v as usize);

        Ok((section, trailer_dict, prev))
    }

    fn byte_stream_at(&self, offset: usize) -> MemoryByteStream {
        MemoryByteStream::from_arc(Arc::clone(&self.data)).sub_stream(offset, self.data.len() - offset)
            .unwrap_or_else(|_| MemoryByteStream::new(Vec::new()))
    }
}

impl ObjectResolver for FileParser {
    fn resolve(&mut self, id: ObjId) -> CosResult<Object> {
        if let Some(cached) = self.cache.get(&id) {
            return Ok(cached.clone());
        }
        let entry = self
            .table
            .lookup(id.object_number)
            .copied()
            .ok_or_else(|| CosError::xref(format!("no xref entry for object {id}")))?;
        let value = match entry {
            XrefEntry::Free { .. } => {
                return Err(CosError::xref(format!("object {id} is marked free")));
            }
            XrefEntry::Compressed { .. } => {
                return Err(CosError::invalid_state(
                    "compressed (xref-stream) object resolution is not supported",
                ));
            }
            XrefEntry::InUse { byte_offset, .. } => {
                let stream = self.byte_stream_at(byte_offset as usize);
                let reader =
                    StreamReader::new(Box::new(stream), self.config.stream_reader_buffer_size);
                let tokenizer = Tokenizer::new(reader, self.config, self.diagnostics.clone());
                let mut object_parser = Parser::new(tokenizer, self.config, self.diagnostics.clone());
                match object_parser.next_object(self)? {
                    ParseEvent::Object(Object::Indirect(got_id, value)) => {
                        if got_id != id {
                            self.diagnostics.warn(&format!(
                                "xref pointed at object {got_id} while resolving {id}"
                            ));
                        }
                        *value
                    }
                    other => {
                        return Err(CosError::syntax(
                            format!("expected an indirect object definition at offset {byte_offset}, found {other:?}"),
                            byte_offset as usize,
                        ));
                    }
                }
            }
        };
        self.cache.put(id, value.clone());
        Ok(value)
    }
}

fn skip_ws(data: &[u8], mut pos: usize) -> usize {
    while pos < data.len() && matches!(data[pos], 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20) {
        pos += 1;
    }
    pos
}

fn parse_subsection_header(data: &[u8], mut pos: usize) -> CosResult<(u32, usize, usize)> {
    pos = skip_ws(data, pos);
    let first_start = pos;
    while pos < data.len() && data[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == first_start {
        return Err(CosError::xref("expected subsection first-object-number"));
    }
    let first: u32 = std::str::from_utf8(&data[first_start..pos])
        .unwrap()
        .parse()
        .map_err(|_| CosError::xref("subsection first-object-number is not a valid u32"))?;
    pos = skip_ws(data, pos);
    let count_start = pos;
    while pos < data.len() && data[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == count_start {
        return Err(CosError::xref("expected subsection entry count"));
    }
    let count: usize = std::str::from_utf8(&data[count_start..pos])
        .unwrap()
        .parse()
        .map_err(|_| CosError::xref("subsection entry count is not a valid usize"))?;
    pos = skip_ws(data, pos);
    Ok((first, count, pos))
}
