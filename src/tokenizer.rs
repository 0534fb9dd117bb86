use crate::config::ParserConfig;
use crate::diagnostic::DiagnosticHandler;
use crate::error::{CosError, CosResult};
use crate::stream::StreamReader;
use crate::token::{Keyword, Token, TokenKind};
use smallvec::SmallVec;
use std::sync::Arc;

fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_eol(b: u8) -> bool {
    b == 0x0A || b == 0x0D
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Converts a byte stream into a lazily-produced sequence of [`Token`]s
/// under PDF lexical rules, with a two-token look-ahead queue.
///
/// Rust's ownership model makes the source library's free-list of recycled
/// token envelopes unnecessary: tokens here are ordinary owned values and
/// are simply dropped once consumed (a documented deviation; see
/// `DESIGN.md`).
pub struct Tokenizer {
    reader: StreamReader,
    config: ParserConfig,
    diagnostics: Arc<dyn DiagnosticHandler>,
    /// The two-token look-ahead queue realizing the bounded integer
    /// reservoir the object grammar needs to disambiguate `N`, `N N R`, and
    /// `N N obj`. Almost always 0 or 1 entries, never more than 2, so an
    /// inline `SmallVec` avoids a heap allocation per tokenizer instance.
    peeked: SmallVec<[Token; 2]>,
}

impl Tokenizer {
    pub fn new(
        reader: StreamReader,
        config: ParserConfig,
        diagnostics: Arc<dyn DiagnosticHandler>,
    ) -> Self {
        Tokenizer {
            reader,
            config,
            diagnostics,
            peeked: SmallVec::new(),
        }
    }

    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    pub fn reader_mut(&mut self) -> &mut StreamReader {
        &mut self.reader
    }

    /// Clears the look-ahead queue. Call after repositioning the
    /// underlying stream externally.
    pub fn reset(&mut self) -> CosResult<()> {
        self.peeked.clear();
        self.reader.reset()
    }

    pub fn has_next(&mut self) -> CosResult<bool> {
        Ok(!self.peek_next()?.is_eof())
    }

    pub fn peek_next(&mut self) -> CosResult<&Token> {
        if self.peeked.is_empty() {
            let t = self.scan_token()?;
            self.peeked.push(t);
        }
        Ok(&self.peeked[0])
    }

    pub fn peek_next_next(&mut self) -> CosResult<&Token> {
        while self.peeked.len() < 2 {
            let t = self.scan_token()?;
            self.peeked.push(t);
        }
        Ok(&self.peeked[1])
    }

    pub fn get_next(&mut self) -> CosResult<Token> {
        if !self.peeked.is_empty() {
            return Ok(self.peeked.remove(0));
        }
        self.scan_token()
    }

    /// Consumes and returns the next token only if it matches `kind_eq`.
    pub fn match_next<F: FnOnce(&TokenKind) -> bool>(
        &mut self,
        kind_eq: F,
    ) -> CosResult<Option<Token>> {
        if kind_eq(&self.peek_next()?.kind) {
            Ok(Some(self.get_next()?))
        } else {
            Ok(None)
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> CosResult<()> {
        loop {
            match self.reader.peek()? {
                Some(b) if is_whitespace(b) => {
                    self.reader.getc()?;
                }
                Some(b'%') => {
                    self.reader.getc()?;
                    loop {
                        match self.reader.getc()? {
                            None => break,
                            Some(b) if is_eol(b) => break,
                            _ => {}
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn unknown(&self, offset: usize, length: usize, message: &str) -> Token {
        self.diagnostics.error(message);
        Token::new(TokenKind::Unknown, offset, length)
    }

    fn scan_token(&mut self) -> CosResult<Token> {
        self.skip_whitespace_and_comments()?;
        let offset = self.reader.position() as usize;
        let Some(c) = self.reader.getc()? else {
            return Ok(Token::new(TokenKind::Eof, offset, 0));
        };
        match c {
            b'[' => Ok(Token::new(TokenKind::ArrayStart, offset, 1)),
            b']' => Ok(Token::new(TokenKind::ArrayEnd, offset, 1)),
            b'<' => {
                if self.reader.peek()? == Some(b'<') {
                    self.reader.getc()?;
                    Ok(Token::new(TokenKind::DictStart, offset, 2))
                } else {
                    self.scan_hex_string(offset)
                }
            }
            b'>' => {
                if self.reader.peek()? == Some(b'>') {
                    self.reader.getc()?;
                    Ok(Token::new(TokenKind::DictEnd, offset, 2))
                } else {
                    Ok(self.unknown(offset, 1, "stray '>' outside dictionary terminator"))
                }
            }
            b'(' => self.scan_literal_string(offset),
            b'/' => self.scan_name(offset),
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.scan_number(c, offset),
            b'{' | b'}' => Ok(Token::new(TokenKind::Unknown, offset, 1)),
            b')' => Ok(self.unknown(offset, 1, "stray ')' with no matching '('")),
            _ => self.scan_keyword(c, offset),
        }
    }

    fn scan_literal_string(&mut self, offset: usize) -> CosResult<Token> {
        let mut out = Vec::new();
        let mut depth: u32 = 1;
        loop {
            let Some(c) = self.reader.getc()? else {
                return Ok(self.unknown(
                    offset,
                    self.reader.position() as usize - offset,
                    "unterminated literal string",
                ));
            };
            match c {
                b'(' => {
                    depth += 1;
                    out.push(c);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(c);
                }
                b'\\' => {
                    let Some(next) = self.reader.getc()? else {
                        return Ok(self.unknown(
                            offset,
                            self.reader.position() as usize - offset,
                            "literal string ends with a trailing backslash",
                        ));
                    };
                    match next {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'(' => out.push(b'('),
                        b')' => out.push(b')'),
                        b'\\' => out.push(b'\\'),
                        b'\r' => {
                            if self.reader.peek()? == Some(b'\n') {
                                self.reader.getc()?;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut value = (next - b'0') as u32;
                            for _ in 0..2 {
                                match self.reader.peek()? {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + (d - b'0') as u32;
                                        self.reader.getc()?;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value % 256) as u8);
                        }
                        other => out.push(other),
                    }
                }
                b'\r' => {
                    if self.reader.peek()? == Some(b'\n') {
                        self.reader.getc()?;
                    }
                    out.push(b'\n');
                }
                _ => out.push(c),
            }
        }
        let length = self.reader.position() as usize - offset;
        Ok(Token::new(TokenKind::LiteralString(out), offset, length))
    }

    fn scan_hex_string(&mut self, offset: usize) -> CosResult<Token> {
        let mut out = Vec::new();
        let mut pending_high: Option<u8> = None;
        loop {
            let Some(c) = self.reader.getc()? else {
                return Ok(self.unknown(
                    offset,
                    self.reader.position() as usize - offset,
                    "unterminated hex string",
                ));
            };
            if c == b'>' {
                if let Some(high) = pending_high.take() {
                    out.push(high << 4);
                }
                break;
            }
            if is_whitespace(c) {
                continue;
            }
            let nibble = match hex_digit(c) {
                Some(n) => n,
                None => {
                    if self.config.strict {
                        return Ok(self.unknown(
                            offset,
                            self.reader.position() as usize - offset,
                            "non-hex byte inside hex string",
                        ));
                    }
                    0
                }
            };
            match pending_high.take() {
                Some(high) => out.push((high << 4) | nibble),
                None => pending_high = Some(nibble),
            }
        }
        let length = self.reader.position() as usize - offset;
        Ok(Token::new(TokenKind::HexString(out), offset, length))
    }

    fn scan_name(&mut self, offset: usize) -> CosResult<Token> {
        let mut out = Vec::new();
        loop {
            match self.reader.peek()? {
                Some(b) if !is_whitespace(b) && !is_delimiter(b) => {
                    self.reader.getc()?;
                    if b == b'#' {
                        let hi = self.reader.getc()?;
                        let lo = self.reader.getc()?;
                        match (hi.and_then(hex_digit), lo.and_then(hex_digit)) {
                            (Some(h), Some(l)) => out.push((h << 4) | l),
                            _ => {
                                return Ok(self.unknown(
                                    offset,
                                    self.reader.position() as usize - offset,
                                    "incomplete or non-hex '#' escape in name",
                                ));
                            }
                        }
                    } else {
                        out.push(b);
                    }
                }
                _ => break,
            }
        }
        if out.len() > 127 {
            self.diagnostics
                .warn(&format!("name exceeds 127 bytes after decoding ({} bytes)", out.len()));
        }
        let length = self.reader.position() as usize - offset;
        Ok(Token::new(TokenKind::Name(out), offset, length))
    }

    fn scan_number(&mut self, first: u8, offset: usize) -> CosResult<Token> {
        let mut lexeme = vec![first];
        let mut saw_dot = first == b'.';
        let mut saw_digit = first.is_ascii_digit();
        loop {
            match self.reader.peek()? {
                Some(b @ b'0'..=b'9') => {
                    saw_digit = true;
                    lexeme.push(b);
                    self.reader.getc()?;
                }
                Some(b'.') if !saw_dot => {
                    saw_dot = true;
                    lexeme.push(b'.');
                    self.reader.getc()?;
                }
                _ => break,
            }
        }
        if !saw_digit {
            return Ok(self.unknown(
                offset,
                lexeme.len(),
                "numeral has no digits",
            ));
        }
        let length = lexeme.len();
        let text = std::str::from_utf8(&lexeme).unwrap();
        if saw_dot {
            let frac_digits = text.rsplit('.').next().unwrap_or("").len();
            if frac_digits > 5 && self.config.strict {
                return Ok(self.unknown(
                    offset,
                    length,
                    "real literal has more than 5 fractional digits",
                ));
            }
            match text.parse::<f64>() {
                Ok(v) => Ok(Token::new(TokenKind::Real(v), offset, length)),
                Err(_) => Ok(self.unknown(offset, length, "malformed real literal")),
            }
        } else {
            match text.parse::<i32>() {
                Ok(v) => Ok(Token::new(TokenKind::Integer(v), offset, length)),
                Err(_) => {
                    if self.config.strict {
                        return Err(CosError::out_of_range(format!(
                            "integer literal '{text}' overflows i32"
                        )));
                    }
                    // Lenient mode: keep the full value in a widened token
                    // rather than silently truncating or aborting.
                    match text.parse::<i64>() {
                        Ok(v) => Ok(Token::new(TokenKind::WideInteger(v), offset, length)),
                        Err(_) => Ok(self.unknown(offset, length, "integer literal overflow")),
                    }
                }
            }
        }
    }

    fn scan_keyword(&mut self, first: u8, offset: usize) -> CosResult<Token> {
        let mut word = vec![first];
        loop {
            match self.reader.peek()? {
                Some(b) if !is_whitespace(b) && !is_delimiter(b) => {
                    word.push(b);
                    self.reader.getc()?;
                    if word.len() > 128 {
                        break;
                    }
                }
                _ => break,
            }
        }
        let length = word.len();
        match Keyword::from_bytes(&word) {
            Some(kw) => Ok(Token::new(TokenKind::Keyword(kw), offset, length)),
            None => Ok(Token::new(TokenKind::Unknown, offset, length)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::RecordingDiagnosticHandler;
    use crate::stream::MemoryByteStream;

    fn tokenize_all(input: &[u8]) -> Vec<TokenKind> {
        let reader = StreamReader::new(Box::new(MemoryByteStream::new(input.to_vec())), 256);
        let diag = Arc::new(RecordingDiagnosticHandler::new());
        let mut t = Tokenizer::new(reader, ParserConfig::default(), diag);
        let mut out = Vec::new();
        loop {
            let tok = t.get_next().unwrap();
            if tok.is_eof() {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn literal_string_with_escapes() {
        let out = tokenize_all(b"(a\\(b\\)c)");
        assert_eq!(out, vec![TokenKind::LiteralString(b"a(b)c".to_vec())]);
    }

    #[test]
    fn literal_string_octal_escape() {
        let out = tokenize_all(b"(\\101\\102)");
        assert_eq!(out, vec![TokenKind::LiteralString(b"AB".to_vec())]);
    }

    #[test]
    fn literal_string_line_continuation_drops_backslash_and_eol() {
        let out = tokenize_all(b"(a\\\nb)");
        assert_eq!(out, vec![TokenKind::LiteralString(b"ab".to_vec())]);
    }

    #[test]
    fn hex_string_decodes_hello() {
        let out = tokenize_all(b"<48 65 6C 6C 6F>");
        assert_eq!(out, vec![TokenKind::HexString(b"Hello".to_vec())]);
    }

    #[test]
    fn hex_string_odd_digit_implicit_zero() {
        let out = tokenize_all(b"<4>");
        assert_eq!(out, vec![TokenKind::HexString(vec![0x40])]);
    }

    #[test]
    fn name_with_hash_escapes() {
        let out = tokenize_all(b"/Name#20with#20spaces");
        assert_eq!(out, vec![TokenKind::Name(b"Name with spaces".to_vec())]);
    }

    #[test]
    fn real_number_negative() {
        let out = tokenize_all(b"-3.14");
        assert_eq!(out, vec![TokenKind::Real(-3.14)]);
    }

    #[test]
    fn integer_token() {
        let out = tokenize_all(b"7");
        assert_eq!(out, vec![TokenKind::Integer(7)]);
    }

    #[test]
    fn dict_and_array_delimiters() {
        let out = tokenize_all(b"<< >> [ ]");
        assert_eq!(
            out,
            vec![
                TokenKind::DictStart,
                TokenKind::DictEnd,
                TokenKind::ArrayStart,
                TokenKind::ArrayEnd,
            ]
        );
    }

    #[test]
    fn keywords_recognized() {
        let out = tokenize_all(b"true false null R obj endobj stream endstream xref n f trailer startxref");
        assert_eq!(
            out,
            vec![
                TokenKind::Keyword(Keyword::True),
                TokenKind::Keyword(Keyword::False),
                TokenKind::Keyword(Keyword::Null),
                TokenKind::Keyword(Keyword::R),
                TokenKind::Keyword(Keyword::Obj),
                TokenKind::Keyword(Keyword::EndObj),
                TokenKind::Keyword(Keyword::Stream),
                TokenKind::Keyword(Keyword::EndStream),
                TokenKind::Keyword(Keyword::Xref),
                TokenKind::Keyword(Keyword::N),
                TokenKind::Keyword(Keyword::F),
                TokenKind::Keyword(Keyword::Trailer),
                TokenKind::Keyword(Keyword::StartXref),
            ]
        );
    }

    #[test]
    fn unmatched_word_is_unknown() {
        let out = tokenize_all(b"bogus");
        assert_eq!(out, vec![TokenKind::Unknown]);
    }

    #[test]
    fn unterminated_literal_string_is_unknown_and_reports_diagnostic() {
        let reader = StreamReader::new(Box::new(MemoryByteStream::new(b"(abc".to_vec())), 256);
        let diag = Arc::new(RecordingDiagnosticHandler::new());
        let mut t = Tokenizer::new(reader, ParserConfig::default(), diag.clone());
        let tok = t.get_next().unwrap();
        assert_eq!(tok.kind, TokenKind::Unknown);
        assert_eq!(diag.errors().len(), 1);
    }

    #[test]
    fn comment_is_skipped() {
        let out = tokenize_all(b"1 % a comment\n2");
        assert_eq!(out, vec![TokenKind::Integer(1), TokenKind::Integer(2)]);
    }

    #[test]
    fn peek_next_next_does_not_consume() {
        let reader = StreamReader::new(Box::new(MemoryByteStream::new(b"1 2 3".to_vec())), 256);
        let diag = Arc::new(RecordingDiagnosticHandler::new());
        let mut t = Tokenizer::new(reader, ParserConfig::default(), diag);
        assert_eq!(t.peek_next().unwrap().kind, TokenKind::Integer(1));
        assert_eq!(t.peek_next_next().unwrap().kind, TokenKind::Integer(2));
        assert_eq!(t.get_next().unwrap().kind, TokenKind::Integer(1));
        assert_eq!(t.get_next().unwrap().kind, TokenKind::Integer(2));
        assert_eq!(t.get_next().unwrap().kind, TokenKind::Integer(3));
    }

    #[test]
    fn integer_literal_within_i32_range_is_a_plain_integer() {
        let out = tokenize_all(format!("{}", i32::MAX).as_bytes());
        assert_eq!(out, vec![TokenKind::Integer(i32::MAX)]);
    }

    #[test]
    fn integer_literal_overflowing_i32_becomes_wide_integer_in_lenient_mode() {
        let value = i32::MAX as i64 + 1;
        let reader = StreamReader::new(
            Box::new(MemoryByteStream::new(value.to_string().into_bytes())),
            256,
        );
        let diag = Arc::new(RecordingDiagnosticHandler::new());
        let mut t = Tokenizer::new(reader, ParserConfig::lenient(), diag);
        let tok = t.get_next().unwrap();
        assert_eq!(tok.kind, TokenKind::WideInteger(value));
    }

    #[test]
    fn integer_literal_overflowing_i32_is_a_hard_error_in_strict_mode() {
        let value = i32::MAX as i64 + 1;
        let reader = StreamReader::new(
            Box::new(MemoryByteStream::new(value.to_string().into_bytes())),
            256,
        );
        let diag = Arc::new(RecordingDiagnosticHandler::new());
        let mut t = Tokenizer::new(reader, ParserConfig::strict(), diag);
        assert!(t.get_next().is_err());
    }

    #[test]
    fn token_offsets_are_monotonic() {
        let reader = StreamReader::new(
            Box::new(MemoryByteStream::new(b"1 2.0 /Foo (bar)".to_vec())),
            256,
        );
        let diag = Arc::new(RecordingDiagnosticHandler::new());
        let mut t = Tokenizer::new(reader, ParserConfig::default(), diag);
        let mut last = 0usize;
        loop {
            let tok = t.get_next().unwrap();
            if tok.is_eof() {
                break;
            }
            assert!(tok.offset >= last);
            last = tok.offset;
        }
    }
}
