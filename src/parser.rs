use crate::config::ParserConfig;
use crate::diagnostic::DiagnosticHandler;
use crate::error::{CosError, CosResult};
use crate::object::{Dictionary, ObjId, Object};
use crate::resolver::ObjectResolver;
use crate::token::{Keyword, Token, TokenKind};
use crate::tokenizer::Tokenizer;
use std::sync::Arc;

/// A token the recursive-descent grammar hands back to its caller instead
/// of folding into an object: array/dictionary closers and the handful of
/// structural keywords (`endobj`, `endstream`, `xref`, `trailer`,
/// `startxref`) that mark the end of whatever construct is currently being
/// scanned.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    Object(Object),
    ArrayEnd,
    DictEnd,
    EndObj,
    EndStream,
    Xref,
    Trailer,
    StartXref,
    Eof,
}

/// The recursive-descent object parser (§4.4).
///
/// The distilled design calls for a bounded "reservoir" of up to two
/// pending integer literals used to disambiguate `N N obj` / `N N R` from a
/// bare integer. This implementation realizes that reservoir with the
/// tokenizer's own two-token peek queue rather than a second, duplicate
/// bookkeeping structure: the two serve the identical purpose (look two
/// tokens ahead, discard the look-ahead once it's clear the triple isn't
/// forming), so keeping both would just be two copies of the same state.
pub struct Parser {
    tokenizer: Tokenizer,
    config: ParserConfig,
    diagnostics: Arc<dyn DiagnosticHandler>,
}

impl Parser {
    pub fn new(
        tokenizer: Tokenizer,
        config: ParserConfig,
        diagnostics: Arc<dyn DiagnosticHandler>,
    ) -> Self {
        Parser {
            tokenizer,
            config,
            diagnostics,
        }
    }

    pub fn tokenizer_mut(&mut self) -> &mut Tokenizer {
        &mut self.tokenizer
    }

    pub fn has_next_object(&mut self) -> CosResult<bool> {
        self.tokenizer.has_next()
    }

    /// Parses exactly one top-level construct: an indirect object
    /// definition, a bare direct object, or a structural keyword/EOF event.
    pub fn next_object(&mut self, resolver: &mut dyn ObjectResolver) -> CosResult<ParseEvent> {
        let token = self.tokenizer.get_next()?;
        self.dispatch(token, resolver)
    }

    fn dispatch(
        &mut self,
        token: Token,
        resolver: &mut dyn ObjectResolver,
    ) -> CosResult<ParseEvent> {
        match token.kind {
            TokenKind::Eof => Ok(ParseEvent::Eof),
            TokenKind::ArrayEnd => Ok(ParseEvent::ArrayEnd),
            TokenKind::DictEnd => Ok(ParseEvent::DictEnd),
            TokenKind::Keyword(Keyword::EndObj) => Ok(ParseEvent::EndObj),
            TokenKind::Keyword(Keyword::EndStream) => Ok(ParseEvent::EndStream),
            TokenKind::Keyword(Keyword::Xref) => Ok(ParseEvent::Xref),
            TokenKind::Keyword(Keyword::Trailer) => Ok(ParseEvent::Trailer),
            TokenKind::Keyword(Keyword::StartXref) => Ok(ParseEvent::StartXref),
            TokenKind::ArrayStart => Ok(ParseEvent::Object(self.parse_array(resolver)?)),
            TokenKind::DictStart => Ok(ParseEvent::Object(self.parse_dict_or_stream(resolver)?)),
            TokenKind::LiteralString(bytes) | TokenKind::HexString(bytes) => {
                Ok(ParseEvent::Object(Object::String(bytes)))
            }
            TokenKind::Name(bytes) => Ok(ParseEvent::Object(Object::Name(bytes))),
            TokenKind::Real(v) => Ok(ParseEvent::Object(Object::Real(v))),
            TokenKind::Keyword(Keyword::True) => Ok(ParseEvent::Object(Object::Boolean(true))),
            TokenKind::Keyword(Keyword::False) => Ok(ParseEvent::Object(Object::Boolean(false))),
            TokenKind::Keyword(Keyword::Null) => Ok(ParseEvent::Object(Object::Null)),
            TokenKind::Integer(n) => self.parse_integer_led(n, resolver),
            TokenKind::WideInteger(n) => {
                self.diagnostics.warn(&format!(
                    "integer literal {n} exceeds the 32-bit object model range, clamping"
                ));
                let clamped = n.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
                Ok(ParseEvent::Object(Object::Integer(clamped)))
            }
            TokenKind::Keyword(Keyword::R) => {
                self.diagnostics
                    .error("'R' keyword with no preceding object/generation pair");
                Err(CosError::syntax("stray 'R' keyword", token.offset))
            }
            TokenKind::Keyword(Keyword::Obj) => {
                self.diagnostics
                    .error("'obj' keyword with no preceding object/generation pair");
                Err(CosError::syntax("stray 'obj' keyword", token.offset))
            }
            TokenKind::Keyword(Keyword::Stream) => {
                self.diagnostics
                    .error("'stream' keyword with no preceding dictionary");
                Err(CosError::syntax("stray 'stream' keyword", token.offset))
            }
            TokenKind::Keyword(Keyword::N) | TokenKind::Keyword(Keyword::F) => Ok(
                ParseEvent::Object(Object::Name(match token.kind {
                    TokenKind::Keyword(Keyword::N) => b"n".to_vec(),
                    _ => b"f".to_vec(),
                })),
            ),
            TokenKind::Unknown => Err(CosError::syntax(
                "unrecognized token",
                token.offset,
            )),
        }
    }

    /// Handles the integer-led productions: a bare `Integer`, an
    /// `N G R` reference, or an `N G obj ... endobj` indirect definition.
    /// Looks ahead at most two tokens, per the two-token/ two-integer
    /// bound the design calls for.
    ///
    /// The reservoir can also hold just one pending integer when `R`/`obj`
    /// directly follows it (`N R`, `N obj`) rather than `N N R`/`N N obj`:
    /// that's a missing generation number, not a different production, so
    /// it warns and treats the generation as `0` instead of erroring.
    fn parse_integer_led(
        &mut self,
        first: i32,
        resolver: &mut dyn ObjectResolver,
    ) -> CosResult<ParseEvent> {
        match self.tokenizer.peek_next()?.kind.clone() {
            TokenKind::Integer(second) => {
                let third_is_obj_or_r = matches!(
                    self.tokenizer.peek_next_next()?.kind,
                    TokenKind::Keyword(Keyword::R) | TokenKind::Keyword(Keyword::Obj)
                );
                if !third_is_obj_or_r {
                    return Ok(ParseEvent::Object(Object::Integer(first)));
                }
                self.tokenizer.get_next()?; // consume the generation integer
                let keyword_token = self.tokenizer.get_next()?; // R or obj
                self.finish_integer_led(first, second, keyword_token, resolver)
            }
            TokenKind::Keyword(Keyword::R) | TokenKind::Keyword(Keyword::Obj) => {
                self.diagnostics.warn(&format!(
                    "only one integer ({first}) pending before 'R'/'obj', defaulting generation to 0"
                ));
                let keyword_token = self.tokenizer.get_next()?; // consume R or obj
                self.finish_integer_led(first, 0, keyword_token, resolver)
            }
            _ => Ok(ParseEvent::Object(Object::Integer(first))),
        }
    }

    /// Builds the `Reference`/`Indirect` result once an object number,
    /// generation number, and the disambiguating `R`/`obj` keyword token are
    /// all in hand, regardless of whether the generation came from a second
    /// reservoir integer or the single-pending-integer default of `0`.
    fn finish_integer_led(
        &mut self,
        first: i32,
        second: i32,
        keyword_token: Token,
        resolver: &mut dyn ObjectResolver,
    ) -> CosResult<ParseEvent> {
        let obj_num = u32::try_from(first).map_err(|_| {
            CosError::out_of_range(format!("object number {first} out of range"))
        })?;
        let gen_num = u16::try_from(second).map_err(|_| {
            CosError::out_of_range(format!("generation number {second} out of range"))
        })?;
        let id = ObjId::new(obj_num, gen_num);

        match keyword_token.kind {
            TokenKind::Keyword(Keyword::R) => Ok(ParseEvent::Object(Object::Reference(id))),
            TokenKind::Keyword(Keyword::Obj) => {
                let value = self.parse_indirect_value(resolver)?;
                Ok(ParseEvent::Object(Object::Indirect(id, Box::new(value))))
            }
            _ => unreachable!("keyword_token is always R or Obj"),
        }
    }

    /// Parses the body of `N G obj <value> [stream ...] endobj`.
    fn parse_indirect_value(&mut self, resolver: &mut dyn ObjectResolver) -> CosResult<Object> {
        let value_token = self.tokenizer.get_next()?;
        let mut value = match self.dispatch(value_token, resolver)? {
            ParseEvent::Object(obj) => obj,
            other => {
                self.diagnostics
                    .error(&format!("expected an object after 'obj', found {other:?}"));
                return Err(CosError::syntax(
                    "expected an object after 'obj'",
                    self.tokenizer.position() as usize,
                ));
            }
        };

        if let Object::Dictionary(ref dict) = value {
            if self
                .tokenizer
                .match_next(|k| matches!(k, TokenKind::Keyword(Keyword::Stream)))?
                .is_some()
            {
                let payload = self.read_stream_payload(dict, resolver)?;
                value = Object::Stream(dict.clone(), payload);
            }
        }

        match self.tokenizer.get_next()? {
            t if t.is_keyword(Keyword::EndObj) => {}
            t => {
                self.diagnostics.warn(&format!(
                    "missing 'endobj' after object body (found {:?} at byte {})",
                    t.kind, t.offset
                ));
            }
        }
        Ok(value)
    }

    /// Reads the raw, still-encoded stream payload. Bypasses the tokenizer
    /// entirely — it reads straight off the stream reader — because the
    /// payload is opaque binary data, not PDF syntax.
    fn read_stream_payload(
        &mut self,
        dict: &Dictionary,
        resolver: &mut dyn ObjectResolver,
    ) -> CosResult<Vec<u8>> {
        let length = match dict.get(b"Length") {
            Some(Object::Integer(n)) => *n,
            Some(Object::Reference(id)) => match resolver.resolve(*id)? {
                Object::Integer(n) => n,
                other => {
                    return Err(CosError::syntax(
                        format!("/Length resolved to non-integer object {other:?}"),
                        self.tokenizer.position() as usize,
                    ));
                }
            },
            Some(other) => {
                return Err(CosError::syntax(
                    format!("/Length is not an integer or reference (found {other:?})"),
                    self.tokenizer.position() as usize,
                ));
            }
            None => {
                return Err(CosError::syntax(
                    "stream dictionary is missing required /Length",
                    self.tokenizer.position() as usize,
                ));
            }
        };
        if length < 0 {
            return Err(CosError::out_of_range("/Length is negative"));
        }

        let reader = self.tokenizer.reader_mut();
        match reader.getc()? {
            Some(b'\r') => {
                if reader.peek()? == Some(b'\n') {
                    reader.getc()?;
                } else if self.config.strict {
                    return Err(CosError::syntax(
                        "bare CR after 'stream' keyword",
                        reader.position() as usize,
                    ));
                }
            }
            Some(b'\n') => {}
            other => {
                self.diagnostics.warn(&format!(
                    "expected an EOL after 'stream' keyword, found {other:?}"
                ));
            }
        }

        let mut payload = vec![0u8; length as usize];
        let mut filled = 0;
        while filled < payload.len() {
            let n = reader.stream_mut().read(&mut payload[filled..])?;
            if n == 0 {
                return Err(CosError::io("stream payload truncated before /Length bytes"));
            }
            filled += n;
        }
        // The StreamReader's own buffer may already hold bytes past the
        // payload; resynchronize it with the underlying stream's position
        // after this out-of-band read.
        reader.reset()?;

        if self
            .tokenizer
            .match_next(|k| matches!(k, TokenKind::Keyword(Keyword::EndStream)))?
            .is_none()
        {
            self.diagnostics
                .warn("missing 'endstream' immediately after stream payload");
        }
        Ok(payload)
    }

    fn parse_array(&mut self, resolver: &mut dyn ObjectResolver) -> CosResult<Object> {
        let mut items = Vec::new();
        loop {
            let token = self.tokenizer.get_next()?;
            if token.is_eof() {
                self.diagnostics.error("unterminated array: reached EOF");
                return Err(CosError::syntax("unterminated array", token.offset));
            }
            match self.dispatch(token, resolver)? {
                ParseEvent::ArrayEnd => break,
                ParseEvent::Object(obj) => items.push(obj),
                other => {
                    self.diagnostics
                        .error(&format!("unexpected {other:?} inside array"));
                    return Err(CosError::syntax(
                        "unexpected token inside array",
                        self.tokenizer.position() as usize,
                    ));
                }
            }
        }
        Ok(Object::Array(items))
    }

    fn parse_dict_or_stream(&mut self, resolver: &mut dyn ObjectResolver) -> CosResult<Object> {
        let mut dict = Dictionary::new();
        loop {
            let key_token = self.tokenizer.get_next()?;
            if key_token.is_eof() {
                self.diagnostics.error("unterminated dictionary: reached EOF");
                return Ok(Object::Dictionary(dict));
            }
            let key = match key_token.kind {
                TokenKind::DictEnd => break,
                TokenKind::Name(bytes) => bytes,
                other => {
                    self.diagnostics.warn(&format!(
                        "malformed dictionary key {other:?} at byte {}, skipping entry",
                        key_token.offset
                    ));
                    continue;
                }
            };
            let value_token = self.tokenizer.get_next()?;
            let value = match self.dispatch(value_token, resolver)? {
                ParseEvent::Object(obj) => obj,
                ParseEvent::DictEnd => {
                    self.diagnostics
                        .warn(&format!("dictionary key {key:?} has no value before '>>'"));
                    dict.insert(key, Object::Null);
                    break;
                }
                other => {
                    self.diagnostics
                        .error(&format!("unexpected {other:?} as dictionary value"));
                    return Err(CosError::syntax(
                        "unexpected token as dictionary value",
                        self.tokenizer.position() as usize,
                    ));
                }
            };
            dict.insert(key, value);
        }
        Ok(Object::Dictionary(dict))
    }
}
