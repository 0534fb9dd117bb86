//! End-to-end and property-based tests exercising the public parsing
//! surface the way a caller outside the crate would: build a byte buffer,
//! hand it to the tokenizer/parser/file-parser layers, and check the
//! resulting objects and diagnostics.

use coslib::diagnostic::RecordingDiagnosticHandler;
use coslib::object::{Dictionary, ObjId, Object};
use coslib::resolver::NoResolver;
use coslib::stream::{MemoryByteStream, StreamReader};
use coslib::tokenizer::Tokenizer;
use coslib::xref::XrefEntry;
use coslib::{FileParser, ParseEvent, Parser, ParserConfig};
use proptest::prelude::*;
use std::sync::Arc;

fn parse_single_object(input: &[u8]) -> ParseEvent {
    let reader = StreamReader::new(Box::new(MemoryByteStream::new(input.to_vec())), 256);
    let diag = Arc::new(RecordingDiagnosticHandler::new());
    let tokenizer = Tokenizer::new(reader, ParserConfig::default(), diag.clone());
    let mut parser = Parser::new(tokenizer, ParserConfig::default(), diag);
    let mut resolver = NoResolver;
    parser.next_object(&mut resolver).unwrap()
}

fn sample_pdf_with(extra_objects: &[(u32, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = vec![(1u32, 0usize)];
    offsets[0].1 = out.len();
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    offsets.push((2, out.len()));
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
    for (num, body) in extra_objects {
        offsets.push((*num, out.len()));
        out.extend_from_slice(format!("{num} 0 obj\n{body}\nendobj\n").as_bytes());
    }
    let xref_offset = out.len();
    let max_obj = offsets.iter().map(|(n, _)| *n).max().unwrap();
    out.extend_from_slice(format!("xref\n0 {}\n", max_obj + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \r\n");
    for i in 1..=max_obj {
        match offsets.iter().find(|(n, _)| *n == i) {
            Some((_, off)) => out.extend_from_slice(format!("{off:010} 00000 n \r\n").as_bytes()),
            None => out.extend_from_slice(b"0000000000 00000 f \r\n"),
        }
    }
    out.extend_from_slice(format!("trailer\n<< /Size {} /Root 1 0 R >>\n", max_obj + 1).as_bytes());
    out.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF").as_bytes());
    out
}

// ---- §8 end-to-end scenarios ------------------------------------------------

#[test]
fn opens_a_minimal_well_formed_file_and_resolves_the_catalog() {
    let data = sample_pdf_with(&[]);
    let diag = Arc::new(RecordingDiagnosticHandler::new());
    let mut fp = FileParser::open(data, ParserConfig::default(), diag).unwrap();
    let root = fp.catalog_reference().expect("trailer has /Root");
    let catalog = fp.get_object(root).unwrap();
    let dict = catalog.as_dict().unwrap();
    assert_eq!(dict.get(b"Type"), Some(&Object::Name(b"Catalog".to_vec())));
}

#[test]
fn resolves_a_stream_object_with_indirect_length() {
    let data = sample_pdf_with(&[
        (3, "5"),
        (4, "<< /Length 3 0 R >>\nstream\nHello\nendstream"),
    ]);
    let diag = Arc::new(RecordingDiagnosticHandler::new());
    let mut fp = FileParser::open(data, ParserConfig::default(), diag).unwrap();
    let obj = fp.get_object(ObjId::new(4, 0)).unwrap();
    match obj {
        Object::Stream(_, payload) => assert_eq!(payload, b"Hello"),
        other => panic!("expected a stream object, got {other:?}"),
    }
}

#[test]
fn follows_prev_chain_across_two_xref_sections() {
    // First revision.
    let mut data = Vec::new();
    data.extend_from_slice(b"%PDF-1.4\n");
    let obj1_offset = data.len();
    data.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    let obj2_offset = data.len();
    data.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
    let first_xref_offset = data.len();
    data.extend_from_slice(b"xref\n0 3\n");
    data.extend_from_slice(b"0000000000 65535 f \r\n");
    data.extend_from_slice(format!("{obj1_offset:010} 00000 n \r\n").as_bytes());
    data.extend_from_slice(format!("{obj2_offset:010} 00000 n \r\n").as_bytes());
    data.extend_from_slice(b"trailer\n<< /Size 3 /Root 1 0 R >>\n");
    data.extend_from_slice(format!("startxref\n{first_xref_offset}\n%%EOF\n").as_bytes());

    // Incremental update: object 2 replaced, new xref section chains back via /Prev.
    let obj2_new_offset = data.len();
    data.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 7 >>\nendobj\n");
    let second_xref_offset = data.len();
    data.extend_from_slice(b"xref\n0 3\n");
    data.extend_from_slice(b"0000000000 65535 f \r\n");
    data.extend_from_slice(format!("{obj1_offset:010} 00000 n \r\n").as_bytes());
    data.extend_from_slice(format!("{obj2_new_offset:010} 00000 n \r\n").as_bytes());
    data.extend_from_slice(
        format!("trailer\n<< /Size 3 /Root 1 0 R /Prev {first_xref_offset} >>\n").as_bytes(),
    );
    data.extend_from_slice(format!("startxref\n{second_xref_offset}\n%%EOF").as_bytes());

    let diag = Arc::new(RecordingDiagnosticHandler::new());
    let mut fp = FileParser::open(data, ParserConfig::default(), diag).unwrap();
    let pages = fp.get_object(ObjId::new(2, 0)).unwrap();
    assert_eq!(pages.as_dict().unwrap().get(b"Count"), Some(&Object::Integer(7)));
}

#[test]
fn rejects_object_marked_free_in_xref() {
    let mut data = Vec::new();
    data.extend_from_slice(b"%PDF-1.4\n");
    data.extend_from_slice(b"1 0 obj\n(unreachable)\nendobj\n");
    let xref_offset = data.len();
    data.extend_from_slice(b"xref\n0 2\n");
    data.extend_from_slice(b"0000000000 65535 f \r\n");
    data.extend_from_slice(b"0000000000 00000 f \r\n");
    data.extend_from_slice(b"trailer\n<< /Size 2 /Root 1 0 R >>\n");
    data.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF").as_bytes());

    let diag = Arc::new(RecordingDiagnosticHandler::new());
    let mut fp = FileParser::open(data, ParserConfig::default(), diag).unwrap();
    assert!(fp.get_object(ObjId::new(1, 0)).is_err());
}

#[test]
fn lenient_mode_tolerates_a_missing_endobj() {
    let reader = StreamReader::new(
        Box::new(MemoryByteStream::new(b"9 0 obj (partial)".to_vec())),
        256,
    );
    let diag = Arc::new(RecordingDiagnosticHandler::new());
    let tokenizer = Tokenizer::new(reader, ParserConfig::lenient(), diag.clone());
    let mut parser = Parser::new(tokenizer, ParserConfig::lenient(), diag.clone());
    let mut resolver = NoResolver;
    let event = parser.next_object(&mut resolver).unwrap();
    assert_eq!(
        event,
        ParseEvent::Object(Object::Indirect(
            ObjId::new(9, 0),
            Box::new(Object::String(b"partial".to_vec()))
        ))
    );
    assert_eq!(diag.warnings().len(), 1);
}

// ---- §8 testable properties (proptest) -------------------------------------

proptest! {
    /// A dictionary built from distinct names and arbitrary small integers
    /// round-trips through the parser with every key present and the
    /// right value, regardless of insertion order.
    #[test]
    fn dictionary_round_trips_arbitrary_integer_values(
        values in prop::collection::vec(-1_000_000i32..1_000_000, 1..8)
    ) {
        let mut body = String::from("<< ");
        for (i, v) in values.iter().enumerate() {
            body.push_str(&format!("/K{i} {v} "));
        }
        body.push_str(">>");
        let event = parse_single_object(body.as_bytes());
        let ParseEvent::Object(Object::Dictionary(dict)) = event else {
            panic!("expected a dictionary event");
        };
        for (i, v) in values.iter().enumerate() {
            prop_assert_eq!(dict.get(format!("K{i}").as_bytes()), Some(&Object::Integer(*v)));
        }
    }

    /// Duplicate keys always resolve to the last value written, no matter
    /// how many times the key repeats or what the intervening values are.
    #[test]
    fn duplicate_dictionary_keys_always_keep_the_last_value(
        values in prop::collection::vec(0i32..1000, 2..10)
    ) {
        let mut body = String::from("<< ");
        for v in &values {
            body.push_str(&format!("/Dup {v} "));
        }
        body.push_str(">>");
        let event = parse_single_object(body.as_bytes());
        let ParseEvent::Object(Object::Dictionary(dict)) = event else {
            panic!("expected a dictionary event");
        };
        prop_assert_eq!(dict.get(b"Dup"), Some(&Object::Integer(*values.last().unwrap())));
    }

    /// Any well-formed `N G R` reference parses back to exactly that
    /// object id, never eagerly resolved.
    #[test]
    fn references_parse_to_their_object_id_unresolved(
        obj_num in 1u32..1_000_000,
        gen_num in 0u16..100,
    ) {
        let input = format!("{obj_num} {gen_num} R");
        let event = parse_single_object(input.as_bytes());
        prop_assert_eq!(event, ParseEvent::Object(Object::Reference(ObjId::new(obj_num, gen_num))));
    }

    /// A bare integer is never mistaken for the start of a reference or
    /// indirect object unless a second integer and `R`/`obj` keyword
    /// actually follow it.
    #[test]
    fn lone_integer_never_becomes_a_reference(n in -1_000_000i32..1_000_000) {
        let event = parse_single_object(n.to_string().as_bytes());
        prop_assert_eq!(event, ParseEvent::Object(Object::Integer(n)));
    }

    /// `XrefEntry::parse_classical` composed with `format_classical` is
    /// the identity for every in-use entry value it can represent.
    #[test]
    fn xref_in_use_entry_round_trips(
        byte_offset in 0u32..u32::MAX,
        generation in 0u16..=65535,
    ) {
        let entry = XrefEntry::InUse { byte_offset, generation };
        let formatted = entry.format_classical();
        let parsed = XrefEntry::parse_classical(&formatted, true).unwrap();
        prop_assert_eq!(entry, parsed);
    }

    /// An array of integer literals parses back to exactly the same
    /// sequence, regardless of how many elements it has.
    #[test]
    fn array_of_integers_preserves_order(values in prop::collection::vec(-10_000i32..10_000, 0..12)) {
        let body = format!(
            "[{}]",
            values.iter().map(i32::to_string).collect::<Vec<_>>().join(" ")
        );
        let event = parse_single_object(body.as_bytes());
        let ParseEvent::Object(Object::Array(items)) = event else {
            panic!("expected an array event");
        };
        let expected: Vec<Object> = values.into_iter().map(Object::Integer).collect();
        prop_assert_eq!(items, expected);
    }
}

#[test]
fn empty_dictionary_is_a_valid_object() {
    let event = parse_single_object(b"<< >>");
    assert_eq!(event, ParseEvent::Object(Object::Dictionary(Dictionary::new())));
}
