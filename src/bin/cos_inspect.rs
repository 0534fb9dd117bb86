//! A small demo CLI: opens a PDF file, drives the object-layer parser over
//! it, and prints the trailer dictionary plus a summary of the xref table.
//! Not a supported interface — a thin, non-normative harness for exercising
//! the library by hand.

use coslib::diagnostic::LoggingDiagnosticHandler;
use coslib::xref::XrefEntry;
use coslib::{FileParser, ParserConfig};
use std::env;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: cos-inspect <file.pdf>");
        return ExitCode::FAILURE;
    };

    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("cos-inspect: failed to read {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let config = ParserConfig::default();
    let diagnostics = Arc::new(LoggingDiagnosticHandler);
    let file_parser = match FileParser::open(data, config, diagnostics) {
        Ok(fp) => fp,
        Err(err) => {
            eprintln!("cos-inspect: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(trailer) = file_parser.trailer() {
        println!("trailer: {} entries", trailer.dict.len());
        for (key, value) in trailer.dict.iter() {
            println!("  /{} = {:?}", String::from_utf8_lossy(key), value);
        }
    } else {
        println!("trailer: none");
    }

    let mut in_use = 0usize;
    let mut free = 0usize;
    let mut compressed = 0usize;
    for section in &file_parser.xref_table().sections {
        for subsection in &section.subsections {
            for entry in &subsection.entries {
                match entry {
                    XrefEntry::InUse { .. } => in_use += 1,
                    XrefEntry::Free { .. } => free += 1,
                    XrefEntry::Compressed { .. } => compressed += 1,
                }
            }
        }
    }
    println!("xref: {in_use} in-use, {free} free, {compressed} compressed entries across {} section(s)", file_parser.xref_table().sections.len());

    if let Some(root) = file_parser.catalog_reference() {
        println!("catalog: {root}");
    }

    ExitCode::SUCCESS
}
