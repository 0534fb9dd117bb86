use crate::error::{CosError, CosResult};
use crate::object::Dictionary;

/// One cross-reference table entry (§3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// The object is serialized at `byte_offset` in the file.
    InUse { byte_offset: u32, generation: u16 },
    /// Linked-list node in the free list; `next_free_obj_number` is the
    /// next free slot (0 terminates the chain at the head entry).
    Free {
        next_free_obj_number: u32,
        generation: u16,
    },
    /// An entry produced by an xref-stream object (type 2); `generation`
    /// is always 0 for these.
    Compressed {
        containing_stream_obj_number: u32,
        index_within_stream: u32,
    },
}

impl XrefEntry {
    pub fn is_free(&self) -> bool {
        matches!(self, XrefEntry::Free { .. })
    }

    pub fn generation(&self) -> u16 {
        match self {
            XrefEntry::InUse { generation, .. } => *generation,
            XrefEntry::Free { generation, .. } => *generation,
            XrefEntry::Compressed { .. } => 0,
        }
    }

    /// Parses one classical, fixed-width 20-byte xref line:
    /// 10 digits, SP, 5 digits, SP, `n`|`f`, 2-byte EOL.
    pub fn parse_classical(line: &[u8], strict: bool) -> CosResult<XrefEntry> {
        if line.len() != 20 {
            return Err(CosError::xref(format!(
                "xref entry line must be 20 bytes, got {}",
                line.len()
            )));
        }
        let first = &line[0..10];
        let sep1 = line[10];
        let second = &line[11..16];
        let sep2 = line[16];
        let kind = line[17];
        let eol = &line[18..20];

        if sep1 != b' ' || sep2 != b' ' {
            return Err(CosError::xref("xref entry is missing its field separators"));
        }
        if strict {
            if !first.iter().all(u8::is_ascii_digit) || !second.iter().all(u8::is_ascii_digit) {
                return Err(CosError::xref(
                    "xref entry digit fields must be exactly 10 and 5 ASCII digits",
                ));
            }
        }
        let valid_eol = matches!(eol, b" \r" | b" \n" | b"\r\n");
        if strict && !valid_eol {
            return Err(CosError::xref("xref entry has a malformed 2-byte EOL"));
        }

        let first_num = parse_ascii_digits(first)?;
        let second_num = parse_ascii_digits(second)? as u16;

        match kind {
            b'n' => Ok(XrefEntry::InUse {
                byte_offset: first_num,
                generation: second_num,
            }),
            b'f' => Ok(XrefEntry::Free {
                next_free_obj_number: first_num,
                generation: second_num,
            }),
            other => Err(CosError::xref(format!(
                "xref entry type must be 'n' or 'f', found {:?}",
                other as char
            ))),
        }
    }

    /// Formats this entry back into a classical 20-byte line. Round-trips
    /// with [`XrefEntry::parse_classical`] for entries produced by it.
    pub fn format_classical(&self) -> Vec<u8> {
        let (first, second, kind) = match self {
            XrefEntry::InUse {
                byte_offset,
                generation,
            } => (*byte_offset, *generation, b'n'),
            XrefEntry::Free {
                next_free_obj_number,
                generation,
            } => (*next_free_obj_number, *generation, b'f'),
            XrefEntry::Compressed { .. } => {
                panic!("compressed entries have no classical 20-byte representation")
            }
        };
        format!("{first:010} {second:05} {}\r\n", kind as char).into_bytes()
    }
}

fn parse_ascii_digits(field: &[u8]) -> CosResult<u32> {
    let text = std::str::from_utf8(field)
        .map_err(|_| CosError::xref("xref entry field is not ASCII"))?
        .trim();
    text.parse::<u32>()
        .map_err(|_| CosError::xref(format!("xref entry field '{text}' is not a valid number")))
}

/// A contiguous, densely numbered run of entries starting at
/// `first_object_number`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subsection {
    pub first_object_number: u32,
    pub entries: Vec<XrefEntry>,
}

impl Subsection {
    pub fn new(first_object_number: u32, entries: Vec<XrefEntry>) -> Self {
        Subsection {
            first_object_number,
            entries,
        }
    }

    pub fn get(&self, object_number: u32) -> Option<&XrefEntry> {
        let index = object_number.checked_sub(self.first_object_number)? as usize;
        self.entries.get(index)
    }
}

/// An ordered list of subsections, all introduced by a single `xref`
/// keyword and terminated by `trailer`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub subsections: Vec<Subsection>,
}

impl Section {
    pub fn get(&self, object_number: u32) -> Option<&XrefEntry> {
        self.subsections.iter().find_map(|s| s.get(object_number))
    }
}

/// The file trailer (§3.5), chained via `/Prev`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trailer {
    pub dict: Dictionary,
    pub last_xref_offset: u32,
    pub previous: Option<Box<Trailer>>,
}

/// The full cross-reference table: sections ordered newest-to-oldest,
/// following the `/Prev` chain. Lookup returns the newest in-use entry for
/// a given object number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XrefTable {
    pub sections: Vec<Section>,
}

impl XrefTable {
    pub fn new() -> Self {
        XrefTable::default()
    }

    pub fn push_newest(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Looks up `object_number`, searching sections from newest to oldest
    /// and returning the first match (which may be a `Free` entry).
    pub fn lookup(&self, object_number: u32) -> Option<&XrefEntry> {
        self.sections.iter().find_map(|s| s.get(object_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_in_use_entry() {
        let entry = XrefEntry::parse_classical(b"0000000017 00000 n \r\n", false).unwrap();
        assert_eq!(
            entry,
            XrefEntry::InUse {
                byte_offset: 17,
                generation: 0
            }
        );
    }

    #[test]
    fn parses_free_head_entry() {
        let entry = XrefEntry::parse_classical(b"0000000000 65535 f \r\n", false).unwrap();
        assert_eq!(
            entry,
            XrefEntry::Free {
                next_free_obj_number: 0,
                generation: 65535
            }
        );
    }

    #[test]
    fn round_trips_through_format_and_parse() {
        let original = XrefEntry::InUse {
            byte_offset: 1234,
            generation: 3,
        };
        let formatted = original.format_classical();
        let parsed = XrefEntry::parse_classical(&formatted, true).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn rejects_wrong_length_line() {
        assert!(XrefEntry::parse_classical(b"short", false).is_err());
    }

    #[test]
    fn strict_mode_rejects_bad_eol() {
        let line = b"0000000017 00000 n XY";
        assert!(XrefEntry::parse_classical(line, true).is_err());
        assert!(XrefEntry::parse_classical(line, false).is_err()); // separators still checked
    }

    #[test]
    fn table_lookup_prefers_newest_section() {
        let mut table = XrefTable::new();
        table.push_newest(Section {
            subsections: vec![Subsection::new(
                0,
                vec![XrefEntry::InUse {
                    byte_offset: 100,
                    generation: 0,
                }],
            )],
        });
        table.push_newest(Section {
            subsections: vec![Subsection::new(
                0,
                vec![XrefEntry::InUse {
                    byte_offset: 999,
                    generation: 0,
                }],
            )],
        });
        assert_eq!(
            table.lookup(0),
            Some(&XrefEntry::InUse {
                byte_offset: 100,
                generation: 0
            })
        );
    }

    #[test]
    fn subsection_get_is_offset_by_first_object_number() {
        let sub = Subsection::new(
            5,
            vec![
                XrefEntry::InUse {
                    byte_offset: 10,
                    generation: 0,
                },
                XrefEntry::InUse {
                    byte_offset: 20,
                    generation: 0,
                },
            ],
        );
        assert_eq!(
            sub.get(6),
            Some(&XrefEntry::InUse {
                byte_offset: 20,
                generation: 0
            })
        );
        assert_eq!(sub.get(4), None);
    }
}
