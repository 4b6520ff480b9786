//! # Substitution tables
//!
//! A table is loaded from comma separated rows, where the first two fields of
//! each row are code points in hexadecimal notation (without `0x`):
//!
//! ```text
//! 4E2D,56FD,this field is ignored
//! ```
//!
//! Rows with less than two fields are skipped. A later row for the same
//! source code point replaces the earlier one. Quoting follows RFC 4180,
//! a stray or unterminated `"` makes the whole load fail.
use std::{
    char::REPLACEMENT_CHARACTER,
    collections::HashMap,
    convert::TryFrom,
    fs::File,
    io::Read,
    iter::FromIterator,
    path::Path,
};

use log::{debug, info};

use crate::{Error, MappingError, Result};

/// The value used for a field that is not a hexadecimal number
pub const FALLBACK_CODE_POINT: i32 = 0;

/// A mapping from source to replacement code points
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionTable {
    entries: HashMap<u32, u32>,
}

impl SubstitutionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, returning the replacement that was previously set for `from`
    pub fn insert(&mut self, from: u32, to: u32) -> Option<u32> {
        self.entries.insert(from, to)
    }

    /// Get the replacement for `from`
    pub fn get(&self, from: u32) -> Option<u32> {
        self.entries.get(&from).copied()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a table from the CSV file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::OpenMapping {
            path: path.to_owned(),
            source,
        })?;
        let table = Self::from_reader(file).map_err(|source| Error::ReadMapping {
            path: path.to_owned(),
            source,
        })?;
        info!(
            "Loaded {} substitution(s) from '{}'",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Read a table from CSV data
    ///
    /// Fails on the first read or quoting error, in which case no table is
    /// returned at all.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, MappingError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        check_quotes(&data)?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(&data[..]);

        let mut table = Self::new();
        for record in rdr.byte_records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());
            let (from, to) = match (record.get(0), record.get(1)) {
                (Some(from), Some(to)) => (from, to),
                _ => {
                    debug!("Skipping row with less than 2 fields on line {}", line);
                    continue;
                }
            };
            let from = match u32::try_from(parse_code_point(from)) {
                Ok(from) => from,
                Err(_) => {
                    debug!("Line {}: negative source never matches, skipped", line);
                    continue;
                }
            };
            let to = u32::try_from(parse_code_point(to)) //
                .unwrap_or(REPLACEMENT_CHARACTER as u32);
            if let Some(prev) = table.insert(from, to) {
                debug!(
                    "Line {}: U+{:04X} now maps to U+{:04X} instead of U+{:04X}",
                    line, from, to, prev
                );
            }
        }
        Ok(table)
    }
}

impl FromIterator<(u32, u32)> for SubstitutionTable {
    fn from_iter<T: IntoIterator<Item = (u32, u32)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Copy, Clone)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    /// A `"` inside a quoted field, either closing it or escaping the next one
    QuoteInQuoted,
    /// A `\r` right after a closing quote
    CarriageReturn,
}

/// Check that every `"` in `data` is placed as RFC 4180 requires
///
/// Quotes may only open a field, close it (followed by `,`, a line break or
/// the end of the data) or be doubled inside a quoted field.
fn check_quotes(data: &[u8]) -> Result<(), MappingError> {
    use self::QuoteState::*;

    let mut state = FieldStart;
    let mut line = 1;
    let mut field_line = 1;
    for &byte in data {
        state = match (state, byte) {
            (FieldStart, b'"') => {
                field_line = line;
                Quoted
            }
            (Unquoted, b'"') => return Err(MappingError::BareQuote { line }),
            (FieldStart | Unquoted, b',') => FieldStart,
            (FieldStart | Unquoted, b'\n') => {
                line += 1;
                FieldStart
            }
            (FieldStart | Unquoted, _) => Unquoted,
            (Quoted, b'"') => QuoteInQuoted,
            (Quoted, b'\n') => {
                line += 1;
                Quoted
            }
            (Quoted, _) => Quoted,
            (QuoteInQuoted, b'"') => Quoted,
            (QuoteInQuoted, b',') => FieldStart,
            (QuoteInQuoted, b'\n') | (CarriageReturn, b'\n') => {
                line += 1;
                FieldStart
            }
            (QuoteInQuoted, b'\r') => CarriageReturn,
            (QuoteInQuoted, _) | (CarriageReturn, _) => {
                return Err(MappingError::Quote { line: field_line })
            }
        };
    }
    match state {
        Quoted => Err(MappingError::Quote { line: field_line }),
        _ => Ok(()),
    }
}

/// Parse a code point, falling back to [`FALLBACK_CODE_POINT`]
pub fn parse_code_point(field: &[u8]) -> i32 {
    parse_hex(field).unwrap_or_else(|| {
        debug!(
            "{:?} is not a hex code point, using {}",
            String::from_utf8_lossy(field),
            FALLBACK_CODE_POINT
        );
        FALLBACK_CODE_POINT
    })
}

/// Parse the leading hexadecimal digits of a field
///
/// Surrounding whitespace and a leading `+` or `-` are accepted, anything
/// after the last digit is ignored. Returns `None` if there are no digits or
/// the value does not fit into an `i32`.
pub fn parse_hex(field: &[u8]) -> Option<i32> {
    let start = field.iter().position(|b| !b.is_ascii_whitespace())?;
    let field = &field[start..];
    let (negative, field) = match field.split_first() {
        Some((&b'-', rest)) => (true, rest),
        Some((&b'+', rest)) => (false, rest),
        _ => (false, field),
    };
    let end = field
        .iter()
        .position(|b| !b.is_ascii_hexdigit())
        .unwrap_or(field.len());
    let digits = std::str::from_utf8(&field[..end]).ok()?;
    if digits.is_empty() {
        return None;
    }
    let value = i64::try_from(u64::from_str_radix(digits, 16).ok()?).ok()?;
    let value = if negative { -value } else { value };
    i32::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read, Write};

    use super::{parse_code_point, parse_hex, SubstitutionTable};
    use crate::{Error, MappingError};

    fn load(data: &str) -> SubstitutionTable {
        SubstitutionTable::from_reader(data.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex(b"4E2D"), Some(0x4E2D));
        assert_eq!(parse_hex(b"4e2d"), Some(0x4E2D));
        assert_eq!(parse_hex(b" 41 "), Some(0x41));
        assert_eq!(parse_hex(b"+1F600"), Some(0x1F600));
        assert_eq!(parse_hex(b"-41"), Some(-0x41));
        assert_eq!(parse_hex(b"4E2Dxyz"), Some(0x4E2D));
        assert_eq!(parse_hex(b"7FFFFFFF"), Some(0x7FFF_FFFF));
        assert_eq!(parse_hex(b"-80000000"), Some(i32::MIN));
        assert_eq!(parse_hex(b"80000000"), None);
        assert_eq!(parse_hex(b"FFFFFFFFFFFFFFFFFF"), None);
        assert_eq!(parse_hex(b"xyz"), None);
        assert_eq!(parse_hex(b"-"), None);
        assert_eq!(parse_hex(b""), None);
        assert_eq!(parse_hex(b"   "), None);
    }

    #[test]
    fn test_parse_code_point_fallback() {
        assert_eq!(parse_code_point(b"56FD"), 0x56FD);
        assert_eq!(parse_code_point(b"zz"), 0);
        assert_eq!(parse_code_point(b"0x41"), 0);
    }

    #[test]
    fn test_load() {
        let table = load("4E2D,56FD\n0041,0042,comment\n");
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0x4E2D), Some(0x56FD));
        assert_eq!(table.get(0x41), Some(0x42));
        assert_eq!(table.get(0x42), None);
    }

    #[test]
    fn test_last_row_wins() {
        let table = load("41,42\n41,43\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0x41), Some(0x43));
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let table = load("41\n\n42,43\n44\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0x41), None);
        assert_eq!(table.get(0x42), Some(0x43));
    }

    #[test]
    fn test_malformed_hex_maps_to_zero() {
        let table = load("nothex,41\n42,??\n");
        assert_eq!(table.get(0), Some(0x41));
        assert_eq!(table.get(0x42), Some(0));
    }

    #[test]
    fn test_negative_code_points() {
        let table = load("-41,42\n43,-1\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0), None);
        assert_eq!(table.get(0x43), Some(0xFFFD));
    }

    #[test]
    fn test_quoted_fields() {
        let table = load("\"4E2D\",\"56FD\"\r\n\"41\",\"42,x\"\n\"4\"\"3\",44\n");
        assert_eq!(table.get(0x4E2D), Some(0x56FD));
        assert_eq!(table.get(0x41), Some(0x42));
        assert_eq!(table.get(0x4), Some(0x44));
    }

    #[test]
    fn test_unterminated_quote() {
        let result = SubstitutionTable::from_reader(&b"41,42\n\"43,44\n45,46\n"[..]);
        assert!(matches!(result, Err(MappingError::Quote { line: 2 })));
    }

    #[test]
    fn test_bare_quote() {
        let result = SubstitutionTable::from_reader(&b"41,4\"2\"x\n"[..]);
        assert!(matches!(result, Err(MappingError::BareQuote { line: 1 })));
    }

    #[test]
    fn test_text_after_closing_quote() {
        let result = SubstitutionTable::from_reader(&b"40,41\n\"41\"x,42\n"[..]);
        assert!(matches!(result, Err(MappingError::Quote { line: 2 })));
    }

    /// Yields some data, then fails
    struct BrokenReader<'a> {
        data: &'a [u8],
    }

    impl Read for BrokenReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(io::ErrorKind::Other, "device gone"));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn test_read_error_mid_file() {
        let reader = BrokenReader {
            data: b"41,42\n43,44\n",
        };
        let result = SubstitutionTable::from_reader(reader);
        assert!(matches!(result, Err(MappingError::Io(_))));
    }

    #[test]
    fn test_empty() {
        assert!(load("").is_empty());
    }

    #[test]
    fn test_invalid_utf8_field() {
        let table = SubstitutionTable::from_reader(&b"41,\xFF\xFE\n"[..]).unwrap();
        assert_eq!(table.get(0x41), Some(0));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        match SubstitutionTable::load(&path) {
            Err(Error::OpenMapping { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_load_file_with_broken_quotes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "4E2D,56FD").unwrap();
        writeln!(file, "\"9AD8,9AD9").unwrap();
        let result = SubstitutionTable::load(file.path());
        assert!(matches!(
            result,
            Err(Error::ReadMapping {
                source: MappingError::Quote { line: 2 },
                ..
            })
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "4E2D,56FD").unwrap();
        writeln!(file, "9AD8").unwrap();
        let table = SubstitutionTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0x4E2D), Some(0x56FD));
    }
}
