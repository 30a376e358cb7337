//! Cross-reference sections and the merged object index.
//!
//! A PDF carries one xref section per incremental update. Sections are
//! loaded newest-first and merged into a single index where the newest
//! entry for an object number wins - including Free entries, so a later
//! deletion really does shadow an earlier body.

use crate::error::{PdfError, Result};
use crate::model::{Dict, PdfObject};
use crate::parser::ObjectParser;
use rustc_hash::FxHashMap;

/// Location of one object, as recorded by a cross-reference section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Object lives at a byte offset in the file.
    InUse { offset: usize, genno: u32 },
    /// Slot is free; resolving it is an error.
    Free { genno: u32 },
    /// Object is packed inside an object stream, at the given index.
    Compressed { container: u32, index: usize },
}

/// One cross-reference section plus its trailer dictionary.
#[derive(Debug, Default)]
pub struct XRef {
    /// Map from object number to entry
    pub entries: FxHashMap<u32, XRefEntry>,
    /// Trailer dictionary of this section
    pub trailer: Dict,
    /// Whether this section was rebuilt by scanning the file
    pub is_fallback: bool,
}

impl XRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, objid: u32) -> Option<&XRefEntry> {
        self.entries.get(&objid)
    }

    pub fn objids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }
}

/// Merge sections (ordered newest first) into one index.
///
/// The first section mentioning an object number wins; older sections
/// never overwrite it.
pub fn merge_index(sections: &[XRef]) -> FxHashMap<u32, XRefEntry> {
    let mut index = FxHashMap::default();
    for section in sections {
        for (&objid, &entry) in &section.entries {
            index.entry(objid).or_insert(entry);
        }
    }
    index
}

/// Parse a classic cross-reference table at `pos`.
///
/// Layout: the `xref` keyword, then subsections (`first count` header
/// followed by `count` entries of `offset genno n|f`), then `trailer` and
/// the trailer dictionary. Entries are nominally 20 bytes but real files
/// vary, so parsing is whitespace-flexible throughout.
pub fn load_table(data: &[u8], pos: usize) -> Result<XRef> {
    let mut xref = XRef::new();
    let data_at = &data[pos..];

    if !data_at.starts_with(b"xref") {
        return Err(PdfError::SyntaxError(format!(
            "expected 'xref' keyword at offset {}",
            pos
        )));
    }
    let mut cursor = 4;

    loop {
        skip_table_whitespace(data_at, &mut cursor);
        if cursor >= data_at.len() {
            break;
        }
        if data_at[cursor..].starts_with(b"trailer") {
            cursor += 7;
            break;
        }

        // Subsection header: first object number, entry count
        let (start_objid, consumed) = read_number(&data_at[cursor..])?;
        cursor += consumed;
        skip_table_whitespace(data_at, &mut cursor);
        let (count, consumed) = read_number(&data_at[cursor..])?;
        cursor += consumed;
        skip_to_next_line(data_at, &mut cursor);

        let mut base_objid = start_objid;
        for i in 0..count {
            let (offset, consumed) = read_number(&data_at[cursor..])?;
            cursor += consumed;
            while cursor < data_at.len() && data_at[cursor] == b' ' {
                cursor += 1;
            }
            let (genno, consumed) = read_number(&data_at[cursor..])?;
            cursor += consumed;
            while cursor < data_at.len() && data_at[cursor] == b' ' {
                cursor += 1;
            }
            let marker = if cursor < data_at.len() {
                data_at[cursor]
            } else {
                b'f'
            };
            cursor += 1;

            // Some writers start a subsection at 1 but still emit the
            // object-0 free entry (0000000000 65535 f). Shift the base so
            // that entry maps to object 0 and the rest stay aligned.
            if i == 0 && base_objid > 0 && marker == b'f' && offset == 0 && genno == 65535 {
                base_objid -= 1;
            }

            let objid = (base_objid + i) as u32;
            skip_to_next_line(data_at, &mut cursor);

            let genno = genno.clamp(0, u32::MAX as i64) as u32;
            let entry = if marker == b'n' {
                XRefEntry::InUse {
                    offset: offset.max(0) as usize,
                    genno,
                }
            } else {
                XRefEntry::Free { genno }
            };
            xref.entries.insert(objid, entry);
        }
    }

    // Trailer dictionary follows the `trailer` keyword
    let trailer_at = pos + cursor;
    let mut skip = trailer_at;
    while skip < data.len() && data[skip].is_ascii_whitespace() {
        skip += 1;
    }
    if data[skip..].starts_with(b"<<") {
        let mut parser = ObjectParser::at(data, skip);
        if let Ok(PdfObject::Dict(dict)) = parser.parse_object() {
            xref.trailer = dict;
        }
    }

    Ok(xref)
}

/// Rebuild an index by scanning the whole file for `N G obj` envelopes.
///
/// This is the recovery path for files whose xref chain is missing or
/// lying. The last occurrence of each object number wins, mirroring how a
/// conforming reader would treat the file had the updates been indexed.
pub fn scan_objects(data: &[u8]) -> Result<XRef> {
    use regex::bytes::Regex;

    let mut xref = XRef::new();
    xref.is_fallback = true;
    let re = Regex::new(r"(\d+)\s+(\d+)\s+obj\b").unwrap();

    for cap in re.captures_iter(data) {
        let objid = match std::str::from_utf8(&cap[1])
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            Some(value) if value <= u32::MAX as u64 => value as u32,
            _ => continue,
        };
        let genno = match std::str::from_utf8(&cap[2])
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            Some(value) if value <= u32::MAX as u64 => value as u32,
            _ => continue,
        };
        let pos = cap.get(0).unwrap().start();

        xref.entries
            .insert(objid, XRefEntry::InUse { offset: pos, genno });
    }

    if xref.entries.is_empty() {
        return Err(PdfError::NoValidXRef);
    }

    // Best effort: the last `trailer` keyword in the file
    if let Some(trailer_pos) = rfind(data, b"trailer") {
        let mut skip = trailer_pos + 7;
        while skip < data.len() && data[skip].is_ascii_whitespace() {
            skip += 1;
        }
        if data[skip..].starts_with(b"<<") {
            let mut parser = ObjectParser::at(data, skip);
            if let Ok(PdfObject::Dict(dict)) = parser.parse_object() {
                xref.trailer = dict;
            }
        }
    }

    Ok(xref)
}

/// Find the last occurrence of `needle` in `data`.
pub(crate) fn rfind(data: &[u8], needle: &[u8]) -> Option<usize> {
    if data.len() < needle.len() {
        return None;
    }
    (0..=data.len() - needle.len())
        .rev()
        .find(|&i| &data[i..i + needle.len()] == needle)
}

/// Read a decimal number, returning (value, bytes consumed).
pub(crate) fn read_number(data: &[u8]) -> Result<(i64, usize)> {
    let mut pos = 0;
    let negative = if pos < data.len() && data[pos] == b'-' {
        pos += 1;
        true
    } else {
        false
    };

    let start = pos;
    while pos < data.len() && data[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == start {
        return Err(PdfError::SyntaxError("expected number".into()));
    }

    let num_str = std::str::from_utf8(&data[start..pos])
        .map_err(|_| PdfError::SyntaxError("invalid number".into()))?;
    let mut num: i64 = num_str
        .parse()
        .map_err(|_| PdfError::SyntaxError("invalid number".into()))?;
    if negative {
        num = -num;
    }

    Ok((num, pos))
}

fn skip_table_whitespace(data: &[u8], cursor: &mut usize) {
    while *cursor < data.len()
        && matches!(data[*cursor], b' ' | b'\n' | b'\r' | b'\t')
    {
        *cursor += 1;
    }
}

fn skip_to_next_line(data: &[u8], cursor: &mut usize) {
    while *cursor < data.len() && data[*cursor] != b'\n' && data[*cursor] != b'\r' {
        *cursor += 1;
    }
    while *cursor < data.len() && (data[*cursor] == b'\n' || data[*cursor] == b'\r') {
        *cursor += 1;
    }
}
