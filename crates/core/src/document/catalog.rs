//! PDF document - bootstrap, object store and stream decoding.
//!
//! Handles:
//! - header and startxref location
//! - xref loading (classic tables, xref streams, /Prev chains, /XRefStm)
//! - object resolution with caching
//! - object streams (compressed objects)
//! - stream filter chains
//! - full-scan recovery for damaged files

use super::xref::{self, XRef, XRefEntry};
use crate::codec::{self, DecodeParams};
use crate::error::{PdfError, Result};
use crate::model::{Dict, ObjRef, PdfObject, PdfStream};
use crate::parser::ObjectParser;
use bytes::Bytes;
use memmap2::Mmap;
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// How far from the ends of the file the header and startxref markers are
/// searched for.
const MARKER_WINDOW: usize = 1024;

/// Behavioral knobs for opening a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Fail resolution when a reference's generation disagrees with the
    /// index instead of logging a warning. Stale generations are common in
    /// real files, so the lenient default resolves by object number.
    pub strict_generations: bool,
}

#[derive(Clone)]
enum PdfBytes {
    Owned(Bytes),
    Shared(Bytes),
}

impl PdfBytes {
    const fn as_bytes(&self) -> &Bytes {
        match self {
            Self::Owned(data) => data,
            Self::Shared(data) => data,
        }
    }

    fn as_slice(&self) -> &[u8] {
        self.as_bytes().as_ref()
    }
}

type CacheSlot = Arc<OnceCell<Arc<PdfObject>>>;

/// An open PDF document.
///
/// The document owns its bytes (shared `Bytes`, possibly backed by a
/// memory map), the merged cross-reference index and the object cache.
/// It is immutable after construction and safe to share across threads.
///
/// Indirect references inside parsed values are *not* followed eagerly;
/// they come back as [`PdfObject::Ref`] and are resolved per call through
/// [`Document::get`] or [`Document::resolve`]. The cache short-circuits
/// repeated resolution of one reference, but consumers that walk the graph
/// recursively must keep their own set of visited object numbers - depth
/// policy belongs to the caller, not this layer.
pub struct Document {
    data: PdfBytes,
    options: ParseOptions,
    version: Option<String>,
    /// Loaded xref sections, newest first
    xrefs: Vec<XRef>,
    /// Merged object index (newest entry per object number)
    index: FxHashMap<u32, XRefEntry>,
    catalog: Dict,
    info: Vec<Dict>,
    cache: Mutex<FxHashMap<u32, CacheSlot>>,
    /// Index rebuilt by scanning, created at most once when needed
    recovery: OnceCell<Option<XRef>>,
}

impl Document {
    /// Open a document from raw PDF data (copied).
    pub fn new<D: AsRef<[u8]>>(data: D) -> Result<Self> {
        Self::with_options(data, ParseOptions::default())
    }

    /// Open a document from raw PDF data with explicit options.
    pub fn with_options<D: AsRef<[u8]>>(data: D, options: ParseOptions) -> Result<Self> {
        Self::open_inner(
            PdfBytes::Owned(Bytes::copy_from_slice(data.as_ref())),
            options,
        )
    }

    /// Open a document from shared bytes (zero-copy).
    pub fn new_from_bytes(data: Bytes) -> Result<Self> {
        Self::open_inner(PdfBytes::Shared(data), ParseOptions::default())
    }

    /// Open a document from a memory-mapped file.
    pub fn new_from_mmap(mmap: Mmap) -> Result<Self> {
        Self::open_inner(
            PdfBytes::Shared(Bytes::from_owner(mmap)),
            ParseOptions::default(),
        )
    }

    fn open_inner(data: PdfBytes, options: ParseOptions) -> Result<Self> {
        let mut doc = Self {
            data,
            options,
            version: None,
            xrefs: Vec::new(),
            index: FxHashMap::default(),
            catalog: Dict::new(),
            info: Vec::new(),
            cache: Mutex::new(FxHashMap::default()),
            recovery: OnceCell::new(),
        };
        doc.parse()?;
        Ok(doc)
    }

    /// Returns the raw PDF bytes.
    pub fn bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Header version (e.g. "1.7"), when a header was found.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Get the document catalog (the root dictionary).
    pub const fn catalog(&self) -> &Dict {
        &self.catalog
    }

    /// Get the document info dictionaries, newest first.
    pub const fn info(&self) -> &Vec<Dict> {
        &self.info
    }

    /// Trailer dictionary of the newest xref section.
    pub fn trailer(&self) -> &Dict {
        static EMPTY: OnceCell<Dict> = OnceCell::new();
        self.xrefs
            .first()
            .map(|x| &x.trailer)
            .unwrap_or_else(|| EMPTY.get_or_init(Dict::new))
    }

    /// Whether any trailer carries an /Encrypt dictionary.
    ///
    /// Decryption is out of scope for this crate; callers can use this to
    /// bail out early on protected files.
    pub fn is_encrypted(&self) -> bool {
        self.xrefs.iter().any(|x| x.trailer.contains_key("Encrypt"))
    }

    /// All object numbers known to the index, sorted.
    pub fn get_objids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.index.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Whether the index came entirely from scanning (no usable xref).
    pub fn is_rebuilt(&self) -> bool {
        self.xrefs.iter().all(|x| x.is_fallback)
    }

    // === Bootstrap ===

    fn parse(&mut self) -> Result<()> {
        self.version = Self::find_header(self.data.as_slice());
        if self.version.is_none() {
            log::warn!("no %PDF- header within the first {} bytes", MARKER_WINDOW);
        }

        let mut loaded = false;
        if let Ok(pos) = self.find_startxref() {
            match self.load_xrefs(pos) {
                Ok(()) if !self.xrefs.is_empty() => loaded = true,
                Ok(()) => {}
                Err(e) => {
                    log::warn!("xref chain unusable ({}), rebuilding by scan", e);
                    self.xrefs.clear();
                }
            }
        }

        if !loaded {
            let mut scanned = xref::scan_objects(self.data.as_slice())?;
            if !scanned.trailer.contains_key("Root") {
                self.supplement_trailer(&mut scanned);
            }
            self.xrefs.push(scanned);
        } else if self.xrefs.iter().all(|x| x.trailer.is_empty()) {
            // The chain loaded but carried no trailer anywhere; the scan is
            // the last chance to find one.
            if let Ok(mut scanned) = xref::scan_objects(self.data.as_slice()) {
                if !scanned.trailer.contains_key("Root") {
                    self.supplement_trailer(&mut scanned);
                }
                self.xrefs.push(scanned);
            }
        }

        self.index = xref::merge_index(&self.xrefs);

        if self.xrefs.iter().all(|x| x.trailer.is_empty()) {
            return Err(PdfError::NoValidXRef);
        }

        // Catalog and info from the trailers, newest first
        let root_refs: Vec<PdfObject> = self
            .xrefs
            .iter()
            .filter_map(|x| x.trailer.get("Root").cloned())
            .collect();
        for root_ref in root_refs {
            if self.catalog.is_empty()
                && let Ok(root_obj) = self.resolve_shared(&root_ref)
                && let Ok(dict) = root_obj.as_dict()
            {
                self.catalog = dict.clone();
            }
        }
        let info_refs: Vec<PdfObject> = self
            .xrefs
            .iter()
            .filter_map(|x| x.trailer.get("Info").cloned())
            .collect();
        for info_ref in info_refs {
            if let Ok(info_obj) = self.resolve_shared(&info_ref)
                && let Ok(dict) = info_obj.as_dict()
            {
                self.info.push(dict.clone());
            }
        }

        Ok(())
    }

    /// Locate the %PDF-X.Y header, tolerating leading garbage.
    fn find_header(data: &[u8]) -> Option<String> {
        let window = &data[..data.len().min(MARKER_WINDOW)];
        let needle = b"%PDF-";
        let start = window
            .windows(needle.len())
            .position(|w| w == needle)?;
        let rest = &data[start + needle.len()..];
        let end = rest
            .iter()
            .position(|&b| !(b.is_ascii_digit() || b == b'.'))
            .unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        std::str::from_utf8(&rest[..end]).ok().map(str::to_string)
    }

    /// Find the byte offset named by the last startxref marker.
    fn find_startxref(&self) -> Result<usize> {
        let data = self.data.as_slice();
        let search = b"startxref";
        if data.len() < search.len() {
            return Err(PdfError::SyntaxError("PDF too small".into()));
        }

        let window_start = data.len().saturating_sub(MARKER_WINDOW);
        let i = xref::rfind(&data[window_start..], search)
            .map(|i| window_start + i)
            .ok_or(PdfError::NoValidXRef)?;

        let rest = &data[i + search.len()..];
        let mut pos = 0;
        while pos < rest.len() && matches!(rest[pos], b' ' | b'\n' | b'\r') {
            pos += 1;
        }
        let mut num_end = pos;
        while num_end < rest.len() && rest[num_end].is_ascii_digit() {
            num_end += 1;
        }
        if num_end > pos {
            let num_str =
                std::str::from_utf8(&rest[pos..num_end]).map_err(|_| PdfError::NoValidXRef)?;
            return num_str.parse().map_err(|_| PdfError::NoValidXRef);
        }

        Err(PdfError::NoValidXRef)
    }

    /// Load the xref chain starting from the given offset.
    ///
    /// Follows /Prev backwards (incremental updates) and /XRefStm
    /// (hybrid-reference files); a visited set breaks offset loops.
    fn load_xrefs(&mut self, mut pos: usize) -> Result<()> {
        let mut visited = HashSet::new();

        while !visited.contains(&pos) {
            visited.insert(pos);

            let section = self.load_xref_at(pos)?;

            let xref_stm = section
                .trailer
                .get("XRefStm")
                .and_then(|p| p.as_int().ok())
                .map(|n| n as usize);
            let prev = section
                .trailer
                .get("Prev")
                .and_then(|p| p.as_int().ok())
                .map(|n| n as usize);

            self.xrefs.push(section);

            if let Some(stm_pos) = xref_stm
                && !visited.contains(&stm_pos)
            {
                visited.insert(stm_pos);
                match self.load_xref_stream(stm_pos) {
                    Ok(stm) => self.xrefs.push(stm),
                    Err(e) => log::warn!("ignoring bad XRefStm at {}: {}", stm_pos, e),
                }
            }

            match prev {
                Some(prev_pos) => pos = prev_pos,
                None => break,
            }
        }

        Ok(())
    }

    fn load_xref_at(&self, pos: usize) -> Result<XRef> {
        let data = self.data.as_slice();
        if pos >= data.len() {
            return Err(PdfError::SyntaxError(format!(
                "xref offset {} exceeds file size {}",
                pos,
                data.len()
            )));
        }
        if data[pos..].starts_with(b"xref") {
            xref::load_table(data, pos)
        } else {
            // PDF 1.5+ cross-reference stream
            self.load_xref_stream(pos)
        }
    }

    /// Load a cross-reference stream.
    ///
    /// The decoded body is rows of /W-wide fields covering the /Index
    /// ranges: type 0 = free, 1 = in use at offset, 2 = compressed in a
    /// container stream. A zero-width type field defaults to type 1.
    fn load_xref_stream(&self, pos: usize) -> Result<XRef> {
        let obj = self.parse_object_at(pos, 0, false)?;
        let stream = obj.as_stream()?;

        let w = stream
            .get("W")
            .ok_or_else(|| PdfError::SyntaxError("missing W in xref stream".into()))?;
        let w_arr = w.as_array()?;
        if w_arr.len() != 3 {
            return Err(PdfError::SyntaxError("W must have 3 elements".into()));
        }
        let w0 = w_arr[0].as_int()? as usize;
        let w1 = w_arr[1].as_int()? as usize;
        let w2 = w_arr[2].as_int()? as usize;
        let entry_size = w0 + w1 + w2;
        if entry_size == 0 {
            return Err(PdfError::SyntaxError("empty W widths".into()));
        }

        let size = stream
            .get("Size")
            .ok_or_else(|| PdfError::SyntaxError("missing Size in xref stream".into()))?
            .as_int()? as usize;

        let index = if let Some(idx) = stream.get("Index") {
            let arr = idx.as_array()?;
            let mut pairs = Vec::new();
            let mut i = 0;
            while i + 1 < arr.len() {
                let start = arr[i].as_int()? as u32;
                let count = arr[i + 1].as_int()? as usize;
                pairs.push((start, count));
                i += 2;
            }
            pairs
        } else {
            vec![(0, size)]
        };

        let data = self.stream_data(stream)?;

        let mut section = XRef::new();
        let mut data_pos = 0;

        for (start_objid, count) in index {
            for i in 0..count {
                if data_pos + entry_size > data.len() {
                    break;
                }

                let objid = start_objid + i as u32;
                let entry_type = if w0 > 0 {
                    read_be_int(&data[data_pos..data_pos + w0])
                } else {
                    1
                };
                let field1 = read_be_int(&data[data_pos + w0..data_pos + w0 + w1]);
                let field2 = read_be_int(&data[data_pos + w0 + w1..data_pos + entry_size]);
                data_pos += entry_size;

                let entry = match entry_type {
                    0 => XRefEntry::Free {
                        genno: field2 as u32,
                    },
                    1 => XRefEntry::InUse {
                        offset: field1 as usize,
                        genno: field2 as u32,
                    },
                    2 => XRefEntry::Compressed {
                        container: field1 as u32,
                        index: field2 as usize,
                    },
                    _ => continue,
                };
                section.entries.insert(objid, entry);
            }
        }

        // The stream dictionary doubles as the trailer
        for (key, value) in &stream.attrs {
            if !matches!(
                key.as_str(),
                "Length" | "Filter" | "DecodeParms" | "W" | "Index"
            ) {
                section.trailer.insert(key.clone(), value.clone());
            }
        }

        Ok(section)
    }

    /// Fill a scanned section's trailer by looking for a /Root key in the
    /// objects themselves (files whose trailer was lost, or that only ever
    /// had an xref stream).
    fn supplement_trailer(&self, scanned: &mut XRef) {
        let mut offsets: Vec<(u32, usize)> = scanned
            .entries
            .iter()
            .filter_map(|(&objid, entry)| match entry {
                XRefEntry::InUse { offset, .. } => Some((objid, *offset)),
                _ => None,
            })
            .collect();
        offsets.sort_unstable();

        for (objid, offset) in offsets {
            let Ok(obj) = self.parse_object_at(offset, objid, true) else {
                continue;
            };
            let dict = match &obj {
                PdfObject::Dict(d) => d,
                PdfObject::Stream(s) => &s.attrs,
                _ => continue,
            };
            if dict.contains_key("Root") {
                for (key, value) in dict {
                    scanned.trailer.insert(key.clone(), value.clone());
                }
            }
        }
    }

    // === Object store ===

    /// Get an object by reference, checking the generation number.
    ///
    /// A reference whose generation disagrees with the index is resolved
    /// by object number with a warning; with
    /// [`ParseOptions::strict_generations`] it fails instead.
    pub fn get(&self, r: &ObjRef) -> Result<Arc<PdfObject>> {
        if let Some(entry) = self.index.get(&r.objid) {
            let index_genno = match entry {
                XRefEntry::InUse { genno, .. } => *genno,
                XRefEntry::Free { genno } => *genno,
                // Objects in streams always have generation 0
                XRefEntry::Compressed { .. } => 0,
            };
            if index_genno != r.genno {
                if self.options.strict_generations {
                    return Err(PdfError::GenerationMismatch {
                        objid: r.objid,
                        expected: r.genno,
                        got: index_genno,
                    });
                }
                log::warn!(
                    "object {}: reference has generation {}, index has {}",
                    r.objid,
                    r.genno,
                    index_genno
                );
            }
        }
        self.getobj(r.objid)
    }

    /// Get an object by object number.
    ///
    /// The result is cached for the life of the document; concurrent first
    /// access from several threads parses at most once.
    pub fn getobj(&self, objid: u32) -> Result<Arc<PdfObject>> {
        if objid == 0 {
            return Err(PdfError::ObjectNotFound(0));
        }

        // Thread-local cycle detection: resolving an object may require
        // resolving others (e.g. an indirect /Length), and a corrupt file
        // can close that loop.
        thread_local! {
            static RESOLVING: RefCell<HashSet<u32>> = RefCell::new(HashSet::new());
        }

        struct Guard {
            objid: u32,
        }
        impl Drop for Guard {
            fn drop(&mut self) {
                RESOLVING.with(|set| {
                    set.borrow_mut().remove(&self.objid);
                });
            }
        }

        let is_circular = RESOLVING.with(|set| {
            let mut borrowed = set.borrow_mut();
            if borrowed.contains(&objid) {
                true
            } else {
                borrowed.insert(objid);
                false
            }
        });
        if is_circular {
            return Err(PdfError::SyntaxError(format!(
                "circular reference detected for obj {}",
                objid
            )));
        }
        let _guard = Guard { objid };

        let slot: CacheSlot = {
            let mut cache = self
                .cache
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            cache.entry(objid).or_default().clone()
        };

        slot.get_or_try_init(|| self.load_object(objid))
            .map(Arc::clone)
    }

    fn load_object(&self, objid: u32) -> Result<Arc<PdfObject>> {
        match self.index.get(&objid).copied() {
            Some(XRefEntry::InUse { offset, .. }) => {
                match self.parse_object_at(offset, objid, self.is_rebuilt()) {
                    Ok(obj) => Ok(Arc::new(obj)),
                    Err(e) => {
                        log::warn!(
                            "object {} not parseable at recorded offset {} ({}), trying scan recovery",
                            objid,
                            offset,
                            e
                        );
                        self.load_via_recovery(objid, e)
                    }
                }
            }
            Some(XRefEntry::Compressed { container, index }) => {
                match self.parse_object_from_stream(container, index) {
                    Ok(obj) => Ok(Arc::new(obj)),
                    Err(e) => self.load_via_recovery(objid, e),
                }
            }
            Some(XRefEntry::Free { genno }) => Err(PdfError::FreeObject { objid, genno }),
            None => self.load_via_recovery(objid, PdfError::ObjectNotFound(objid)),
        }
    }

    /// Second chance through the scan-rebuilt index.
    fn load_via_recovery(&self, objid: u32, orig: PdfError) -> Result<Arc<PdfObject>> {
        let recovery = self
            .recovery
            .get_or_init(|| xref::scan_objects(self.data.as_slice()).ok());
        if let Some(recovery) = recovery
            && let Some(&XRefEntry::InUse { offset, .. }) = recovery.get(objid)
        {
            return self
                .parse_object_at(offset, objid, true)
                .map(Arc::new)
                .map_err(|_| orig);
        }
        Err(orig)
    }

    /// Parse an indirect object envelope (`objid genno obj ... endobj`)
    /// at the given offset.
    ///
    /// `expected_objid` 0 skips the envelope identity check (bootstrap).
    /// In `fallback` mode the declared /Length is distrusted and stream
    /// bodies are found by endstream scan.
    fn parse_object_at(
        &self,
        offset: usize,
        expected_objid: u32,
        fallback: bool,
    ) -> Result<PdfObject> {
        let data = self.data.as_slice();
        if offset >= data.len() {
            return Err(PdfError::SyntaxError(format!(
                "object offset {} exceeds file size {}",
                offset,
                data.len()
            )));
        }

        let mut cursor = offset;
        let (objid, consumed) = xref::read_number(&data[cursor..])?;
        cursor += consumed;
        skip_ws(data, &mut cursor);
        let (genno, consumed) = xref::read_number(&data[cursor..])?;
        cursor += consumed;
        skip_ws(data, &mut cursor);

        if !data[cursor..].starts_with(b"obj") {
            return Err(PdfError::SyntaxError(format!(
                "expected 'obj' at offset {}, got {:?}",
                offset,
                String::from_utf8_lossy(&data[cursor..data.len().min(cursor + 10)])
            )));
        }
        cursor += 3;
        skip_ws(data, &mut cursor);

        if expected_objid != 0 && objid != expected_objid as i64 {
            return Err(PdfError::SyntaxError(format!(
                "object number mismatch at offset {}: expected {}, found {}",
                offset, expected_objid, objid
            )));
        }

        let mut parser = ObjectParser::at(data, cursor);
        let obj = parser.parse_object()?;

        // A dict followed by the `stream` keyword begins a stream body
        if let PdfObject::Dict(dict) = &obj {
            let mut pos = parser.tell();
            skip_ws(data, &mut pos);
            if data[pos..].starts_with(b"stream") {
                pos += 6;
                // `stream` is terminated by CRLF or LF
                if pos < data.len() && data[pos] == b'\r' {
                    pos += 1;
                }
                if pos < data.len() && data[pos] == b'\n' {
                    pos += 1;
                }

                // XRef and ObjStm streams are load-bearing for the whole
                // file; always locate their end by scan.
                let force_scan = matches!(
                    dict.get("Type"),
                    Some(PdfObject::Name(name)) if name == "XRef" || name == "ObjStm"
                );

                let length: usize = if fallback || force_scan {
                    0
                } else {
                    dict.get("Length")
                        .map(|len_obj| self.resolve_soft(len_obj))
                        .and_then(|resolved| resolved.as_int().ok())
                        .filter(|&len| len > 0)
                        .map(|len| len as usize)
                        .unwrap_or(0)
                };

                let body_start = pos;
                let body = if length > 0 && body_start + length <= data.len() {
                    // Trust the declared /Length when it fits
                    self.data.as_bytes().slice(body_start..body_start + length)
                } else if let Some(end) = find_endstream(&data[body_start..]) {
                    self.data.as_bytes().slice(body_start..body_start + end)
                } else {
                    self.data.as_bytes().slice(body_start..)
                };

                let mut stream = PdfStream::new(dict.clone(), body);
                stream.set_objid(objid.max(0) as u32, genno.max(0) as u32);
                return Ok(PdfObject::Stream(Box::new(stream)));
            }
        }

        Ok(obj)
    }

    /// Parse a compressed object out of its container object stream.
    ///
    /// The container's decoded body starts with `/N` pairs of
    /// `objid offset`, then the packed objects from `/First` onwards.
    fn parse_object_from_stream(&self, container: u32, index: usize) -> Result<PdfObject> {
        let container_obj = self.getobj(container)?;
        let stream = container_obj.as_stream()?;

        match stream.get("Type") {
            Some(PdfObject::Name(name)) if name == "ObjStm" => {}
            _ => {
                log::warn!("container object {} is not marked /Type /ObjStm", container);
            }
        }

        let data = self.stream_data(stream)?;

        let n = self
            .resolve_soft(
                stream
                    .get("N")
                    .ok_or_else(|| PdfError::SyntaxError("missing N in ObjStm".into()))?,
            )
            .as_int()? as usize;
        let first = self
            .resolve_soft(
                stream
                    .get("First")
                    .ok_or_else(|| PdfError::SyntaxError("missing First in ObjStm".into()))?,
            )
            .as_int()? as usize;

        if index >= n {
            return Err(PdfError::SyntaxError(format!(
                "object stream index {} >= N {}",
                index, n
            )));
        }
        if first > data.len() {
            return Err(PdfError::SyntaxError(
                "ObjStm First exceeds decoded length".into(),
            ));
        }

        // Header: objid1 offset1 objid2 offset2 ...
        let mut header = ObjectParser::new(&data[..first]);
        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            let _objid = header.parse_object()?.as_int()?;
            let offset = header.parse_object()?.as_int()? as usize;
            offsets.push(offset);
        }

        let obj_offset = first + offsets[index];
        if obj_offset > data.len() {
            return Err(PdfError::SyntaxError(
                "ObjStm offset exceeds decoded length".into(),
            ));
        }

        let mut parser = ObjectParser::at(&data, obj_offset);
        parser.parse_object()
    }

    // === Resolution ===

    /// Resolve a reference to its object, cloning the result.
    pub fn resolve(&self, obj: &PdfObject) -> Result<PdfObject> {
        Ok((*self.resolve_shared(obj)?).clone())
    }

    /// Resolve a reference to its object without cloning.
    ///
    /// Non-reference values are returned as-is (wrapped). Chains of
    /// references are followed; a cycle is an error.
    pub fn resolve_shared(&self, obj: &PdfObject) -> Result<Arc<PdfObject>> {
        let mut seen = HashSet::new();
        let mut current = match obj {
            PdfObject::Ref(r) => {
                seen.insert(r.objid);
                self.get(r)?
            }
            _ => return Ok(Arc::new(obj.clone())),
        };
        loop {
            match current.as_ref() {
                PdfObject::Ref(r) => {
                    if !seen.insert(r.objid) {
                        return Err(PdfError::SyntaxError(format!(
                            "circular reference detected for obj {}",
                            r.objid
                        )));
                    }
                    current = self.get(r)?;
                }
                _ => return Ok(current),
            }
        }
    }

    /// Resolve, falling back to the original value when resolution fails.
    fn resolve_soft(&self, obj: &PdfObject) -> PdfObject {
        match self.resolve(obj) {
            Ok(resolved) => resolved,
            Err(_) => obj.clone(),
        }
    }

    // === Streams ===

    /// Decoded bytes of the stream behind a reference.
    pub fn get_stream_bytes(&self, r: &ObjRef) -> Result<Vec<u8>> {
        let obj = self.get(r)?;
        let stream = obj.as_stream()?;
        self.stream_data(stream)
    }

    /// Run a stream's filter chain over its raw bytes.
    ///
    /// `/Filter` may be one name or an array applied left to right;
    /// `/DecodeParms` pairs positionally when it is an array. A failing
    /// filter yields a `DecodeError` but leaves the stream dictionary and
    /// raw bytes untouched for the caller.
    pub fn stream_data(&self, stream: &PdfStream) -> Result<Vec<u8>> {
        let chain = self.filter_chain(stream)?;
        let mut data = stream.rawdata().to_vec();
        for (name, params) in &chain {
            data = codec::apply_filter(name, &data, params)?;
        }
        Ok(data)
    }

    /// Resolve a stream's filter names and decode parameters.
    pub fn filter_chain(&self, stream: &PdfStream) -> Result<Vec<(String, DecodeParams)>> {
        let Some(filter) = stream.get_any(&["Filter", "F"]) else {
            return Ok(Vec::new());
        };
        let filter = self.resolve_soft(filter);
        let parms = stream
            .get_any(&["DecodeParms", "DP"])
            .map(|p| self.resolve_soft(p));

        let params_at = |i: usize| -> DecodeParams {
            let obj = match &parms {
                Some(PdfObject::Array(arr)) => arr.get(i).map(|p| self.resolve_soft(p)),
                Some(other) if i == 0 => Some(other.clone()),
                _ => None,
            };
            match obj {
                Some(PdfObject::Dict(dict)) => DecodeParams::from_dict(Some(&dict)),
                _ => DecodeParams::default(),
            }
        };

        match filter {
            PdfObject::Name(name) => Ok(vec![(name, params_at(0))]),
            PdfObject::Array(arr) => {
                let mut chain = Vec::with_capacity(arr.len());
                for (i, item) in arr.iter().enumerate() {
                    match self.resolve_soft(item) {
                        PdfObject::Name(name) => chain.push((name, params_at(i))),
                        other => {
                            return Err(PdfError::SyntaxError(format!(
                                "filter array entry is not a name: {:?}",
                                other
                            )));
                        }
                    }
                }
                Ok(chain)
            }
            // A non-name /F is a file specification, not a filter
            _ => Ok(Vec::new()),
        }
    }
}

fn skip_ws(data: &[u8], cursor: &mut usize) {
    while *cursor < data.len() && matches!(data[*cursor], b' ' | b'\n' | b'\r' | b'\t') {
        *cursor += 1;
    }
}

/// Find the end of a stream body by locating `endstream` and trimming the
/// line terminator in front of it.
fn find_endstream(data: &[u8]) -> Option<usize> {
    let needle = b"endstream";
    if data.len() < needle.len() {
        return None;
    }
    for pos in 0..=data.len() - needle.len() {
        if &data[pos..pos + needle.len()] == needle {
            let mut end = pos;
            while end > 0 && matches!(data[end - 1], b' ' | b'\n' | b'\r') {
                end -= 1;
            }
            return Some(end);
        }
    }
    None
}

fn read_be_int(bytes: &[u8]) -> u64 {
    let mut val: u64 = 0;
    for &b in bytes {
        val = (val << 8) | (b as u64);
    }
    val
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_header_tolerates_leading_garbage() {
        let data = b"garbage bytes\n%PDF-1.6\nrest";
        assert_eq!(Document::find_header(data).as_deref(), Some("1.6"));
        assert_eq!(Document::find_header(b"no header at all"), None);
    }

    #[test]
    fn find_endstream_trims_line_end() {
        let data = b"abc  \nendstream";
        let end = find_endstream(data).unwrap();
        assert_eq!(&data[..end], b"abc");
    }

    #[test]
    fn read_be_int_widths() {
        assert_eq!(read_be_int(&[]), 0);
        assert_eq!(read_be_int(&[0x12]), 0x12);
        assert_eq!(read_be_int(&[0x01, 0x02, 0x03]), 0x010203);
    }

    #[test]
    fn document_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Document>();
    }
}
