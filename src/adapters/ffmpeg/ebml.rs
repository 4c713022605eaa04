//! Just enough EBML to cut a GetMedia body into its fragments.
//!
//! Every fragment in the body is a complete Matroska document starting with
//! its own EBML header, and carries its fragment number as a simple tag.

use super::FRAGMENT_NUMBER_TAG;
use std::io::{self, ErrorKind, Read};

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];
const DOC_TYPE_ID: [u8; 2] = [0x42, 0x82];
const TAG_STRING_ID: [u8; 2] = [0x44, 0x87];
/// Real EBML headers are a few dozen bytes.
const MAX_HEADER_SIZE: u64 = 256;
/// Bytes after a tag name searched for its value.
const TAG_VALUE_WINDOW: usize = 64;
const CHUNK_SIZE: usize = 64 * 1024;

enum HeaderCheck {
    Header,
    NotHeader,
    NeedMore,
}

/// Splits a byte stream into Matroska documents, one per EBML header.
///
/// Only a document's own bytes are ever buffered, so an endless stream is
/// read fragment by fragment.
pub struct SegmentSplitter<R> {
    source: R,
    buffer: Vec<u8>,
    scanned: usize,
    eof: bool,
}

impl<R: Read> SegmentSplitter<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            scanned: 0,
            eof: false,
        }
    }

    /// The next complete document, or `None` once the source is exhausted.
    pub fn next_segment(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(end) = self.find_next_header() {
                let rest = self.buffer.split_off(end);
                self.scanned = 0;
                return Ok(Some(std::mem::replace(&mut self.buffer, rest)));
            }
            if self.eof {
                self.scanned = 0;
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.buffer)));
            }
            self.fill()?;
        }
    }

    /// Offset of the header that starts the following document. The
    /// document being collected always starts at offset 0.
    fn find_next_header(&mut self) -> Option<usize> {
        let mut at = self.scanned.max(1);
        while at + EBML_MAGIC.len() <= self.buffer.len() {
            if self.buffer[at..].starts_with(&EBML_MAGIC) {
                match check_header(&self.buffer[at..]) {
                    HeaderCheck::Header => return Some(at),
                    HeaderCheck::NeedMore if !self.eof => {
                        self.scanned = at;
                        return None;
                    }
                    _ => {}
                }
            }
            at += 1;
        }
        self.scanned = at;
        None
    }

    fn fill(&mut self) -> io::Result<()> {
        let start = self.buffer.len();
        self.buffer.resize(start + CHUNK_SIZE, 0);
        let read = loop {
            match self.source.read(&mut self.buffer[start..]) {
                Ok(read) => break read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(start);
                    return Err(e);
                }
            }
        };
        self.buffer.truncate(start + read);
        if read == 0 {
            self.eof = true;
        }
        Ok(())
    }
}

/// Whether `bytes`, starting at an EBML magic, hold a Matroska or WebM
/// header rather than payload bytes that happen to match.
fn check_header(bytes: &[u8]) -> HeaderCheck {
    let after_id = &bytes[EBML_MAGIC.len()..];
    let Some(&first) = after_id.first() else {
        return HeaderCheck::NeedMore;
    };
    let Some(width) = vint_width(first) else {
        return HeaderCheck::NotHeader;
    };
    if after_id.len() < width {
        return HeaderCheck::NeedMore;
    }
    let size = vint_value(&after_id[..width]);
    if size > MAX_HEADER_SIZE {
        return HeaderCheck::NotHeader;
    }
    let Some(body) = after_id.get(width..width + size as usize) else {
        return HeaderCheck::NeedMore;
    };
    let has_doc_type = find(body, &DOC_TYPE_ID).is_some();
    if has_doc_type && (find(body, b"matroska").is_some() || find(body, b"webm").is_some()) {
        HeaderCheck::Header
    } else {
        HeaderCheck::NotHeader
    }
}

/// Value of the fragment number tag in one document, if it carries one.
pub fn fragment_number(segment: &[u8]) -> Option<String> {
    let name = FRAGMENT_NUMBER_TAG.as_bytes();
    let name_at = segment.windows(name.len()).rposition(|w| w == name)?;
    let after_name = &segment[name_at + name.len()..];
    let window = &after_name[..after_name.len().min(TAG_VALUE_WINDOW)];
    let value_id_at = find(window, &TAG_STRING_ID)?;

    let sized = &after_name[value_id_at + TAG_STRING_ID.len()..];
    let width = vint_width(*sized.first()?)?;
    let size = vint_value(sized.get(..width)?) as usize;
    let value = sized.get(width..width + size)?;

    let value = std::str::from_utf8(value).ok()?.trim_end_matches('\0');
    (!value.is_empty()).then(|| value.to_string())
}

/// Width in bytes of an EBML variable-size integer, from its first byte.
fn vint_width(first: u8) -> Option<usize> {
    match first.leading_zeros() {
        8 => None,
        zeros => Some(zeros as usize + 1),
    }
}

fn vint_value(bytes: &[u8]) -> u64 {
    let marker_cleared = u64::from(bytes[0]) & (0xFF >> bytes.len());
    bytes[1..]
        .iter()
        .fold(marker_cleared, |value, &b| (value << 8) | u64::from(b))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
