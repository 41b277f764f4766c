//! Text header parsing, writing, and typed keyword access.
//!
//! The first block of a MarCCD file is ASCII text of the form
//!
//! ```text
//! HEADER_BYTES=4096\n
//! DIM=2\n
//! BYTE_ORDER=little_endian\n
//! TYPE=unsigned_short\n
//! SIZE1=2048\n
//! SIZE2=2048\n
//! END\n
//! \0\0\0 ...
//! ```
//!
//! padded with the filler byte up to the fixed block size. Keys and values are
//! stored verbatim and in file order, so an unmodified header re-encodes to the
//! same bytes.

use core::fmt;
use core::str;

use log::{debug, trace};

use crate::endian::ByteOrder;
use crate::error::FormatError;
use crate::layout::{block_at, copy_and_pad, Layout};
use crate::pixels::PixelType;

// ── Types ──

/// The keywords this crate interprets. Anything else is a vendor key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// Total header length in bytes (text block + metadata block).
    HeaderBytes,
    /// Number of pixel grid dimensions; always 2.
    Dim,
    /// Byte order of the multi-byte header fields.
    ByteOrder,
    /// Pixel data type token.
    Type,
    /// Width of the pixel grid.
    Size1,
    /// Height of the pixel grid.
    Size2,
}

impl Keyword {
    /// All keywords that must be present in a valid header, in canonical order.
    pub const REQUIRED: [Keyword; 6] = [
        Keyword::HeaderBytes,
        Keyword::Dim,
        Keyword::ByteOrder,
        Keyword::Type,
        Keyword::Size1,
        Keyword::Size2,
    ];

    /// The keyword as written in the header.
    pub const fn as_str(self) -> &'static str {
        match self {
            Keyword::HeaderBytes => "HEADER_BYTES",
            Keyword::Dim => "DIM",
            Keyword::ByteOrder => "BYTE_ORDER",
            Keyword::Type => "TYPE",
            Keyword::Size1 => "SIZE1",
            Keyword::Size2 => "SIZE2",
        }
    }

    /// Look up a keyword by its exact header spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        Keyword::REQUIRED.into_iter().find(|kw| kw.as_str() == name)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A header key: either a known [`Keyword`] or an opaque vendor key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Known(Keyword),
    Vendor(String),
}

impl Key {
    /// Classify a raw key string.
    pub fn parse(name: &str) -> Self {
        match Keyword::from_name(name) {
            Some(kw) => Key::Known(kw),
            None => Key::Vendor(String::from(name)),
        }
    }

    /// The key as written in the header.
    pub fn as_str(&self) -> &str {
        match self {
            Key::Known(kw) => kw.as_str(),
            Key::Vendor(name) => name,
        }
    }
}

impl From<Keyword> for Key {
    fn from(kw: Keyword) -> Self {
        Key::Known(kw)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::parse(name)
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        match Keyword::from_name(&name) {
            Some(kw) => Key::Known(kw),
            None => Key::Vendor(name),
        }
    }
}

/// One `KEY=VALUE` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: String,
}

/// The parsed text header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextHeader {
    entries: Vec<Entry>,
    /// Whether the content was closed by the terminator token.
    terminated: bool,
    /// Whether the last line (entry or terminator) ends with the delimiter
    /// rather than running into filler or the block edge.
    final_delimiter: bool,
    /// Bytes between the end of the content and the trailing filler run.
    trailer: Vec<u8>,
}

impl Default for TextHeader {
    fn default() -> Self {
        TextHeader::new()
    }
}

impl TextHeader {
    /// An empty header that will be written with a terminator.
    pub fn new() -> Self {
        TextHeader {
            entries: Vec::new(),
            terminated: true,
            final_delimiter: true,
            trailer: Vec::new(),
        }
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Iterate over `(key, value)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the header content ends with the terminator token.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Returns `true` if the last line is followed by the delimiter.
    pub fn has_final_delimiter(&self) -> bool {
        self.final_delimiter
    }

    /// Non-filler bytes that followed the content in the decoded block.
    pub fn trailer(&self) -> &[u8] {
        &self.trailer
    }

    /// The value of a known keyword.
    pub fn get(&self, kw: Keyword) -> Option<&str> {
        self.get_key(kw.as_str())
    }

    /// The value of any key, known or vendor, by its header spelling.
    pub fn get_key(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key.as_str() == name)
            .map(|e| e.value.as_str())
    }

    /// The value of a keyword that must be present.
    pub fn require(&self, kw: Keyword) -> Result<&str, FormatError> {
        self.get(kw).ok_or(FormatError::MissingKeyword(kw.as_str()))
    }

    /// Set a value, replacing the first entry with the same key in place or
    /// appending a new entry at the end.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<String>) -> Result<(), FormatError> {
        let key = key.into();
        let value = value.into();
        validate_token(key.as_str(), &value)?;

        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => {
                self.entries.push(Entry { key, value });
                if !self.terminated {
                    self.final_delimiter = true;
                }
            }
        }
        Ok(())
    }

    /// Remove the first entry with the given key, returning its value.
    pub fn remove(&mut self, key: impl Into<Key>) -> Option<String> {
        let key = key.into();
        let idx = self.entries.iter().position(|e| e.key == key)?;
        if !self.terminated && idx + 1 == self.entries.len() {
            self.final_delimiter = true;
        }
        Some(self.entries.remove(idx).value)
    }

    /// Parse a known keyword as an unsigned integer.
    pub fn integer(&self, kw: Keyword) -> Result<usize, FormatError> {
        let raw = self.require(kw)?;
        raw.trim().parse().map_err(|_| FormatError::InvalidValue {
            field: String::from(kw.as_str()),
            value: String::from(raw),
        })
    }

    /// The declared `BYTE_ORDER`.
    pub fn byte_order(&self) -> Result<ByteOrder, FormatError> {
        let raw = self.require(Keyword::ByteOrder)?;
        ByteOrder::from_token(raw.trim()).ok_or_else(|| FormatError::InvalidValue {
            field: String::from(Keyword::ByteOrder.as_str()),
            value: String::from(raw),
        })
    }

    /// The declared pixel `TYPE`.
    pub fn pixel_type(&self) -> Result<PixelType, FormatError> {
        let raw = self.require(Keyword::Type)?;
        PixelType::from_token(raw.trim()).ok_or_else(|| FormatError::InvalidValue {
            field: String::from(Keyword::Type.as_str()),
            value: String::from(raw),
        })
    }

    /// Number of bytes the rendered content occupies before padding.
    pub fn content_len(&self, layout: &Layout) -> usize {
        let entries: usize = self
            .entries
            .iter()
            .map(|e| e.key.as_str().len() + e.value.len() + 2)
            .sum();
        let terminator = if self.terminated {
            layout.terminator.len() + 1
        } else {
            0
        };
        entries + terminator - usize::from(self.drops_final_delimiter())
    }

    fn drops_final_delimiter(&self) -> bool {
        !self.final_delimiter && (self.terminated || !self.entries.is_empty())
    }
}

fn validate_token(key: &str, value: &str) -> Result<(), FormatError> {
    let bad_key = key.is_empty() || key.bytes().any(|b| b == b'=' || b.is_ascii_control());
    let bad_value = value.bytes().any(|b| b.is_ascii_control());
    if bad_key || bad_value {
        return Err(FormatError::MalformedField {
            token: format!("{key}={value}"),
        });
    }
    Ok(())
}

// ── Parsing ──

fn parse_token(line: &[u8], layout: &Layout) -> Result<Entry, FormatError> {
    let malformed = || FormatError::MalformedField {
        token: String::from_utf8_lossy(line).into_owned(),
    };
    let text = str::from_utf8(line).map_err(|_| malformed())?;
    let (key, value) = text
        .split_once(char::from(layout.separator))
        .ok_or_else(malformed)?;
    if key.is_empty() {
        return Err(malformed());
    }
    trace!("text header: {key}={value}");
    Ok(Entry {
        key: Key::parse(key),
        value: String::from(value),
    })
}

/// Decode the fixed-size text header block starting at `offset`.
///
/// Parsing stops at the terminator token, or at the first filler byte when
/// there is no terminator. Returns the header and the number of bytes
/// consumed, which is always `layout.text_header_size`.
pub fn decode(
    data: &[u8],
    offset: usize,
    layout: &Layout,
) -> Result<(TextHeader, usize), FormatError> {
    let size = layout.text_header_size;
    let block = block_at(data, offset, size).map_err(|available| {
        FormatError::TruncatedHeader {
            needed: size,
            available,
        }
    })?;

    let mut entries = Vec::new();
    let mut terminated = false;
    let mut final_delimiter = true;
    let mut pos = 0;

    while pos < block.len() && block[pos] != layout.filler {
        let rest = &block[pos..];
        let line_len = rest
            .iter()
            .position(|&b| b == layout.delimiter || b == layout.filler)
            .unwrap_or(rest.len());
        let line = &rest[..line_len];
        let delimited = rest.get(line_len) == Some(&layout.delimiter);
        pos += line_len + usize::from(delimited);
        final_delimiter = delimited;

        if line == layout.terminator {
            terminated = true;
            break;
        }
        entries.push(parse_token(line, layout)?);
    }

    let tail = &block[pos..];
    let trailer_len = tail
        .iter()
        .rposition(|&b| b != layout.filler)
        .map(|i| i + 1)
        .unwrap_or(0);

    debug!(
        "decoded text header: {} entries, terminated={}, final delimiter={}, {} content bytes",
        entries.len(),
        terminated,
        final_delimiter,
        pos
    );

    let header = TextHeader {
        entries,
        terminated,
        final_delimiter,
        trailer: tail[..trailer_len].to_vec(),
    };
    Ok((header, size))
}

// ── Writing ──

/// Encode a header into exactly `layout.text_header_size` bytes.
///
/// Fails with [`FormatError::FieldTooLarge`] rather than truncating content.
/// A recorded trailer is kept as far as it fits after the content.
pub fn encode(header: &TextHeader, layout: &Layout) -> Result<Vec<u8>, FormatError> {
    let size = layout.text_header_size;
    let mut content = Vec::with_capacity(header.content_len(layout));

    for entry in &header.entries {
        let key = entry.key.as_str().as_bytes();
        let value = entry.value.as_bytes();
        let clashes = |b: &u8| *b == layout.delimiter || *b == layout.filler;
        if key.is_empty()
            || key.iter().any(|b| clashes(b) || *b == layout.separator)
            || value.iter().any(clashes)
        {
            return Err(FormatError::MalformedField {
                token: format!("{}={}", entry.key.as_str(), entry.value),
            });
        }
        content.extend_from_slice(key);
        content.push(layout.separator);
        content.extend_from_slice(value);
        content.push(layout.delimiter);
    }

    if header.terminated {
        content.extend_from_slice(layout.terminator);
        content.push(layout.delimiter);
    }
    if header.drops_final_delimiter() {
        content.pop();
    }

    if content.len() > size {
        return Err(FormatError::FieldTooLarge {
            field: String::from("text header"),
            size: content.len(),
            capacity: size,
        });
    }

    let keep = header.trailer.len().min(size - content.len());
    if keep < header.trailer.len() {
        debug!(
            "text header trailer shortened from {} to {} bytes",
            header.trailer.len(),
            keep
        );
    }
    content.extend_from_slice(&header.trailer[..keep]);

    let mut block = vec![0u8; size];
    copy_and_pad(&mut block, &content, layout.filler);
    Ok(block)
}

// ── Tests ──
