//! Binary frame metadata decoding and encoding.
//!
//! Each field listed in [`FRAME_FIELDS`] is decoded into a typed
//! [`FieldValue`]. Everything else in the block is kept as an opaque copy of
//! the original bytes with the named ranges zeroed. Encoding lays the opaque
//! copy down first and writes the named fields over it, so reserved bytes
//! survive a read-modify-write cycle exactly.

use log::{debug, trace};

use crate::endian::{read_i32, read_u32, write_i32, write_u32, ByteOrder};
use crate::error::FormatError;
use crate::frame::{lookup, FieldKind, FRAME_FIELDS, FRAME_HEADER_SIZE};
use crate::layout::{block_at, Layout};

/// The decoded value of one frame header field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U32(u32),
    I32(i32),
    U32Array(Vec<u32>),
    I32Array(Vec<i32>),
    /// Raw bytes of a text field, always exactly the field width.
    Text(Vec<u8>),
}

impl FieldValue {
    /// The all-zero value of a field kind.
    pub fn zeroed(kind: FieldKind) -> Self {
        match kind {
            FieldKind::U32 => FieldValue::U32(0),
            FieldKind::I32 => FieldValue::I32(0),
            FieldKind::U32Array(n) => FieldValue::U32Array(vec![0; n]),
            FieldKind::I32Array(n) => FieldValue::I32Array(vec![0; n]),
            FieldKind::Text(n) => FieldValue::Text(vec![0; n]),
        }
    }

    /// A text value from a string. Padded to the field width on [`BinaryMetadata::set`].
    pub fn text(s: &str) -> Self {
        FieldValue::Text(s.as_bytes().to_vec())
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            FieldValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            FieldValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Text content up to the first NUL, if valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(raw) => {
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                core::str::from_utf8(&raw[..end]).ok()
            }
            _ => None,
        }
    }

    fn matches_kind(&self, kind: FieldKind) -> bool {
        match (self, kind) {
            (FieldValue::U32(_), FieldKind::U32) | (FieldValue::I32(_), FieldKind::I32) => true,
            (FieldValue::U32Array(v), FieldKind::U32Array(n)) => v.len() == n,
            (FieldValue::I32Array(v), FieldKind::I32Array(n)) => v.len() == n,
            (FieldValue::Text(_), FieldKind::Text(_)) => true,
            _ => false,
        }
    }
}

/// The decoded binary metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMetadata {
    /// One value per entry of [`FRAME_FIELDS`], in table order.
    values: Vec<FieldValue>,
    /// The whole block with every named field range zeroed.
    reserved: Vec<u8>,
}

impl Default for BinaryMetadata {
    fn default() -> Self {
        BinaryMetadata::zeroed_with_size(Layout::MARCCD.metadata_size)
    }
}

impl BinaryMetadata {
    /// An all-zero metadata block sized for `layout`.
    pub fn zeroed(layout: &Layout) -> Result<Self, FormatError> {
        check_block_size(layout)?;
        Ok(Self::zeroed_with_size(layout.metadata_size))
    }

    fn zeroed_with_size(size: usize) -> Self {
        BinaryMetadata {
            values: FRAME_FIELDS
                .iter()
                .map(|spec| FieldValue::zeroed(spec.kind))
                .collect(),
            reserved: vec![0; size],
        }
    }

    /// Size of the encoded block in bytes.
    pub fn block_size(&self) -> usize {
        self.reserved.len()
    }

    /// The opaque bytes. Named field ranges read as zero.
    pub fn reserved(&self) -> &[u8] {
        &self.reserved
    }

    /// Iterate over `(name, value)` for every named field.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        FRAME_FIELDS
            .iter()
            .zip(self.values.iter())
            .map(|(spec, value)| (spec.name, value))
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        lookup(name).map(|(idx, _)| &self.values[idx])
    }

    pub fn u32(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(FieldValue::as_u32)
    }

    pub fn i32(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(FieldValue::as_i32)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Replace the value of a named field.
    ///
    /// The value must have the field's kind (and array length). Text shorter
    /// than the field is NUL-padded; longer text is rejected.
    pub fn set(&mut self, name: &str, value: FieldValue) -> Result<(), FormatError> {
        let (idx, spec) = lookup(name).ok_or_else(|| FormatError::UnknownField(String::from(name)))?;
        if !value.matches_kind(spec.kind) {
            return Err(FormatError::InvalidValue {
                field: String::from(name),
                value: format!("{value:?}"),
            });
        }
        let value = match value {
            FieldValue::Text(mut raw) => {
                let width = spec.width();
                if raw.len() > width {
                    return Err(FormatError::FieldTooLarge {
                        field: String::from(name),
                        size: raw.len(),
                        capacity: width,
                    });
                }
                raw.resize(width, 0);
                FieldValue::Text(raw)
            }
            other => other,
        };
        self.values[idx] = value;
        Ok(())
    }

    pub fn set_u32(&mut self, name: &str, value: u32) -> Result<(), FormatError> {
        self.set(name, FieldValue::U32(value))
    }

    pub fn set_i32(&mut self, name: &str, value: i32) -> Result<(), FormatError> {
        self.set(name, FieldValue::I32(value))
    }

    pub fn set_text(&mut self, name: &str, value: &str) -> Result<(), FormatError> {
        self.set(name, FieldValue::text(value))
    }
}

fn check_block_size(layout: &Layout) -> Result<(), FormatError> {
    if layout.metadata_size < FRAME_HEADER_SIZE {
        return Err(FormatError::inconsistent(
            "metadata block holds the frame header",
            format!(">= {FRAME_HEADER_SIZE} bytes"),
            layout.metadata_size,
        ));
    }
    Ok(())
}

fn read_field(raw: &[u8], kind: FieldKind, order: ByteOrder) -> FieldValue {
    match kind {
        FieldKind::U32 => FieldValue::U32(read_u32(raw, order)),
        FieldKind::I32 => FieldValue::I32(read_i32(raw, order)),
        FieldKind::U32Array(_) => FieldValue::U32Array(
            raw.chunks_exact(4).map(|c| read_u32(c, order)).collect(),
        ),
        FieldKind::I32Array(_) => FieldValue::I32Array(
            raw.chunks_exact(4).map(|c| read_i32(c, order)).collect(),
        ),
        FieldKind::Text(_) => FieldValue::Text(raw.to_vec()),
    }
}

fn write_field(buf: &mut [u8], value: &FieldValue, order: ByteOrder) {
    match value {
        FieldValue::U32(v) => write_u32(buf, *v, order),
        FieldValue::I32(v) => write_i32(buf, *v, order),
        FieldValue::U32Array(values) => {
            for (chunk, v) in buf.chunks_exact_mut(4).zip(values) {
                write_u32(chunk, *v, order);
            }
        }
        FieldValue::I32Array(values) => {
            for (chunk, v) in buf.chunks_exact_mut(4).zip(values) {
                write_i32(chunk, *v, order);
            }
        }
        FieldValue::Text(raw) => buf.copy_from_slice(raw),
    }
}

/// Decode the metadata block starting at `offset`, reading multi-byte fields
/// in `order`.
///
/// Returns the record and the number of bytes consumed
/// (`layout.metadata_size`).
pub fn decode(
    data: &[u8],
    offset: usize,
    order: ByteOrder,
    layout: &Layout,
) -> Result<(BinaryMetadata, usize), FormatError> {
    check_block_size(layout)?;
    let size = layout.metadata_size;
    let block = block_at(data, offset, size).map_err(|available| {
        FormatError::TruncatedMetadata {
            needed: size,
            available,
        }
    })?;

    let mut reserved = block.to_vec();
    let values = FRAME_FIELDS
        .iter()
        .map(|spec| {
            let value = read_field(&block[spec.range()], spec.kind, order);
            trace!("metadata field {} @ {}: {:?}", spec.name, spec.offset, value);
            reserved[spec.range()].fill(0);
            value
        })
        .collect();

    debug!(
        "decoded metadata block: {} bytes at offset {}, {:?} byte order",
        size, offset, order
    );
    Ok((BinaryMetadata { values, reserved }, size))
}

/// Encode the metadata block in `order`.
///
/// The output is exactly [`BinaryMetadata::block_size`] bytes long.
pub fn encode(metadata: &BinaryMetadata, order: ByteOrder) -> Vec<u8> {
    let mut buf = metadata.reserved.clone();
    for (spec, value) in FRAME_FIELDS.iter().zip(&metadata.values) {
        write_field(&mut buf[spec.range()], value, order);
    }
    debug!(
        "encoded metadata block: {} bytes, {:?} byte order",
        buf.len(),
        order
    );
    buf
}
