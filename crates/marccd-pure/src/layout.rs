/// Size in bytes of the ASCII key/value header block.
pub const TEXT_HEADER_SIZE: usize = 1024;

/// Size in bytes of the binary frame metadata block.
pub const METADATA_SIZE: usize = 3072;

/// Combined size of both header blocks; the pixel data begins here.
pub const HEADER_BYTES: usize = TEXT_HEADER_SIZE + METADATA_SIZE;

/// Padding byte used after the text header content.
pub const FILLER_BYTE: u8 = 0x00;

/// Separates `KEY=VALUE` tokens in the text header.
pub const FIELD_DELIMITER: u8 = b'\n';

/// Separates the key from the value inside a token.
pub const KEY_VALUE_SEPARATOR: u8 = b'=';

/// Token that ends the text header content.
pub const TERMINATOR: &[u8] = b"END";

/// Immutable description of the block structure of a MarCCD file.
///
/// Codecs take a `&Layout` instead of reading module-level constants, so a
/// caller can describe a variant (for example a larger metadata block) without
/// touching shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Fixed size of the text header block (N1).
    pub text_header_size: usize,
    /// Fixed size of the binary metadata block (N2).
    pub metadata_size: usize,
    /// Padding byte of the text header block.
    pub filler: u8,
    /// Token delimiter in the text header.
    pub delimiter: u8,
    /// Key/value separator in the text header.
    pub separator: u8,
    /// Terminator token of the text header.
    pub terminator: &'static [u8],
}

impl Layout {
    /// The standard MarCCD layout: 1024 text bytes followed by 3072 metadata bytes.
    pub const MARCCD: Layout = Layout {
        text_header_size: TEXT_HEADER_SIZE,
        metadata_size: METADATA_SIZE,
        filler: FILLER_BYTE,
        delimiter: FIELD_DELIMITER,
        separator: KEY_VALUE_SEPARATOR,
        terminator: TERMINATOR,
    };

    /// Total header length, `N1 + N2`. This is the value of `HEADER_BYTES`.
    pub const fn header_bytes(&self) -> usize {
        self.text_header_size + self.metadata_size
    }

    /// Byte offset at which the metadata block begins.
    pub const fn metadata_offset(&self) -> usize {
        self.text_header_size
    }

    /// Total file length for a pixel payload of `pixel_bytes` bytes.
    pub const fn file_len(&self, pixel_bytes: usize) -> usize {
        self.header_bytes() + pixel_bytes
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout::MARCCD
    }
}

/// Returns `data[offset..offset + len]`.
///
/// When the slice is too short the error carries the number of bytes that
/// were actually available past `offset`.
pub(crate) fn block_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8], usize> {
    let available = data.len().saturating_sub(offset);
    if available < len {
        return Err(available);
    }
    Ok(&data[offset..offset + len])
}

/// Copies `src` into the beginning of `dest` and fills the remaining bytes of
/// `dest` with `pad_byte`.
///
/// # Panics
///
/// Panics if `dest.len() < src.len()`.
pub(crate) fn copy_and_pad(dest: &mut [u8], src: &[u8], pad_byte: u8) {
    let len = src.len();
    dest[..len].copy_from_slice(src);
    dest[len..].fill(pad_byte);
}
