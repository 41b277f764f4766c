//! Byte-order aware integer conversion for MarCCD data.
//!
//! Unlike formats with a single fixed byte order, a MarCCD file declares the
//! order of its header fields in the text header and the order of its pixel
//! data in the frame metadata. The two can differ, so every routine here takes
//! the order explicitly.

use crate::error::FormatError;

/// Marker stored in the frame header for little-endian data.
pub const LITTLE_ENDIAN_CODE: u32 = 1234;

/// Marker stored in the frame header for big-endian data.
pub const BIG_ENDIAN_CODE: u32 = 4321;

/// Byte order of multi-byte numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Least-significant byte first.
    #[default]
    Little,
    /// Most-significant byte first.
    Big,
}

impl ByteOrder {
    /// The order of the machine running this code.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// The `BYTE_ORDER` text header token.
    pub const fn token(self) -> &'static str {
        match self {
            ByteOrder::Little => "little_endian",
            ByteOrder::Big => "big_endian",
        }
    }

    /// Parse a `BYTE_ORDER` text header token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "little_endian" => Some(ByteOrder::Little),
            "big_endian" => Some(ByteOrder::Big),
            _ => None,
        }
    }

    /// The numeric marker written into the frame header's byte order fields.
    pub const fn code(self) -> u32 {
        match self {
            ByteOrder::Little => LITTLE_ENDIAN_CODE,
            ByteOrder::Big => BIG_ENDIAN_CODE,
        }
    }

    /// Interpret a frame header byte order marker.
    ///
    /// Returns `Ok(None)` for `0`, which means the field was never set.
    pub fn from_code(field: &'static str, code: u32) -> Result<Option<Self>, FormatError> {
        match code {
            0 => Ok(None),
            LITTLE_ENDIAN_CODE => Ok(Some(ByteOrder::Little)),
            BIG_ENDIAN_CODE => Ok(Some(ByteOrder::Big)),
            other => Err(FormatError::inconsistent(
                field,
                "1234, 4321 or 0",
                other,
            )),
        }
    }
}

/// Read a `u32` from the first 4 bytes of the slice.
#[inline]
pub fn read_u32(buf: &[u8], order: ByteOrder) -> u32 {
    let bytes = [buf[0], buf[1], buf[2], buf[3]];
    match order {
        ByteOrder::Little => u32::from_le_bytes(bytes),
        ByteOrder::Big => u32::from_be_bytes(bytes),
    }
}

/// Read an `i32` from the first 4 bytes of the slice.
#[inline]
pub fn read_i32(buf: &[u8], order: ByteOrder) -> i32 {
    read_u32(buf, order) as i32
}

/// Write a `u32` into the first 4 bytes of the slice.
#[inline]
pub fn write_u32(buf: &mut [u8], val: u32, order: ByteOrder) {
    let bytes = match order {
        ByteOrder::Little => val.to_le_bytes(),
        ByteOrder::Big => val.to_be_bytes(),
    };
    buf[..4].copy_from_slice(&bytes);
}

/// Write an `i32` into the first 4 bytes of the slice.
#[inline]
pub fn write_i32(buf: &mut [u8], val: i32, order: ByteOrder) {
    write_u32(buf, val as u32, order);
}

// --- Bulk conversions ---
//
// Pixel buffers are cast with bytemuck and then swapped in place. When the
// declared order matches the host these are no-ops.

/// Convert `u16` samples between `order` and native order in place.
pub fn swap_u16_in_place(values: &mut [u16], order: ByteOrder) {
    if order == ByteOrder::native() {
        return;
    }
    for v in values.iter_mut() {
        *v = v.swap_bytes();
    }
}

/// Convert `u32` samples between `order` and native order in place.
pub fn swap_u32_in_place(values: &mut [u32], order: ByteOrder) {
    if order == ByteOrder::native() {
        return;
    }
    for v in values.iter_mut() {
        *v = v.swap_bytes();
    }
}
