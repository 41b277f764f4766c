//! Pixel grid decoding and encoding.
//!
//! The pixel payload is `width * height` unsigned samples in row-major order.
//! The storage type is chosen from the declared bit depth, never inferred.

use bytemuck::pod_collect_to_vec;
use log::debug;

use crate::endian::{swap_u16_in_place, swap_u32_in_place, ByteOrder};
use crate::error::FormatError;
use crate::layout::block_at;

/// Sample type of the pixel payload, as named by the `TYPE` header key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelType {
    /// 8-bit samples.
    UnsignedChar,
    /// 16-bit samples; what MarCCD detectors write.
    #[default]
    UnsignedShort,
    /// 32-bit samples.
    UnsignedInt,
}

impl PixelType {
    /// Bit depths that map to a storage type.
    pub const SUPPORTED_BIT_DEPTHS: [u32; 3] = [8, 16, 32];

    /// Map a bit depth onto its storage type.
    pub fn from_bit_depth(bits: u32) -> Result<Self, FormatError> {
        match bits {
            8 => Ok(PixelType::UnsignedChar),
            16 => Ok(PixelType::UnsignedShort),
            32 => Ok(PixelType::UnsignedInt),
            other => Err(FormatError::UnsupportedBitDepth(other)),
        }
    }

    pub const fn bit_depth(self) -> u32 {
        match self {
            PixelType::UnsignedChar => 8,
            PixelType::UnsignedShort => 16,
            PixelType::UnsignedInt => 32,
        }
    }

    pub const fn bytes_per_pixel(self) -> usize {
        self.bit_depth() as usize / 8
    }

    /// The `TYPE` header token.
    pub const fn token(self) -> &'static str {
        match self {
            PixelType::UnsignedChar => "unsigned_char",
            PixelType::UnsignedShort => "unsigned_short",
            PixelType::UnsignedInt => "unsigned_int",
        }
    }

    /// Parse a `TYPE` header token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "unsigned_char" => Some(PixelType::UnsignedChar),
            "unsigned_short" => Some(PixelType::UnsignedShort),
            "unsigned_int" => Some(PixelType::UnsignedInt),
            _ => None,
        }
    }
}

/// Pixel samples, typed by bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl PixelData {
    /// `count` zero samples of the given type.
    pub fn zeros(ty: PixelType, count: usize) -> Self {
        match ty {
            PixelType::UnsignedChar => PixelData::U8(vec![0; count]),
            PixelType::UnsignedShort => PixelData::U16(vec![0; count]),
            PixelType::UnsignedInt => PixelData::U32(vec![0; count]),
        }
    }

    pub fn pixel_type(&self) -> PixelType {
        match self {
            PixelData::U8(_) => PixelType::UnsignedChar,
            PixelData::U16(_) => PixelType::UnsignedShort,
            PixelData::U32(_) => PixelType::UnsignedInt,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::U16(v) => v.len(),
            PixelData::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sample at flat index `idx`, widened to `u32`.
    pub fn get(&self, idx: usize) -> Option<u32> {
        match self {
            PixelData::U8(v) => v.get(idx).map(|&p| u32::from(p)),
            PixelData::U16(v) => v.get(idx).map(|&p| u32::from(p)),
            PixelData::U32(v) => v.get(idx).copied(),
        }
    }
}

/// A two-dimensional grid of unsigned samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    data: PixelData,
}

impl PixelGrid {
    /// Build a grid, checking that the sample count is `width * height`.
    pub fn new(width: usize, height: usize, data: PixelData) -> Result<Self, FormatError> {
        let expected = width.checked_mul(height);
        if expected != Some(data.len()) {
            return Err(FormatError::inconsistent(
                "pixel count == width * height",
                format!("{width} x {height}"),
                data.len(),
            ));
        }
        Ok(PixelGrid {
            width,
            height,
            data,
        })
    }

    /// An all-zero grid.
    pub fn zeros(width: usize, height: usize, ty: PixelType) -> Result<Self, FormatError> {
        let count = width.checked_mul(height).ok_or_else(|| {
            FormatError::inconsistent(
                "pixel count == width * height",
                format!("{width} x {height}"),
                "overflow",
            )
        })?;
        Ok(PixelGrid {
            width,
            height,
            data: PixelData::zeros(ty, count),
        })
    }

    /// A 16-bit grid from row-major samples.
    pub fn from_u16(width: usize, height: usize, samples: Vec<u16>) -> Result<Self, FormatError> {
        PixelGrid::new(width, height, PixelData::U16(samples))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_type(&self) -> PixelType {
        self.data.pixel_type()
    }

    pub fn bit_depth(&self) -> u32 {
        self.pixel_type().bit_depth()
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.pixel_type().bytes_per_pixel()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the encoded payload in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.bytes_per_pixel()
    }

    pub fn data(&self) -> &PixelData {
        &self.data
    }

    pub fn into_data(self) -> PixelData {
        self.data
    }

    /// The sample in column `x` of row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x)
    }

    /// All samples as rows of widened values.
    pub fn rows(&self) -> Vec<Vec<u32>> {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .filter_map(|x| self.data.get(y * self.width + x))
                    .collect()
            })
            .collect()
    }
}

/// Decode `width * height` samples of `bit_depth` bits starting at `offset`.
pub fn decode(
    data: &[u8],
    offset: usize,
    width: usize,
    height: usize,
    bit_depth: u32,
    order: ByteOrder,
) -> Result<PixelGrid, FormatError> {
    let ty = PixelType::from_bit_depth(bit_depth)?;
    let available = data.len().saturating_sub(offset);
    let needed = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(ty.bytes_per_pixel()))
        .ok_or(FormatError::TruncatedPixelData {
            needed: usize::MAX,
            available,
        })?;
    let raw = block_at(data, offset, needed)
        .map_err(|available| FormatError::TruncatedPixelData { needed, available })?;

    let pixels = match ty {
        PixelType::UnsignedChar => PixelData::U8(raw.to_vec()),
        PixelType::UnsignedShort => {
            // Collect into a properly aligned Vec<u16>, then swap to native order.
            let mut samples: Vec<u16> = pod_collect_to_vec(raw);
            swap_u16_in_place(&mut samples, order);
            PixelData::U16(samples)
        }
        PixelType::UnsignedInt => {
            let mut samples: Vec<u32> = pod_collect_to_vec(raw);
            swap_u32_in_place(&mut samples, order);
            PixelData::U32(samples)
        }
    };

    debug!(
        "decoded {width}x{height} pixel grid, {bit_depth}-bit {order:?}, {needed} bytes"
    );
    PixelGrid::new(width, height, pixels)
}

/// Encode a grid's samples in `order`.
///
/// The output is exactly `width * height * bytes_per_pixel` bytes long.
pub fn encode(grid: &PixelGrid, order: ByteOrder) -> Vec<u8> {
    match &grid.data {
        PixelData::U8(samples) => samples.clone(),
        PixelData::U16(samples) => {
            let mut swapped = samples.clone();
            swap_u16_in_place(&mut swapped, order);
            pod_collect_to_vec(&swapped)
        }
        PixelData::U32(samples) => {
            let mut swapped = samples.clone();
            swap_u32_in_place(&mut swapped, order);
            pod_collect_to_vec(&swapped)
        }
    }
}
