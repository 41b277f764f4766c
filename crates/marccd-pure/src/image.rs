//! The decoded MarCCD image: text header, frame metadata, and pixel grid.
//!
//! A [`MarImage`] is always consistent. Decoding validates every cross-field
//! invariant before returning, and every mutator checks the result before
//! committing it, so a failed call leaves the image unchanged.

use log::debug;

use crate::endian::ByteOrder;
use crate::error::FormatError;
use crate::frame::names;
use crate::layout::Layout;
use crate::metadata::{self, BinaryMetadata, FieldValue};
use crate::parameters::{ExperimentalParameters, Timestamp};
use crate::pixels::{self, PixelGrid, PixelType};
use crate::text_header::{self, Key, Keyword, TextHeader};

/// Caller-supplied values applied by [`MarImage::from_array`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    text: Vec<(Key, String)>,
    metadata: Vec<(String, FieldValue)>,
    distance: Option<f64>,
    center: Option<(f64, f64)>,
    pixel_size: Option<(f64, f64)>,
    wavelength: Option<f64>,
    acquired: Option<Timestamp>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text header key. Known keywords replace the synthesized value.
    pub fn text(mut self, key: impl Into<Key>, value: impl Into<String>) -> Self {
        self.text.push((key.into(), value.into()));
        self
    }

    /// Set a named frame header field.
    pub fn metadata(mut self, name: &str, value: FieldValue) -> Self {
        self.metadata.push((String::from(name), value));
        self
    }

    /// Crystal-to-detector distance in millimeters.
    pub fn distance(mut self, mm: f64) -> Self {
        self.distance = Some(mm);
        self
    }

    /// Beam center in pixels.
    pub fn center(mut self, x: f64, y: f64) -> Self {
        self.center = Some((x, y));
        self
    }

    /// Pixel size in microns.
    pub fn pixel_size(mut self, x: f64, y: f64) -> Self {
        self.pixel_size = Some((x, y));
        self
    }

    /// Wavelength in ångström.
    pub fn wavelength(mut self, angstrom: f64) -> Self {
        self.wavelength = Some(angstrom);
        self
    }

    pub fn acquired(mut self, ts: Timestamp) -> Self {
        self.acquired = Some(ts);
        self
    }
}

/// A complete MarCCD image.
#[derive(Debug, Clone, PartialEq)]
pub struct MarImage {
    layout: Layout,
    header: TextHeader,
    metadata: BinaryMetadata,
    pixels: PixelGrid,
}

impl MarImage {
    /// Decode a complete file held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        Self::from_bytes_with_layout(data, Layout::MARCCD)
    }

    /// Decode a complete file using a non-standard block layout.
    pub fn from_bytes_with_layout(data: &[u8], layout: Layout) -> Result<Self, FormatError> {
        let (header, _) = text_header::decode(data, 0, &layout)?;
        let header_order = header.byte_order()?;

        let metadata_offset = layout.metadata_offset();
        let (metadata, metadata_len) =
            metadata::decode(data, metadata_offset, header_order, &layout)?;
        let pixel_order = pixel_order(header_order, &metadata)?;

        let width = header.integer(Keyword::Size1)?;
        let height = header.integer(Keyword::Size2)?;
        let ty = header.pixel_type()?;
        let offset = metadata_offset + metadata_len;
        let pixels = pixels::decode(data, offset, width, height, ty.bit_depth(), pixel_order)?;

        let expected = offset + pixels.byte_len();
        if data.len() != expected {
            return Err(FormatError::inconsistent(
                "file length == HEADER_BYTES + pixel bytes",
                expected,
                data.len(),
            ));
        }

        validate(&layout, &header, &metadata, &pixels)?;
        debug!(
            "decoded MarCCD image: {width}x{height} {}, header {:?}, pixels {:?}",
            ty.token(),
            header_order,
            pixel_order
        );
        Ok(MarImage {
            layout,
            header,
            metadata,
            pixels,
        })
    }

    /// Build an image around a pixel grid.
    ///
    /// The synthesized header carries the six required keys with
    /// `BYTE_ORDER=little_endian`; the metadata is zeroed apart from the byte
    /// order markers, `header_size`, and the grid shape. Overrides are applied
    /// on top, text keys first, and the result must satisfy every invariant.
    pub fn from_array(pixels: PixelGrid, overrides: Overrides) -> Result<Self, FormatError> {
        let layout = Layout::MARCCD;

        let mut header = TextHeader::new();
        header.set(Keyword::HeaderBytes, layout.header_bytes().to_string())?;
        header.set(Keyword::Dim, "2")?;
        header.set(Keyword::ByteOrder, ByteOrder::default().token())?;
        header.set(Keyword::Type, pixels.pixel_type().token())?;
        header.set(Keyword::Size1, pixels.width().to_string())?;
        header.set(Keyword::Size2, pixels.height().to_string())?;
        for (key, value) in overrides.text {
            header.set(key, value)?;
        }

        let order = header.byte_order()?;
        let mut metadata = BinaryMetadata::zeroed(&layout)?;
        metadata.set_u32(names::HEADER_BYTE_ORDER, order.code())?;
        metadata.set_u32(names::DATA_BYTE_ORDER, order.code())?;
        metadata.set_u32(
            names::HEADER_SIZE,
            to_u32(names::HEADER_SIZE, layout.metadata_size)?,
        )?;
        sync_metadata_shape(&mut metadata, &pixels, true)?;
        for (name, value) in overrides.metadata {
            metadata.set(&name, value)?;
        }

        if let Some(mm) = overrides.distance {
            metadata.set_distance(mm)?;
        }
        if let Some((x, y)) = overrides.center {
            metadata.set_center(x, y)?;
        }
        if let Some((x, y)) = overrides.pixel_size {
            metadata.set_pixel_size(x, y)?;
        }
        if let Some(angstrom) = overrides.wavelength {
            metadata.set_wavelength(angstrom)?;
        }
        if let Some(ts) = overrides.acquired {
            metadata.set_acquire_timestamp(&ts)?;
        }

        validate(&layout, &header, &metadata, &pixels)?;
        Ok(MarImage {
            layout,
            header,
            metadata,
            pixels,
        })
    }

    /// Encode the complete file.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        let mut header = self.header.clone();
        sync_header_shape(&self.layout, &mut header, &self.pixels)?;
        let header_order = header.byte_order()?;
        let pixel_order = pixel_order(header_order, &self.metadata)?;

        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&text_header::encode(&header, &self.layout)?);
        out.extend_from_slice(&metadata::encode(&self.metadata, header_order));
        out.extend_from_slice(&pixels::encode(&self.pixels, pixel_order));

        debug!(
            "encoded MarCCD image: {} bytes, header {:?}, pixels {:?}",
            out.len(),
            header_order,
            pixel_order
        );
        Ok(out)
    }

    /// Length of the buffer [`to_bytes`](Self::to_bytes) produces.
    pub fn encoded_len(&self) -> usize {
        self.layout.file_len(self.pixels.byte_len())
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn header(&self) -> &TextHeader {
        &self.header
    }

    pub fn metadata(&self) -> &BinaryMetadata {
        &self.metadata
    }

    pub fn pixels(&self) -> &PixelGrid {
        &self.pixels
    }

    pub fn into_pixels(self) -> PixelGrid {
        self.pixels
    }

    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// Byte order of the text-declared header fields and the metadata block.
    pub fn header_byte_order(&self) -> Result<ByteOrder, FormatError> {
        self.header.byte_order()
    }

    /// Byte order of the pixel data.
    pub fn pixel_byte_order(&self) -> Result<ByteOrder, FormatError> {
        pixel_order(self.header.byte_order()?, &self.metadata)
    }

    /// Set one text header key.
    ///
    /// Changing `BYTE_ORDER` also rewrites a non-zero `header_byte_order`
    /// marker so the two keep agreeing.
    pub fn set_header(
        &mut self,
        key: impl Into<Key>,
        value: impl Into<String>,
    ) -> Result<(), FormatError> {
        let mut header = self.header.clone();
        header.set(key, value)?;

        let mut metadata = self.metadata.clone();
        if let Ok(order) = header.byte_order() {
            if metadata.u32(names::HEADER_BYTE_ORDER).unwrap_or(0) != 0 {
                metadata.set_u32(names::HEADER_BYTE_ORDER, order.code())?;
            }
        }

        validate(&self.layout, &header, &metadata, &self.pixels)?;
        self.header = header;
        self.metadata = metadata;
        Ok(())
    }

    /// Remove a text header key, returning its value. Required keys cannot be removed.
    pub fn remove_header(&mut self, key: impl Into<Key>) -> Result<Option<String>, FormatError> {
        let key = key.into();
        if let Key::Known(kw) = &key {
            return Err(FormatError::inconsistent(
                "required keyword present",
                kw.as_str(),
                "removed",
            ));
        }
        Ok(self.header.remove(key))
    }

    /// Set one frame header field.
    pub fn set_metadata(&mut self, name: &str, value: FieldValue) -> Result<(), FormatError> {
        let mut metadata = self.metadata.clone();
        metadata.set(name, value)?;
        validate(&self.layout, &self.header, &metadata, &self.pixels)?;
        self.metadata = metadata;
        Ok(())
    }

    /// Replace the pixel grid.
    ///
    /// `SIZE1`, `SIZE2` and `TYPE` follow the new grid, as do the metadata
    /// `nfast`, `nslow` and `depth` fields when they are set.
    pub fn replace_pixels(&mut self, pixels: PixelGrid) -> Result<(), FormatError> {
        let mut header = self.header.clone();
        sync_header_shape(&self.layout, &mut header, &pixels)?;
        let mut metadata = self.metadata.clone();
        sync_metadata_shape(&mut metadata, &pixels, false)?;

        validate(&self.layout, &header, &metadata, &pixels)?;
        debug!(
            "replaced pixel grid: {}x{} -> {}x{}",
            self.pixels.width(),
            self.pixels.height(),
            pixels.width(),
            pixels.height()
        );
        self.header = header;
        self.metadata = metadata;
        self.pixels = pixels;
        Ok(())
    }

    pub fn parameters(&self) -> ExperimentalParameters {
        self.metadata.parameters()
    }

    /// Beam center `(x, y)` in pixels.
    pub fn center(&self) -> (f64, f64) {
        self.metadata.center()
    }

    pub fn set_distance(&mut self, mm: f64) -> Result<(), FormatError> {
        self.metadata.set_distance(mm)
    }

    pub fn set_center(&mut self, x: f64, y: f64) -> Result<(), FormatError> {
        self.metadata.set_center(x, y)
    }

    pub fn set_pixel_size(&mut self, x: f64, y: f64) -> Result<(), FormatError> {
        self.metadata.set_pixel_size(x, y)
    }

    pub fn set_wavelength(&mut self, angstrom: f64) -> Result<(), FormatError> {
        self.metadata.set_wavelength(angstrom)
    }

    pub fn set_acquire_timestamp(&mut self, ts: &Timestamp) -> Result<(), FormatError> {
        self.metadata.set_acquire_timestamp(ts)
    }
}

/// Pixel order is the metadata `data_byte_order` when set, else the header order.
fn pixel_order(header_order: ByteOrder, metadata: &BinaryMetadata) -> Result<ByteOrder, FormatError> {
    let code = metadata.u32(names::DATA_BYTE_ORDER).unwrap_or(0);
    Ok(ByteOrder::from_code(names::DATA_BYTE_ORDER, code)?.unwrap_or(header_order))
}

fn to_u32(field: &str, value: usize) -> Result<u32, FormatError> {
    u32::try_from(value).map_err(|_| FormatError::InvalidValue {
        field: String::from(field),
        value: value.to_string(),
    })
}

/// Rewrite the shape dependent keys whose parsed value disagrees with the grid.
fn sync_header_shape(
    layout: &Layout,
    header: &mut TextHeader,
    pixels: &PixelGrid,
) -> Result<(), FormatError> {
    let wanted = [
        (Keyword::HeaderBytes, layout.header_bytes()),
        (Keyword::Dim, 2),
        (Keyword::Size1, pixels.width()),
        (Keyword::Size2, pixels.height()),
    ];
    for (kw, value) in wanted {
        if header.integer(kw).ok() != Some(value) {
            header.set(kw, value.to_string())?;
        }
    }
    if header.pixel_type().ok() != Some(pixels.pixel_type()) {
        header.set(Keyword::Type, pixels.pixel_type().token())?;
    }
    Ok(())
}

/// Write the grid shape into `nfast`, `nslow` and `depth`. Unless `force`,
/// fields that are zero (unset) stay zero.
fn sync_metadata_shape(
    metadata: &mut BinaryMetadata,
    pixels: &PixelGrid,
    force: bool,
) -> Result<(), FormatError> {
    let wanted = [
        (names::NFAST, pixels.width()),
        (names::NSLOW, pixels.height()),
        (names::DEPTH, pixels.bytes_per_pixel()),
    ];
    for (name, value) in wanted {
        if force || metadata.u32(name).unwrap_or(0) != 0 {
            metadata.set_u32(name, to_u32(name, value)?)?;
        }
    }
    Ok(())
}

/// A non-zero metadata dimension must equal the one the text header declares.
fn check_dimension(
    invariant: &'static str,
    metadata: &BinaryMetadata,
    name: &str,
    expected: usize,
) -> Result<(), FormatError> {
    let actual = metadata.u32(name).unwrap_or(0);
    if actual != 0 && usize::try_from(actual).ok() != Some(expected) {
        return Err(FormatError::inconsistent(invariant, expected, actual));
    }
    Ok(())
}

fn validate(
    layout: &Layout,
    header: &TextHeader,
    metadata: &BinaryMetadata,
    pixels: &PixelGrid,
) -> Result<(), FormatError> {
    let dim = header.integer(Keyword::Dim)?;
    if dim != 2 {
        return Err(FormatError::inconsistent("DIM == 2", 2, dim));
    }

    let header_bytes = header.integer(Keyword::HeaderBytes)?;
    if header_bytes != layout.header_bytes() {
        return Err(FormatError::inconsistent(
            "HEADER_BYTES == text block + metadata block",
            layout.header_bytes(),
            header_bytes,
        ));
    }

    let width = header.integer(Keyword::Size1)?;
    if width != pixels.width() {
        return Err(FormatError::inconsistent(
            "SIZE1 == pixel grid width",
            pixels.width(),
            width,
        ));
    }
    let height = header.integer(Keyword::Size2)?;
    if height != pixels.height() {
        return Err(FormatError::inconsistent(
            "SIZE2 == pixel grid height",
            pixels.height(),
            height,
        ));
    }

    let ty = header.pixel_type()?;
    if ty != pixels.pixel_type() {
        return Err(FormatError::inconsistent(
            "TYPE == pixel grid type",
            pixels.pixel_type().token(),
            ty.token(),
        ));
    }

    let order = header.byte_order()?;
    let code = metadata.u32(names::HEADER_BYTE_ORDER).unwrap_or(0);
    if let Some(declared) = ByteOrder::from_code(names::HEADER_BYTE_ORDER, code)? {
        if declared != order {
            return Err(FormatError::inconsistent(
                "header_byte_order == BYTE_ORDER",
                order.token(),
                declared.token(),
            ));
        }
    }
    pixel_order(order, metadata)?;

    check_dimension("nfast == SIZE1", metadata, names::NFAST, width)?;
    check_dimension("nslow == SIZE2", metadata, names::NSLOW, height)?;
    let depth = metadata.u32(names::DEPTH).unwrap_or(0);
    if depth != 0 {
        let declared = PixelType::from_bit_depth(depth.saturating_mul(8))?;
        if declared != ty {
            return Err(FormatError::inconsistent(
                "depth == bytes per pixel",
                ty.bytes_per_pixel(),
                depth,
            ));
        }
    }

    if metadata.block_size() != layout.metadata_size {
        return Err(FormatError::inconsistent(
            "metadata block size",
            layout.metadata_size,
            metadata.block_size(),
        ));
    }
    Ok(())
}
