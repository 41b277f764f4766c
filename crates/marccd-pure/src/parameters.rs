//! Experimental parameters stored as scaled integers in the frame header.
//!
//! | quantity        | field(s)                                      | unit on disk  |
//! |-----------------|-----------------------------------------------|---------------|
//! | distance        | `xtal_to_detector`, `start_xtal_to_detector`  | µm            |
//! | beam center     | `beam_x`, `beam_y`                            | 1/1000 pixel  |
//! | pixel size      | `pixelsize_x`, `pixelsize_y`                  | nm            |
//! | wavelength      | `source_wavelength`                           | 1e-5 Å        |

use core::fmt;

use crate::error::FormatError;
use crate::frame::names;
use crate::metadata::BinaryMetadata;

const DISTANCE_SCALE: f64 = 1e3;
const CENTER_SCALE: f64 = 1e3;
const PIXEL_SIZE_SCALE: f64 = 1e3;
const WAVELENGTH_SCALE: f64 = 1e5;

/// Physical parameters of the exposure, in user units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExperimentalParameters {
    /// Crystal-to-detector distance in millimeters.
    pub distance: f64,
    /// Beam center `(x, y)` in pixels.
    pub center: (f64, f64),
    /// Pixel size `(x, y)` in microns.
    pub pixel_size: (f64, f64),
    /// X-ray wavelength in ångström.
    pub wavelength: f64,
    /// Acquisition time, when the header carries a parsable one.
    pub acquired: Option<Timestamp>,
}

/// Acquisition time as recorded by the detector software.
///
/// On disk this is `MMDDhhmmYYYY.SS.nnnnnnnnn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: u32,
}

fn digits<T: core::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl Timestamp {
    /// Parse the on-disk form. Trailing characters after the nanoseconds are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.as_bytes();
        if raw.len() < 25 || raw[12] != b'.' {
            return None;
        }
        let field = |range: core::ops::Range<usize>| core::str::from_utf8(&raw[range]).ok();
        Some(Timestamp {
            month: digits(field(0..2)?)?,
            day: digits(field(2..4)?)?,
            hour: digits(field(4..6)?)?,
            minute: digits(field(6..8)?)?,
            year: digits(field(8..12)?)?,
            second: digits(field(13..15)?)?,
            // byte 15 is a separator of any kind
            nanosecond: digits(field(16..25)?)?,
        })
    }

    /// Render the on-disk form.
    pub fn to_header_string(&self) -> String {
        format!(
            "{:02}{:02}{:02}{:02}{:04}.{:02}.{:09}",
            self.month, self.day, self.hour, self.minute, self.year, self.second, self.nanosecond
        )
    }
}

impl fmt::Display for Timestamp {
    /// `YYYY-MMDD-hhmm-SS-nnnnnnnnn`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}{:02}-{:02}{:02}-{:02}-{:09}",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.nanosecond
        )
    }
}

fn to_fixed(field: &'static str, value: f64, scale: f64) -> Result<i32, FormatError> {
    let scaled = (value * scale).round();
    if !scaled.is_finite() || scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
        return Err(FormatError::InvalidValue {
            field: String::from(field),
            value: value.to_string(),
        });
    }
    Ok(scaled as i32)
}

impl BinaryMetadata {
    fn scaled(&self, name: &str, scale: f64) -> f64 {
        f64::from(self.i32(name).unwrap_or(0)) / scale
    }

    /// All experimental parameters at once.
    pub fn parameters(&self) -> ExperimentalParameters {
        ExperimentalParameters {
            distance: self.distance(),
            center: self.center(),
            pixel_size: self.pixel_size(),
            wavelength: self.wavelength(),
            acquired: self.acquire_timestamp(),
        }
    }

    /// Crystal-to-detector distance in millimeters.
    pub fn distance(&self) -> f64 {
        self.scaled(names::XTAL_TO_DETECTOR, DISTANCE_SCALE)
    }

    /// Set the distance. Both the current and the scan start distance are written.
    pub fn set_distance(&mut self, mm: f64) -> Result<(), FormatError> {
        let fixed = to_fixed(names::XTAL_TO_DETECTOR, mm, DISTANCE_SCALE)?;
        self.set_i32(names::XTAL_TO_DETECTOR, fixed)?;
        self.set_i32(names::START_XTAL_TO_DETECTOR, fixed)
    }

    /// Beam center `(x, y)` in pixels.
    pub fn center(&self) -> (f64, f64) {
        (
            self.scaled(names::BEAM_X, CENTER_SCALE),
            self.scaled(names::BEAM_Y, CENTER_SCALE),
        )
    }

    pub fn set_center(&mut self, x: f64, y: f64) -> Result<(), FormatError> {
        let fx = to_fixed(names::BEAM_X, x, CENTER_SCALE)?;
        let fy = to_fixed(names::BEAM_Y, y, CENTER_SCALE)?;
        self.set_i32(names::BEAM_X, fx)?;
        self.set_i32(names::BEAM_Y, fy)
    }

    /// Pixel size `(x, y)` in microns.
    pub fn pixel_size(&self) -> (f64, f64) {
        (
            self.scaled(names::PIXELSIZE_X, PIXEL_SIZE_SCALE),
            self.scaled(names::PIXELSIZE_Y, PIXEL_SIZE_SCALE),
        )
    }

    pub fn set_pixel_size(&mut self, x: f64, y: f64) -> Result<(), FormatError> {
        let fx = to_fixed(names::PIXELSIZE_X, x, PIXEL_SIZE_SCALE)?;
        let fy = to_fixed(names::PIXELSIZE_Y, y, PIXEL_SIZE_SCALE)?;
        self.set_i32(names::PIXELSIZE_X, fx)?;
        self.set_i32(names::PIXELSIZE_Y, fy)
    }

    /// X-ray wavelength in ångström.
    pub fn wavelength(&self) -> f64 {
        self.scaled(names::SOURCE_WAVELENGTH, WAVELENGTH_SCALE)
    }

    pub fn set_wavelength(&mut self, angstrom: f64) -> Result<(), FormatError> {
        let fixed = to_fixed(names::SOURCE_WAVELENGTH, angstrom, WAVELENGTH_SCALE)?;
        self.set_i32(names::SOURCE_WAVELENGTH, fixed)
    }

    /// The parsed `acquire_timestamp`, or `None` if it is blank or malformed.
    pub fn acquire_timestamp(&self) -> Option<Timestamp> {
        self.text(names::ACQUIRE_TIMESTAMP).and_then(Timestamp::parse)
    }

    pub fn set_acquire_timestamp(&mut self, ts: &Timestamp) -> Result<(), FormatError> {
        self.set_text(names::ACQUIRE_TIMESTAMP, &ts.to_header_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::ByteOrder;
    use crate::metadata::encode;

    const SAMPLE_TS: &str = "080917452019.36.123456789";

    #[test]
    fn parse_timestamp() {
        let ts = Timestamp::parse(SAMPLE_TS).unwrap();
        assert_eq!(ts.year, 2019);
        assert_eq!(ts.month, 8);
        assert_eq!(ts.day, 9);
        assert_eq!(ts.hour, 17);
        assert_eq!(ts.minute, 45);
        assert_eq!(ts.second, 36);
        assert_eq!(ts.nanosecond, 123456789);
        assert_eq!(ts.to_string(), "2019-0809-1745-36-123456789");
        assert_eq!(ts.to_header_string(), SAMPLE_TS);
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(Timestamp::parse("").is_none());
        assert!(Timestamp::parse("08091745201936123456789xx").is_none());
        assert!(Timestamp::parse("0809174520a9.36.123456789").is_none());
        assert!(Timestamp::parse("080917452019.36.12345").is_none());
    }

    #[test]
    fn parse_timestamp_any_second_separator() {
        assert!(Timestamp::parse("080917452019.36:123456789").is_some());
    }

    #[test]
    fn distance_written_twice() {
        let mut meta = BinaryMetadata::default();
        meta.set_distance(150.25).unwrap();
        assert_eq!(meta.i32(names::XTAL_TO_DETECTOR), Some(150250));
        assert_eq!(meta.i32(names::START_XTAL_TO_DETECTOR), Some(150250));
        assert_eq!(meta.distance(), 150.25);

        let out = encode(&meta, ByteOrder::Little);
        assert_eq!(&out[640..644], &150250i32.to_le_bytes());
        assert_eq!(&out[696..700], &150250i32.to_le_bytes());
    }

    #[test]
    fn center_and_pixel_size() {
        let mut meta = BinaryMetadata::default();
        meta.set_center(1024.5, 1000.125).unwrap();
        meta.set_pixel_size(73.242, 73.242).unwrap();
        assert_eq!(meta.center(), (1024.5, 1000.125));
        assert_eq!(meta.i32(names::PIXELSIZE_X), Some(73242));

        let out = encode(&meta, ByteOrder::Little);
        assert_eq!(&out[644..648], &1024500i32.to_le_bytes());
        assert_eq!(&out[648..652], &1000125i32.to_le_bytes());
        assert_eq!(&out[772..776], &73242i32.to_le_bytes());
    }

    #[test]
    fn wavelength_rounds() {
        let mut meta = BinaryMetadata::default();
        meta.set_wavelength(1.0332).unwrap();
        assert_eq!(meta.i32(names::SOURCE_WAVELENGTH), Some(103320));
        meta.set_wavelength(0.979_499_999).unwrap();
        assert_eq!(meta.i32(names::SOURCE_WAVELENGTH), Some(97950));
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut meta = BinaryMetadata::default();
        assert!(matches!(
            meta.set_distance(f64::NAN),
            Err(FormatError::InvalidValue { .. })
        ));
        assert!(meta.set_wavelength(1e9).is_err());
        assert_eq!(meta.distance(), 0.0);
    }

    #[test]
    fn parameters_snapshot() {
        let mut meta = BinaryMetadata::default();
        meta.set_distance(100.0).unwrap();
        meta.set_wavelength(1.0).unwrap();
        meta.set_acquire_timestamp(&Timestamp::parse(SAMPLE_TS).unwrap())
            .unwrap();
        let params = meta.parameters();
        assert_eq!(params.distance, 100.0);
        assert_eq!(params.wavelength, 1.0);
        assert_eq!(params.center, (0.0, 0.0));
        assert_eq!(params.acquired.map(|t| t.year), Some(2019));
    }

    #[test]
    fn blank_timestamp_is_none() {
        assert!(BinaryMetadata::default().acquire_timestamp().is_none());
    }
}
