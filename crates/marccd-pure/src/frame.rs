//! Declared layout of the binary frame header.
//!
//! The metadata block is a packed record of 3072 bytes. Every interpreted
//! field is listed in [`FRAME_FIELDS`] with its byte offset and kind; the
//! `reserve*` ranges between them are deliberately absent and are carried
//! verbatim by [`crate::metadata::BinaryMetadata`].

use core::ops::Range;

/// Size of the byte range described by [`FRAME_FIELDS`].
pub const FRAME_HEADER_SIZE: usize = 3072;

/// Primitive type and width of a frame header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer. Fixed-point quantities are stored this way.
    I32,
    /// Fixed-length array of unsigned 32-bit integers.
    U32Array(usize),
    /// Fixed-length array of signed 32-bit integers.
    I32Array(usize),
    /// NUL-padded ASCII of the given byte width.
    Text(usize),
}

impl FieldKind {
    /// Width of the field in bytes.
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U32 | FieldKind::I32 => 4,
            FieldKind::U32Array(n) | FieldKind::I32Array(n) => 4 * n,
            FieldKind::Text(n) => n,
        }
    }
}

/// One row of the layout table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Width of the field in bytes.
    pub const fn width(&self) -> usize {
        self.kind.width()
    }

    /// Byte range of the field within the metadata block.
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.kind.width()
    }
}

const fn field(name: &'static str, offset: usize, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, offset, kind }
}

/// Names of the fields the rest of the crate reads or derives.
pub mod names {
    pub const HEADER_BYTE_ORDER: &str = "header_byte_order";
    pub const DATA_BYTE_ORDER: &str = "data_byte_order";
    pub const HEADER_SIZE: &str = "header_size";
    pub const NFAST: &str = "nfast";
    pub const NSLOW: &str = "nslow";
    pub const DEPTH: &str = "depth";
    pub const XTAL_TO_DETECTOR: &str = "xtal_to_detector";
    pub const START_XTAL_TO_DETECTOR: &str = "start_xtal_to_detector";
    pub const BEAM_X: &str = "beam_x";
    pub const BEAM_Y: &str = "beam_y";
    pub const PIXELSIZE_X: &str = "pixelsize_x";
    pub const PIXELSIZE_Y: &str = "pixelsize_y";
    pub const SOURCE_WAVELENGTH: &str = "source_wavelength";
    pub const ACQUIRE_TIMESTAMP: &str = "acquire_timestamp";
}

/// Every interpreted field of the frame header, in offset order.
pub static FRAME_FIELDS: [FieldSpec; 138] = [
    // File and header format parameters
    field("header_type", 0, FieldKind::U32),
    field("header_name", 4, FieldKind::Text(16)),
    field("header_major_version", 20, FieldKind::U32),
    field("header_minor_version", 24, FieldKind::U32),
    field("header_byte_order", 28, FieldKind::U32),
    field("data_byte_order", 32, FieldKind::U32),
    field("header_size", 36, FieldKind::U32),
    field("frame_type", 40, FieldKind::U32),
    field("magic_number", 44, FieldKind::I32),
    field("compression_type", 48, FieldKind::U32),
    field("compression1", 52, FieldKind::U32),
    field("compression2", 56, FieldKind::U32),
    field("compression3", 60, FieldKind::U32),
    field("compression4", 64, FieldKind::U32),
    field("compression5", 68, FieldKind::U32),
    field("compression6", 72, FieldKind::U32),
    field("nheaders", 76, FieldKind::U32),
    field("nfast", 80, FieldKind::U32),
    field("nslow", 84, FieldKind::U32),
    field("depth", 88, FieldKind::U32),
    field("record_length", 92, FieldKind::U32),
    field("signif_bits", 96, FieldKind::U32),
    field("data_type", 100, FieldKind::U32),
    field("saturated_value", 104, FieldKind::U32),
    field("sequence", 108, FieldKind::U32),
    field("nimages", 112, FieldKind::U32),
    field("origin", 116, FieldKind::U32),
    field("orientation", 120, FieldKind::U32),
    field("view_direction", 124, FieldKind::U32),
    field("overflow_location", 128, FieldKind::U32),
    field("over_8_bits", 132, FieldKind::U32),
    field("over_16_bits", 136, FieldKind::U32),
    field("multiplexed", 140, FieldKind::U32),
    field("nfastimages", 144, FieldKind::U32),
    field("nslowimages", 148, FieldKind::U32),
    field("darkcurrent_applied", 152, FieldKind::U32),
    field("bias_applied", 156, FieldKind::U32),
    field("flatfield_applied", 160, FieldKind::U32),
    field("distortion_applied", 164, FieldKind::U32),
    field("original_header_type", 168, FieldKind::U32),
    field("file_saved", 172, FieldKind::U32),
    field("n_valid_pixels", 176, FieldKind::U32),
    field("defectmap_applied", 180, FieldKind::U32),
    field("subimage_nfast", 184, FieldKind::U32),
    field("subimage_nslow", 188, FieldKind::U32),
    field("subimage_origin_fast", 192, FieldKind::U32),
    field("subimage_origin_slow", 196, FieldKind::U32),
    field("readout_pattern", 200, FieldKind::U32),
    field("saturation_level", 204, FieldKind::U32),
    field("orientation_code", 208, FieldKind::U32),
    field("frameshift_multiplexed", 212, FieldKind::U32),
    field("prescan_nfast", 216, FieldKind::U32),
    field("prescan_nslow", 220, FieldKind::U32),
    field("postscan_nfast", 224, FieldKind::U32),
    field("postscan_nslow", 228, FieldKind::U32),
    field("prepost_trimmed", 232, FieldKind::U32),
    // Data statistics
    field("total_counts", 256, FieldKind::U32Array(2)),
    field("special_counts1", 264, FieldKind::U32Array(2)),
    field("special_counts2", 272, FieldKind::U32Array(2)),
    field("min", 280, FieldKind::U32),
    field("max", 284, FieldKind::U32),
    field("mean", 288, FieldKind::I32),
    field("rms", 292, FieldKind::U32),
    field("n_zeros", 296, FieldKind::U32),
    field("n_saturated", 300, FieldKind::U32),
    field("stats_uptodate", 304, FieldKind::U32),
    field("pixel_noise", 308, FieldKind::U32Array(9)),
    // Sample changer
    field("barcode", 384, FieldKind::Text(16)),
    field("barcode_angle", 400, FieldKind::U32),
    field("barcode_status", 404, FieldKind::U32),
    // Goniostat
    field("xtal_to_detector", 640, FieldKind::I32),
    field("beam_x", 644, FieldKind::I32),
    field("beam_y", 648, FieldKind::I32),
    field("integration_time", 652, FieldKind::I32),
    field("exposure_time", 656, FieldKind::I32),
    field("readout_time", 660, FieldKind::I32),
    field("nreads", 664, FieldKind::I32),
    field("start_twotheta", 668, FieldKind::I32),
    field("start_omega", 672, FieldKind::I32),
    field("start_chi", 676, FieldKind::I32),
    field("start_kappa", 680, FieldKind::I32),
    field("start_phi", 684, FieldKind::I32),
    field("start_delta", 688, FieldKind::I32),
    field("start_gamma", 692, FieldKind::I32),
    field("start_xtal_to_detector", 696, FieldKind::I32),
    field("end_twotheta", 700, FieldKind::I32),
    field("end_omega", 704, FieldKind::I32),
    field("end_chi", 708, FieldKind::I32),
    field("end_kappa", 712, FieldKind::I32),
    field("end_phi", 716, FieldKind::I32),
    field("end_delta", 720, FieldKind::I32),
    field("end_gamma", 724, FieldKind::I32),
    field("end_xtal_to_detector", 728, FieldKind::I32),
    field("rotation_axis", 732, FieldKind::I32),
    field("rotation_range", 736, FieldKind::I32),
    field("detector_rotx", 740, FieldKind::I32),
    field("detector_roty", 744, FieldKind::I32),
    field("detector_rotz", 748, FieldKind::I32),
    field("total_dose", 752, FieldKind::I32),
    // Detector
    field("detector_type", 768, FieldKind::I32),
    field("pixelsize_x", 772, FieldKind::I32),
    field("pixelsize_y", 776, FieldKind::I32),
    field("mean_bias", 780, FieldKind::I32),
    field("photons_per_100adu", 784, FieldKind::I32),
    field("measured_bias", 788, FieldKind::I32Array(9)),
    field("measured_temperature", 824, FieldKind::I32Array(9)),
    field("measured_pressure", 860, FieldKind::I32Array(9)),
    // X-ray source
    field("source_type", 896, FieldKind::I32),
    field("source_dx", 900, FieldKind::I32),
    field("source_dy", 904, FieldKind::I32),
    field("source_wavelength", 908, FieldKind::I32),
    field("source_power", 912, FieldKind::I32),
    field("source_voltage", 916, FieldKind::I32),
    field("source_current", 920, FieldKind::I32),
    field("source_bias", 924, FieldKind::I32),
    field("source_polarization_x", 928, FieldKind::I32),
    field("source_polarization_y", 932, FieldKind::I32),
    field("source_intensity_0", 936, FieldKind::I32),
    field("source_intensity_1", 940, FieldKind::I32),
    // X-ray optics
    field("optics_type", 952, FieldKind::I32),
    field("optics_dx", 956, FieldKind::I32),
    field("optics_dy", 960, FieldKind::I32),
    field("optics_wavelength", 964, FieldKind::I32),
    field("optics_dispersion", 968, FieldKind::I32),
    field("optics_crossfire_x", 972, FieldKind::I32),
    field("optics_crossfire_y", 976, FieldKind::I32),
    field("optics_angle", 980, FieldKind::I32),
    field("optics_polarization_x", 984, FieldKind::I32),
    field("optics_polarization_y", 988, FieldKind::I32),
    // File parameters
    field("filetitle", 1024, FieldKind::Text(128)),
    field("filepath", 1152, FieldKind::Text(128)),
    field("filename", 1280, FieldKind::Text(64)),
    field("acquire_timestamp", 1344, FieldKind::Text(32)),
    field("header_timestamp", 1376, FieldKind::Text(32)),
    field("save_timestamp", 1408, FieldKind::Text(32)),
    field("file_comment", 1440, FieldKind::Text(512)),
    // Dataset parameters
    field("dataset_comment", 2048, FieldKind::Text(512)),
    // User data
    field("user_data", 2560, FieldKind::Text(512)),
];

/// Find a field by name, returning its index in [`FRAME_FIELDS`] and its spec.
pub fn lookup(name: &str) -> Option<(usize, &'static FieldSpec)> {
    FRAME_FIELDS
        .iter()
        .enumerate()
        .find(|(_, spec)| spec.name == name)
}
