//! Pure Rust reader and writer for MarCCD detector images.
//!
//! A MarCCD file is a 1024-byte text header, a 3072-byte binary frame header,
//! and a row-major grid of unsigned pixels:
//!
//! ```no_run
//! use marccd_pure::{file, Keyword};
//!
//! let mut image = file::read("frame_0001.mccd")?;
//! println!("{} x {}", image.width(), image.height());
//! image.set_header("COMMENT", "reprocessed")?;
//! assert_eq!(image.header().get(Keyword::Dim), Some("2"));
//! file::write(&image, "frame_0001_copy.mccd")?;
//! # Ok::<(), marccd_pure::Error>(())
//! ```

#[cfg(feature = "array")]
pub mod array;
pub mod endian;
pub mod error;
pub mod file;
pub mod frame;
pub mod image;
pub mod layout;
pub mod metadata;
pub mod parameters;
pub mod pixels;
pub mod text_header;

pub use endian::ByteOrder;
pub use error::{Error, FormatError, Result};
pub use image::{MarImage, Overrides};
pub use layout::{Layout, HEADER_BYTES, METADATA_SIZE, TEXT_HEADER_SIZE};
pub use metadata::{BinaryMetadata, FieldValue};
pub use parameters::{ExperimentalParameters, Timestamp};
pub use pixels::{PixelData, PixelGrid, PixelType};
pub use text_header::{Key, Keyword, TextHeader};
