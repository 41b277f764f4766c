//! Reading and writing MarCCD files.
//!
//! Reads load the whole file and decode it in memory. Writes encode the whole
//! image first, so a format error never touches the destination.

use std::io::{Read, Write};
use std::path::Path;

use log::info;
use tempfile::NamedTempFile;

use crate::error::Result;
use crate::image::MarImage;

/// Read and decode the file at `path`.
pub fn read<P: AsRef<Path>>(path: P) -> Result<MarImage> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let image = MarImage::from_bytes(&data)?;
    info!(
        "read {}: {}x{}, {} bytes",
        path.display(),
        image.width(),
        image.height(),
        data.len()
    );
    Ok(image)
}

/// Read a complete file from an open byte source.
pub fn read_from<R: Read>(mut reader: R) -> Result<MarImage> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(MarImage::from_bytes(&data)?)
}

/// Encode `image` and replace the file at `path` with it.
///
/// The bytes go to a temporary file in the destination directory which is
/// then renamed over `path`. If anything fails the destination keeps its
/// previous content.
pub fn write<P: AsRef<Path>>(image: &MarImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let data = image.to_bytes()?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!("wrote {}: {} bytes", path.display(), data.len());
    Ok(())
}

/// Encode `image` and write it to `writer` in one call.
pub fn write_to<W: Write>(image: &MarImage, mut writer: W) -> Result<()> {
    let data = image.to_bytes()?;
    writer.write_all(&data)?;
    Ok(())
}
