/// WVD file reader

use crate::error::Result;
use crate::image::DiskImage;
use log::debug;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read a WVD file from disk
///
/// The whole file is loaded into memory before parsing.
pub fn read_wvd<P: AsRef<Path>>(path: P) -> Result<DiskImage> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    debug!("read {} bytes from {}", data.len(), path.display());

    let mut image = DiskImage::from_bytes(&data)?;
    image.filename = Some(path.to_string_lossy().into_owned());
    Ok(image)
}
