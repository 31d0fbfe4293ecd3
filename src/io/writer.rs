/// WVD file writer

use crate::error::Result;
use crate::image::DiskImage;
use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a WVD file to disk
///
/// The header is written first, followed by every sector in platter-major
/// order. The write is not atomic.
pub fn write_wvd<P: AsRef<Path>>(image: &DiskImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);

    writer.write_all(image.header().as_bytes())?;
    for platter in image.platters() {
        for sector in platter.sectors() {
            writer.write_all(sector)?;
        }
    }
    writer.flush()?;

    debug!(
        "wrote {} platter(s) of {} sectors to {}",
        image.num_platters(),
        image.num_sectors(),
        path.display()
    );
    Ok(())
}
