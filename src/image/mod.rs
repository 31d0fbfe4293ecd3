/// WVD image data structures

/// Header block and media types
pub mod header;
/// Platter structure
pub mod platter;
/// Sector definition and control byte
pub mod sector;

pub use header::{MediaType, WvdHeader, HEADER_SIZE, WVD_MAGIC};
pub use platter::Platter;
pub use sector::{ControlByte, Sector, SectorRole, SECTOR_SIZE};

use crate::catalog::{Catalog, CatalogMut};
use crate::error::{Result, WvdError};
use log::debug;
use std::path::Path;

/// Main WVD image container
///
/// An image only comes into existence by parsing bytes; there is no way to
/// build an empty one and populate it.
#[derive(Debug, Clone)]
pub struct DiskImage {
    /// Header block
    pub(crate) header: WvdHeader,
    /// Platters, each with its own catalog
    pub(crate) platters: Vec<Platter>,
    /// Has the image been modified?
    pub(crate) dirty: bool,
    /// Original filename if loaded from disk
    pub(crate) filename: Option<String>,
}

impl DiskImage {
    /// Open a WVD file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::io::reader::read_wvd(path)
    }

    /// Parse an in-memory image
    ///
    /// Fails unless the header carries the `WANG\0` signature and the body
    /// holds at least `platters * sectors` sectors. Trailing bytes are
    /// ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header = WvdHeader::parse(data)?;
        let num_sectors = header.num_sectors();
        let num_platters = header.num_platters();

        let expected = HEADER_SIZE + num_platters * num_sectors * SECTOR_SIZE;
        if data.len() < expected {
            return Err(WvdError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        let mut platters = Vec::with_capacity(num_platters);
        let mut offset = HEADER_SIZE;
        for p in 0..num_platters {
            let mut platter = Platter::new(p);
            for _ in 0..num_sectors {
                platter.add_sector(sector::sector_from_slice(
                    &data[offset..offset + SECTOR_SIZE],
                ));
                offset += SECTOR_SIZE;
            }
            platters.push(platter);
        }

        debug!(
            "loaded wvd image: {} platter(s) of {} sectors, {}",
            num_platters,
            num_sectors,
            header.media_type()
        );

        Ok(Self {
            header,
            platters,
            dirty: false,
            filename: None,
        })
    }

    /// Serialise the image: header followed by every sector, platter-major
    pub fn to_bytes(&self) -> Vec<u8> {
        let total = HEADER_SIZE + self.num_platters() * self.num_sectors() * SECTOR_SIZE;
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(self.header.as_bytes());
        for platter in &self.platters {
            for sector in platter.sectors() {
                out.extend_from_slice(sector);
            }
        }
        out
    }

    /// Save the image to a file and clear the dirty flag
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        crate::io::writer::write_wvd(self, path)?;
        self.dirty = false;
        Ok(())
    }

    /// Get the original filename if loaded from disk
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the header block
    pub fn header(&self) -> &WvdHeader {
        &self.header
    }

    /// Sectors per platter
    pub fn num_sectors(&self) -> usize {
        self.header.num_sectors()
    }

    /// Number of platters
    pub fn num_platters(&self) -> usize {
        self.header.num_platters()
    }

    /// Write format byte from the header
    pub fn write_format(&self) -> u8 {
        self.header.write_format()
    }

    /// Read format byte from the header
    pub fn read_format(&self) -> u8 {
        self.header.read_format()
    }

    /// Is the image flagged write protected?
    pub fn write_protect(&self) -> bool {
        self.header.write_protect()
    }

    /// Media type from the header
    pub fn media_type(&self) -> MediaType {
        self.header.media_type()
    }

    /// Disk label from the header
    pub fn label(&self) -> String {
        self.header.label()
    }

    /// Set or clear the write protect flag
    pub fn set_write_protect(&mut self, protect: bool) {
        self.header.set_write_protect(protect);
        self.dirty = true;
    }

    /// Replace the disk label
    pub fn set_label(&mut self, label: &str) {
        self.header.set_label(label);
        self.dirty = true;
    }

    /// Set the media type
    pub fn set_media_type(&mut self, media: MediaType) {
        self.header.set_media_type(media);
        self.dirty = true;
    }

    /// Mask applied to 16 bit sector pointers decoded from catalog entries
    ///
    /// First generation controllers ignored the address MSB, so small
    /// single platter media may carry it set. Multi-platter images and
    /// platters over 32K sectors use all 16 bits.
    pub fn sector_address_mask(&self) -> u32 {
        if self.num_platters() > 1 || self.num_sectors() > 32768 {
            0xFFFF
        } else {
            0x7FFF
        }
    }

    /// Get a platter by number
    pub fn platter(&self, platter: usize) -> Result<&Platter> {
        let max = self.num_platters().saturating_sub(1);
        self.platters
            .get(platter)
            .ok_or(WvdError::InvalidPlatter { platter, max })
    }

    /// Get all platters
    pub fn platters(&self) -> &[Platter] {
        &self.platters
    }

    fn check_address(&self, platter: usize, sector: usize) -> Result<()> {
        if platter >= self.num_platters() {
            return Err(WvdError::InvalidPlatter {
                platter,
                max: self.num_platters().saturating_sub(1),
            });
        }
        if sector >= self.num_sectors() {
            return Err(WvdError::OutOfRange {
                platter,
                sector,
                max: self.num_sectors().saturating_sub(1),
            });
        }
        Ok(())
    }

    /// Read a sector
    pub fn get_sector(&self, platter: usize, sector: usize) -> Result<&Sector> {
        self.check_address(platter, sector)?;
        self.platters[platter]
            .get_sector(sector)
            .ok_or(WvdError::OutOfRange {
                platter,
                sector,
                max: self.num_sectors().saturating_sub(1),
            })
    }

    /// Replace a sector
    pub fn set_sector(&mut self, platter: usize, sector: usize, data: &Sector) -> Result<()> {
        self.check_address(platter, sector)?;
        let max = self.num_sectors().saturating_sub(1);
        let slot = self.platters[platter]
            .get_sector_mut(sector)
            .ok_or(WvdError::OutOfRange {
                platter,
                sector,
                max,
            })?;
        *slot = *data;
        self.dirty = true;
        Ok(())
    }

    /// Replace a sector from a byte slice, which must be exactly 256 bytes
    pub fn set_sector_bytes(&mut self, platter: usize, sector: usize, data: &[u8]) -> Result<()> {
        if data.len() != SECTOR_SIZE {
            return Err(WvdError::invalid_record(format!(
                "sector data is {} bytes, expected {}",
                data.len(),
                SECTOR_SIZE
            )));
        }
        self.set_sector(platter, sector, &sector::sector_from_slice(data))
    }

    /// Read a contiguous run of sectors
    pub fn get_sectors(&self, platter: usize, first: usize, count: usize) -> Result<Vec<Sector>> {
        (first..first + count)
            .map(|n| self.get_sector(platter, n).copied())
            .collect()
    }

    /// Catalog view of a platter
    pub fn catalog(&self, platter: usize) -> Result<Catalog<'_>> {
        Catalog::new(self, platter)
    }

    /// Mutable catalog view of a platter
    pub fn catalog_mut(&mut self, platter: usize) -> Result<CatalogMut<'_>> {
        CatalogMut::new(self, platter)
    }

    /// Check if the image has unsaved modifications
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the image as unmodified
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_bytes(sectors: u16, platters: u8) -> Vec<u8> {
        let header = WvdHeader::new(sectors, platters, MediaType::Floppy8);
        let mut bytes = header.as_bytes().to_vec();
        for i in 0..(sectors as usize * platters as usize) {
            bytes.extend_from_slice(&[i as u8; SECTOR_SIZE]);
        }
        bytes
    }

    #[test]
    fn test_from_bytes() {
        let image = DiskImage::from_bytes(&image_bytes(8, 1)).unwrap();
        assert_eq!(image.num_sectors(), 8);
        assert_eq!(image.num_platters(), 1);
        assert!(!image.is_dirty());
        assert_eq!(image.get_sector(0, 3).unwrap()[0], 3);
    }

    #[test]
    fn test_truncated() {
        let mut bytes = image_bytes(8, 1);
        bytes.truncate(bytes.len() - 1);
        let err = DiskImage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, WvdError::Truncated { .. }));
    }

    #[test]
    fn test_round_trip_bytes() {
        let bytes = image_bytes(4, 2);
        let image = DiskImage::from_bytes(&bytes).unwrap();
        assert_eq!(image.to_bytes(), bytes);
    }

    #[test]
    fn test_platter_major_order() {
        let image = DiskImage::from_bytes(&image_bytes(4, 2)).unwrap();
        assert_eq!(image.get_sector(1, 0).unwrap()[0], 4);
        assert_eq!(image.get_sector(1, 3).unwrap()[0], 7);
    }

    #[test]
    fn test_out_of_range() {
        let mut image = DiskImage::from_bytes(&image_bytes(4, 1)).unwrap();
        assert!(matches!(
            image.get_sector(0, 4),
            Err(WvdError::OutOfRange { sector: 4, .. })
        ));
        assert!(matches!(
            image.get_sector(1, 0),
            Err(WvdError::InvalidPlatter { platter: 1, .. })
        ));
        assert!(image.set_sector(0, 9, &[0; SECTOR_SIZE]).is_err());
        assert!(!image.is_dirty());
    }

    #[test]
    fn test_set_sector_marks_dirty() {
        let mut image = DiskImage::from_bytes(&image_bytes(4, 1)).unwrap();
        image.set_sector(0, 2, &[0xAA; SECTOR_SIZE]).unwrap();
        assert!(image.is_dirty());
        assert_eq!(image.get_sector(0, 2).unwrap()[255], 0xAA);

        image.mark_clean();
        assert!(!image.is_dirty());

        assert!(image.set_sector_bytes(0, 2, &[0u8; 10]).is_err());
    }

    #[test]
    fn test_sector_address_mask() {
        let image = DiskImage::from_bytes(&image_bytes(4, 1)).unwrap();
        assert_eq!(image.sector_address_mask(), 0x7FFF);

        let image = DiskImage::from_bytes(&image_bytes(4, 2)).unwrap();
        assert_eq!(image.sector_address_mask(), 0xFFFF);
    }

    #[test]
    fn test_metadata_setters() {
        let mut image = DiskImage::from_bytes(&image_bytes(4, 1)).unwrap();
        image.set_label("BACKUP 3");
        assert_eq!(image.label(), "BACKUP 3");
        assert!(image.is_dirty());

        image.set_media_type(MediaType::Disk2260);
        assert_eq!(image.media_type(), MediaType::Disk2260);

        image.set_write_protect(true);
        assert!(image.write_protect());
    }
}
