/// File level view of a catalog entry

use crate::catalog::entry::{CatalogEntry, FileName, FileType, IndexState};
use crate::catalog::Catalog;
use crate::error::{Result, WvdError};
use crate::image::sector::{read_be16, read_be24, Sector};
use crate::scramble::is_scrambled;
use std::fmt;

/// How a program file was saved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Plain `SAVE`
    Normal,
    /// `SAVE P`: listable only by the owner, bytes in the clear
    Protected,
    /// `SAVE !`: body sectors are scrambled
    Scrambled,
    /// Header sector is neither 0x4x nor 0x5x, or the extent is bogus
    Unknown,
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveMode::Normal => write!(f, "normal"),
            SaveMode::Protected => write!(f, "protected"),
            SaveMode::Scrambled => write!(f, "scrambled"),
            SaveMode::Unknown => write!(f, "unknown"),
        }
    }
}

/// A catalog entry bound to the platter it came from
///
/// This is a snapshot: mutating the catalog or the file sectors afterwards
/// is not reflected in the entry fields, although the sector reads are
/// live.
#[derive(Debug, Clone)]
pub struct FileHandle<'a> {
    catalog: Catalog<'a>,
    entry: CatalogEntry,
}

impl<'a> FileHandle<'a> {
    pub(crate) fn new(catalog: Catalog<'a>, entry: CatalogEntry) -> Self {
        Self { catalog, entry }
    }

    /// The underlying catalog entry
    pub fn entry(&self) -> &CatalogEntry {
        &self.entry
    }

    /// Padded filename
    pub fn name(&self) -> FileName {
        self.entry.name()
    }

    /// Program, data, or unknown
    pub fn file_type(&self) -> FileType {
        self.entry.file_type()
    }

    /// Status string such as " P" or "SD"
    pub fn status(&self) -> Option<String> {
        self.entry.status()
    }

    /// First sector
    pub fn start(&self) -> u32 {
        self.entry.start()
    }

    /// Last allocated sector
    pub fn end(&self) -> u32 {
        self.entry.end()
    }

    /// `(start, end)` pair
    pub fn extent(&self) -> (u32, u32) {
        self.entry.extent()
    }

    fn read(&self, n: u32) -> Result<&'a Sector> {
        self.catalog
            .image()
            .get_sector(self.catalog.platter(), n as usize)
    }

    /// Basic sanity check of the extent against the disk and the index
    pub fn extent_is_plausible(&self) -> bool {
        let (start, end) = self.extent();
        start < end
            && (end as usize) < self.catalog.image().num_sectors()
            && start as usize >= self.catalog.num_index_sectors()
    }

    fn require_plausible_extent(&self) -> Result<()> {
        if self.extent_is_plausible() {
            Ok(())
        } else {
            let (start, end) = self.extent();
            Err(WvdError::ImplausibleExtent {
                name: self.name().trimmed(),
                start,
                end,
            })
        }
    }

    /// Sectors in use, as recorded in the control sector at `end`
    ///
    /// The count includes the header, trailer and the control sector.
    pub fn used_sectors(&self) -> Result<u32> {
        self.require_plausible_extent()?;
        let control = self.read(self.end())?;
        Ok(if self.catalog.index_type().is_tri_byte() {
            read_be24(&control[1..4])
        } else {
            read_be16(&control[1..3])
        })
    }

    /// Allocated but unused sectors
    pub fn free_sectors(&self) -> Result<u32> {
        let used = self.used_sectors()?;
        let (start, end) = self.extent();
        Ok((end - start + 1).wrapping_sub(used) % 65536)
    }

    /// Does the control sector look right for this file type?
    pub fn control_record_is_plausible(&self) -> bool {
        if !self.extent_is_plausible() {
            return false;
        }
        let (Ok(used), Ok(control)) = (self.used_sectors(), self.read(self.end())) else {
            return false;
        };
        let (start, end) = self.extent();
        let prefix = control[0] & 0xF0;
        let prefix_ok = match self.file_type() {
            FileType::Program => prefix == 0x20,
            FileType::Data => prefix == 0xA0,
            FileType::Unknown(_) => prefix == 0x20 || prefix == 0xA0,
        };
        used <= end - start + 1 && prefix_ok
    }

    /// How a program file was saved; `None` for anything but programs
    pub fn save_mode(&self) -> Option<SaveMode> {
        if self.file_type() != FileType::Program {
            return None;
        }
        if !self.extent_is_plausible() {
            return Some(SaveMode::Unknown);
        }
        let Ok(header) = self.read(self.start()) else {
            return Some(SaveMode::Unknown);
        };
        match header[0] & 0xF0 {
            0x40 => return Some(SaveMode::Normal),
            0x50 => {}
            _ => return Some(SaveMode::Unknown),
        }
        match self.read(self.start() + 1) {
            Ok(body) if is_scrambled(body) => Some(SaveMode::Scrambled),
            _ => Some(SaveMode::Protected),
        }
    }

    /// The used sectors of the file, minus the trailing control sector
    pub fn sectors(&self) -> Result<Vec<Sector>> {
        if self.entry.state() != IndexState::Valid {
            return Err(WvdError::unsupported(format!(
                "{}: index state is {}",
                self.name(),
                self.entry.state()
            )));
        }
        if let FileType::Unknown(code) = self.file_type() {
            return Err(WvdError::unsupported(format!(
                "{}: unknown file type 0x{:02X}",
                self.name(),
                code
            )));
        }
        self.require_plausible_extent()?;
        if !self.control_record_is_plausible() {
            return Err(WvdError::BadControlRecord(self.name().trimmed()));
        }
        let used = self.used_sectors()?;
        let start = self.start();
        (start..(start + used).saturating_sub(1))
            .map(|n| self.read(n).copied())
            .collect()
    }
}
