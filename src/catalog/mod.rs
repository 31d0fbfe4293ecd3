/// Hash indexed catalog of a platter
///
/// The first sectors of a platter hold the catalog index. Sector 0 slot 0 is
/// the disk parameter block (index type, index size and the end pointers),
/// so sector 0 holds 15 file entries and every other index sector 16.
/// Nothing is cached: every query re-reads the sectors of the image.

/// Catalog and file consistency checks
pub mod check;
/// Index slot records, states and filenames
pub mod entry;
/// File level view of a catalog entry
pub mod file;
/// Filename hash functions
pub mod hash;

pub use entry::{CatalogEntry, FileName, FileType, IndexState, IndexType};
pub use file::{FileHandle, SaveMode};

use crate::error::{Result, WvdError};
use crate::image::sector::{read_be16, read_be24, Sector, EMPTY_SECTOR};
use crate::image::DiskImage;
use crate::scramble::{is_scrambled, unscramble};
use entry::{ENTRY_SIZE, SLOTS_PER_SECTOR};
use log::{debug, trace, warn};
use std::ops::Range;

/// Map an absolute slot number onto its index sector and slot within it
#[inline]
fn slot_location(n: usize) -> (usize, usize) {
    ((n + 1) / SLOTS_PER_SECTOR, (n + 1) % SLOTS_PER_SECTOR)
}

/// Absolute slot number for a slot within an index sector
#[inline]
fn absolute_slot(sector: usize, slot: usize) -> usize {
    if sector == 0 {
        slot
    } else {
        SLOTS_PER_SECTOR * sector + slot - 1
    }
}

/// Number of file slots in an index sector
#[inline]
fn slots_in_sector(sector: usize) -> usize {
    if sector == 0 {
        SLOTS_PER_SECTOR - 1
    } else {
        SLOTS_PER_SECTOR
    }
}

/// Read-only catalog view of one platter
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    image: &'a DiskImage,
    platter: usize,
}

impl<'a> Catalog<'a> {
    /// Attach to a platter of an image
    pub fn new(image: &'a DiskImage, platter: usize) -> Result<Self> {
        image.platter(platter)?;
        let catalog = Self { image, platter };
        let code = catalog.parameter_block()[0];
        if code & 0x80 != 0 {
            warn!(
                "platter {}: index type byte 0x{:02X} has its MSB set",
                platter, code
            );
        }
        Ok(catalog)
    }

    /// The image this catalog reads from
    pub fn image(&self) -> &'a DiskImage {
        self.image
    }

    /// Platter number
    pub fn platter(&self) -> usize {
        self.platter
    }

    fn sector(&self, n: usize) -> Result<&'a Sector> {
        self.image.get_sector(self.platter, n)
    }

    fn parameter_block(&self) -> &'a Sector {
        self.sector(0).unwrap_or(&EMPTY_SECTOR)
    }

    /// Index layout, from byte 0 of sector 0 with the MSB ignored
    pub fn index_type(&self) -> IndexType {
        IndexType::from_code(self.parameter_block()[0])
    }

    /// Does the platter appear to carry a catalog at all?
    pub fn has_catalog(&self) -> bool {
        self.image.num_sectors() > 0 && self.index_type().is_catalog()
    }

    /// Number of leading sectors holding the index
    pub fn num_index_sectors(&self) -> usize {
        let block = self.parameter_block();
        if self.index_type().is_tri_byte() {
            read_be16(&block[1..3]) as usize
        } else {
            block[1] as usize
        }
    }

    /// Last sector in use by cataloged files (-1 when nothing is in use)
    pub fn current_end(&self) -> i64 {
        let block = self.parameter_block();
        let value = if self.index_type().is_tri_byte() {
            read_be24(&block[3..6])
        } else {
            read_be16(&block[2..4]) & self.image.sector_address_mask()
        };
        value as i64 - 1
    }

    /// Last sector available to cataloged files
    pub fn end_catalog_area(&self) -> i64 {
        let block = self.parameter_block();
        let value = if self.index_type().is_tri_byte() {
            read_be24(&block[6..9])
        } else {
            read_be16(&block[4..6]) & self.image.sector_address_mask()
        };
        value as i64 - 1
    }

    /// All absolute slot numbers of the index
    pub fn catalog_indices(&self) -> Range<usize> {
        0..(SLOTS_PER_SECTOR * self.num_index_sectors()).saturating_sub(1)
    }

    /// Snapshot of the `n`-th slot, or `None` if it is past the index
    pub fn entry(&self, n: usize) -> Option<CatalogEntry> {
        let (sec, slot) = slot_location(n);
        if sec >= self.num_index_sectors() {
            return None;
        }
        let data = self.sector(sec).ok()?;
        let record = &data[ENTRY_SIZE * slot..ENTRY_SIZE * (slot + 1)];
        CatalogEntry::from_record(
            n,
            record,
            self.index_type(),
            self.image.sector_address_mask(),
        )
        .ok()
    }

    /// Index sector a name hashes to, before overflow probing
    pub fn filename_hash(&self, name: &FileName) -> u8 {
        match self.index_type() {
            IndexType::Old => hash::old_hash(name.as_bytes()),
            _ => hash::new_hash(name.as_bytes()),
        }
    }

    /// Absolute slots in the order a lookup or insertion visits them
    fn search_path(&self, name: &FileName) -> Vec<usize> {
        let secs = self.num_index_sectors();
        if secs == 0 {
            return Vec::new();
        }
        let hash = self.filename_hash(name) as isize;
        let dir = self.index_type().overflow_direction();
        let mut path = Vec::with_capacity(secs * SLOTS_PER_SECTOR);
        for delta in 0..secs as isize {
            let sec = (hash + delta * dir).rem_euclid(secs as isize) as usize;
            for slot in 0..slots_in_sector(sec) {
                path.push(absolute_slot(sec, slot));
            }
        }
        path
    }

    /// Find a live entry by name using the hash search sequence
    ///
    /// The search gives up at the first empty slot on the search path.
    pub fn find(&self, name: &FileName) -> Option<CatalogEntry> {
        for n in self.search_path(name) {
            let entry = self.entry(n)?;
            let state = entry.state();
            trace!("search {} slot {}: {}", name, n, state);
            if state == IndexState::Empty {
                return None;
            }
            if state.is_live() && entry.name() == *name {
                return Some(entry);
            }
        }
        None
    }

    /// Find a live entry by name
    pub fn entry_by_name(&self, name: &str) -> Result<Option<CatalogEntry>> {
        Ok(self.find(&FileName::new(name)?))
    }

    /// Every live (valid or scratched) entry in slot order
    pub fn live_entries(&self) -> Vec<CatalogEntry> {
        self.catalog_indices()
            .filter_map(|n| self.entry(n))
            .filter(|e| e.state().is_live())
            .collect()
    }

    /// Names of every live file, in slot order
    pub fn all_filenames(&self) -> Vec<FileName> {
        let mut names: Vec<FileName> = Vec::new();
        for entry in self.live_entries() {
            let name = entry.name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Expand a list of names and wildcard patterns into live filenames
    ///
    /// An exact match wins; otherwise `*` and `?` are wildcards and every
    /// other character is literal. Names over 8 characters are skipped.
    /// Duplicates are removed and order follows the catalog scan.
    pub fn expand_wildcards<S: AsRef<str>>(&self, patterns: &[S]) -> Vec<FileName> {
        let all = self.all_filenames();
        let mut matched: Vec<FileName> = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let Ok(exact) = FileName::new(pattern) else {
                warn!("filename \"{}\" is more than 8 characters; ignoring", pattern);
                continue;
            };
            if all.contains(&exact) {
                if !matched.contains(&exact) {
                    matched.push(exact);
                }
                continue;
            }
            if !pattern.contains(|c| c == '*' || c == '?') {
                continue;
            }
            for name in &all {
                if wildcard_match(pattern.as_bytes(), name.as_bytes()) && !matched.contains(name) {
                    matched.push(*name);
                }
            }
        }
        matched
    }

    /// True if every file slot of index sector `bucket` is occupied
    pub fn is_index_bucket_full(&self, bucket: usize) -> bool {
        if bucket >= self.num_index_sectors() {
            return false;
        }
        (0..slots_in_sector(bucket))
            .map(|slot| absolute_slot(bucket, slot))
            .all(|n| {
                self.entry(n)
                    .is_some_and(|e| e.state() != IndexState::Empty)
            })
    }

    /// First empty slot along the insertion search path
    fn free_slot_for(&self, name: &FileName) -> Option<usize> {
        self.search_path(name).into_iter().find(|&n| {
            self.entry(n)
                .is_some_and(|e| e.state() == IndexState::Empty)
        })
    }

    /// Open a live file by name
    pub fn file(&self, name: &str) -> Result<FileHandle<'a>> {
        let filename = FileName::new(name)?;
        let entry = self
            .find(&filename)
            .ok_or_else(|| WvdError::FileNotFound(filename.trimmed()))?;
        Ok(FileHandle::new(*self, entry))
    }
}

/// Glob match with `*` and `?`, allowing unmatched trailing spaces
fn wildcard_match(pattern: &[u8], name: &[u8]) -> bool {
    match pattern.split_first() {
        None => name.iter().all(|&b| b == b' '),
        Some((b'*', rest)) => (0..=name.len()).any(|i| wildcard_match(rest, &name[i..])),
        Some((b'?', rest)) => !name.is_empty() && wildcard_match(rest, &name[1..]),
        Some((&c, rest)) => name.first() == Some(&c) && wildcard_match(rest, &name[1..]),
    }
}

/// Mutable catalog view of one platter
///
/// Every change writes straight through to the image sectors. Snapshots
/// taken before a change are not updated.
#[derive(Debug)]
pub struct CatalogMut<'a> {
    image: &'a mut DiskImage,
    platter: usize,
}

impl<'a> CatalogMut<'a> {
    /// Attach to a platter of an image
    pub fn new(image: &'a mut DiskImage, platter: usize) -> Result<Self> {
        image.platter(platter)?;
        Ok(Self { image, platter })
    }

    /// Read-only view of the same platter
    pub fn view(&self) -> Catalog<'_> {
        Catalog {
            image: self.image,
            platter: self.platter,
        }
    }

    fn require_catalog(&self) -> Result<()> {
        if self.view().has_catalog() {
            Ok(())
        } else {
            Err(WvdError::NoCatalog(self.platter))
        }
    }

    /// Change the index type byte (keeps the rest of the parameter block)
    pub fn set_index_type(&mut self, index_type: IndexType) -> Result<()> {
        if !index_type.is_catalog() {
            return Err(WvdError::unsupported(format!(
                "unknown disk index type {}",
                index_type
            )));
        }
        let mut block = *self.image.get_sector(self.platter, 0)?;
        block[0] = index_type.code();
        self.image.set_sector(self.platter, 0, &block)
    }

    /// Overwrite the `n`-th slot with a record
    pub fn set_entry(&mut self, n: usize, entry: &CatalogEntry) -> Result<()> {
        let (sec, slot) = slot_location(n);
        if sec >= self.view().num_index_sectors() {
            return Err(WvdError::invalid_record(format!(
                "catalog slot {} is outside the index",
                n
            )));
        }
        let mut data = *self.image.get_sector(self.platter, sec)?;
        data[ENTRY_SIZE * slot..ENTRY_SIZE * (slot + 1)].copy_from_slice(entry.record());
        self.image.set_sector(self.platter, sec, &data)
    }

    /// Insert a record at the first empty slot of its search sequence
    ///
    /// Unlike a lookup, insertion keeps probing past occupied buckets until
    /// every index sector has been visited. Returns the slot used.
    pub fn add_entry(&mut self, entry: &CatalogEntry) -> Result<usize> {
        self.require_catalog()?;
        let name = entry.name();
        let slot = self
            .view()
            .free_slot_for(&name)
            .ok_or_else(|| WvdError::CatalogFull(name.trimmed()))?;
        trace!("inserting {} at slot {}", name, slot);
        self.set_entry(slot, entry)?;
        Ok(slot)
    }

    /// Rehash every live entry into the old (`false`) or new (`true`) layout
    ///
    /// Files are not moved, only their index entries. Tri-byte catalogs
    /// cannot be converted.
    pub fn convert_index(&mut self, new_style: bool) -> Result<()> {
        self.require_catalog()?;
        let current = self.view().index_type();
        if current.is_tri_byte() {
            return Err(WvdError::unsupported(
                "tri-byte catalogs cannot be converted",
            ));
        }
        let target = if new_style { IndexType::New } else { IndexType::Old };
        if current == target {
            return Ok(());
        }

        let entries: Vec<CatalogEntry> = {
            let view = self.view();
            view.all_filenames()
                .iter()
                .filter_map(|name| view.find(name))
                .collect()
        };
        debug!(
            "converting platter {} index from {} to {}: {} entries",
            self.platter,
            current,
            target,
            entries.len()
        );

        let index_sectors = self.view().num_index_sectors();
        if index_sectors == 0 {
            return self.set_index_type(target);
        }
        for s in 0..index_sectors {
            let mut data = EMPTY_SECTOR;
            if s == 0 {
                let block = self.image.get_sector(self.platter, 0)?;
                data[..ENTRY_SIZE].copy_from_slice(&block[..ENTRY_SIZE]);
                data[0] = target.code();
            }
            self.image.set_sector(self.platter, s, &data)?;
        }

        for entry in &entries {
            let (start, end) = entry.extent();
            if !(start < end && (end as usize) < self.image.num_sectors()) {
                warn!(
                    "{}: implausible extent ({}, {}) carried over unchanged",
                    entry.name(),
                    start,
                    end
                );
            }
            self.add_entry(entry)?;
        }
        Ok(())
    }

    /// Set or clear the protection bit on every sector of a program
    ///
    /// The final allocated sector (the control record) is left alone.
    /// Scrambled programs are refused since flipping the bit would corrupt
    /// them.
    pub fn set_protection(&mut self, name: &str, protect: bool) -> Result<()> {
        let (start, end) = {
            let file = self.view().file(name)?;
            if file.file_type() != FileType::Program {
                return Err(WvdError::NotAProgram(file.name().trimmed()));
            }
            if !file.extent_is_plausible() {
                let (start, end) = file.extent();
                return Err(WvdError::ImplausibleExtent {
                    name: file.name().trimmed(),
                    start,
                    end,
                });
            }
            if file.save_mode() == Some(SaveMode::Scrambled) {
                return Err(WvdError::unsupported(format!(
                    "{}: scrambled programs can't change protection",
                    file.name()
                )));
            }
            file.extent()
        };

        for s in start as usize..end as usize {
            let mut data = *self.image.get_sector(self.platter, s)?;
            if protect {
                data[0] |= 0x10;
            } else {
                data[0] &= !0x10;
            }
            self.image.set_sector(self.platter, s, &data)?;
        }
        Ok(())
    }

    /// Rewrite every scrambled sector of a program in place
    ///
    /// The result is an ordinary protected program. Returns the number of
    /// sectors rewritten.
    pub fn unscramble_file(&mut self, name: &str) -> Result<usize> {
        let (start, sectors) = {
            let file = self.view().file(name)?;
            if file.file_type() != FileType::Program {
                return Err(WvdError::NotAProgram(file.name().trimmed()));
            }
            (file.start() as usize, file.sectors()?)
        };

        let mut rewritten = 0;
        for (offset, sector) in sectors.iter().enumerate() {
            if is_scrambled(sector) {
                self.image
                    .set_sector(self.platter, start + offset, &unscramble(sector))?;
                rewritten += 1;
            }
        }
        debug!("{}: unscrambled {} sectors", name, rewritten);
        Ok(rewritten)
    }
}
