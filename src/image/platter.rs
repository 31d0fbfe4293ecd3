/// Platter data structures

use crate::image::sector::{Sector, EMPTY_SECTOR};

/// One addressable surface of a disk image, holding a flat array of sectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platter {
    /// Platter number (0 based)
    pub platter_number: usize,
    /// Sectors on this platter
    sectors: Vec<Sector>,
}

impl Platter {
    /// Create a new platter with no sectors
    pub fn new(platter_number: usize) -> Self {
        Self {
            platter_number,
            sectors: Vec::new(),
        }
    }

    /// Create a platter with `num_sectors` blank sectors
    pub fn blank(platter_number: usize, num_sectors: usize) -> Self {
        Self {
            platter_number,
            sectors: vec![EMPTY_SECTOR; num_sectors],
        }
    }

    /// Append a sector to this platter
    pub fn add_sector(&mut self, sector: Sector) {
        self.sectors.push(sector);
    }

    /// Get a reference to all sectors
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Get a sector by number
    pub fn get_sector(&self, sector_number: usize) -> Option<&Sector> {
        self.sectors.get(sector_number)
    }

    /// Get a mutable reference to a sector by number
    pub fn get_sector_mut(&mut self, sector_number: usize) -> Option<&mut Sector> {
        self.sectors.get_mut(sector_number)
    }

    /// Get the number of sectors on this platter
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// Check if this platter has any sectors
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_platter() {
        let platter = Platter::new(0);
        assert_eq!(platter.platter_number, 0);
        assert_eq!(platter.sector_count(), 0);
        assert!(platter.is_empty());
    }

    #[test]
    fn test_blank_platter() {
        let platter = Platter::blank(1, 16);
        assert_eq!(platter.platter_number, 1);
        assert_eq!(platter.sector_count(), 16);
        assert!(platter.get_sector(15).is_some());
        assert!(platter.get_sector(16).is_none());
    }

    #[test]
    fn test_add_and_modify_sector() {
        let mut platter = Platter::new(0);
        platter.add_sector([0x42; 256]);
        assert_eq!(platter.sector_count(), 1);

        if let Some(sector) = platter.get_sector_mut(0) {
            sector[0] = 0x40;
        }
        assert_eq!(platter.get_sector(0).map(|s| s[0]), Some(0x40));
        assert_eq!(platter.sectors()[0][1], 0x42);
    }
}
