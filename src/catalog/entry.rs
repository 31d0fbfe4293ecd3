/// Catalog index entries

use crate::error::{Result, WvdError};
use crate::image::sector::{read_be16, read_be24, write_be16, write_be24};
use std::fmt;

/// Size of one catalog index record
pub const ENTRY_SIZE: usize = 16;

/// Number of index slots per catalog sector
pub const SLOTS_PER_SECTOR: usize = 16;

/// Catalog layout, from byte 0 of sector 0 (MSB ignored)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// Original layout, hashed with the old hash, overflows backwards
    Old,
    /// OS 2.5 layout, hashed with the new hash, overflows forwards
    New,
    /// Large disk layout with 24 bit sector pointers
    TriByte,
    /// Not a catalog
    Unknown(u8),
}

impl IndexType {
    /// Decode the first byte of sector 0
    pub fn from_code(code: u8) -> Self {
        match code & 0x7F {
            0 => IndexType::Old,
            1 => IndexType::New,
            2 => IndexType::TriByte,
            other => IndexType::Unknown(other),
        }
    }

    /// Byte value for this index type
    pub fn code(&self) -> u8 {
        match self {
            IndexType::Old => 0,
            IndexType::New => 1,
            IndexType::TriByte => 2,
            IndexType::Unknown(code) => *code,
        }
    }

    /// Is this one of the known catalog layouts?
    pub fn is_catalog(&self) -> bool {
        !matches!(self, IndexType::Unknown(_))
    }

    /// Does this layout use 24 bit sector pointers?
    pub fn is_tri_byte(&self) -> bool {
        matches!(self, IndexType::TriByte)
    }

    /// Overflow direction: old catalogs move to the previous sector
    pub fn overflow_direction(&self) -> isize {
        match self {
            IndexType::Old => -1,
            _ => 1,
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexType::Old => write!(f, "old"),
            IndexType::New => write!(f, "new"),
            IndexType::TriByte => write!(f, "tri-byte"),
            IndexType::Unknown(code) => write!(f, "unknown (0x{:02X})", code),
        }
    }
}

/// State byte of an index slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Never used (0x00)
    Empty,
    /// Live file (0x10)
    Valid,
    /// Scratched, still recoverable (0x11)
    Scratched,
    /// Space has been reused (0x21)
    Invalid,
    /// Anything else
    Unknown(u8),
}

impl IndexState {
    /// Decode a state byte
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => IndexState::Empty,
            0x10 => IndexState::Valid,
            0x11 => IndexState::Scratched,
            0x21 => IndexState::Invalid,
            other => IndexState::Unknown(other),
        }
    }

    /// Byte value for this state
    pub fn code(&self) -> u8 {
        match self {
            IndexState::Empty => 0x00,
            IndexState::Valid => 0x10,
            IndexState::Scratched => 0x11,
            IndexState::Invalid => 0x21,
            IndexState::Unknown(code) => *code,
        }
    }

    /// Valid or scratched
    pub fn is_live(&self) -> bool {
        matches!(self, IndexState::Valid | IndexState::Scratched)
    }
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexState::Empty => write!(f, "empty"),
            IndexState::Valid => write!(f, "valid"),
            IndexState::Scratched => write!(f, "scratched"),
            IndexState::Invalid => write!(f, "invalid"),
            IndexState::Unknown(_) => write!(f, "unknown"),
        }
    }
}

/// File type byte of an index slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// BASIC program (0x80)
    Program,
    /// Data file (0x00)
    Data,
    /// Anything else
    Unknown(u8),
}

impl FileType {
    /// Decode a file type byte
    pub fn from_code(code: u8) -> Self {
        match code {
            0x80 => FileType::Program,
            0x00 => FileType::Data,
            other => FileType::Unknown(other),
        }
    }

    /// Byte value for this file type
    pub fn code(&self) -> u8 {
        match self {
            FileType::Program => 0x80,
            FileType::Data => 0x00,
            FileType::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Program => write!(f, "P"),
            FileType::Data => write!(f, "D"),
            FileType::Unknown(_) => write!(f, "?"),
        }
    }
}

/// An 8 byte, space padded Wang filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileName([u8; 8]);

impl FileName {
    /// Pad a name to 8 bytes; names over 8 bytes are rejected
    pub fn new(name: &str) -> Result<Self> {
        Self::from_slice(name.as_bytes())
    }

    /// Pad raw bytes to 8 bytes; over 8 bytes are rejected
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > 8 {
            return Err(WvdError::InvalidFilename(
                String::from_utf8_lossy(bytes).into_owned(),
            ));
        }
        let mut raw = [b' '; 8];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(FileName(raw))
    }

    /// Wrap raw name bytes as stored on disk
    pub fn from_raw(raw: [u8; 8]) -> Self {
        FileName(raw)
    }

    /// Raw padded bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Name with trailing spaces removed
    pub fn trimmed(&self) -> String {
        let end = self.0.iter().rposition(|&b| b != b' ').map_or(0, |p| p + 1);
        self.0[..end].iter().map(|&b| b as char).collect()
    }

    /// Padded name as text (bytes mapped one to one onto chars)
    pub fn padded(&self) -> String {
        self.0.iter().map(|&b| b as char).collect()
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.trimmed())
    }
}

/// Snapshot of one catalog index slot
///
/// Decoding of the sector pointers depends on the catalog layout and the
/// disk's sector address mask, so both are captured with the record.
/// Changing a snapshot does not touch the disk; write it back with
/// [`crate::catalog::CatalogMut::set_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    slot: usize,
    record: [u8; ENTRY_SIZE],
    index_type: IndexType,
    sector_mask: u32,
}

impl CatalogEntry {
    /// Wrap a raw 16 byte record
    pub fn from_record(
        slot: usize,
        record: &[u8],
        index_type: IndexType,
        sector_mask: u32,
    ) -> Result<Self> {
        if record.len() != ENTRY_SIZE {
            return Err(WvdError::invalid_record(format!(
                "catalog entry is {} bytes, expected {}",
                record.len(),
                ENTRY_SIZE
            )));
        }
        let mut raw = [0u8; ENTRY_SIZE];
        raw.copy_from_slice(record);
        Ok(Self {
            slot,
            record: raw,
            index_type,
            sector_mask,
        })
    }

    /// Build a fresh valid entry
    pub fn new(
        name: FileName,
        file_type: FileType,
        start: u32,
        end: u32,
        index_type: IndexType,
    ) -> Self {
        let mut entry = Self {
            slot: 0,
            record: [0u8; ENTRY_SIZE],
            index_type,
            sector_mask: 0xFFFF,
        };
        entry.set_state(IndexState::Valid);
        entry.set_file_type(file_type);
        entry.set_extent(start, end);
        entry.set_name(name);
        entry
    }

    /// Absolute catalog slot this snapshot came from
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Raw 16 byte record
    pub fn record(&self) -> &[u8; ENTRY_SIZE] {
        &self.record
    }

    /// Index slot state
    pub fn state(&self) -> IndexState {
        IndexState::from_code(self.record[0])
    }

    /// Program or data
    pub fn file_type(&self) -> FileType {
        FileType::from_code(self.record[1])
    }

    /// Padded filename
    pub fn name(&self) -> FileName {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.record[8..16]);
        FileName::from_raw(raw)
    }

    /// First sector of the file
    pub fn start(&self) -> u32 {
        if self.index_type.is_tri_byte() {
            read_be24(&self.record[2..5])
        } else {
            read_be16(&self.record[2..4]) & self.sector_mask
        }
    }

    /// Last allocated sector of the file (the control sector)
    pub fn end(&self) -> u32 {
        if self.index_type.is_tri_byte() {
            read_be24(&self.record[5..8])
        } else {
            read_be16(&self.record[4..6]) & self.sector_mask
        }
    }

    /// `(start, end)` sector pair
    pub fn extent(&self) -> (u32, u32) {
        (self.start(), self.end())
    }

    /// Two character status, e.g. " P" or "SD"; `None` for unused slots
    pub fn status(&self) -> Option<String> {
        match self.state() {
            IndexState::Empty | IndexState::Invalid => None,
            IndexState::Valid => Some(format!(" {}", self.file_type())),
            IndexState::Scratched => Some(format!("S{}", self.file_type())),
            IndexState::Unknown(_) => Some("unknown".to_string()),
        }
    }

    /// Change the index slot state
    pub fn set_state(&mut self, state: IndexState) {
        self.record[0] = state.code();
    }

    /// Change the file type byte
    pub fn set_file_type(&mut self, file_type: FileType) {
        self.record[1] = file_type.code();
    }

    /// Change the filename
    pub fn set_name(&mut self, name: FileName) {
        self.record[8..16].copy_from_slice(name.as_bytes());
    }

    /// Store the extent using the layout's pointer width
    pub fn set_extent(&mut self, start: u32, end: u32) {
        if self.index_type.is_tri_byte() {
            write_be24(&mut self.record[2..5], start);
            write_be24(&mut self.record[5..8], end);
        } else {
            write_be16(&mut self.record[2..4], start);
            write_be16(&mut self.record[4..6], end);
        }
    }
}
