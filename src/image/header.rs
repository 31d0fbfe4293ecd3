/// WVD header block and its field offsets

use crate::error::{Result, WvdError};
use std::fmt;

/// WVD header signature
pub const WVD_MAGIC: &[u8] = b"WANG\0";

/// Size of the header block
pub const HEADER_SIZE: usize = 256;

/// Offset of the write format byte
pub const HEADER_WRITE_FORMAT_OFFSET: usize = 5;

/// Offset of the read format byte
pub const HEADER_READ_FORMAT_OFFSET: usize = 6;

/// Offset of the write protect flag
pub const HEADER_WRITE_PROTECT_OFFSET: usize = 7;

/// Offset of the little-endian sectors per platter field
pub const HEADER_SECTOR_COUNT_OFFSET: usize = 8;

/// Offset of the media type byte
pub const HEADER_MEDIA_TYPE_OFFSET: usize = 10;

/// Offset of the platter count (minus one) byte
pub const HEADER_PLATTER_COUNT_OFFSET: usize = 11;

/// Offset of the NUL terminated disk label
pub const HEADER_LABEL_OFFSET: usize = 16;

/// Maximum length of the disk label
pub const MAX_LABEL_LEN: usize = HEADER_SIZE - HEADER_LABEL_OFFSET;

/// Physical media the image was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// 5.25" floppy disk
    Floppy5_25,
    /// 8" floppy disk
    Floppy8,
    /// 2260 style hard disk
    Disk2260,
    /// 2280 style hard disk
    Disk2280,
    /// Unrecognised media code
    Unknown(u8),
}

impl MediaType {
    /// Decode a header media type byte
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => MediaType::Floppy5_25,
            1 => MediaType::Floppy8,
            2 => MediaType::Disk2260,
            3 => MediaType::Disk2280,
            other => MediaType::Unknown(other),
        }
    }

    /// Header byte for this media type
    pub fn code(&self) -> u8 {
        match self {
            MediaType::Floppy5_25 => 0,
            MediaType::Floppy8 => 1,
            MediaType::Disk2260 => 2,
            MediaType::Disk2280 => 3,
            MediaType::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Floppy5_25 => write!(f, "5.25\" floppy"),
            MediaType::Floppy8 => write!(f, "8\" floppy"),
            MediaType::Disk2260 => write!(f, "2260 hard disk"),
            MediaType::Disk2280 => write!(f, "2280 hard disk"),
            MediaType::Unknown(code) => write!(f, "unknown media (0x{:02X})", code),
        }
    }
}

/// The 256-byte block at the start of every image
///
/// The raw bytes are kept so that fields this crate doesn't interpret
/// (bytes 12..16, anything after the label NUL) survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WvdHeader {
    raw: [u8; HEADER_SIZE],
}

impl WvdHeader {
    /// Create a header for a fresh image
    pub fn new(num_sectors: u16, num_platters: u8, media: MediaType) -> Self {
        let mut raw = [0u8; HEADER_SIZE];
        raw[..WVD_MAGIC.len()].copy_from_slice(WVD_MAGIC);
        raw[HEADER_WRITE_FORMAT_OFFSET] = 0;
        raw[HEADER_READ_FORMAT_OFFSET] = 0;
        raw[HEADER_SECTOR_COUNT_OFFSET..HEADER_SECTOR_COUNT_OFFSET + 2]
            .copy_from_slice(&num_sectors.to_le_bytes());
        raw[HEADER_MEDIA_TYPE_OFFSET] = media.code();
        raw[HEADER_PLATTER_COUNT_OFFSET] = num_platters.saturating_sub(1);
        Self { raw }
    }

    /// Parse a header block, checking the signature
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(WvdError::invalid_format(format!(
                "header is {} bytes, expected {}",
                data.len(),
                HEADER_SIZE
            )));
        }
        if !data.starts_with(WVD_MAGIC) {
            return Err(WvdError::invalid_format("file is not a .wvd image"));
        }
        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&data[..HEADER_SIZE]);
        Ok(Self { raw })
    }

    /// Raw header bytes
    pub fn as_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.raw
    }

    /// Write format byte
    pub fn write_format(&self) -> u8 {
        self.raw[HEADER_WRITE_FORMAT_OFFSET]
    }

    /// Read format byte
    pub fn read_format(&self) -> u8 {
        self.raw[HEADER_READ_FORMAT_OFFSET]
    }

    /// Write protect flag
    pub fn write_protect(&self) -> bool {
        self.raw[HEADER_WRITE_PROTECT_OFFSET] != 0
    }

    /// Sectors per platter
    pub fn num_sectors(&self) -> usize {
        u16::from_le_bytes([
            self.raw[HEADER_SECTOR_COUNT_OFFSET],
            self.raw[HEADER_SECTOR_COUNT_OFFSET + 1],
        ]) as usize
    }

    /// Media type byte, decoded
    pub fn media_type(&self) -> MediaType {
        MediaType::from_code(self.raw[HEADER_MEDIA_TYPE_OFFSET])
    }

    /// Number of platters
    pub fn num_platters(&self) -> usize {
        self.raw[HEADER_PLATTER_COUNT_OFFSET] as usize + 1
    }

    /// Label text up to the first NUL
    pub fn label(&self) -> String {
        let field = &self.raw[HEADER_LABEL_OFFSET..];
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        String::from_utf8_lossy(&field[..end]).into_owned()
    }

    /// Set or clear the write protect flag
    pub fn set_write_protect(&mut self, protect: bool) {
        self.raw[HEADER_WRITE_PROTECT_OFFSET] = protect as u8;
    }

    /// Set the media type byte
    pub fn set_media_type(&mut self, media: MediaType) {
        self.raw[HEADER_MEDIA_TYPE_OFFSET] = media.code();
    }

    /// Replace the label, truncating to the field size and NUL padding
    pub fn set_label(&mut self, label: &str) {
        let bytes = label.as_bytes();
        let len = bytes.len().min(MAX_LABEL_LEN);
        let field = &mut self.raw[HEADER_LABEL_OFFSET..];
        field.fill(0);
        field[..len].copy_from_slice(&bytes[..len]);
    }
}
