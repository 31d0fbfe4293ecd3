/// Sector data structures

/// Every Wang sector holds exactly 256 bytes
pub const SECTOR_SIZE: usize = 256;

/// One raw 256-byte sector
pub type Sector = [u8; SECTOR_SIZE];

/// A blank (zero filled) sector
pub const EMPTY_SECTOR: Sector = [0u8; SECTOR_SIZE];

/// Sector control byte (byte 0 of every file sector)
///
/// The high nibble encodes the structural role of the sector, the low bits
/// the physical record sequencing used by data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlByte(pub u8);

impl ControlByte {
    /// Data file record - Bit 7
    pub const DATA: u8 = 0x80;

    /// Program header record - Bit 6
    pub const HEADER: u8 = 0x40;

    /// Program trailer / data end-of-file record - Bit 5
    pub const TRAILER: u8 = 0x20;

    /// Protected program (SAVE P) - Bit 4
    pub const PROTECTED: u8 = 0x10;

    /// Intermediate physical record of a logical data record - Bit 1
    pub const INTERMEDIATE: u8 = 0x02;

    /// Last physical record of a logical data record - Bit 0
    pub const LAST: u8 = 0x01;

    /// Read the control byte of a sector
    #[inline]
    pub fn of(sector: &Sector) -> Self {
        ControlByte(sector[0])
    }

    /// High nibble, i.e. the structural role bits
    #[inline]
    pub fn role_bits(&self) -> u8 {
        self.0 & 0xF0
    }

    /// Check if the data record bit is set
    #[inline]
    pub fn is_data(&self) -> bool {
        (self.0 & Self::DATA) != 0
    }

    /// Check if the header record bit is set
    #[inline]
    pub fn is_header(&self) -> bool {
        (self.0 & Self::HEADER) != 0
    }

    /// Check if the trailer record bit is set
    #[inline]
    pub fn is_trailer(&self) -> bool {
        (self.0 & Self::TRAILER) != 0
    }

    /// Check if the protected bit is set
    #[inline]
    pub fn is_protected(&self) -> bool {
        (self.0 & Self::PROTECTED) != 0
    }

    /// Check if the intermediate physical record bit is set
    #[inline]
    pub fn is_intermediate(&self) -> bool {
        (self.0 & Self::INTERMEDIATE) != 0
    }

    /// Check if the last physical record bit is set
    #[inline]
    pub fn is_last(&self) -> bool {
        (self.0 & Self::LAST) != 0
    }

    /// Data end-of-file marker (0xA0 / 0xA1 style)
    #[inline]
    pub fn is_end_of_data(&self) -> bool {
        (self.0 & 0xA0) == 0xA0
    }

    /// Classify the sector by its control byte alone
    pub fn role(&self) -> SectorRole {
        match (self.is_data(), self.is_header(), self.is_trailer()) {
            (true, _, true) => SectorRole::DataTrailer,
            (true, _, false) => SectorRole::DataRecord,
            (false, true, _) => SectorRole::ProgramHeader,
            (false, false, true) => SectorRole::ProgramTrailer,
            (false, false, false) => SectorRole::ProgramBody,
        }
    }
}

/// Structural role of a sector as declared by its control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorRole {
    /// Program header (0x4x, 0x5x if protected)
    ProgramHeader,
    /// Program body (0x0x, 0x1x if protected)
    ProgramBody,
    /// Last program record (0x2x, 0x3x if protected)
    ProgramTrailer,
    /// Data record (0x81/0x82)
    DataRecord,
    /// Data end-of-file or control record (0xAx)
    DataTrailer,
}

impl std::fmt::Display for SectorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectorRole::ProgramHeader => write!(f, "Program header"),
            SectorRole::ProgramBody => write!(f, "Program body"),
            SectorRole::ProgramTrailer => write!(f, "Program trailer"),
            SectorRole::DataRecord => write!(f, "Data record"),
            SectorRole::DataTrailer => write!(f, "Data trailer"),
        }
    }
}

/// Return true if both nibbles of the byte are decimal digits
#[inline]
pub fn is_bcd_byte(byte: u8) -> bool {
    (byte & 0x0F) <= 0x09 && (byte & 0xF0) <= 0x90
}

/// Decode a big-endian 16 bit field
#[inline]
pub fn read_be16(bytes: &[u8]) -> u32 {
    u16::from_be_bytes([bytes[0], bytes[1]]) as u32
}

/// Decode a big-endian 24 bit field
#[inline]
pub fn read_be24(bytes: &[u8]) -> u32 {
    ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32)
}

/// Encode a big-endian 16 bit field
#[inline]
pub fn write_be16(bytes: &mut [u8], value: u32) {
    bytes[..2].copy_from_slice(&(value as u16).to_be_bytes());
}

/// Encode a big-endian 24 bit field
#[inline]
pub fn write_be24(bytes: &mut [u8], value: u32) {
    bytes[0] = (value >> 16) as u8;
    bytes[1] = (value >> 8) as u8;
    bytes[2] = value as u8;
}

/// Copy a slice into a fresh sector, zero padding or truncating as needed
pub fn sector_from_slice(data: &[u8]) -> Sector {
    let mut sector = EMPTY_SECTOR;
    let len = data.len().min(SECTOR_SIZE);
    sector[..len].copy_from_slice(&data[..len]);
    sector
}
