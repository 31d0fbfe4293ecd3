use thiserror::Error;

/// Result type alias for WVD operations
pub type Result<T> = std::result::Result<T, WvdError>;

/// Errors that can occur when working with WVD images
#[derive(Debug, Error)]
pub enum WvdError {
    /// I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unrecognized image format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The image body is shorter than the header geometry claims
    #[error("Truncated image: expected {expected} bytes, found {actual}")]
    Truncated {
        /// Number of bytes the header geometry requires
        expected: usize,
        /// Number of bytes actually present
        actual: usize,
    },

    /// Invalid platter number specified
    #[error("Invalid platter {platter} (max: {max})")]
    InvalidPlatter {
        /// Platter number
        platter: usize,
        /// Maximum allowed platter number
        max: usize,
    },

    /// Sector address outside the platter
    #[error("Sector {sector} on platter {platter} is out of range (max: {max})")]
    OutOfRange {
        /// Platter number
        platter: usize,
        /// Sector number
        sector: usize,
        /// Maximum allowed sector number
        max: usize,
    },

    /// A fixed-size record had the wrong length
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The platter has no recognizable catalog
    #[error("Platter {0} has no catalog")]
    NoCatalog(usize),

    /// File not found in the catalog
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Invalid filename
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    /// Catalog extent fails the basic sanity checks
    #[error("{name}: implausible file extent ({start}, {end})")]
    ImplausibleExtent {
        /// Trimmed file name
        name: String,
        /// First sector claimed by the catalog
        start: u32,
        /// Last sector claimed by the catalog
        end: u32,
    },

    /// File control record (last allocated sector) is not believable
    #[error("{0}: file control record is not plausible")]
    BadControlRecord(String),

    /// No free hash slot could be found for a catalog entry
    #[error("Catalog full: no free index slot for {0}")]
    CatalogFull(String),

    /// Operation on a program file was attempted on something else
    #[error("Not a program file: {0}")]
    NotAProgram(String),

    /// Unsupported operation or format variant
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl WvdError {
    /// Create an invalid format error
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        WvdError::InvalidFormat(message.into())
    }

    /// Create an invalid record error
    pub fn invalid_record<S: Into<String>>(message: S) -> Self {
        WvdError::InvalidRecord(message.into())
    }

    /// Create an unsupported operation error
    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        WvdError::Unsupported(message.into())
    }
}
