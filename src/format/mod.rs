/// Wang file format handlers
///
/// Each handler validates a run of file sectors (`check`) and decodes it to
/// text (`list`). Validation never fails with an error: problems are
/// collected into a [`CheckReport`].

/// Structured data files written by DATASAVE
pub mod data;
/// EDIT text files
pub mod edit;
/// `LIST D` style line re-wrapping
pub mod pretty;
/// BASIC program files
pub mod program;
/// BASIC keyword table
pub mod tokens;

pub use data::DataHandler;
pub use edit::EditHandler;
pub use program::ProgramHandler;

use crate::catalog::{FileName, FileType};
use crate::image::sector::Sector;
use std::fmt;

/// Default width for pretty printed listings
pub const DEFAULT_LIST_WIDTH: usize = 78;

/// Outcome of a structural check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Errors were found, or warnings exceeded the allowed limit
    pub failed: bool,
    /// Error messages in the order found
    pub errors: Vec<String>,
    /// Warning messages in the order found
    pub warnings: Vec<String>,
    /// Last sector before the first problem, `None` if that is before
    /// sector 0 or the check is not sector based
    pub last_good_sector: Option<usize>,
}

impl CheckReport {
    /// No errors and no warnings at all
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Errors followed by warnings, each warning prefixed as such
    pub fn messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .cloned()
            .chain(self.warnings.iter().map(|w| format!("(warning) {}", w)))
            .collect()
    }
}

/// Collects problems while walking sectors
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    errors: Vec<String>,
    warnings: Vec<String>,
    first_error: Option<usize>,
    first_warning: Option<usize>,
}

impl Diagnostics {
    pub(crate) fn error<S: Into<String>>(&mut self, sector: usize, message: S) {
        self.first_error = Some(self.first_error.map_or(sector, |s| s.min(sector)));
        self.errors.push(message.into());
    }

    pub(crate) fn warning<S: Into<String>>(&mut self, sector: usize, message: S) {
        self.first_warning = Some(self.first_warning.map_or(sector, |s| s.min(sector)));
        self.warnings.push(message.into());
    }

    pub(crate) fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Stop walking once there is an error or too many warnings
    pub(crate) fn should_stop(&self, warn_limit: usize) -> bool {
        self.has_errors() || self.warnings.len() > warn_limit
    }

    pub(crate) fn into_report(self, last_sector: usize, warn_limit: usize) -> CheckReport {
        let failed = self.has_errors() || self.warnings.len() > warn_limit;
        let last_good_sector = match (self.first_error, self.first_warning) {
            (Some(e), _) => e.checked_sub(1),
            (None, Some(w)) => w.checked_sub(1),
            (None, None) => Some(last_sector),
        };
        CheckReport {
            failed,
            errors: self.errors,
            warnings: self.warnings,
            last_good_sector,
        }
    }
}

/// Options for [`FormatHandler::check`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Absolute sector number of the first sector passed in
    pub sector: usize,
    /// Used sector count claimed by the catalog, if known
    pub used: Option<u32>,
    /// Number of warnings tolerated before the check fails
    pub warn_limit: usize,
    /// Name the catalog gives the file, if known
    pub catalog_name: Option<FileName>,
}

impl CheckOptions {
    /// Options for a check starting at absolute sector `sector`
    pub fn new(sector: usize) -> Self {
        Self {
            sector,
            ..Self::default()
        }
    }

    /// Set the catalog's used sector count
    pub fn with_used(mut self, used: u32) -> Self {
        self.used = Some(used);
        self
    }

    /// Set the warning limit
    pub fn with_warn_limit(mut self, warn_limit: usize) -> Self {
        self.warn_limit = warn_limit;
        self
    }

    /// Set the catalog name to compare against the program header
    pub fn with_catalog_name(mut self, name: FileName) -> Self {
        self.catalog_name = Some(name);
        self
    }
}

/// BASIC dialect used when decoding and pretty printing programs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// BASIC-2: double quotes only, `%` image runs to end of line
    #[default]
    Basic2,
    /// Wang BASIC: single or double quotes, `:` ends an image statement
    ///
    /// This is an approximation; keyword expansion still follows BASIC-2.
    WangBasic,
}

/// Options for [`FormatHandler::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Absolute sector number of the first sector passed in
    pub sector: usize,
    /// Re-wrap program lines one statement per line
    pub pretty: bool,
    /// Wrap width for pretty printing
    pub width: usize,
    /// Dialect rules for strings and image statements
    pub dialect: Dialect,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            sector: 0,
            pretty: false,
            width: DEFAULT_LIST_WIDTH,
            dialect: Dialect::Basic2,
        }
    }
}

impl ListOptions {
    /// Options for a listing starting at absolute sector `sector`
    pub fn new(sector: usize) -> Self {
        Self {
            sector,
            ..Self::default()
        }
    }

    /// Turn pretty printing on or off
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Set the pretty printing width
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Set the dialect
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }
}

/// Validator and decoder for one file format
pub trait FormatHandler {
    /// Short name
    fn name(&self) -> &'static str;

    /// Longer description
    fn long_name(&self) -> &'static str;

    /// Catalog file type this format is stored as
    fn file_type(&self) -> FileType;

    /// Check the structure of a run of file sectors
    fn check(&self, sectors: &[Sector], options: &CheckOptions) -> CheckReport;

    /// Decode a run of file sectors to text lines
    fn list(&self, sectors: &[Sector], options: &ListOptions) -> Vec<String>;
}

/// The file formats understood by the toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// BASIC program
    Program,
    /// DATASAVE structured data
    Data,
    /// EDIT text
    Edit,
}

impl FileFormat {
    /// All formats, in detection order
    pub const ALL: [FileFormat; 3] = [FileFormat::Program, FileFormat::Data, FileFormat::Edit];

    /// The handler for this format
    pub fn handler(&self) -> &'static dyn FormatHandler {
        match self {
            FileFormat::Program => &ProgramHandler,
            FileFormat::Data => &DataHandler,
            FileFormat::Edit => &EditHandler,
        }
    }

    /// Look a format up by its short name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.handler().name().eq_ignore_ascii_case(name))
    }

    /// Pick the format of a file from its catalog type and contents
    ///
    /// EDIT files are structurally valid data files, so data-family files
    /// are tried as EDIT first.
    pub fn detect(file_type: FileType, sectors: &[Sector]) -> Option<Self> {
        match file_type {
            FileType::Program => Some(FileFormat::Program),
            FileType::Data => {
                if EditHandler.check(sectors, &CheckOptions::default()).failed {
                    Some(FileFormat::Data)
                } else {
                    Some(FileFormat::Edit)
                }
            }
            FileType::Unknown(_) => None,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.handler().name())
    }
}

/// Run `list_one` over each sector until it reports the end of the file
pub(crate) fn list_each<F>(sectors: &[Sector], first_sector: usize, mut list_one: F) -> Vec<String>
where
    F: FnMut(&Sector, usize, &mut Vec<String>) -> bool,
{
    let mut listing = Vec::new();
    for (offset, sector) in sectors.iter().enumerate() {
        if list_one(sector, first_sector + offset, &mut listing) {
            break;
        }
    }
    listing
}
