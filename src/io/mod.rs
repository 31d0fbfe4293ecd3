/// I/O operations for reading and writing WVD files

/// Reader implementation for WVD files
pub mod reader;
/// Writer implementation for WVD files
pub mod writer;

pub use reader::read_wvd;
pub use writer::write_wvd;
