/*!
# wvd

A Rust library for reading, checking and repairing Wang 2200 virtual disk
(`.wvd`) images.

## Features

- Load and save single and multi-platter `.wvd` images
- Hash indexed catalogs in both the old and the new index layout, with
  lookup, insertion and conversion between the two
- Structural checks and listings for BASIC programs, DATASAVE data files
  and EDIT text files
- Unscrambling of `SAVE !` programs
- Recovery of files from sectors without a usable catalog

## Quick Start

```rust,no_run
use wvd::{DiskImage, FormatHandler, ListOptions, ProgramHandler};

let image = DiskImage::open("disk.wvd")?;
let catalog = image.catalog(0)?;

for entry in catalog.live_entries() {
    println!("{:8} {:?} {:?}", entry.name(), entry.status(), entry.extent());
}

let report = catalog.check_index();
for message in report.messages() {
    println!("{}", message);
}

let file = catalog.file("MENU")?;
for line in ProgramHandler.list(&file.sectors()?, &ListOptions::default().with_pretty(true)) {
    println!("{}", line);
}
# Ok::<(), wvd::WvdError>(())
```

## Modules

- `image`: the image, its header and platters
- `catalog`: catalog index, entries, files and consistency checks
- `format`: program, data and EDIT file handlers
- `scramble`: `SAVE !` descrambling
- `scan`: catalog-less file recovery
- `dump`: hex dumps and raw sector listings
- `compare`: image and catalog comparison
- `io`: reading and writing `.wvd` files
- `error`: error types and Result alias
*/

#![warn(missing_docs)]

/// Catalog index, entries and file handles
pub mod catalog;
/// Image and catalog comparison
pub mod compare;
/// Hex dumps and raw sector listings
pub mod dump;
/// Error types and Result alias
pub mod error;
/// File format handlers
pub mod format;
/// Core image data structures (DiskImage, Platter, Sector)
pub mod image;
/// I/O operations for reading and writing WVD files
pub mod io;
/// Catalog-less file recovery
pub mod scan;
/// Descrambling of `SAVE !` program sectors
pub mod scramble;

// Re-export common types
pub use catalog::{
    Catalog, CatalogEntry, CatalogMut, FileHandle, FileName, FileType, IndexState, IndexType,
    SaveMode,
};
pub use compare::{compare_catalogs, compare_images, CatalogComparison, ImageComparison};
pub use error::{Result, WvdError};
pub use format::{
    CheckOptions, CheckReport, DataHandler, Dialect, EditHandler, FileFormat, FormatHandler,
    ListOptions, ProgramHandler,
};
pub use image::{ControlByte, DiskImage, MediaType, Platter, Sector, SectorRole, WvdHeader};
pub use scan::{scan, FileSpan, SpanKind};
pub use scramble::{is_scrambled, unscramble};
