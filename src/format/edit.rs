/// EDIT text files
///
/// EDIT files are data files with a rigid layout: every sector but the
/// last is `81 01` followed by four 62 byte strings (SOV 0xBE) and the
/// `FD 00` end of block. The last sector is an 0xAx trailer. Text ends at
/// the first 0x03 byte.

use crate::catalog::FileType;
use crate::format::tokens::END_OF_BLOCK;
use crate::format::{CheckOptions, CheckReport, Diagnostics, FormatHandler, ListOptions};
use crate::image::sector::Sector;
use std::fmt::Write;

/// SOV of a 62 byte string
const STRING_MARKER: u8 = 0xBE;
/// Length of each string
const STRING_LEN: usize = 62;
/// Strings per sector
const STRINGS_PER_SECTOR: usize = 4;
/// End of text
const END_OF_TEXT: u8 = 0x03;
/// Line break in type 1 files
const LINE_BREAK: u8 = 0x1E;

/// Which of the two EDIT layouts a file uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditVariant {
    /// `02 01 <offset> FILE = name date`, lines broken by 0x1E
    Type1,
    /// `*FILE = name`, one line per string
    Type2,
}

/// Handler for EDIT text files
#[derive(Debug, Clone, Copy, Default)]
pub struct EditHandler;

/// The `n`-th 62 byte string of a sector
fn string_at(sector: &Sector, n: usize) -> &[u8] {
    let start = 3 + n * (STRING_LEN + 1);
    &sector[start..start + STRING_LEN]
}

fn is_trailer(sector: &Sector) -> bool {
    sector[0] & 0xF0 == 0xA0
}

impl EditVariant {
    /// Identify the layout from the first string of the first sector
    fn detect(sector: &Sector) -> std::result::Result<Self, String> {
        let line0 = string_at(sector, 0);
        if line0.starts_with(b"*FILE = ") {
            return Ok(EditVariant::Type2);
        }
        if line0[..2] != [0x02, 0x01] {
            return Err(format!(
                "magic bytes {:02x}{:02x} found instead of 0201",
                line0[0], line0[1]
            ));
        }
        if &line0[3..10] != b"FILE = " {
            return Err("first line didn't contain the filename".to_string());
        }
        Ok(EditVariant::Type1)
    }
}

/// Expand one type 1 byte into `line`, flushing completed lines
fn push_type1_byte(byte: u8, line: &mut String, listing: &mut Vec<String>) {
    match byte {
        LINE_BREAK => listing.push(std::mem::take(line)),
        0x09 => line.push('\t'),
        32..=128 => line.push(byte as char),
        _ => {
            let _ = write!(line, "\\x{:02x}", byte);
        }
    }
}

/// Expand one type 2 string into a line
fn type2_line(text: &[u8]) -> String {
    let mut line = String::new();
    for &byte in text {
        match byte {
            0xA0 => line.push('\t'),
            32..=127 => line.push(byte as char),
            _ => {
                let _ = write!(line, "\\x{:02x}", byte);
            }
        }
    }
    line.trim_end_matches(' ').to_string()
}

/// Rework the first string of a type 1 file
///
/// The leading `02 01 <offset>` is dropped and the `FILE = ...` description
/// becomes a `* ` comment line of its own.
fn type1_first_string(line0: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let offset = line0[2] as usize;
    if !(0x16..=0x1A).contains(&offset) {
        return Err(format!(
            "first line of file started with 0x{:02x} 0x{:02x} 0x{:02x} (expected 0x02 0x01 (0x16..0x1a))",
            line0[0], line0[1], line0[2]
        ));
    }
    let mut line0 = line0.to_vec();
    if line0[2 + offset] == LINE_BREAK {
        line0[2 + offset] = b' ';
    }
    let mut out = b"* ".to_vec();
    out.extend_from_slice(&line0[3..3 + offset]);
    out.push(LINE_BREAK);
    out.extend_from_slice(&line0[3 + offset..]);
    Ok(out)
}

impl FormatHandler for EditHandler {
    fn name(&self) -> &'static str {
        "edit"
    }

    fn long_name(&self) -> &'static str {
        "EDIT editor source code text file"
    }

    fn file_type(&self) -> FileType {
        FileType::Data
    }

    fn check(&self, sectors: &[Sector], options: &CheckOptions) -> CheckReport {
        let start = options.sector;
        let mut diag = Diagnostics::default();

        if sectors.is_empty() {
            diag.error(start, "this is a null file");
            return diag.into_report(start, options.warn_limit);
        }

        let mut end_byte_seen = false;
        let mut sec = start;
        for (offset, sector) in sectors.iter().enumerate() {
            sec = start + offset;

            if is_trailer(sector) {
                if offset == 0 {
                    diag.error(sec, "first sector was trailer record");
                }
                if !end_byte_seen {
                    diag.error(
                        sec,
                        format!(
                            "sector {}: end byte 0x03 not seen before the trailer record",
                            sec
                        ),
                    );
                }
                break;
            }

            if end_byte_seen {
                diag.error(
                    sec,
                    format!(
                        "sector {}: end byte \\x03 byte seen; expected trailer record next",
                        sec
                    ),
                );
                break;
            }

            if sector[0] != 0x81 {
                diag.error(
                    sec,
                    format!(
                        "sector {} started with unexpected control byte 0x{:02x}; expected 0x81",
                        sec, sector[0]
                    ),
                );
                break;
            }
            if sector[1] != 0x01 {
                diag.error(
                    sec,
                    format!(
                        "sector {} started with unexpected sector sequence byte 0x{:02x}; expected 0x01",
                        sec, sector[1]
                    ),
                );
                break;
            }
            if (0..STRINGS_PER_SECTOR).any(|n| sector[2 + n * (STRING_LEN + 1)] != STRING_MARKER) {
                diag.error(
                    sec,
                    format!("sector {}: expected to see four strings of 62 bytes each", sec),
                );
                break;
            }
            if sector[0xFE] != END_OF_BLOCK {
                diag.error(
                    sec,
                    format!(
                        "sector {}: end of block byte was 0x{:02x} (expected 0xfd)",
                        sec, sector[0xFE]
                    ),
                );
                break;
            }

            end_byte_seen = sector.contains(&END_OF_TEXT);

            if offset == 0 {
                if let Err(message) = EditVariant::detect(sector) {
                    diag.error(sec, format!("sector {}: {}", sec, message));
                    break;
                }
            }

            if diag.should_stop(options.warn_limit) {
                break;
            }
        }

        diag.into_report(sec, options.warn_limit)
    }

    /// Join the strings of every sector into text lines
    ///
    /// Lines run across string and sector boundaries in type 1 files.
    fn list(&self, sectors: &[Sector], _options: &ListOptions) -> Vec<String> {
        let mut listing = Vec::new();
        let Some(first) = sectors.first() else {
            return listing;
        };
        let variant = match EditVariant::detect(first) {
            Ok(v) => v,
            Err(message) => {
                listing.push(format!("# relative sector 0: {}", message));
                return listing;
            }
        };

        let mut line = String::new();
        'sectors: for (offset, sector) in sectors.iter().enumerate() {
            if is_trailer(sector) {
                break;
            }

            for n in 0..STRINGS_PER_SECTOR {
                let mut text = string_at(sector, n).to_vec();
                if offset == 0 && n == 0 && variant == EditVariant::Type1 {
                    match type1_first_string(&text) {
                        Ok(reworked) => text = reworked,
                        Err(message) => {
                            listing.push(format!("# relative sector 0: {}", message));
                            return listing;
                        }
                    }
                }

                let end = text.iter().position(|&b| b == END_OF_TEXT);
                if let Some(idx) = end {
                    text.truncate(idx);
                }

                match variant {
                    EditVariant::Type1 => {
                        for &byte in &text {
                            push_type1_byte(byte, &mut line, &mut listing);
                        }
                    }
                    EditVariant::Type2 => listing.push(type2_line(&text)),
                }

                if end.is_some() {
                    break 'sectors;
                }
            }
        }

        if !line.is_empty() {
            listing.push(line);
        }
        listing
    }
}
