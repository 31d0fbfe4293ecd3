/// BASIC program files
///
/// A program is a header sector (0x40, 0x50 if protected) holding the
/// filename, zero or more body sectors (0x00/0x10) terminated by 0xFD and a
/// trailer sector (0x20/0x30) terminated by 0xFE. Body sectors hold whole
/// lines: `FF <bcd> <bcd> text 0D 00 00`.

use crate::catalog::{FileName, FileType};
use crate::format::pretty::pretty_print;
use crate::format::tokens::{
    token_text, END_OF_BLOCK, END_OF_DATA, END_OF_LINE, IMAGE, LINE_NUMBER, REM,
};
use crate::format::{
    list_each, CheckOptions, CheckReport, Diagnostics, Dialect, FormatHandler, ListOptions,
};
use crate::image::sector::{is_bcd_byte, ControlByte, Sector};
use crate::scramble::{is_scrambled, unscramble};
use std::fmt::Write;

/// Handler for Wang BASIC and BASIC-2 programs
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramHandler;

/// Where the decoder is within a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    /// Keywords expand
    Atomic,
    /// Inside a string opened with the given quote
    InQuotes(u8),
    /// After REM, up to the next colon
    InRem,
    /// After a `%` image token
    InImage,
}

impl LexState {
    fn next(self, c: u8, dialect: Dialect) -> Self {
        let is_quote = c == b'"' || (dialect == Dialect::WangBasic && c == b'\'');
        match self {
            LexState::Atomic if c == REM => LexState::InRem,
            LexState::Atomic if c == IMAGE => LexState::InImage,
            LexState::Atomic if is_quote => LexState::InQuotes(c),
            LexState::InQuotes(q) if c == q => LexState::Atomic,
            LexState::InRem if c == b':' => LexState::Atomic,
            LexState::InImage if c == b':' && dialect == Dialect::WangBasic => LexState::Atomic,
            state => state,
        }
    }
}

/// Decode a four digit BCD line number
fn bcd_line_number(hi: u8, lo: u8) -> u32 {
    1000 * (hi >> 4) as u32 + 100 * (hi & 0x0F) as u32 + 10 * (lo >> 4) as u32 + (lo & 0x0F) as u32
}

/// Filename stored in bytes 1..9 of a program header
pub fn header_name(sector: &Sector) -> FileName {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&sector[1..9]);
    FileName::from_raw(raw)
}

/// Check the header sector of a program
pub(crate) fn check_header_record(
    sec: usize,
    sector: &Sector,
    catalog_name: Option<&FileName>,
    diag: &mut Diagnostics,
) {
    let name = header_name(sector);
    if let Some(expected) = catalog_name {
        if *expected != name {
            diag.warning(
                sec,
                format!(
                    "file {}'s header block indicates file name '{}'",
                    expected, name
                ),
            );
        }
    }
    if sector[9] != END_OF_BLOCK {
        diag.warning(
            sec,
            format!(
                "{}'s header record (sector {}) must have a 0xFD terminator in the 10th byte",
                name, sec
            ),
        );
    }
}

/// Check the line structure of a body or trailer sector
pub(crate) fn check_body_record(sec: usize, sector: &Sector, terminator: u8, diag: &mut Diagnostics) {
    let Some(pos) = sector.iter().position(|&b| b == terminator) else {
        diag.error(
            sec,
            format!(
                "(sector {}) does not contain a 0x{:02X} terminator byte",
                sec, terminator
            ),
        );
        return;
    };

    // an empty body is just the terminator at offset 1
    if pos < 7 && pos != 1 {
        diag.error(
            sec,
            format!(
                "(sector {}) contains a 0x{:02X} terminator byte, but it is too soon",
                sec, terminator
            ),
        );
        return;
    }

    let byte_at = |i: usize| sector.get(i).copied().unwrap_or(0);
    let mut expect_line_number = true;
    let mut cp = 1;
    while cp < pos {
        if expect_line_number {
            // Wang BASIC allows spaces before the line number
            if sector[cp] == b' ' {
                cp += 1;
                continue;
            }
            if sector[cp] != LINE_NUMBER {
                diag.error(
                    sec,
                    format!(
                        "(sector {}) didn't find a line number token, 0xFF, where expected; 0x{:02X} found",
                        sec, sector[cp]
                    ),
                );
                return;
            }
            let (hi, lo) = (byte_at(cp + 1), byte_at(cp + 2));
            if !is_bcd_byte(hi) || !is_bcd_byte(lo) {
                diag.error(
                    sec,
                    format!(
                        "(sector {}) should begin with a bcd line number, but found 0x{:02X}{:02X}",
                        sec, hi, lo
                    ),
                );
                return;
            }
            cp += 3;
            expect_line_number = false;
        } else {
            if sector[cp] != END_OF_LINE {
                cp += 1;
                continue;
            }
            let (a, b) = (byte_at(cp + 1), byte_at(cp + 2));
            if a != 0x00 || b != 0x00 {
                diag.error(
                    sec,
                    format!(
                        "(sector {}) contains an EOL (0x0D) which isn't followed by 0x0000; found 0x{:02X}{:02X}",
                        sec, a, b
                    ),
                );
                return;
            }
            cp += 3;
            expect_line_number = true;
        }
    }

    if !expect_line_number {
        diag.error(
            sec,
            format!(
                "(sector {}) terminated with a partial program line at offset {}",
                sec, cp
            ),
        );
    }
}

/// Could this sector be a program header, ignoring its control byte?
pub(crate) fn is_possible_header(sector: &Sector) -> bool {
    let mut diag = Diagnostics::default();
    check_header_record(0, sector, None, &mut diag);
    diag.into_report(0, 0).is_clean()
}

/// Could this sector be a body record ending in `terminator`?
pub(crate) fn is_possible_body(sector: &Sector, terminator: u8) -> bool {
    let mut diag = Diagnostics::default();
    check_body_record(0, sector, terminator, &mut diag);
    !diag.has_errors()
}

/// Decode one program sector into source lines
///
/// Partial lines at the end of the sector are dropped; program lines never
/// span sectors.
pub fn list_program_record(raw: &Sector, sector_num: usize, dialect: Dialect) -> Vec<String> {
    let mut listing = Vec::new();

    let unscrambled;
    let sector = if is_scrambled(raw) {
        unscrambled = unscramble(raw);
        &unscrambled
    } else {
        raw
    };

    let control = ControlByte::of(sector);
    if !control.is_data() && control.is_header() {
        let protection = if control.is_protected() {
            ", protected file"
        } else {
            ""
        };
        listing.push(format!(
            "# Sector {}, program filename = '{}'{}",
            sector_num,
            header_name(sector),
            protection
        ));
        return listing;
    }
    if control.is_data() {
        listing.push(format!("# {} doesn't look like a program record", sector_num));
        return listing;
    }

    let mut line = String::new();
    let mut state = LexState::Atomic;
    let mut cp = 1;
    while cp < 255 && sector[cp] != END_OF_BLOCK && sector[cp] != END_OF_DATA {
        let c = sector[cp];

        if c == END_OF_LINE {
            listing.push(std::mem::take(&mut line));
            state = LexState::Atomic;
            cp += 3;
            continue;
        }

        if c < 0x80 {
            line.push(c as char);
        } else if c == LINE_NUMBER && cp < 254 {
            let number = bcd_line_number(sector[cp + 1], sector[cp + 2]);
            let _ = write!(line, "{}", number);
            cp += 2;
        } else {
            match (state, token_text(c)) {
                (LexState::Atomic, Some(text)) => line.push_str(text),
                _ => {
                    let _ = write!(line, "\\{:02X}", c);
                }
            }
        }

        state = state.next(c, dialect);
        cp += 1;
    }
    listing
}

impl FormatHandler for ProgramHandler {
    fn name(&self) -> &'static str {
        "program"
    }

    fn long_name(&self) -> &'static str {
        "Wang BASIC and BASIC-2 program files"
    }

    fn file_type(&self) -> FileType {
        FileType::Program
    }

    /// Check control bytes and line structure of every sector
    ///
    /// A single sector is checked without insisting that it be a header.
    fn check(&self, sectors: &[Sector], options: &CheckOptions) -> CheckReport {
        let start = options.sector;
        let one_block = sectors.len() == 1;
        let mut diag = Diagnostics::default();
        let mut protected = 0u8;
        let mut trailer_at = None;
        let mut sec = start;

        for (offset, raw) in sectors.iter().enumerate() {
            sec = start + offset;

            let unscrambled;
            let sector = if is_scrambled(raw) {
                protected = ControlByte::PROTECTED;
                unscrambled = unscramble(raw);
                &unscrambled
            } else {
                raw
            };
            let control = ControlByte::of(sector);

            if control.is_data() {
                diag.error(sec, format!("sector {} indicates it is a data record", sec));
                return diag.into_report(sec, options.warn_limit);
            }

            let (terminator, expected) = if control.is_header() {
                protected = control.0 & ControlByte::PROTECTED;
                (END_OF_BLOCK, ControlByte::HEADER | protected)
            } else if control.is_trailer() {
                (END_OF_DATA, ControlByte::TRAILER | protected)
            } else {
                (END_OF_BLOCK, protected)
            };

            if control.role_bits() != expected {
                diag.warning(
                    sec,
                    format!(
                        "sector {} has control byte of 0x{:02x}; 0x{:02x} expected",
                        sec,
                        control.role_bits(),
                        expected
                    ),
                );
            }

            if control.is_header() {
                if offset != 0 && !one_block {
                    diag.error(sec, format!("sector {} indicates it is a header record", sec));
                } else {
                    check_header_record(sec, sector, options.catalog_name.as_ref(), &mut diag);
                }
            } else if offset == 0 && !one_block {
                diag.warning(sec, format!("sector {} should have been a header record", sec));
            } else {
                check_body_record(sec, sector, terminator, &mut diag);
            }

            if control.is_trailer() {
                trailer_at = Some(sec);
                break;
            }
            if diag.should_stop(options.warn_limit) {
                break;
            }
        }

        if let (Some(used), Some(trailer)) = (options.used, trailer_at) {
            // +1 for the control sector after the trailer
            let computed = trailer - start + 2;
            if used as usize != computed {
                diag.warning(
                    sec,
                    format!(
                        "catalog claims {} used sectors, but file uses {} sectors",
                        used, computed
                    ),
                );
            }
        }

        diag.into_report(sec, options.warn_limit)
    }

    fn list(&self, sectors: &[Sector], options: &ListOptions) -> Vec<String> {
        list_each(sectors, options.sector, |sector, sector_num, listing| {
            if sector[0] == 0xA0 {
                return true;
            }
            let lines = list_program_record(sector, sector_num, options.dialect);
            if options.pretty {
                for line in &lines {
                    listing.extend(pretty_print(line, options.width, options.dialect));
                }
            } else {
                listing.extend(lines);
            }
            ControlByte::of(sector).role_bits() & 0xE0 == ControlByte::TRAILER
        })
    }
}
