/// Raw sector listings

use crate::format::data::list_data_record;
use crate::format::program::{is_possible_body, is_possible_header};
use crate::format::tokens::{END_OF_BLOCK, END_OF_DATA};
use crate::format::{FormatHandler, ListOptions, ProgramHandler};
use crate::image::sector::{ControlByte, Sector};
use std::fmt::Write;

/// Hex and ASCII dump of one sector, 16 bytes per row
pub fn hex_dump(sector: &Sector) -> Vec<String> {
    sector
        .chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let mut line = format!("{:02x}:", row * 16);
            for byte in chunk {
                let _ = write!(line, " {:02x}", byte);
            }
            line.push_str("  ");
            line.extend(chunk.iter().map(|&b| {
                if (0x20..0x80).contains(&b) {
                    b as char
                } else {
                    '.'
                }
            }));
            line
        })
        .collect()
}

/// List an arbitrary run of sectors, each on its own
///
/// Sectors that look like program records are decoded as programs, data
/// sectors as data records. Anything else is hex dumped.
pub fn list_sectors(sectors: &[Sector], first_sector: usize, options: &ListOptions) -> Vec<String> {
    let mut listing = Vec::new();

    for (offset, sector) in sectors.iter().enumerate() {
        let sec = first_sector + offset;
        listing.push(format!("============== sector {} ==============", sec));

        let control = ControlByte::of(sector);
        let program = !control.is_data()
            && if control.is_header() {
                is_possible_header(sector)
            } else if control.is_trailer() {
                is_possible_body(sector, END_OF_DATA)
            } else {
                is_possible_body(sector, END_OF_BLOCK)
            };

        if program {
            let opts = ListOptions {
                sector: sec,
                ..options.clone()
            };
            listing.extend(ProgramHandler.list(std::slice::from_ref(sector), &opts));
        } else if control.is_data() && !control.is_trailer() {
            listing.extend(list_data_record(sector));
        } else if control.is_data() {
            listing.push("Data file trailer record".to_string());
        } else {
            listing.extend(hex_dump(sector));
        }
    }
    listing
}
