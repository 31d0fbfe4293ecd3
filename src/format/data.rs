/// Structured data files written by DATASAVE
///
/// A logical record is one sector (`81 01`) or a run of sectors
/// (`82 01`, `82 02`, ..., `81 nn`). The value stream starts at byte 2: each
/// value is introduced by a start-of-value (SOV) byte and the stream ends
/// with 0xFD. A sector with 0xA0 set ends the file.

use crate::catalog::FileType;
use crate::format::tokens::END_OF_BLOCK;
use crate::format::{CheckOptions, CheckReport, Diagnostics, FormatHandler, ListOptions};
use crate::image::sector::{is_bcd_byte, ControlByte, Sector};
use std::fmt::Write;

/// SOV of an 8 byte packed BCD number
pub const SOV_NUMBER: u8 = 0x08;

/// SOV bytes from here up are control codes, not values
const SOV_LIMIT: u8 = 0xFC;

/// Last offset the 0xFD terminator may occupy
const LAST_TERMINATOR_OFFSET: usize = 254;

/// Single sector record, or the last sector of a multi-sector record
const RECORD_LAST: u8 = 0x81;
/// Non-final sector of a multi-sector record
const RECORD_MORE: u8 = 0x82;

/// Handler for DATASAVE files
#[derive(Debug, Clone, Copy, Default)]
pub struct DataHandler;

/// One value of a data record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue<'a> {
    /// Packed BCD number, sign/exponent byte first
    Number(&'a [u8]),
    /// String bytes
    String(&'a [u8]),
}

/// Why a value stream could not be walked further
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamError {
    NumberOverflow,
    BadDigits,
    BadSov(u8),
    StringOverflow,
    NoTerminator,
}

/// Walk the values of a record, stopping at the first control code
///
/// Returns the values found and, on failure, what went wrong.
fn walk_values(sector: &Sector, check_digits: bool) -> (Vec<DataValue<'_>>, Option<StreamError>) {
    let mut values = Vec::new();
    let mut cp = 2;
    while cp < 255 && sector[cp] < SOV_LIMIT {
        let sov = sector[cp];
        if sov == SOV_NUMBER {
            if cp + 9 > LAST_TERMINATOR_OFFSET {
                return (values, Some(StreamError::NumberOverflow));
            }
            let fp = &sector[cp + 1..cp + 9];
            if check_digits && !fp[1..].iter().all(|&b| is_bcd_byte(b)) {
                return (values, Some(StreamError::BadDigits));
            }
            values.push(DataValue::Number(fp));
            cp += 9;
        } else if sov < 0x80 {
            return (values, Some(StreamError::BadSov(sov)));
        } else {
            let len = (sov - 0x80) as usize;
            if cp + 1 + len > LAST_TERMINATOR_OFFSET {
                return (values, Some(StreamError::StringOverflow));
            }
            values.push(DataValue::String(&sector[cp + 1..cp + 1 + len]));
            cp += 1 + len;
        }
    }
    if sector.get(cp) != Some(&END_OF_BLOCK) {
        return (values, Some(StreamError::NoTerminator));
    }
    (values, None)
}

/// Check the value stream of one record sector
pub(crate) fn check_data_record(sec: usize, sector: &Sector, diag: &mut Diagnostics) {
    let message = match walk_values(sector, true).1 {
        None => return,
        Some(StreamError::NumberOverflow) => format!(
            "sector {}, SOV indicates a number, but there aren't enough bytes left in the sector",
            sec
        ),
        Some(StreamError::BadDigits) => format!("sector {}, fp value has non-BCD digits", sec),
        Some(StreamError::BadSov(sov)) => {
            format!("sector {}, unexpected SOV value of 0x{:02X}", sec, sov)
        }
        Some(StreamError::StringOverflow) => format!(
            "sector {}; SOV indicates string length that doesn't fit in sector",
            sec
        ),
        Some(StreamError::NoTerminator) => {
            format!("sector {} doesn't contain 0xFD terminator", sec)
        }
    };
    diag.error(sec, message);
}

/// Does the value stream of this sector look valid?
pub(crate) fn is_possible_data_record(sector: &Sector) -> bool {
    walk_values(sector, true).1.is_none()
}

/// Render a packed BCD number
///
/// The digits are shown as stored: sign, leading digit, point, twelve more
/// digits, then the exponent sign and exponent in hex.
pub fn format_number(fp: &[u8]) -> String {
    let mantissa_sign = if fp[0] & 0x10 != 0 { '-' } else { ' ' };
    let exponent_sign = if fp[0] & 0x80 != 0 { '-' } else { '+' };
    let exponent = (fp[0] & 0x0F) as u32 + 10 * (fp[1] >> 4) as u32;

    let mut text = format!("{}{}.", mantissa_sign, fp[1] & 0x0F);
    for digits in &fp[2..8] {
        let _ = write!(text, "{:02X}", digits);
    }
    let _ = write!(text, "{}{:02X}", exponent_sign, exponent);
    text
}

/// Render a string value in double quotes, escaping non-printing bytes
pub fn format_string(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len() + 2);
    text.push('"');
    for &b in bytes {
        if (32..128).contains(&b) {
            text.push(b as char);
        } else {
            let _ = write!(text, "\\{:02X}", b);
        }
    }
    text.push('"');
    text
}

/// List the values of one record sector
pub fn list_data_record(sector: &Sector) -> Vec<String> {
    let (values, problem) = walk_values(sector, false);
    let mut listing: Vec<String> = values
        .into_iter()
        .map(|value| match value {
            DataValue::Number(fp) => format_number(fp),
            DataValue::String(bytes) => format_string(bytes),
        })
        .collect();
    match problem {
        Some(StreamError::NumberOverflow) => listing.push(
            "# SOV indicates a number, but there aren't enough bytes left in the sector"
                .to_string(),
        ),
        Some(StreamError::BadSov(sov)) => {
            listing.push(format!("# Unexpected SOV value of 0x{:02X}", sov))
        }
        Some(StreamError::StringOverflow) => listing
            .push("# SOV indicates string length that doesn't fit in sector".to_string()),
        _ => {}
    }
    listing
}

impl FormatHandler for DataHandler {
    fn name(&self) -> &'static str {
        "data"
    }

    fn long_name(&self) -> &'static str {
        "Wang BASIC and BASIC-2 data files"
    }

    fn file_type(&self) -> FileType {
        FileType::Data
    }

    /// Check record sequencing and the value stream of each sector
    ///
    /// An end-of-data sector stops the check without being inspected.
    fn check(&self, sectors: &[Sector], options: &CheckOptions) -> CheckReport {
        let start = options.sector;
        let mut diag = Diagnostics::default();
        let mut expect: Option<u8> = None;
        let mut sec = start;

        for (offset, sector) in sectors.iter().enumerate() {
            sec = start + offset;
            let (b0, b1) = (sector[0], sector[1]);

            match expect {
                None => {
                    if ControlByte(b0).is_end_of_data() {
                        break;
                    }
                    match (b0, b1) {
                        (RECORD_LAST, 0x01) => {}
                        (RECORD_MORE, 0x01) => expect = Some(0x02),
                        _ => {
                            diag.error(
                                sec,
                                format!("sector {} has bad control bytes 0x{:02x}{:02x}", sec, b0, b1),
                            );
                            break;
                        }
                    }
                }
                Some(seq) => {
                    if b1 != seq {
                        diag.error(
                            sec,
                            format!(
                                "sector {} expected to have sequence number 0x{:02x}, got 0x{:02x}",
                                sec, seq, b1
                            ),
                        );
                        break;
                    }
                    match b0 {
                        RECORD_MORE => expect = Some(seq.wrapping_add(1)),
                        RECORD_LAST => expect = None,
                        _ => {
                            diag.error(
                                sec,
                                format!("sector {} has bad control bytes 0x{:02x}{:02x}", sec, b0, b1),
                            );
                            break;
                        }
                    }
                }
            }

            check_data_record(sec, sector, &mut diag);
            if diag.should_stop(options.warn_limit) {
                break;
            }
        }

        diag.into_report(sec, options.warn_limit)
    }

    fn list(&self, sectors: &[Sector], options: &ListOptions) -> Vec<String> {
        let mut listing = Vec::new();
        let mut logical_record = 0;

        for (offset, sector) in sectors.iter().enumerate() {
            let control = ControlByte::of(sector);
            if !control.is_data() {
                listing.push(format!(
                    "Sector {} of data file has bad header byte 0x{:02X}",
                    options.sector + offset,
                    sector[0]
                ));
                break;
            }
            if control.is_end_of_data() {
                break;
            }
            if sector[1] == 0x01 {
                listing.push(format!("### Logical Record {}", logical_record));
                logical_record += 1;
            }
            listing.extend(list_data_record(sector));
        }
        listing
    }
}
