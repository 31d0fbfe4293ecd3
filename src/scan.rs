/// Catalog-less file recovery
///
/// Walks a run of raw sectors and groups them into probable files using
/// only the sector contents. Nothing is guessed beyond what the control
/// bytes and record structure show, so damaged files come back as
/// headless, tailless or fragment spans.

use crate::format::data::is_possible_data_record;
use crate::format::program::{header_name, is_possible_body, is_possible_header};
use crate::format::tokens::{END_OF_BLOCK, END_OF_DATA};
use crate::image::sector::{ControlByte, Sector};
use crate::scramble::{is_scrambled, unscramble};
use log::trace;
use std::fmt;

/// What a recovered span appears to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Header, body and trailer
    Program,
    /// Body and trailer, no header
    ProgramHeadless,
    /// Header and maybe body, no trailer
    ProgramTailless,
    /// Body only
    ProgramFragment,
    /// Whole logical records, possibly ending in a trailer
    Data,
    /// Ends inside a multi-sector logical record
    DataFragment,
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SpanKind::Program => "program",
            SpanKind::ProgramHeadless => "program_headless",
            SpanKind::ProgramTailless => "program_tailless",
            SpanKind::ProgramFragment => "program_fragment",
            SpanKind::Data => "data",
            SpanKind::DataFragment => "data_fragment",
        };
        write!(f, "{}", text)
    }
}

/// A run of sectors that looks like one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpan {
    /// First sector, absolute
    pub first_sector: usize,
    /// Last sector, absolute and inclusive
    pub last_sector: usize,
    /// What the span appears to be
    pub kind: SpanKind,
    /// Name from the program header, or a made up one such as `PF_00123`
    pub name: String,
}

/// What a sector could be, judged on its own
#[derive(Debug, Clone, Copy)]
struct SectorClass {
    program_header: bool,
    program_middle: bool,
    program_end: bool,
    data_record: bool,
    data_trailer: bool,
    last_physical: bool,
    sequence: u8,
}

impl SectorClass {
    fn of(sector: &Sector) -> Self {
        let control = ControlByte::of(sector);
        let program = !control.is_data();
        let data = control.is_data();
        Self {
            program_header: program && control.is_header() && is_possible_header(sector),
            program_middle: program
                && !control.is_header()
                && is_possible_body(sector, END_OF_BLOCK),
            program_end: program && !control.is_header() && is_possible_body(sector, END_OF_DATA),
            data_record: data
                && (control.is_intermediate() || control.is_last())
                && is_possible_data_record(sector),
            data_trailer: data && control.is_trailer(),
            last_physical: control.is_last(),
            sequence: sector[1],
        }
    }

    /// First physical sector of a logical record
    fn data_start(&self) -> bool {
        self.data_record && self.sequence == 1
    }

    /// Next physical sector after sequence number `prev`
    fn data_follows(&self, prev: u8) -> bool {
        self.data_record && u16::from(self.sequence) == u16::from(prev) + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Unknown,
    ProgramHeader,
    ProgramHeaderBody,
    ProgramBody,
    DataWhole,
    DataPart,
}

struct Scanner {
    spans: Vec<FileSpan>,
    state: ScanState,
    first: usize,
    name: String,
    sequence: u8,
}

impl Scanner {
    fn new() -> Self {
        Self {
            spans: Vec::new(),
            state: ScanState::Unknown,
            first: 0,
            name: String::new(),
            sequence: 0,
        }
    }

    fn goto(&mut self, sec: usize, state: ScanState) {
        trace!("sector {}: {:?} -> {:?}", sec, self.state, state);
        self.state = state;
    }

    fn close(&mut self, last: usize, kind: SpanKind) {
        let name = match kind {
            SpanKind::Data => format!("DAT{:05}", self.first),
            SpanKind::DataFragment => format!("DF_{:05}", self.first),
            _ => std::mem::take(&mut self.name),
        };
        trace!("sectors {}..={}: {} {}", self.first, last, kind, name);
        self.spans.push(FileSpan {
            first_sector: self.first,
            last_sector: last,
            kind,
            name,
        });
        self.state = ScanState::Unknown;
    }

    /// Try to extend the open span with `class`; false once it is closed
    fn extend(&mut self, sec: usize, class: &SectorClass) -> bool {
        match self.state {
            ScanState::Unknown => false,
            ScanState::ProgramHeader | ScanState::ProgramHeaderBody => {
                if class.program_middle {
                    self.goto(sec, ScanState::ProgramHeaderBody);
                    true
                } else if class.program_end {
                    self.close(sec, SpanKind::Program);
                    true
                } else {
                    self.close(sec - 1, SpanKind::ProgramTailless);
                    false
                }
            }
            ScanState::ProgramBody => {
                if class.program_middle {
                    true
                } else if class.program_end {
                    self.close(sec, SpanKind::ProgramHeadless);
                    true
                } else {
                    self.close(sec - 1, SpanKind::ProgramFragment);
                    false
                }
            }
            ScanState::DataPart => {
                if class.data_follows(self.sequence) {
                    if class.last_physical {
                        self.goto(sec, ScanState::DataWhole);
                    } else {
                        self.sequence += 1;
                    }
                    true
                } else {
                    self.close(sec - 1, SpanKind::DataFragment);
                    false
                }
            }
            ScanState::DataWhole => {
                if class.data_start() {
                    if !class.last_physical {
                        self.sequence = 1;
                        self.goto(sec, ScanState::DataPart);
                    }
                    true
                } else if class.data_trailer {
                    self.close(sec, SpanKind::Data);
                    true
                } else {
                    self.close(sec - 1, SpanKind::Data);
                    false
                }
            }
        }
    }

    /// Open a new span at `sec` if the sector can start one
    fn open(&mut self, sec: usize, class: &SectorClass, sector: &Sector) {
        self.first = sec;
        if class.program_header {
            self.name = header_name(sector).trimmed();
            self.goto(sec, ScanState::ProgramHeader);
        } else if class.program_middle {
            self.name = format!("PF_{:05}", sec);
            self.goto(sec, ScanState::ProgramBody);
        } else if class.program_end {
            self.name = format!("PF_{:05}", sec);
            self.close(sec, SpanKind::ProgramHeadless);
        } else if class.data_start() {
            if class.last_physical {
                self.goto(sec, ScanState::DataWhole);
            } else {
                self.sequence = 1;
                self.goto(sec, ScanState::DataPart);
            }
        } else {
            trace!("sector {}: not part of any file", sec);
        }
    }

    /// Close whatever is still open after the last sector
    fn finish(mut self, last: usize) -> Vec<FileSpan> {
        match self.state {
            ScanState::Unknown => {}
            ScanState::ProgramHeader | ScanState::ProgramHeaderBody => {
                self.close(last, SpanKind::ProgramTailless)
            }
            ScanState::ProgramBody => self.close(last, SpanKind::ProgramFragment),
            ScanState::DataWhole => self.close(last, SpanKind::Data),
            ScanState::DataPart => self.close(last, SpanKind::DataFragment),
        }
        self.spans
    }
}

/// Group raw sectors into probable files
///
/// `first_sector` is the absolute number of `sectors[0]`. Scrambled
/// program sectors are unscrambled before they are looked at.
pub fn scan(sectors: &[Sector], first_sector: usize) -> Vec<FileSpan> {
    let mut scanner = Scanner::new();
    for (offset, raw) in sectors.iter().enumerate() {
        let sec = first_sector + offset;
        let sector = if is_scrambled(raw) { unscramble(raw) } else { *raw };
        let class = SectorClass::of(&sector);
        if !scanner.extend(sec, &class) {
            scanner.open(sec, &class, &sector);
        }
    }
    let last = (first_sector + sectors.len()).saturating_sub(1);
    scanner.finish(last)
}
