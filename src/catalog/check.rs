use crate::catalog::entry::{FileName, FileType, IndexState};
use crate::catalog::{slot_location, Catalog, SaveMode};
use crate::error::Result;
use crate::format::{
    CheckOptions, CheckReport, Diagnostics, FileFormat, FormatHandler, ProgramHandler,
};
use log::debug;

/// First byte of a data file holding a raw binary image
const RAW_BINARY_MARKER: u8 = 0x6A;

/// Extent of a file already seen by the index check
struct SeenExtent {
    name: String,
    start: u32,
    end: u32,
}

impl SeenExtent {
    fn overlaps(&self, start: u32, end: u32) -> bool {
        start <= self.end && self.start <= end
    }
}

fn suspect_name(name: &FileName) -> bool {
    name.as_bytes().iter().any(|&b| !(0x20..0x80).contains(&b))
}

impl<'a> Catalog<'a> {
    fn describe_platter(&self) -> String {
        if self.image().num_platters() > 1 {
            format!("Platter {}", self.platter() + 1)
        } else {
            "The disk".to_string()
        }
    }

    /// Check the parameter block and every index slot
    ///
    /// Problems are errors, except for odd filename characters which are
    /// only warnings. A platter with no index sectors gets a single
    /// warning and does not fail.
    pub fn check_index(&self) -> CheckReport {
        let mut diag = Diagnostics::default();
        let desc = self.describe_platter();
        let index_sectors = self.num_index_sectors();
        let num_sectors = self.image().num_sectors();

        if index_sectors == 0 {
            diag.warning(0, format!("{} has no catalog", desc));
            return self.index_report(diag);
        }

        let block_problem = if index_sectors >= num_sectors {
            Some("reports an index that larger than the disk")
        } else if self.end_catalog_area() >= num_sectors as i64 {
            Some("reports a last catalog sector that is larger than the disk size")
        } else if self.end_catalog_area() <= index_sectors as i64 {
            Some("reports a last catalog sector that is inside the catalog index area")
        } else if self.current_end() > self.end_catalog_area() {
            Some("supposedly has more cataloged sectors in use than available")
        } else {
            None
        };
        if let Some(problem) = block_problem {
            diag.error(0, format!("{} {}", desc, problem));
            return self.index_report(diag);
        }

        let mut extents: Vec<SeenExtent> = Vec::new();
        let mut live_names: Vec<FileName> = Vec::new();
        let mut prev_sector = None;
        let mut prev_slot_empty = false;

        for n in self.catalog_indices() {
            let Some(entry) = self.entry(n) else {
                continue;
            };
            let (secnum, slot) = slot_location(n);
            if prev_sector != Some(secnum) {
                prev_sector = Some(secnum);
                prev_slot_empty = false;
            }
            let name = entry.name();
            let trimmed = name.trimmed();

            let state = entry.state();
            match state {
                IndexState::Unknown(code) => {
                    diag.error(
                        secnum,
                        format!(
                            "Sector {}, entry {} has unknown file state 0x{:02X}, filename '{}'",
                            secnum, slot, code, trimmed
                        ),
                    );
                    continue;
                }
                IndexState::Empty => {
                    prev_slot_empty = true;
                    continue;
                }
                _ => {}
            }

            if let FileType::Unknown(code) = entry.file_type() {
                diag.error(
                    secnum,
                    format!(
                        "Sector {}, entry {} has unknown file type 0x{:02X} (should be 0x00 or 0x80)",
                        secnum, slot, code
                    ),
                );
                continue;
            }

            if suspect_name(&name) {
                diag.warning(secnum, format!("suspect filename '{}'", trimmed));
            }

            if state.is_live() {
                if live_names.contains(&name) {
                    diag.error(
                        secnum,
                        format!(
                            "Sector {}, entry {} repeats the filename '{}'",
                            secnum, slot, trimmed
                        ),
                    );
                    continue;
                }
                live_names.push(name);
            }

            if prev_slot_empty {
                diag.error(
                    secnum,
                    format!(
                        "File '{}' has index at sector {}, entry {}, but it follows an empty index slot",
                        trimmed, secnum, slot
                    ),
                );
                continue;
            }

            if state == IndexState::Invalid {
                continue;
            }

            let (start, end) = entry.extent();
            if (start as usize) < index_sectors {
                diag.error(
                    secnum,
                    format!("{} starts at sector {}, which is inside the catalog index", trimmed, start),
                );
                continue;
            }
            if end < start {
                diag.error(secnum, format!("{} ends ({}) before it starts ({})", trimmed, end, start));
                continue;
            }
            if end as usize >= num_sectors {
                diag.error(
                    secnum,
                    format!("{} is off the end of the disk ({} > {})", trimmed, end, num_sectors),
                );
                continue;
            }

            for old in extents.iter().filter(|old| old.overlaps(start, end)) {
                diag.error(
                    secnum,
                    format!(
                        "file extent of {} ({},{}) overlaps that of {} ({},{})",
                        trimmed, start, end, old.name, old.start, old.end
                    ),
                );
            }
            extents.push(SeenExtent {
                name: trimmed,
                start,
                end,
            });
        }

        self.index_report(diag)
    }

    fn index_report(&self, diag: Diagnostics) -> CheckReport {
        let mut report = diag.into_report(0, usize::MAX);
        report.last_good_sector = None;
        debug!(
            "platter {}: index check found {} errors, {} warnings",
            self.platter(),
            report.errors.len(),
            report.warnings.len()
        );
        report
    }

    /// Check one file: control record, used count, then its contents
    ///
    /// `options.sector`, `options.used` and `options.catalog_name` are
    /// filled in from the catalog; only the warning limit is taken from
    /// the caller. Scrambled programs are accepted without looking at the
    /// body.
    pub fn check_file(&self, name: &str, options: &CheckOptions) -> Result<CheckReport> {
        let file = self.file(name)?;
        let trimmed = file.name().trimmed();
        let (start, end) = file.extent();
        let mut diag = Diagnostics::default();

        // only readable once the extent is plausible, so start < end here
        if let Ok(used) = file.used_sectors() {
            let allocated = end - start + 1;
            if used > allocated {
                diag.error(
                    end as usize,
                    format!(
                        "{}'s end block claims {} sectors used, but only {} allocated",
                        trimmed, used, allocated
                    ),
                );
                return Ok(diag.into_report(start as usize, options.warn_limit));
            }
        }

        if !file.control_record_is_plausible() {
            diag.error(
                start as usize,
                format!("{} doesn't have a plausible file control record", trimmed),
            );
            return Ok(diag.into_report(start as usize, options.warn_limit));
        }

        let used = file.used_sectors()?;
        let options = CheckOptions {
            sector: start as usize,
            used: Some(used),
            warn_limit: options.warn_limit,
            catalog_name: Some(file.name()),
        };
        let last = (start + used).saturating_sub(2) as usize;

        match file.file_type() {
            FileType::Program => {
                if file.save_mode() == Some(SaveMode::Scrambled) {
                    debug!("{}: scrambled program, body not checked", trimmed);
                    return Ok(Diagnostics::default().into_report(last, options.warn_limit));
                }
                Ok(ProgramHandler.check(&file.sectors()?, &options))
            }
            FileType::Data => {
                let sectors = file.sectors()?;
                if sectors.first().is_some_and(|s| s[0] == RAW_BINARY_MARKER) {
                    debug!("{}: raw binary data file, not checked", trimmed);
                    return Ok(Diagnostics::default().into_report(last, options.warn_limit));
                }
                let format = FileFormat::detect(FileType::Data, &sectors).unwrap_or(FileFormat::Data);
                Ok(format.handler().check(&sectors, &options))
            }
            FileType::Unknown(_) => {
                diag.error(start as usize, format!("{} has unknown file type", trimmed));
                Ok(diag.into_report(start as usize, options.warn_limit))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::tests::catalog_image;
    use crate::catalog::{CatalogEntry, FileName, FileType, IndexState, IndexType};
    use crate::error::WvdError;
    use crate::format::CheckOptions;
    use crate::image::sector::EMPTY_SECTOR;
    use crate::image::DiskImage;

    fn entry(name: &str, ftype: FileType, start: u32, end: u32) -> CatalogEntry {
        CatalogEntry::new(FileName::new(name).unwrap(), ftype, start, end, IndexType::New)
    }

    fn write(image: &mut DiskImage, n: usize, bytes: &[u8]) {
        let mut s = EMPTY_SECTOR;
        s[..bytes.len()].copy_from_slice(bytes);
        image.set_sector(0, n, &s).unwrap();
    }

    /// A one line program `10 STOP` allocated sectors 10..=14
    fn program_image() -> DiskImage {
        let mut image = catalog_image(64, IndexType::New, 1);
        write(&mut image, 10, b"\x40PROG    \xfd");
        write(&mut image, 11, b"\x20\xff\x00\x10\x95\x0d\x00\x00\xfe");
        write(&mut image, 14, b"\x20\x00\x03");
        image
            .catalog_mut(0)
            .unwrap()
            .add_entry(&entry("PROG", FileType::Program, 10, 14))
            .unwrap();
        image
    }

    #[test]
    fn test_clean_index() {
        let image = program_image();
        let report = image.catalog(0).unwrap().check_index();
        assert!(report.is_clean(), "{:?}", report);
        assert!(!report.failed);
        assert_eq!(report.last_good_sector, None);
    }

    #[test]
    fn test_no_catalog_is_not_a_failure() {
        let image = catalog_image(16, IndexType::Old, 0);
        let report = image.catalog(0).unwrap().check_index();
        assert!(!report.failed);
        assert_eq!(report.warnings, vec!["The disk has no catalog"]);
    }

    #[test]
    fn test_parameter_block_problems() {
        let mut image = catalog_image(16, IndexType::Old, 1);
        let mut block = *image.get_sector(0, 0).unwrap();
        block[1] = 16;
        image.set_sector(0, 0, &block).unwrap();
        let report = image.catalog(0).unwrap().check_index();
        assert!(report.failed);
        assert_eq!(report.errors, vec!["The disk reports an index that larger than the disk"]);

        let mut image = catalog_image(16, IndexType::Old, 1);
        let mut block = *image.get_sector(0, 0).unwrap();
        block[4..6].copy_from_slice(&2u16.to_be_bytes());
        image.set_sector(0, 0, &block).unwrap();
        let report = image.catalog(0).unwrap().check_index();
        assert_eq!(
            report.errors,
            vec!["The disk reports a last catalog sector that is inside the catalog index area"]
        );

        let mut image = catalog_image(16, IndexType::Old, 1);
        let mut block = *image.get_sector(0, 0).unwrap();
        block[2..4].copy_from_slice(&15u16.to_be_bytes());
        block[4..6].copy_from_slice(&10u16.to_be_bytes());
        image.set_sector(0, 0, &block).unwrap();
        let report = image.catalog(0).unwrap().check_index();
        assert_eq!(
            report.errors,
            vec!["The disk supposedly has more cataloged sectors in use than available"]
        );
    }

    #[test]
    fn test_bad_slots() {
        let mut image = catalog_image(64, IndexType::New, 1);
        {
            let mut cat = image.catalog_mut(0).unwrap();
            cat.set_entry(0, &entry("A", FileType::Program, 10, 20)).unwrap();
            cat.set_entry(1, &entry("B", FileType::Program, 15, 25)).unwrap();
            cat.set_entry(2, &entry("A", FileType::Data, 30, 31)).unwrap();
            cat.set_entry(3, &entry("C", FileType::Unknown(0x40), 40, 41)).unwrap();
            cat.set_entry(4, &entry("D", FileType::Data, 50, 48)).unwrap();
            cat.set_entry(5, &entry("E", FileType::Data, 0, 2)).unwrap();
            cat.set_entry(6, &entry("F", FileType::Data, 60, 70)).unwrap();
            let mut odd = entry("G", FileType::Data, 32, 33);
            odd.set_state(IndexState::Unknown(0x7E));
            cat.set_entry(7, &odd).unwrap();
            cat.set_entry(8, &entry("H\x01", FileType::Data, 34, 35)).unwrap();
            cat.set_entry(10, &entry("LATE", FileType::Data, 36, 37)).unwrap();
        }
        let report = image.catalog(0).unwrap().check_index();
        assert!(report.failed);
        assert_eq!(
            report.errors,
            vec![
                "file extent of B (15,25) overlaps that of A (10,20)",
                "Sector 0, entry 3 repeats the filename 'A'",
                "Sector 0, entry 4 has unknown file type 0x40 (should be 0x00 or 0x80)",
                "D ends (48) before it starts (50)",
                "E starts at sector 0, which is inside the catalog index",
                "F is off the end of the disk (70 > 64)",
                "Sector 0, entry 8 has unknown file state 0x7E, filename 'G'",
                "File 'LATE' has index at sector 0, entry 11, but it follows an empty index slot",
            ]
        );
        assert_eq!(report.warnings, vec!["suspect filename 'H\x01'"]);
    }

    #[test]
    fn test_enclosing_extent_overlaps() {
        let mut image = catalog_image(64, IndexType::New, 1);
        {
            let mut cat = image.catalog_mut(0).unwrap();
            cat.set_entry(0, &entry("INNER", FileType::Data, 10, 12)).unwrap();
            cat.set_entry(1, &entry("OUTER", FileType::Data, 5, 20)).unwrap();
            cat.set_entry(2, &entry("AFTER", FileType::Data, 21, 22)).unwrap();
        }
        let report = image.catalog(0).unwrap().check_index();
        assert!(report.failed);
        assert_eq!(
            report.errors,
            vec!["file extent of OUTER (5,20) overlaps that of INNER (10,12)"]
        );
    }

    #[test]
    fn test_check_file() {
        let image = program_image();
        let cat = image.catalog(0).unwrap();
        let report = cat.check_file("PROG", &CheckOptions::default()).unwrap();
        assert!(report.is_clean(), "{:?}", report);
        assert_eq!(report.last_good_sector, Some(11));
        assert!(matches!(
            cat.check_file("NOPE", &CheckOptions::default()),
            Err(WvdError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_check_file_bad_control_record() {
        let mut image = program_image();
        write(&mut image, 14, b"\xa0\x00\x03");
        let report = image
            .catalog(0)
            .unwrap()
            .check_file("PROG", &CheckOptions::default())
            .unwrap();
        assert!(report.failed);
        assert_eq!(
            report.errors,
            vec!["PROG doesn't have a plausible file control record"]
        );
    }

    #[test]
    fn test_check_file_claims_more_than_allocated() {
        let mut image = program_image();
        write(&mut image, 14, b"\x20\x00\x09");
        let report = image
            .catalog(0)
            .unwrap()
            .check_file("PROG", &CheckOptions::default())
            .unwrap();
        assert!(report.failed);
        assert_eq!(
            report.errors,
            vec!["PROG's end block claims 9 sectors used, but only 5 allocated"]
        );
    }

    #[test]
    fn test_check_file_bad_body() {
        let mut image = program_image();
        write(&mut image, 11, b"\x20\xff\x00\x10\xfe");
        let report = image
            .catalog(0)
            .unwrap()
            .check_file("PROG", &CheckOptions::default())
            .unwrap();
        assert!(report.failed);
        assert_eq!(report.last_good_sector, Some(10));
    }

    #[test]
    fn test_check_raw_binary_data() {
        let mut image = catalog_image(64, IndexType::New, 1);
        write(&mut image, 20, b"\x6a\x01\x02");
        write(&mut image, 21, b"\xa0\x00\x02");
        image
            .catalog_mut(0)
            .unwrap()
            .add_entry(&entry("BIN", FileType::Data, 20, 21))
            .unwrap();
        let report = image
            .catalog(0)
            .unwrap()
            .check_file("BIN", &CheckOptions::default())
            .unwrap();
        assert!(report.is_clean());
    }
}
