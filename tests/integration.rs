/// Integration tests for wvd

use wvd::catalog::hash::{new_hash, old_hash};
use wvd::format::pretty::pretty_print;
use wvd::*;

const SECTOR: usize = 256;

/// Raw image bytes: header plus `platters * sectors` zero sectors
fn raw_image(num_sectors: u16, num_platters: u8) -> Vec<u8> {
    let mut bytes = vec![0u8; SECTOR + num_platters as usize * num_sectors as usize * SECTOR];
    bytes[..5].copy_from_slice(b"WANG\0");
    bytes[8..10].copy_from_slice(&num_sectors.to_le_bytes());
    bytes[10] = 1;
    bytes[11] = num_platters - 1;
    bytes
}

/// Image with an empty catalog on platter 0
fn catalog_image(num_sectors: u16, index_type: IndexType, index_sectors: u8) -> DiskImage {
    let mut bytes = raw_image(num_sectors, 1);
    bytes[SECTOR] = index_type.code();
    bytes[SECTOR + 1] = index_sectors;
    bytes[SECTOR + 2..SECTOR + 4].copy_from_slice(&(index_sectors as u16 + 1).to_be_bytes());
    bytes[SECTOR + 4..SECTOR + 6].copy_from_slice(&num_sectors.to_be_bytes());
    DiskImage::from_bytes(&bytes).expect("Failed to load image")
}

fn sector(bytes: &[u8]) -> Sector {
    let mut s = [0u8; SECTOR];
    s[..bytes.len()].copy_from_slice(bytes);
    s
}

/// Write a `10 PRINT 1` style program of one line and catalog it
fn add_program(image: &mut DiskImage, name: &str, start: usize, line: &[u8]) {
    let filename = FileName::new(name).expect("Bad name");
    let mut header = vec![0x40];
    header.extend_from_slice(filename.as_bytes());
    header.push(0xFD);
    let mut trailer = vec![0x20];
    trailer.extend_from_slice(line);
    trailer.extend_from_slice(&[0x0D, 0x00, 0x00, 0xFE]);

    image.set_sector(0, start, &sector(&header)).unwrap();
    image.set_sector(0, start + 1, &sector(&trailer)).unwrap();
    image.set_sector(0, start + 2, &sector(&[0x20, 0x00, 0x03])).unwrap();

    let index_type = image.catalog(0).unwrap().index_type();
    image
        .catalog_mut(0)
        .unwrap()
        .add_entry(&CatalogEntry::new(
            filename,
            FileType::Program,
            start as u32,
            start as u32 + 2,
            index_type,
        ))
        .expect("Failed to add entry");
}

#[test]
fn test_load_minimal_image() {
    let bytes = raw_image(40, 1);
    let image = DiskImage::from_bytes(&bytes).expect("Failed to load image");
    assert_eq!(image.num_sectors(), 40);
    assert_eq!(image.num_platters(), 1);
    assert_eq!(image.media_type(), MediaType::Floppy8);
    assert!(!image.is_dirty());
    assert_eq!(image.to_bytes(), bytes);
}

#[test]
fn test_load_errors() {
    let mut bytes = raw_image(40, 1);
    bytes.truncate(SECTOR + 39 * SECTOR);
    assert!(matches!(
        DiskImage::from_bytes(&bytes),
        Err(WvdError::Truncated { .. })
    ));

    let mut bytes = raw_image(40, 1);
    bytes[0] = b'X';
    assert!(matches!(
        DiskImage::from_bytes(&bytes),
        Err(WvdError::InvalidFormat(_))
    ));

    let image = DiskImage::from_bytes(&raw_image(40, 2)).unwrap();
    assert!(matches!(
        image.get_sector(0, 40),
        Err(WvdError::OutOfRange { .. })
    ));
    assert!(matches!(
        image.get_sector(2, 0),
        Err(WvdError::InvalidPlatter { .. })
    ));
}

#[test]
fn test_save_and_reopen() {
    let mut image = catalog_image(32, IndexType::New, 1);
    add_program(&mut image, "KEEP", 4, &[0xFF, 0x00, 0x10, 0xA0, b'1']);
    image.set_label("saved from a test");
    assert!(image.is_dirty());

    let path = std::env::temp_dir().join(format!("wvd-integration-{}.wvd", std::process::id()));
    image.save(&path).expect("Failed to save image");
    assert!(!image.is_dirty());

    let reopened = DiskImage::open(&path).expect("Failed to open image");
    std::fs::remove_file(&path).ok();

    assert_eq!(reopened.to_bytes(), image.to_bytes());
    assert_eq!(reopened.label(), "saved from a test");
    assert!(reopened.catalog(0).unwrap().entry_by_name("KEEP").unwrap().is_some());
}

#[test]
fn test_hash_reference_vectors() {
    let name = FileName::new("TESTPROG").unwrap();
    assert_eq!(old_hash(name.as_bytes()), 84);
    assert_eq!(new_hash(name.as_bytes()), 165);
}

#[test]
fn test_find_entry_in_old_hash_bucket() {
    let mut bytes = raw_image(64, 1);
    // index type 0, two index sectors
    bytes[SECTOR] = 0x00;
    bytes[SECTOR + 1] = 2;
    bytes[SECTOR + 2..SECTOR + 4].copy_from_slice(&13u16.to_be_bytes());
    bytes[SECTOR + 4..SECTOR + 6].copy_from_slice(&64u16.to_be_bytes());

    // old hash 84 lands in sector 84 % 2 == 0, first file slot
    let slot = SECTOR + 16;
    bytes[slot] = 0x10;
    bytes[slot + 1] = 0x80;
    bytes[slot + 2..slot + 4].copy_from_slice(&10u16.to_be_bytes());
    bytes[slot + 4..slot + 6].copy_from_slice(&12u16.to_be_bytes());
    bytes[slot + 8..slot + 16].copy_from_slice(b"TESTPROG");

    let image = DiskImage::from_bytes(&bytes).unwrap();
    let catalog = image.catalog(0).unwrap();
    let entry = catalog
        .entry_by_name("TESTPROG")
        .unwrap()
        .expect("TESTPROG not found");
    assert_eq!(entry.extent(), (10, 12));
    assert_eq!(entry.file_type(), FileType::Program);
    assert_eq!(entry.status().as_deref(), Some(" P"));
}

#[test]
fn test_program_body_terminator_too_soon() {
    let body = sector(&[0x00, 0xFF, 0x00, 0x10, 0x20, 0xFD]);
    let report = ProgramHandler.check(&[body], &CheckOptions::new(17));
    assert!(report.failed);
    assert!(report.errors.iter().any(|e| e.contains("too soon")));
    assert_eq!(report.last_good_sector, Some(16));
}

#[test]
fn test_unscramble_restores_program_control_byte() {
    let mut raw = [0x5Au8; SECTOR];
    raw[0] = 0x10;
    raw[1] = 0x40;
    assert!(is_scrambled(&raw));
    let clear = unscramble(&raw);
    assert!(matches!(clear[0] >> 4, 0x4 | 0x5));
    assert_ne!(unscramble(&clear), raw);
}

#[test]
fn test_catalog_invariants() {
    let mut image = catalog_image(256, IndexType::New, 3);
    for i in 0..30 {
        add_program(&mut image, &format!("PROG{}", i), 3 + 4 * i, &[0xFF, 0x00, 0x10, 0x96]);
    }
    let catalog = image.catalog(0).unwrap();
    let entries = catalog.live_entries();
    assert_eq!(entries.len(), 30);

    for e in &entries {
        let (start, end) = e.extent();
        assert!(catalog.num_index_sectors() <= start as usize);
        assert!(start < end);
        assert!((end as usize) < image.num_sectors());
    }
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            let (a0, a1) = a.extent();
            let (b0, b1) = b.extent();
            assert!(a1 < b0 || b1 < a0, "{} overlaps {}", a.name(), b.name());
        }
    }

    let report = catalog.check_index();
    assert!(report.is_clean(), "{:?}", report.messages());
    for name in catalog.all_filenames() {
        let report = catalog
            .check_file(&name.trimmed(), &CheckOptions::default())
            .expect("Failed to check file");
        assert!(report.is_clean(), "{}: {:?}", name, report.messages());
    }
}

#[test]
fn test_convert_index() {
    let mut image = catalog_image(128, IndexType::Old, 3);
    let names = ["ALPHA", "BETA", "GAMMA", "DELTA", "MENU"];
    for (i, name) in names.iter().enumerate() {
        add_program(&mut image, name, 10 + 3 * i, &[0xFF, 0x00, 0x10, 0x96]);
    }

    image.catalog_mut(0).unwrap().convert_index(true).unwrap();
    {
        let catalog = image.catalog(0).unwrap();
        assert_eq!(catalog.index_type(), IndexType::New);
        for name in names {
            let entry = catalog.entry_by_name(name).unwrap().expect("lost in conversion");
            let filename = FileName::new(name).unwrap();
            let bucket = new_hash(filename.as_bytes()) as usize % 3;
            let sector = (entry.slot() + 1) / 16;
            assert_eq!(sector, bucket, "{} filed in the wrong bucket", name);
        }
        assert!(catalog.check_index().is_clean());
    }

    image.catalog_mut(0).unwrap().convert_index(false).unwrap();
    let catalog = image.catalog(0).unwrap();
    assert_eq!(catalog.index_type(), IndexType::Old);
    assert_eq!(catalog.all_filenames().len(), names.len());
    for name in names {
        assert!(catalog.entry_by_name(name).unwrap().is_some());
    }
}

#[test]
fn test_convert_tri_byte_is_unsupported() {
    let mut image = catalog_image(64, IndexType::TriByte, 1);
    assert!(matches!(
        image.catalog_mut(0).unwrap().convert_index(false),
        Err(WvdError::Unsupported(_))
    ));
}

#[test]
fn test_wildcards_and_protection() {
    let mut image = catalog_image(64, IndexType::New, 1);
    add_program(&mut image, "MENU", 4, &[0xFF, 0x00, 0x10, 0x96]);
    add_program(&mut image, "MAIN", 8, &[0xFF, 0x00, 0x10, 0x96]);
    add_program(&mut image, "SUB1", 12, &[0xFF, 0x00, 0x10, 0x96]);

    let catalog = image.catalog(0).unwrap();
    let found = catalog.expand_wildcards(&["M*", "SUB?", "MENU"]);
    assert_eq!(found.len(), 3);
    assert!(catalog.expand_wildcards(&["X*"]).is_empty());

    image.catalog_mut(0).unwrap().set_protection("MENU", true).unwrap();
    let catalog = image.catalog(0).unwrap();
    let file = catalog.file("MENU").unwrap();
    assert_eq!(file.save_mode(), Some(SaveMode::Protected));
    assert!(catalog.check_file("MENU", &CheckOptions::default()).unwrap().is_clean());
    let listing = ProgramHandler.list(&file.sectors().unwrap(), &ListOptions::default());
    assert!(listing[0].ends_with(", protected file"));
}

#[test]
fn test_data_record_terminator_boundary() {
    let long = |s: &mut Vec<u8>| {
        s.push(0xFB);
        s.extend(std::iter::repeat(b'x').take(0xFB - 0x80));
    };

    let mut fits = vec![0x81, 0x01];
    long(&mut fits);
    long(&mut fits);
    fits.extend_from_slice(&[0x83, b'a', b'b', b'c', 0xFD]);
    let fits = sector(&fits);
    assert_eq!(fits[254], 0xFD);
    let report = DataHandler.check(&[fits], &CheckOptions::default());
    assert!(!report.failed, "{:?}", report.messages());

    let mut spills = vec![0x81, 0x01];
    long(&mut spills);
    long(&mut spills);
    spills.extend_from_slice(&[0x84, b'a', b'b', b'c']);
    let report = DataHandler.check(&[sector(&spills)], &CheckOptions::default());
    assert!(report.failed);
    assert!(report.errors[0].contains("string length that doesn't fit in sector"));
}

#[test]
fn test_pretty_print_keeps_statements() {
    // 10 PRINT 1:GOTO 10
    let mut record = vec![0x20, 0xFF, 0x00, 0x10, b' ', 0xA0, b'1', b':', 0x9C];
    record.extend_from_slice(b"10");
    record.extend_from_slice(&[0x0D, 0x00, 0x00, 0xFE]);
    let sectors = [sector(&record)];

    let plain = ProgramHandler.list(&sectors, &ListOptions::default());
    assert_eq!(plain, vec!["10 PRINT 1:GOTO 10"]);

    let pretty = ProgramHandler.list(&sectors, &ListOptions::default().with_pretty(true));
    assert_eq!(pretty, vec!["0010 PRINT 1", "   : GOTO 10"]);

    let collapse = |lines: &[String]| -> Vec<String> {
        lines
            .join(" ")
            .split(|c: char| c == ':' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .map(|w| w.trim_start_matches('0').to_string())
            .collect()
    };
    assert_eq!(collapse(&plain), collapse(&pretty));
    assert_eq!(pretty_print(&plain[0], 78, Dialect::Basic2), pretty);
}

#[test]
fn test_scan_recovers_files() {
    let mut image = catalog_image(64, IndexType::New, 1);
    add_program(&mut image, "FIRST", 4, &[0xFF, 0x00, 0x10, 0x96]);
    image.set_sector(0, 20, &sector(&[0x81, 0x01, 0x82, b'O', b'K', 0xFD])).unwrap();
    image.set_sector(0, 21, &sector(&[0xA0])).unwrap();

    let sectors = image.get_sectors(0, 0, image.num_sectors()).unwrap();
    let spans = scan(&sectors, 0);
    assert!(spans.contains(&FileSpan {
        first_sector: 4,
        last_sector: 5,
        kind: SpanKind::Program,
        name: "FIRST".to_string(),
    }));
    assert!(spans.contains(&FileSpan {
        first_sector: 20,
        last_sector: 21,
        kind: SpanKind::Data,
        name: "DAT00020".to_string(),
    }));
}

#[test]
fn test_detect_edit_file() {
    let mut text = [0u8; SECTOR];
    text[0] = 0x81;
    text[1] = 0x01;
    for n in 0..4 {
        let at = 2 + 63 * n;
        text[at] = 0xBE;
        text[at + 1..at + 63].fill(b' ');
    }
    text[3..3 + 13].copy_from_slice(b"*FILE = NOTES");
    text[66..66 + 6].copy_from_slice(b"HELLO\x03");
    text[254] = 0xFD;
    let sectors = [text, sector(&[0xA0])];

    assert_eq!(FileFormat::detect(FileType::Data, &sectors), Some(FileFormat::Edit));
    let listing = FileFormat::Edit
        .handler()
        .list(&sectors, &ListOptions::default());
    assert_eq!(listing, vec!["*FILE = NOTES", "HELLO"]);

    let record = [sector(&[0x81, 0x01, 0x82, b'O', b'K', 0xFD])];
    assert_eq!(FileFormat::detect(FileType::Data, &record), Some(FileFormat::Data));
}

#[test]
fn test_multi_platter_catalogs() {
    let mut bytes = raw_image(32, 2);
    bytes[SECTOR] = 0x01;
    bytes[SECTOR + 1] = 1;
    bytes[SECTOR + 2..SECTOR + 4].copy_from_slice(&2u16.to_be_bytes());
    bytes[SECTOR + 4..SECTOR + 6].copy_from_slice(&32u16.to_be_bytes());
    let image = DiskImage::from_bytes(&bytes).unwrap();

    assert!(image.catalog(0).unwrap().check_index().is_clean());
    let report = image.catalog(1).unwrap().check_index();
    assert_eq!(report.warnings, vec!["Platter 2 has no catalog"]);
    assert!(!report.failed);
}

#[test]
fn test_compare() {
    let mut a = catalog_image(64, IndexType::New, 1);
    add_program(&mut a, "COMMON", 4, &[0xFF, 0x00, 0x10, 0x96]);
    let mut b = DiskImage::from_bytes(&a.to_bytes()).unwrap();
    assert_eq!(compare_images(&a, &b), ImageComparison::Identical);

    add_program(&mut b, "EXTRA", 10, &[0xFF, 0x00, 0x10, 0x96]);
    add_program(&mut a, "OTHER", 20, &[0xFF, 0x00, 0x10, 0x96]);
    assert_eq!(compare_images(&a, &b), ImageComparison::Different);

    let cmp = compare_catalogs(&a, 0, &b, 0, &["*"]).unwrap();
    assert_eq!(cmp.matching, vec![FileName::new("COMMON").unwrap()]);
    assert_eq!(cmp.only_left, vec![FileName::new("OTHER").unwrap()]);
    assert_eq!(cmp.only_right, vec![FileName::new("EXTRA").unwrap()]);
    assert!(cmp.mismatching.is_empty());
}
