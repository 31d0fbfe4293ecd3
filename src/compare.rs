/// Image and catalog comparison

use crate::catalog::{FileHandle, FileName, FileType, SaveMode};
use crate::error::Result;
use crate::format::{FormatHandler, ListOptions, ProgramHandler};
use crate::image::DiskImage;
use log::debug;

/// How two whole images relate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageComparison {
    /// Same metadata and same sectors
    Identical,
    /// Same sectors, metadata differs
    SameSectors,
    /// Sector contents or geometry differ
    Different,
}

/// Files of two catalogs sorted into buckets, each sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogComparison {
    /// Only in the left catalog
    pub only_left: Vec<FileName>,
    /// Only in the right catalog
    pub only_right: Vec<FileName>,
    /// In both, with equivalent contents
    pub matching: Vec<FileName>,
    /// In both, with different contents
    pub mismatching: Vec<FileName>,
}

impl CatalogComparison {
    /// True if the two sides have no names in common
    pub fn no_common_files(&self) -> bool {
        self.matching.is_empty() && self.mismatching.is_empty()
    }
}

fn same_metadata(a: &DiskImage, b: &DiskImage) -> bool {
    a.write_format() == b.write_format()
        && a.read_format() == b.read_format()
        && a.write_protect() == b.write_protect()
        && a.num_platters() == b.num_platters()
        && a.num_sectors() == b.num_sectors()
        && a.media_type() == b.media_type()
        && a.label() == b.label()
}

fn same_sectors(a: &DiskImage, b: &DiskImage) -> bool {
    a.num_platters() == b.num_platters()
        && a.num_sectors() == b.num_sectors()
        && a
            .platters()
            .iter()
            .zip(b.platters())
            .all(|(pa, pb)| pa.sectors() == pb.sectors())
}

/// Compare two images sector by sector, then by header metadata
pub fn compare_images(a: &DiskImage, b: &DiskImage) -> ImageComparison {
    if !same_sectors(a, b) {
        ImageComparison::Different
    } else if same_metadata(a, b) {
        ImageComparison::Identical
    } else {
        ImageComparison::SameSectors
    }
}

/// Listing of a program saved normally or with `SAVE P`
fn comparable_listing(file: &FileHandle<'_>) -> Option<Vec<String>> {
    if file.file_type() != FileType::Program {
        return None;
    }
    match file.save_mode() {
        Some(SaveMode::Normal) | Some(SaveMode::Protected) => {}
        _ => return None,
    }
    let sectors = file.sectors().ok()?;
    Some(ProgramHandler.list(&sectors, &ListOptions::default()))
}

/// Are two same-named files equivalent?
///
/// Sectors are compared first. Programs saved in the same normal or
/// protected mode are then compared by listing, since bytes after the
/// end of block marker are junk.
fn files_match(left: &FileHandle<'_>, right: &FileHandle<'_>) -> bool {
    if left.sectors().ok() == right.sectors().ok() {
        return true;
    }
    if left.save_mode() != right.save_mode() {
        return false;
    }
    match (comparable_listing(left), comparable_listing(right)) {
        (Some(l), Some(r)) => {
            if let Some(n) = l.iter().zip(&r).position(|(a, b)| a != b) {
                debug!("{} has first mismatch at line {}", left.name(), n + 1);
            } else if l.len() != r.len() {
                debug!(
                    "{} mismatch: left has {} lines, right has {} lines",
                    left.name(),
                    l.len(),
                    r.len()
                );
            }
            l == r
        }
        _ => false,
    }
}

/// Compare the files selected by `patterns` on two platters
///
/// An empty pattern list selects every file. The platters may belong to
/// the same image.
pub fn compare_catalogs<S: AsRef<str>>(
    left: &DiskImage,
    left_platter: usize,
    right: &DiskImage,
    right_platter: usize,
    patterns: &[S],
) -> Result<CatalogComparison> {
    let left_cat = left.catalog(left_platter)?;
    let right_cat = right.catalog(right_platter)?;

    let (left_names, right_names) = if patterns.is_empty() {
        (left_cat.expand_wildcards(&["*"]), right_cat.expand_wildcards(&["*"]))
    } else {
        (left_cat.expand_wildcards(patterns), right_cat.expand_wildcards(patterns))
    };

    let mut result = CatalogComparison::default();
    for name in &left_names {
        if !right_names.contains(name) {
            result.only_left.push(*name);
            continue;
        }
        let name_str = name.trimmed();
        let same = match (left_cat.file(&name_str), right_cat.file(&name_str)) {
            (Ok(l), Ok(r)) => files_match(&l, &r),
            // scratched names are not reachable by lookup on either side
            (Err(_), Err(_)) => true,
            _ => false,
        };
        if same {
            result.matching.push(*name);
        } else {
            result.mismatching.push(*name);
        }
    }
    result.only_right = right_names
        .iter()
        .filter(|n| !left_names.contains(n))
        .copied()
        .collect();

    result.only_left.sort();
    result.only_right.sort();
    result.matching.sort();
    result.mismatching.sort();
    Ok(result)
}
