//! Intermediary bins produced by match finding

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use crate::index::ReferencePosition;

/// Output file per barcode index
pub type BarcodeOutputMap = BTreeMap<usize, PathBuf>;

/// One reference-ordered bin of aligned fragments on disk
#[derive(Debug, Clone, PartialEq)]
pub struct BinMetadata {
    pub index: usize,
    pub path: PathBuf,
    /// First reference position covered; `NoMatch` for the unaligned bin
    pub bin_start: ReferencePosition,
    /// Reference bases spanned
    pub length: u64,
    pub data_size: u64,
    pub element_count: u64,
}

impl BinMetadata {
    pub fn new(index: usize, path: PathBuf, bin_start: ReferencePosition, length: u64) -> Self {
        Self {
            index,
            path,
            bin_start,
            length,
            data_size: 0,
            element_count: 0,
        }
    }

    pub fn is_unaligned(&self) -> bool {
        self.bin_start.is_no_match()
    }

    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }
}

/// Remove bin files, returning how many were deleted.
/// Files already gone are skipped.
pub fn remove_bin_files(bins: &[BinMetadata]) -> io::Result<usize> {
    let mut removed = 0;
    for bin in bins {
        match std::fs::remove_file(&bin.path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("Bin file already removed: {}", bin.path.display());
            }
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}
