//! Reference index management
//!
//! The reference index is the sorted-reference catalog produced by reference
//! preprocessing: the contig list, the per-seed-length k-mer shard lists and
//! the optional k-uniqueness / k-repeatness annotation tables.
//!
//! - `contig` - contig metadata and genomic offset translation
//! - `reference_index` - the catalog aggregate with its density invariant
//! - `filters` - contig acceptance predicates and decoy classification
//! - `catalog_io` - text catalog persistence

pub mod catalog_io;
pub mod contig;
pub mod filters;
pub mod reference_index;

pub use contig::{
    Contig, ContigSequence, ReferencePosition, genome_length, genomic_offset_to_position,
};
pub use filters::{
    AcceptAllContigs, ContigFilter, DecoyClassifier, DecoyNamePattern, RejectDecoyByName,
    RejectDecoyContigs,
};
pub use reference_index::{
    AnnotationFile, AnnotationType, CURRENT_FORMAT_VERSION, MAX_SEED_LENGTH, MaskFile,
    OLDEST_SUPPORTED_FORMAT_VERSION, ReferenceIndex, longest_genome_length,
};

use thiserror::Error;

/// Errors raised while building, merging, querying or loading a reference index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("contig index {index} breaks catalog density: next expected index is {expected}")]
    ContigDensity { index: u32, expected: usize },

    #[error(
        "contig {index} ({name}) at genomic position {genomic_position} overlaps the preceding contig ending at {previous_end}"
    )]
    GenomicOrder {
        index: u32,
        name: String,
        genomic_position: u64,
        previous_end: u64,
    },

    #[error(
        "cannot merge references: incoming contig indices start at {first}, expected {expected}"
    )]
    MergeDensity { first: u32, expected: usize },

    #[error("shard mask {mask} does not fit in mask width {mask_width}")]
    InvalidMask { mask_width: u32, mask: u32 },

    #[error("duplicate shard (mask width {mask_width}, mask {mask}) for seed length {seed_length}")]
    DuplicateShard {
        seed_length: u32,
        mask_width: u32,
        mask: u32,
    },

    #[error("seed length {0} is not supported by this reference")]
    UnsupportedSeedLength(u32),

    #[error("{0} annotation requested for reference that does not have one")]
    MissingAnnotation(AnnotationType),

    #[error("conflicting {0} annotations in merged references")]
    AnnotationConflict(AnnotationType),

    #[error(
        "reference format version {found} is outside the supported range [{oldest}, {current}]"
    )]
    UnsupportedVersion { found: u32, oldest: u32, current: u32 },

    #[error("invalid decoy contig pattern: {0}")]
    InvalidDecoyPattern(#[from] regex::Error),

    #[error("catalog line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// True for errors caused by a caller violating an operation precondition
    /// (as opposed to I/O failures or corrupt catalogs).
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            IndexError::ContigDensity { .. }
                | IndexError::GenomicOrder { .. }
                | IndexError::MergeDensity { .. }
                | IndexError::InvalidMask { .. }
                | IndexError::DuplicateShard { .. }
                | IndexError::UnsupportedSeedLength(_)
                | IndexError::MissingAnnotation(_)
                | IndexError::AnnotationConflict(_)
        )
    }
}
