//! Candidate alignment construction
//!
//! - `cigar` - CIGAR runs
//! - `read` - read bases, qualities and masking
//! - `fragment` - candidate alignment metadata and candidate scoring
//! - `fragment_builder` - clipping and CIGAR-driven fragment scoring

pub mod cigar;
pub mod fragment;
pub mod fragment_builder;
pub mod read;

pub use cigar::{Cigar, CigarOp, ParseCigarError};
pub use fragment::{FragmentMetadata, score_candidates};
pub use fragment_builder::{AlignmentConfig, FragmentBuilder};
pub use read::{Read, ReadMetadata};

use thiserror::Error;

use crate::core::quality::QualityError;

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("contig id {contig_id} is out of range ({contig_count} contigs)")]
    UnknownContig { contig_id: u32, contig_count: usize },

    #[error("CIGAR offset {offset} is past the end of a {len}-operation buffer")]
    CigarOffset { offset: usize, len: usize },

    #[error("CIGAR consumes {consumed} read bases, read has {read_length}")]
    ReadLengthMismatch { consumed: u64, read_length: usize },

    #[error("alignment at {position} runs past the end of contig {contig_id} ({contig_length} bases)")]
    PastContigEnd {
        contig_id: u32,
        position: i64,
        contig_length: usize,
    },

    #[error("alignment position {0} is negative")]
    NegativePosition(i64),

    #[error("read metadata describes {metadata_length} bases, read has {read_length}")]
    ReadMetadataMismatch {
        metadata_length: u32,
        read_length: usize,
    },

    #[error("invalid read: {0}")]
    InvalidRead(String),

    #[error(transparent)]
    Quality(#[from] QualityError),
}

impl FragmentError {
    pub fn is_precondition(&self) -> bool {
        match self {
            FragmentError::Quality(e) => e.is_precondition(),
            _ => true,
        }
    }
}
