//! Contig metadata and genomic offset translation
//!
//! A contig is one contiguous reference sequence (chromosome, scaffold,
//! decoy). Contigs of a sorted reference are laid end to end in a single
//! genomic coordinate space; `genomic_position` is the offset of the first
//! base of the contig in that space.

use std::fmt;
use std::path::PathBuf;

/// Per-contig catalog entry
#[derive(Debug, Clone, Default)]
pub struct Contig {
    /// Dense, zero-based karyotype index
    pub index: u32,
    /// Sequence name (e.g. "chr1")
    pub name: String,
    /// Decoy contigs absorb spurious matches and are excluded from primary reporting
    pub decoy: bool,
    /// FASTA file holding the sequence
    pub file_path: PathBuf,
    /// Byte offset of the first base in `file_path`
    pub byte_offset: u64,
    /// Number of bytes the sequence occupies in `file_path` (line breaks included)
    pub byte_size: u64,
    /// Offset of the first base in the concatenated genome
    pub genomic_position: u64,
    /// Total number of bases, ambiguous ones included
    pub total_bases: u64,
    /// Number of A/C/G/T bases
    pub acgt_bases: u64,
    /// @SQ AS: genome assembly identifier
    pub bam_sq_as: String,
    /// @SQ UR: URI of the sequence
    pub bam_sq_ur: String,
    /// @SQ M5: MD5 checksum of the sequence
    pub bam_m5: String,
}

impl Contig {
    pub fn new(index: u32, name: impl Into<String>, genomic_position: u64, total_bases: u64) -> Self {
        Self {
            index,
            name: name.into(),
            genomic_position,
            total_bases,
            acgt_bases: total_bases,
            ..Self::default()
        }
    }

    /// One past the last genomic offset covered by this contig
    #[inline]
    pub fn genomic_end(&self) -> u64 {
        self.genomic_position + self.total_bases
    }
}

/// Two contigs are the same sequence when their metadata agrees. The checksum
/// identifies the sequence when present, otherwise the file it came from.
impl PartialEq for Contig {
    fn eq(&self, that: &Self) -> bool {
        let same_source = if self.bam_m5.is_empty() {
            self.file_path == that.file_path
        } else {
            self.bam_m5 == that.bam_m5
        };

        self.index == that.index
            && self.name == that.name
            && self.decoy == that.decoy
            && same_source
            && self.byte_offset == that.byte_offset
            && self.byte_size == that.byte_size
            && self.genomic_position == that.genomic_position
            && self.total_bases == that.total_bases
            && self.acgt_bases == that.acgt_bases
            && self.bam_sq_as == that.bam_sq_as
            && self.bam_sq_ur == that.bam_sq_ur
    }
}

impl fmt::Display for Contig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Contig({},{}pos,{}tb,{}off)",
            self.name, self.genomic_position, self.total_bases, self.byte_offset
        )
    }
}

/// Position on the reference: a contig and a 0-based offset within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferencePosition {
    Position { contig_id: u32, offset: u64 },
    /// The genomic offset does not fall inside any contig
    NoMatch,
}

impl ReferencePosition {
    pub fn new(contig_id: u32, offset: u64) -> Self {
        ReferencePosition::Position { contig_id, offset }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, ReferencePosition::NoMatch)
    }

    pub fn contig_id(&self) -> Option<u32> {
        match self {
            ReferencePosition::Position { contig_id, .. } => Some(*contig_id),
            ReferencePosition::NoMatch => None,
        }
    }

    pub fn offset(&self) -> Option<u64> {
        match self {
            ReferencePosition::Position { offset, .. } => Some(*offset),
            ReferencePosition::NoMatch => None,
        }
    }
}

impl fmt::Display for ReferencePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferencePosition::Position { contig_id, offset } => write!(f, "{contig_id}:{offset}"),
            ReferencePosition::NoMatch => write!(f, "no-match"),
        }
    }
}

/// Sum of `total_bases` over the contig list
pub fn genome_length(contigs: &[Contig]) -> u64 {
    contigs.iter().map(|c| c.total_bases).sum()
}

/// Translate a 0-based offset in the concatenated genome into a contig position.
///
/// `contigs` must be ordered by `genomic_position`. Binary search, O(log C).
/// Offsets past the end of the last contig, before the first one, or inside a
/// gap between two contigs yield `ReferencePosition::NoMatch`.
pub fn genomic_offset_to_position(genomic_offset: u64, contigs: &[Contig]) -> ReferencePosition {
    // First contig starting strictly after the offset
    let upper = contigs.partition_point(|c| c.genomic_position <= genomic_offset);
    if upper == 0 {
        return ReferencePosition::NoMatch;
    }

    let contig = &contigs[upper - 1];
    let local = genomic_offset - contig.genomic_position;
    if local < contig.total_bases {
        ReferencePosition::new(contig.index, local)
    } else {
        ReferencePosition::NoMatch
    }
}

/// Loaded sequence of one contig, used when scoring candidate alignments
#[derive(Debug, Clone, Default)]
pub struct ContigSequence {
    pub index: u32,
    pub name: String,
    /// Forward strand bases, upper-case ASCII (`N` for ambiguous)
    pub forward: Vec<u8>,
}

impl ContigSequence {
    pub fn new(index: u32, name: impl Into<String>, forward: &[u8]) -> Self {
        Self {
            index,
            name: name.into(),
            forward: forward.iter().map(|b| b.to_ascii_uppercase()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_contigs() -> Vec<Contig> {
        vec![Contig::new(0, "chr1", 0, 100), Contig::new(1, "chr2", 100, 50)]
    }

    #[test]
    fn test_offset_inside_first_contig() {
        let contigs = two_contigs();
        assert_eq!(
            genomic_offset_to_position(0, &contigs),
            ReferencePosition::new(0, 0)
        );
        assert_eq!(
            genomic_offset_to_position(99, &contigs),
            ReferencePosition::new(0, 99)
        );
    }

    #[test]
    fn test_offset_at_contig_boundary() {
        let contigs = two_contigs();
        assert_eq!(
            genomic_offset_to_position(100, &contigs),
            ReferencePosition::new(1, 0)
        );
        assert_eq!(
            genomic_offset_to_position(149, &contigs),
            ReferencePosition::new(1, 49)
        );
    }

    #[test]
    fn test_offset_past_genome_end() {
        let contigs = two_contigs();
        assert!(genomic_offset_to_position(150, &contigs).is_no_match());
        assert!(genomic_offset_to_position(u64::MAX, &contigs).is_no_match());
    }

    #[test]
    fn test_offset_in_gap() {
        let contigs = vec![Contig::new(0, "a", 0, 10), Contig::new(1, "b", 20, 10)];
        assert!(genomic_offset_to_position(15, &contigs).is_no_match());
        assert_eq!(
            genomic_offset_to_position(20, &contigs),
            ReferencePosition::new(1, 0)
        );
    }

    #[test]
    fn test_empty_contig_list() {
        assert!(genomic_offset_to_position(0, &[]).is_no_match());
    }

    #[test]
    fn test_contig_equality_prefers_checksum() {
        let mut a = Contig::new(0, "chr1", 0, 10);
        let mut b = a.clone();
        a.file_path = PathBuf::from("/a.fa");
        b.file_path = PathBuf::from("/b.fa");
        assert_ne!(a, b);

        a.bam_m5 = "abc".to_string();
        b.bam_m5 = "abc".to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn test_genome_length() {
        assert_eq!(genome_length(&two_contigs()), 150);
    }

    #[test]
    fn test_contig_sequence_uppercases() {
        let seq = ContigSequence::new(0, "chr1", b"acgTN");
        assert_eq!(seq.forward, b"ACGTN");
        assert_eq!(seq.len(), 5);
    }
}
