//! Candidate alignment of one read

use super::cigar::Cigar;
use crate::core::quality::{self, QualityError, UNKNOWN_ALIGNMENT_SCORE};

/// One candidate placement of a read on the reference.
///
/// Clip counts are in reference orientation: `left_clipped` is at the lower
/// reference coordinate whatever the strand.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentMetadata {
    pub read_index: u32,
    pub contig_id: u32,
    pub reverse: bool,
    /// 0-based forward-strand position of the first aligned base
    pub position: i64,
    pub cigar: Cigar,
    /// Reference bases covered by the alignment
    pub observed_length: u64,
    pub mismatch_count: u32,
    /// Mismatches plus inserted and deleted bases
    pub edit_distance: u32,
    /// Number of insertion and deletion runs
    pub gap_count: u32,
    pub left_clipped: u32,
    pub right_clipped: u32,
    /// Natural-log probability of the read given this placement
    pub log_probability: f64,
    pub smith_waterman_score: i32,
    pub alignment_score: u32,
    /// 1-based sequencing cycles of mismatching bases, when collected
    pub mismatch_cycles: Vec<u32>,
}

impl FragmentMetadata {
    pub fn new(read_index: u32) -> Self {
        Self {
            read_index,
            contig_id: 0,
            reverse: false,
            position: 0,
            cigar: Cigar::new(),
            observed_length: 0,
            mismatch_count: 0,
            edit_distance: 0,
            gap_count: 0,
            left_clipped: 0,
            right_clipped: 0,
            log_probability: 0.0,
            smith_waterman_score: 0,
            alignment_score: UNKNOWN_ALIGNMENT_SCORE,
            mismatch_cycles: Vec::new(),
        }
    }

    /// Drop any previous alignment and anchor the fragment at a new placement
    pub fn reset_alignment(&mut self, contig_id: u32, reverse: bool, position: i64) {
        let read_index = self.read_index;
        *self = Self::new(read_index);
        self.contig_id = contig_id;
        self.reverse = reverse;
        self.position = position;
    }

    pub fn is_aligned(&self) -> bool {
        !self.cigar.is_empty()
    }

    /// One past the last reference position covered
    pub fn end_position(&self) -> i64 {
        self.position + self.observed_length as i64
    }

    pub fn increment_clip_left(&mut self, bases: u32) {
        self.left_clipped += bases;
    }

    pub fn increment_clip_right(&mut self, bases: u32) {
        self.right_clipped += bases;
    }

    /// Clipped bases at the start of the read as sequenced
    pub fn begin_clipped(&self) -> u32 {
        if self.reverse {
            self.right_clipped
        } else {
            self.left_clipped
        }
    }

    /// Clipped bases at the end of the read as sequenced
    pub fn end_clipped(&self) -> u32 {
        if self.reverse {
            self.left_clipped
        } else {
            self.right_clipped
        }
    }
}

/// Assign alignment scores to the candidates of one read.
///
/// Each candidate competes against the summed probability of all the others
/// plus the rest-of-genome correction. Candidates without a CIGAR keep the
/// unknown score.
pub fn score_candidates(
    fragments: &mut [FragmentMetadata],
    rest_of_genome_correction: f64,
) -> Result<(), QualityError> {
    let total: f64 = fragments
        .iter()
        .filter(|f| f.is_aligned())
        .map(|f| f.log_probability.exp())
        .sum();

    for fragment in fragments.iter_mut().filter(|f| f.is_aligned()) {
        let probability = fragment.log_probability.exp();
        let others = (total - probability).max(0.0);
        fragment.alignment_score =
            quality::alignment_score_from_probability(rest_of_genome_correction, probability, others)?;
    }
    Ok(())
}
