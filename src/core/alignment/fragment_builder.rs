//! Fragment construction from seed placements
//!
//! A candidate placement arrives as a read, a strand and a reference position.
//! The builder clips the read span to the masked region and to the contig,
//! then walks the CIGAR against the reference to count mismatches and gaps
//! and to accumulate the read's log-probability under that placement.
//!
//! Sequence spans are `Range<usize>` offsets into the read along the aligned
//! strand, so the read itself is never copied.

use std::ops::Range;

use super::FragmentError;
use super::cigar::{Cigar, CigarOp};
use super::fragment::FragmentMetadata;
use super::read::{Read, ReadMetadata};
use crate::core::quality;
use crate::index::ContigSequence;

/// Smith-Waterman style scoring used for fragment telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentConfig {
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_open_score: i32,
    pub gap_extend_score: i32,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            match_score: 2,
            mismatch_score: -1,
            gap_open_score: -15,
            gap_extend_score: -3,
        }
    }
}

impl AlignmentConfig {
    /// A gap of length `L` costs one open plus `L - 1` extensions
    pub fn score(&self, matches: u32, mismatches: u32, gap_opens: u32, gap_bases: u32) -> i32 {
        let extensions = gap_bases.saturating_sub(gap_opens);
        self.match_score * matches as i32
            + self.mismatch_score * mismatches as i32
            + self.gap_open_score * gap_opens as i32
            + self.gap_extend_score * extensions as i32
    }
}

pub struct FragmentBuilder {
    collect_mismatch_cycles: bool,
    config: AlignmentConfig,
}

impl FragmentBuilder {
    pub fn new(collect_mismatch_cycles: bool, config: AlignmentConfig) -> Self {
        Self {
            collect_mismatch_cycles,
            config,
        }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Restrict `sequence` so that `[position, position + len)` lies inside
    /// `[0, reference_size)`.
    ///
    /// A negative `position` advances the span start and moves `position` to
    /// 0; an overhang past the reference end truncates the span end. Applying
    /// it to an already clipped span changes nothing.
    pub fn clip_reference(reference_size: i64, position: &mut i64, sequence: &mut Range<usize>) {
        if *position < 0 {
            let advance = (position.unsigned_abs() as usize).min(sequence.len());
            sequence.start += advance;
            *position = 0;
        }

        let end = *position + sequence.len() as i64;
        if end > reference_size {
            let overhang = ((end - reference_size) as usize).min(sequence.len());
            sequence.end -= overhang;
        }
    }

    /// Exclude masked read ends from `sequence`.
    ///
    /// Leading masked bases (trailing ones in forward orientation for a
    /// reverse-strand fragment) advance the span start and
    /// `fragment.position`; trailing masked bases truncate the span end. Both
    /// are counted as clipped.
    pub fn clip_read_masking(read: &Read, fragment: &mut FragmentMetadata, sequence: &mut Range<usize>) {
        let (leading, trailing) = if fragment.reverse {
            (read.end_cycles_masked(), read.begin_cycles_masked())
        } else {
            (read.begin_cycles_masked(), read.end_cycles_masked())
        };

        if sequence.start < leading {
            let advance = (leading - sequence.start).min(sequence.len());
            sequence.start += advance;
            fragment.position += advance as i64;
            fragment.increment_clip_left(advance as u32);
        }

        let unmasked_end = read.len().saturating_sub(trailing).max(sequence.start);
        if sequence.end > unmasked_end {
            let cut = sequence.end - unmasked_end;
            sequence.end -= cut;
            fragment.increment_clip_right(cut as u32);
        }
    }

    /// Anchor `fragment` at `strand_position` on `contig_id` and score it along
    /// `cigar_buffer[cigar_offset..]`, which becomes the fragment's CIGAR.
    ///
    /// Reference `N` never matches. Inserted bases count as substitutions in
    /// the log-probability. The CIGAR must consume exactly the read length,
    /// and `read_metadata` must describe the same number of bases as `read`.
    /// Returns the number of mismatches found.
    #[allow(clippy::too_many_arguments)]
    pub fn update_fragment_cigar(
        &self,
        read_metadata: &ReadMetadata,
        read: &Read,
        contigs: &[ContigSequence],
        fragment: &mut FragmentMetadata,
        reverse: bool,
        contig_id: u32,
        strand_position: i64,
        cigar_buffer: &Cigar,
        cigar_offset: usize,
    ) -> Result<u32, FragmentError> {
        if read_metadata.length as usize != read.len() {
            return Err(FragmentError::ReadMetadataMismatch {
                metadata_length: read_metadata.length,
                read_length: read.len(),
            });
        }
        let contig = contigs
            .get(contig_id as usize)
            .ok_or(FragmentError::UnknownContig {
                contig_id,
                contig_count: contigs.len(),
            })?;
        let ops = cigar_buffer
            .ops()
            .get(cigar_offset..)
            .ok_or(FragmentError::CigarOffset {
                offset: cigar_offset,
                len: cigar_buffer.len(),
            })?;
        if strand_position < 0 {
            return Err(FragmentError::NegativePosition(strand_position));
        }

        let mut consumed = Cigar::new();
        consumed.extend_from_slice(ops);
        if consumed.read_length() != read.len() as u64 {
            return Err(FragmentError::ReadLengthMismatch {
                consumed: consumed.read_length(),
                read_length: read.len(),
            });
        }
        let reference_end = strand_position as u64 + consumed.reference_length();
        if reference_end > contig.len() as u64 {
            return Err(FragmentError::PastContigEnd {
                contig_id,
                position: strand_position,
                contig_length: contig.len(),
            });
        }

        fragment.reset_alignment(contig_id, reverse, strand_position);

        let bases = read.sequence(reverse);
        let qualities = read.qualities(reverse);
        let reference = &contig.forward;

        let mut read_offset = 0usize;
        let mut reference_offset = strand_position as usize;
        let mut matches = 0u32;
        let mut mismatches = 0u32;
        let mut gap_bases = 0u32;
        let mut log_probability = 0.0f64;

        for &(op, len) in consumed.ops() {
            let run = len as usize;
            match op {
                CigarOp::S => {
                    if read_offset == 0 {
                        fragment.increment_clip_left(len);
                    } else {
                        fragment.increment_clip_right(len);
                    }
                    read_offset += run;
                }
                CigarOp::M | CigarOp::Eq | CigarOp::X => {
                    for i in 0..run {
                        let base = bases[read_offset + i];
                        let q = qualities[read_offset + i];
                        let reference_base = reference[reference_offset + i];
                        if base == reference_base && reference_base != b'N' {
                            matches += 1;
                            log_probability += quality::log_match(q)?;
                        } else {
                            mismatches += 1;
                            log_probability += quality::log_substitution(q)?;
                            if self.collect_mismatch_cycles {
                                let cycle = read_metadata
                                    .cycle_at((read_offset + i) as u32, reverse)
                                    .ok_or(FragmentError::ReadMetadataMismatch {
                                        metadata_length: read_metadata.length,
                                        read_length: read.len(),
                                    })?;
                                fragment.mismatch_cycles.push(cycle);
                            }
                        }
                    }
                    read_offset += run;
                    reference_offset += run;
                }
                CigarOp::I => {
                    for &q in &qualities[read_offset..read_offset + run] {
                        log_probability += quality::log_substitution(q)?;
                    }
                    fragment.gap_count += 1;
                    gap_bases += len;
                    read_offset += run;
                }
                CigarOp::D => {
                    fragment.gap_count += 1;
                    gap_bases += len;
                    reference_offset += run;
                }
                CigarOp::N => reference_offset += run,
                CigarOp::H => {}
            }
        }

        fragment.cigar = consumed;
        fragment.observed_length = (reference_offset - strand_position as usize) as u64;
        fragment.mismatch_count = mismatches;
        fragment.edit_distance = mismatches + gap_bases;
        fragment.log_probability = log_probability;
        fragment.smith_waterman_score =
            self.config.score(matches, mismatches, fragment.gap_count, gap_bases);

        Ok(mismatches)
    }

    /// Gapless candidate for a read whose first base (along `reverse`) would
    /// sit at `read_start_position` on the contig.
    ///
    /// Masked ends and overhangs past the contig become soft clips. Returns
    /// `None` when no base is left to align.
    pub fn build_ungapped(
        &self,
        read: &Read,
        read_metadata: &ReadMetadata,
        contigs: &[ContigSequence],
        contig_id: u32,
        reverse: bool,
        read_start_position: i64,
    ) -> Result<Option<FragmentMetadata>, FragmentError> {
        let contig = contigs
            .get(contig_id as usize)
            .ok_or(FragmentError::UnknownContig {
                contig_id,
                contig_count: contigs.len(),
            })?;

        let mut fragment = FragmentMetadata::new(read_metadata.index);
        fragment.reset_alignment(contig_id, reverse, read_start_position);

        let mut sequence = 0..read.len();
        Self::clip_read_masking(read, &mut fragment, &mut sequence);
        let mut position = fragment.position;
        Self::clip_reference(contig.len() as i64, &mut position, &mut sequence);
        if sequence.is_empty() {
            return Ok(None);
        }

        let mut cigar = Cigar::new();
        cigar.push(CigarOp::S, sequence.start as u32);
        cigar.push(CigarOp::M, sequence.len() as u32);
        cigar.push(CigarOp::S, (read.len() - sequence.end) as u32);

        self.update_fragment_cigar(
            read_metadata,
            read,
            contigs,
            &mut fragment,
            reverse,
            contig_id,
            position,
            &cigar,
            0,
        )?;
        Ok(Some(fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contigs() -> Vec<ContigSequence> {
        vec![ContigSequence::new(0, "chr1", b"ACGTACGTACGTACGTACGT")]
    }

    #[test]
    fn test_clip_reference_negative_position() {
        let mut position = -3;
        let mut sequence = 0..10;
        FragmentBuilder::clip_reference(20, &mut position, &mut sequence);
        assert_eq!(position, 0);
        assert_eq!(sequence, 3..10);
    }

    #[test]
    fn test_clip_reference_overhang() {
        let mut position = 15;
        let mut sequence = 0..10;
        FragmentBuilder::clip_reference(20, &mut position, &mut sequence);
        assert_eq!(position, 15);
        assert_eq!(sequence, 0..5);
    }

    #[test]
    fn test_clip_reference_fully_outside() {
        let mut position = 30;
        let mut sequence = 0..10;
        FragmentBuilder::clip_reference(20, &mut position, &mut sequence);
        assert!(sequence.is_empty());
        assert!(sequence.start <= sequence.end);
    }

    #[test]
    fn test_clip_read_masking_forward() {
        let mut read = Read::new(0, b"ACGTACGTAC", &[30; 10]).unwrap();
        read.mask_begin(2);
        read.mask_end(1);
        let mut fragment = FragmentMetadata::new(0);
        fragment.position = 100;
        let mut sequence = 0..10;
        FragmentBuilder::clip_read_masking(&read, &mut fragment, &mut sequence);
        assert_eq!(sequence, 2..9);
        assert_eq!(fragment.position, 102);
        assert_eq!((fragment.left_clipped, fragment.right_clipped), (2, 1));
    }

    #[test]
    fn test_clip_read_masking_reverse_swaps_ends() {
        let mut read = Read::new(0, b"ACGTACGTAC", &[30; 10]).unwrap();
        read.mask_begin(2);
        let mut fragment = FragmentMetadata::new(0);
        fragment.reverse = true;
        let mut sequence = 0..10;
        FragmentBuilder::clip_read_masking(&read, &mut fragment, &mut sequence);
        assert_eq!(sequence, 0..8);
        assert_eq!(fragment.position, 0);
        assert_eq!(fragment.right_clipped, 2);
    }

    #[test]
    fn test_update_fragment_cigar_counts_mismatches() {
        let builder = FragmentBuilder::new(true, AlignmentConfig::default());
        // Reference at 4..12 is ACGTACGT; one mismatch at read offset 3
        let read = Read::new(0, b"ACGAACGT", &[30; 8]).unwrap();
        let meta = ReadMetadata::new(0, 8, 1);
        let cigar: Cigar = "8M".parse().unwrap();
        let mut fragment = FragmentMetadata::new(0);

        let mismatches = builder
            .update_fragment_cigar(&meta, &read, &contigs(), &mut fragment, false, 0, 4, &cigar, 0)
            .unwrap();
        assert_eq!(mismatches, 1);
        assert_eq!(fragment.edit_distance, 1);
        assert_eq!(fragment.observed_length, 8);
        assert_eq!(fragment.mismatch_cycles, vec![4]);
        assert_eq!(fragment.smith_waterman_score, 7 * 2 - 1);
        assert!(fragment.log_probability < 0.0);
    }

    #[test]
    fn test_update_fragment_cigar_gaps() {
        let builder = FragmentBuilder::new(false, AlignmentConfig::default());
        let read = Read::new(0, b"ACGTTACGT", &[30; 9]).unwrap();
        let meta = ReadMetadata::new(0, 9, 1);
        let cigar: Cigar = "4M1I4M".parse().unwrap();
        let mut fragment = FragmentMetadata::new(0);
        let mismatches = builder
            .update_fragment_cigar(&meta, &read, &contigs(), &mut fragment, false, 0, 0, &cigar, 0)
            .unwrap();
        assert_eq!(mismatches, 0);
        assert_eq!(fragment.gap_count, 1);
        assert_eq!(fragment.edit_distance, 1);
        assert_eq!(fragment.observed_length, 8);
        assert!(fragment.mismatch_cycles.is_empty());
    }

    #[test]
    fn test_update_fragment_cigar_errors() {
        let builder = FragmentBuilder::new(false, AlignmentConfig::default());
        let read = Read::new(0, b"ACGT", &[30; 4]).unwrap();
        let meta = ReadMetadata::new(0, 4, 1);
        let mut fragment = FragmentMetadata::new(0);

        let short: Cigar = "3M".parse().unwrap();
        assert!(matches!(
            builder.update_fragment_cigar(&meta, &read, &contigs(), &mut fragment, false, 0, 0, &short, 0),
            Err(FragmentError::ReadLengthMismatch { .. })
        ));
        let cigar: Cigar = "4M".parse().unwrap();
        assert!(matches!(
            builder.update_fragment_cigar(&meta, &read, &contigs(), &mut fragment, false, 0, 18, &cigar, 0),
            Err(FragmentError::PastContigEnd { .. })
        ));
        assert!(matches!(
            builder.update_fragment_cigar(&meta, &read, &contigs(), &mut fragment, false, 5, 0, &cigar, 0),
            Err(FragmentError::UnknownContig { .. })
        ));
        assert!(matches!(
            builder.update_fragment_cigar(&meta, &read, &contigs(), &mut fragment, false, 0, 0, &cigar, 2),
            Err(FragmentError::CigarOffset { .. })
        ));
    }

    #[test]
    fn test_update_fragment_cigar_rejects_short_metadata() {
        // Reverse-strand mismatches past the described length have no cycle
        let builder = FragmentBuilder::new(true, AlignmentConfig::default());
        let read = Read::new(0, b"TTTTTTTT", &[30; 8]).unwrap();
        let meta = ReadMetadata::new(0, 4, 1);
        let cigar: Cigar = "8M".parse().unwrap();
        let mut fragment = FragmentMetadata::new(0);

        let err = builder
            .update_fragment_cigar(&meta, &read, &contigs(), &mut fragment, true, 0, 0, &cigar, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            FragmentError::ReadMetadataMismatch {
                metadata_length: 4,
                read_length: 8
            }
        ));
        assert!(err.is_precondition());
        assert!(fragment.cigar.is_empty());
    }

    #[test]
    fn test_build_ungapped_overhang_becomes_soft_clip() {
        let builder = FragmentBuilder::new(false, AlignmentConfig::default());
        let read = Read::new(0, b"ACGTACGT", &[30; 8]).unwrap();
        let meta = ReadMetadata::new(0, 8, 1);
        let fragment = builder
            .build_ungapped(&read, &meta, &contigs(), 0, false, 16)
            .unwrap()
            .unwrap();
        assert_eq!(fragment.cigar.to_string(), "4M4S");
        assert_eq!(fragment.position, 16);
        assert_eq!(fragment.right_clipped, 4);
        assert_eq!(fragment.mismatch_count, 0);
    }

    #[test]
    fn test_build_ungapped_nothing_left() {
        let builder = FragmentBuilder::new(false, AlignmentConfig::default());
        let read = Read::new(0, b"ACGT", &[30; 4]).unwrap();
        let meta = ReadMetadata::new(0, 4, 1);
        assert!(
            builder
                .build_ungapped(&read, &meta, &contigs(), 0, false, 40)
                .unwrap()
                .is_none()
        );
    }
}
