//! Read bases, qualities and masking
//!
//! Sequences are stored in forward orientation; the reverse-complemented
//! strand is computed once at construction. The per-base mask is kept in
//! forward orientation, and only its leading and trailing runs take part in
//! clipping.

use super::FragmentError;
use crate::core::quality::{self, MAX_QUALITY};

/// Per-read sequencing metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadMetadata {
    /// 0 for the first read of a pair, 1 for the second
    pub index: u32,
    pub length: u32,
    /// 1-based sequencing cycle of the first base
    pub first_cycle: u32,
}

impl ReadMetadata {
    pub fn new(index: u32, length: u32, first_cycle: u32) -> Self {
        Self {
            index,
            length,
            first_cycle,
        }
    }

    /// Cycle of the last base
    pub fn last_cycle(&self) -> u32 {
        self.first_cycle + self.length.saturating_sub(1)
    }

    /// Sequencing cycle of the base at `offset` along the strand the read is
    /// aligned on, `None` when the offset is past the read
    pub fn cycle_at(&self, offset: u32, reverse: bool) -> Option<u32> {
        if offset >= self.length {
            return None;
        }
        if reverse {
            self.last_cycle().checked_sub(offset)
        } else {
            self.first_cycle.checked_add(offset)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    index: u32,
    forward: Vec<u8>,
    forward_quality: Vec<u8>,
    reverse: Vec<u8>,
    reverse_quality: Vec<u8>,
    mask: Vec<bool>,
}

#[inline]
fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        _ => b'N',
    }
}

impl Read {
    /// Build a read from ASCII bases and raw PHRED values (not offset by 33)
    pub fn new(index: u32, sequence: &[u8], quality: &[u8]) -> Result<Self, FragmentError> {
        if sequence.len() != quality.len() {
            return Err(FragmentError::InvalidRead(format!(
                "read {index}: {} bases but {} quality values",
                sequence.len(),
                quality.len()
            )));
        }
        if let Some(&q) = quality.iter().find(|&&q| q > MAX_QUALITY) {
            return Err(quality::QualityError::QualityOutOfRange {
                quality: q,
                max: MAX_QUALITY,
            }
            .into());
        }

        let forward: Vec<u8> = sequence.iter().map(|b| b.to_ascii_uppercase()).collect();
        let reverse = forward.iter().rev().map(|&b| complement(b)).collect();
        Ok(Self {
            index,
            reverse,
            reverse_quality: quality.iter().rev().copied().collect(),
            forward,
            forward_quality: quality.to_vec(),
            mask: vec![false; sequence.len()],
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Bases along the given strand
    pub fn sequence(&self, reverse: bool) -> &[u8] {
        if reverse { &self.reverse } else { &self.forward }
    }

    pub fn qualities(&self, reverse: bool) -> &[u8] {
        if reverse {
            &self.reverse_quality
        } else {
            &self.forward_quality
        }
    }

    /// Mask the first `count` bases (forward orientation)
    pub fn mask_begin(&mut self, count: usize) {
        let count = count.min(self.mask.len());
        self.mask[..count].fill(true);
    }

    /// Mask the last `count` bases (forward orientation)
    pub fn mask_end(&mut self, count: usize) {
        let len = self.mask.len();
        let count = count.min(len);
        self.mask[len - count..].fill(true);
    }

    pub fn is_masked(&self, forward_offset: usize) -> bool {
        self.mask.get(forward_offset).copied().unwrap_or(false)
    }

    /// Leading masked bases in forward orientation
    pub fn begin_cycles_masked(&self) -> usize {
        self.mask.iter().take_while(|&&m| m).count()
    }

    /// Trailing masked bases in forward orientation
    pub fn end_cycles_masked(&self) -> usize {
        if self.mask.iter().all(|&m| m) {
            return self.mask.len();
        }
        self.mask.iter().rev().take_while(|&&m| m).count()
    }

    /// Mask the low-quality 3' end; returns the number of bases masked
    pub fn trim_low_quality_end(&mut self, cutoff: u8) -> usize {
        let trim = quality::trim_low_quality_end(&self.forward_quality, cutoff);
        self.mask_end(trim);
        trim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_complement() {
        let read = Read::new(0, b"aacgN", &[30, 31, 32, 33, 2]).unwrap();
        assert_eq!(read.sequence(false), b"AACGN");
        assert_eq!(read.sequence(true), b"NCGTT");
        assert_eq!(read.qualities(true), &[2, 33, 32, 31, 30]);
    }

    #[test]
    fn test_invalid_reads() {
        assert!(matches!(
            Read::new(0, b"ACG", &[30, 30]),
            Err(FragmentError::InvalidRead(_))
        ));
        assert!(matches!(
            Read::new(0, b"ACG", &[30, 30, 94]),
            Err(FragmentError::Quality(_))
        ));
    }

    #[test]
    fn test_masked_runs() {
        let mut read = Read::new(0, b"ACGTACGTAC", &[30; 10]).unwrap();
        read.mask_begin(2);
        read.mask_end(3);
        assert_eq!(read.begin_cycles_masked(), 2);
        assert_eq!(read.end_cycles_masked(), 3);
        assert!(read.is_masked(0));
        assert!(!read.is_masked(2));

        read.mask_begin(100);
        assert_eq!(read.begin_cycles_masked(), 10);
        assert_eq!(read.end_cycles_masked(), 10);
    }

    #[test]
    fn test_cycles() {
        let meta = ReadMetadata::new(1, 100, 101);
        assert_eq!(meta.last_cycle(), 200);
        assert_eq!(meta.cycle_at(0, false), Some(101));
        assert_eq!(meta.cycle_at(0, true), Some(200));
        assert_eq!(meta.cycle_at(99, true), Some(101));
        assert_eq!(meta.cycle_at(100, true), None);
        assert_eq!(meta.cycle_at(100, false), None);
    }
}
