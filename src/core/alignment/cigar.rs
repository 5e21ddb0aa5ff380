//! CIGAR representation for candidate fragments
//!
//! Runs are stored merged: pushing an operation equal to the last one extends
//! that run instead of adding a new one.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// CIGAR operation type with zero-cost conversion to/from bytes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CigarOp {
    M = b'M',  // Match/mismatch
    I = b'I',  // Insertion to reference
    D = b'D',  // Deletion from reference
    S = b'S',  // Soft clip
    H = b'H',  // Hard clip
    N = b'N',  // Skipped region
    X = b'X',  // Sequence mismatch
    Eq = b'=', // Sequence match
}

impl CigarOp {
    #[inline(always)]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'M' => Some(Self::M),
            b'I' => Some(Self::I),
            b'D' => Some(Self::D),
            b'S' => Some(Self::S),
            b'H' => Some(Self::H),
            b'N' => Some(Self::N),
            b'X' => Some(Self::X),
            b'=' => Some(Self::Eq),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    /// Returns true if this operation consumes read bases
    #[inline(always)]
    pub const fn consumes_read(self) -> bool {
        matches!(self, Self::M | Self::I | Self::S | Self::Eq | Self::X)
    }

    /// Returns true if this operation consumes reference bases
    #[inline(always)]
    pub const fn consumes_reference(self) -> bool {
        matches!(self, Self::M | Self::D | Self::N | Self::Eq | Self::X)
    }

    /// Aligned base pair (match or mismatch)
    #[inline(always)]
    pub const fn is_aligned(self) -> bool {
        matches!(self, Self::M | Self::Eq | Self::X)
    }

    /// Returns true if this operation is a clip (soft or hard)
    #[inline(always)]
    pub const fn is_clip(self) -> bool {
        matches!(self, Self::S | Self::H)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseCigarError {
    #[error("unknown CIGAR operation '{0}'")]
    UnknownOperation(char),
    #[error("CIGAR operation '{0}' has no length")]
    MissingLength(char),
    #[error("CIGAR ends with a dangling length")]
    DanglingLength,
    #[error("invalid CIGAR run length")]
    InvalidLength,
}

/// Sequence of `(operation, length)` runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar {
    ops: Vec<(CigarOp, u32)>,
}

impl Cigar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a run, merging it into the last run when the operation repeats.
    /// Zero-length runs are dropped.
    pub fn push(&mut self, op: CigarOp, len: u32) {
        if len == 0 {
            return;
        }
        match self.ops.last_mut() {
            Some((last, last_len)) if *last == op => *last_len += len,
            _ => self.ops.push((op, len)),
        }
    }

    pub fn extend_from_slice(&mut self, ops: &[(CigarOp, u32)]) {
        for &(op, len) in ops {
            self.push(op, len);
        }
    }

    pub fn ops(&self) -> &[(CigarOp, u32)] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Sums M, D, N, =, X runs
    pub fn reference_length(&self) -> u64 {
        self.ops
            .iter()
            .filter(|(op, _)| op.consumes_reference())
            .map(|&(_, len)| u64::from(len))
            .sum()
    }

    /// Sums M, I, S, =, X runs
    pub fn read_length(&self) -> u64 {
        self.ops
            .iter()
            .filter(|(op, _)| op.consumes_read())
            .map(|&(_, len)| u64::from(len))
            .sum()
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("*");
        }
        for &(op, len) in &self.ops {
            write!(f, "{}{}", len, op.to_byte() as char)?;
        }
        Ok(())
    }
}

impl FromStr for Cigar {
    type Err = ParseCigarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cigar = Cigar::new();
        if s == "*" {
            return Ok(cigar);
        }
        let mut len: Option<u32> = None;
        for c in s.chars() {
            if let Some(digit) = c.to_digit(10) {
                let current = len.unwrap_or(0);
                len = Some(
                    current
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(digit))
                        .ok_or(ParseCigarError::InvalidLength)?,
                );
                continue;
            }
            let op = u8::try_from(c)
                .ok()
                .and_then(CigarOp::from_byte)
                .ok_or(ParseCigarError::UnknownOperation(c))?;
            let run = len.take().ok_or(ParseCigarError::MissingLength(c))?;
            cigar.push(op, run);
        }
        if len.is_some() {
            return Err(ParseCigarError::DanglingLength);
        }
        Ok(cigar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cigar_op_from_byte() {
        assert_eq!(CigarOp::from_byte(b'M'), Some(CigarOp::M));
        assert_eq!(CigarOp::from_byte(b'='), Some(CigarOp::Eq));
        assert_eq!(CigarOp::from_byte(b'?'), None);
    }

    #[test]
    fn test_op_consumes() {
        assert!(CigarOp::M.consumes_read());
        assert!(CigarOp::M.consumes_reference());
        assert!(CigarOp::I.consumes_read());
        assert!(!CigarOp::I.consumes_reference());
        assert!(!CigarOp::D.consumes_read());
        assert!(CigarOp::D.consumes_reference());
        assert!(CigarOp::S.consumes_read());
        assert!(!CigarOp::S.consumes_reference());
    }

    #[test]
    fn test_push_merges_runs() {
        let mut cigar = Cigar::new();
        cigar.push(CigarOp::M, 10);
        cigar.push(CigarOp::M, 5);
        cigar.push(CigarOp::I, 0);
        cigar.push(CigarOp::I, 2);
        cigar.push(CigarOp::M, 20);
        assert_eq!(
            cigar.ops(),
            &[(CigarOp::M, 15), (CigarOp::I, 2), (CigarOp::M, 20)]
        );
    }

    #[test]
    fn test_lengths() {
        // 5S50M2I10M5D30M = 50 + 10 + 5 + 30 reference bases
        let cigar: Cigar = "5S50M2I10M5D30M".parse().unwrap();
        assert_eq!(cigar.reference_length(), 95);
        assert_eq!(cigar.read_length(), 97);
    }

    #[test]
    fn test_display_and_parse() {
        let cigar: Cigar = "10S90M".parse().unwrap();
        assert_eq!(cigar.to_string(), "10S90M");
        assert_eq!(Cigar::new().to_string(), "*");
        assert!("*".parse::<Cigar>().unwrap().is_empty());

        assert_eq!("10Q".parse::<Cigar>(), Err(ParseCigarError::UnknownOperation('Q')));
        assert_eq!("M".parse::<Cigar>(), Err(ParseCigarError::MissingLength('M')));
        assert_eq!("10M5".parse::<Cigar>(), Err(ParseCigarError::DanglingLength));
    }
}
