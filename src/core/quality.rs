//! PHRED quality to probability conversions and mapping quality
//!
//! All probabilities are natural-log values. Per-quality values come from
//! tables built once on first use; every table lookup validates its input
//! against `MAX_QUALITY` and never clamps.
//!
//! Alignment scores are PHRED-scaled confidences that an alignment is the
//! right one among all candidate placements plus a uniform "rest of genome"
//! prior. Mapping quality is the score capped at `MAX_MAPQ`.

use std::sync::LazyLock;

use thiserror::Error;

/// Highest PHRED value covered by the lookup tables (printable Sanger range)
pub const MAX_QUALITY: u8 = 93;

/// Scores at or below this value mark a repeat placement
pub const REPEAT_ALIGNMENT_SCORE: u32 = 3;

/// Sentinel for "no score computed"
pub const UNKNOWN_ALIGNMENT_SCORE: u32 = u32::MAX;

/// Sentinel for "no mapping quality"
pub const UNKNOWN_MAPQ: u32 = 255;

pub const MAX_MAPQ: u32 = 60;

/// Tolerance for comparing log-probabilities
pub const LOG_PROBABILITY_EPSILON: f64 = 1e-7;

/// Reads shorter than this are never quality-trimmed
pub const MIN_TRIMMED_READ_LENGTH: usize = 35;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QualityError {
    #[error("quality value {quality} exceeds the supported maximum {max}")]
    QualityOutOfRange { quality: u8, max: u8 },

    #[error("alignment score is unknown")]
    UnknownScore,

    #[error("mapping quality is unknown")]
    UnknownMapq,

    #[error("invalid alignment probabilities: {0}")]
    InvalidProbability(String),
}

impl QualityError {
    /// Every quality error is a caller precondition violation
    pub fn is_precondition(&self) -> bool {
        true
    }
}

const TABLE_SIZE: usize = MAX_QUALITY as usize + 1;

struct QualityTables {
    log_error: [f64; TABLE_SIZE],
    log_correct: [f64; TABLE_SIZE],
    log_mismatch: [f64; TABLE_SIZE],
}

static TABLES: LazyLock<QualityTables> = LazyLock::new(|| {
    let mut tables = QualityTables {
        log_error: [0.0; TABLE_SIZE],
        log_correct: [0.0; TABLE_SIZE],
        log_mismatch: [0.0; TABLE_SIZE],
    };
    for q in 0..=MAX_QUALITY {
        let p = error_probability(q);
        tables.log_error[q as usize] = p.ln();
        tables.log_correct[q as usize] = (1.0 - p).ln();
        tables.log_mismatch[q as usize] = log_mismatch_slow(q);
    }
    tables
});

#[inline]
fn error_probability(q: u8) -> f64 {
    10f64.powf(-f64::from(q) / 10.0)
}

#[inline]
fn check_quality(q: u8) -> Result<usize, QualityError> {
    if q > MAX_QUALITY {
        Err(QualityError::QualityOutOfRange {
            quality: q,
            max: MAX_QUALITY,
        })
    } else {
        Ok(q as usize)
    }
}

// ============================================================================
// Per-base log-probabilities
// ============================================================================

/// ln(p), the probability that the base call is wrong
#[inline]
pub fn log_error(q: u8) -> Result<f64, QualityError> {
    Ok(TABLES.log_error[check_quality(q)?])
}

/// ln(1 - p), the probability that the base call is right
#[inline]
pub fn log_correct(q: u8) -> Result<f64, QualityError> {
    Ok(TABLES.log_correct[check_quality(q)?])
}

/// Same as [`log_correct`]
#[inline]
pub fn log_match(q: u8) -> Result<f64, QualityError> {
    log_correct(q)
}

/// Log-probability contribution of a mismatching base
#[inline]
pub fn log_mismatch(q: u8) -> Result<f64, QualityError> {
    Ok(TABLES.log_mismatch[check_quality(q)?])
}

/// Direct evaluation of `ln(p/3 / (1 - p))`, the value the mismatch table holds
pub fn log_mismatch_slow(q: u8) -> f64 {
    let p = error_probability(q);
    (p / 3.0 / (1.0 - p)).ln()
}

/// ln(p/3), the probability of reading one specific wrong base.
///
/// Equals `log_correct(q) + log_mismatch(q)` for `q > 0`; unlike the sum it
/// stays finite at `q = 0`.
#[inline]
pub fn log_substitution(q: u8) -> Result<f64, QualityError> {
    Ok(log_error(q)? - 3f64.ln())
}

/// Log-probabilities are equal within [`LOG_PROBABILITY_EPSILON`]
#[inline]
pub fn lp_equals(left: f64, right: f64) -> bool {
    left == right || (left - right).abs() < LOG_PROBABILITY_EPSILON
}

#[inline]
pub fn lp_less(left: f64, right: f64) -> bool {
    left < right && !lp_equals(left, right)
}

// ============================================================================
// Alignment score and mapping quality
// ============================================================================

/// Expected number of equally good random placements elsewhere in the
/// genome: `2 * genome_length / 4^read_length`, evaluated in log space
pub fn rest_of_genome_correction(genome_length: u64, read_length: u32) -> f64 {
    (std::f64::consts::LN_2 + (genome_length as f64).ln() - 4f64.ln() * f64::from(read_length))
        .exp()
}

/// `floor(-10 log10((other + correction) / (other + aligned + correction)))`
///
/// `alignment_probability` and `other_alignments_probability` are plain
/// probabilities (not logs). The denominator must be positive.
pub fn alignment_score_from_probability(
    rest_of_genome_correction: f64,
    alignment_probability: f64,
    other_alignments_probability: f64,
) -> Result<u32, QualityError> {
    let inputs = [
        rest_of_genome_correction,
        alignment_probability,
        other_alignments_probability,
    ];
    if inputs.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(QualityError::InvalidProbability(format!(
            "correction {rest_of_genome_correction}, aligned {alignment_probability}, other {other_alignments_probability}"
        )));
    }

    let competing = other_alignments_probability + rest_of_genome_correction;
    if competing <= 0.0 {
        return Err(QualityError::InvalidProbability(
            "no competing probability mass".to_string(),
        ));
    }
    let score = (-10.0 * (competing / (competing + alignment_probability)).log10()).floor();
    if score >= f64::from(UNKNOWN_ALIGNMENT_SCORE) {
        return Err(QualityError::InvalidProbability(format!(
            "score {score} is not representable"
        )));
    }
    // -0.0 floors to -0.0 when the alignment carries no probability mass
    Ok(score.max(0.0) as u32)
}

/// True iff the score is above the repeat threshold
#[inline]
pub fn is_unique(alignment_score: u32) -> bool {
    alignment_score > REPEAT_ALIGNMENT_SCORE
}

/// Mapping quality of a score: `min(MAX_MAPQ, score)`
#[inline]
pub fn score_to_mapq(alignment_score: u32) -> Result<u32, QualityError> {
    if alignment_score == UNKNOWN_ALIGNMENT_SCORE {
        return Err(QualityError::UnknownScore);
    }
    Ok(alignment_score.min(MAX_MAPQ))
}

/// Mapping quality of one end of a pair.
///
/// A proper pair is rescued by the template score, but only as far as the
/// mate independently supports it: `max(score, min(template, mate))`.
pub fn pick_mapq(
    alignment_score: u32,
    mate_alignment_score: u32,
    proper_pair: bool,
    template_alignment_score: u32,
) -> Result<u32, QualityError> {
    if [alignment_score, mate_alignment_score, template_alignment_score]
        .contains(&UNKNOWN_ALIGNMENT_SCORE)
    {
        return Err(QualityError::UnknownScore);
    }
    if proper_pair {
        score_to_mapq(alignment_score.max(template_alignment_score.min(mate_alignment_score)))
    } else {
        score_to_mapq(alignment_score)
    }
}

/// Mapping quality of a mate without a usable score of its own (e.g. a
/// rescued shadow): the template mapq capped at the other mate's mapq
pub fn pick_mapq_from_mate(mate_mapq: u32, template_alignment_score: u32) -> Result<u32, QualityError> {
    if mate_mapq == UNKNOWN_MAPQ {
        return Err(QualityError::UnknownMapq);
    }
    Ok(score_to_mapq(template_alignment_score)?.min(mate_mapq))
}

// ============================================================================
// Quality trimming
// ============================================================================

/// Number of 3' bases to trim: the suffix maximizing `sum(cutoff - q)`.
///
/// Scanning stops as soon as the running sum goes negative. Reads shorter than
/// [`MIN_TRIMMED_READ_LENGTH`] and a cutoff of 0 trim nothing.
pub fn trim_low_quality_end(qualities: &[u8], cutoff: u8) -> usize {
    if cutoff == 0 || qualities.len() < MIN_TRIMMED_READ_LENGTH {
        return 0;
    }

    let mut sum = 0i64;
    let mut best = 0i64;
    let mut trim = 0usize;
    for (i, &q) in qualities.iter().rev().enumerate() {
        sum += i64::from(cutoff) - i64::from(q);
        if sum < 0 {
            break;
        }
        if sum > best {
            best = sum;
            trim = i + 1;
        }
    }
    trim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_match_formula() {
        for q in 1..=MAX_QUALITY {
            let fast = log_mismatch(q).unwrap();
            let slow = log_mismatch_slow(q);
            assert!(lp_equals(fast, slow), "q={q}: {fast} vs {slow}");
        }
        assert_eq!(log_mismatch(0).unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_substitution_is_correct_plus_mismatch() {
        for q in 1..=MAX_QUALITY {
            let sum = log_correct(q).unwrap() + log_mismatch(q).unwrap();
            assert!(lp_equals(log_substitution(q).unwrap(), sum), "q={q}");
        }
        assert!(log_substitution(0).unwrap().is_finite());
    }

    #[test]
    fn test_log_error_values() {
        assert!((log_error(10).unwrap() - 0.1f64.ln()).abs() < 1e-12);
        assert!((log_correct(20).unwrap() - 0.99f64.ln()).abs() < 1e-12);
        assert_eq!(log_match(30).unwrap(), log_correct(30).unwrap());
    }

    #[test]
    fn test_out_of_range_quality() {
        let err = log_error(MAX_QUALITY + 1).unwrap_err();
        assert_eq!(
            err,
            QualityError::QualityOutOfRange {
                quality: 94,
                max: 93
            }
        );
        assert!(err.is_precondition());
        assert!(log_mismatch(255).is_err());
    }

    #[test]
    fn test_lp_comparisons() {
        assert!(lp_equals(-1.0, -1.0 + 1e-9));
        assert!(!lp_equals(-1.0, -1.1));
        assert!(lp_equals(f64::NEG_INFINITY, f64::NEG_INFINITY));
        assert!(lp_less(-2.0, -1.0));
        assert!(!lp_less(-1.0, -1.0 + 1e-9));
    }

    #[test]
    fn test_trim_low_quality_end() {
        let mut quals = vec![30u8; 40];
        assert_eq!(trim_low_quality_end(&quals, 20), 0);

        quals[37] = 2;
        quals[38] = 2;
        quals[39] = 2;
        assert_eq!(trim_low_quality_end(&quals, 20), 3);

        // Too short to trim
        assert_eq!(trim_low_quality_end(&[2u8; 20], 20), 0);
    }

    #[test]
    fn test_score_zero_when_no_probability() {
        assert_eq!(alignment_score_from_probability(1.0, 0.0, 0.0).unwrap(), 0);
        assert!(alignment_score_from_probability(0.0, 1.0, 0.0).is_err());
        assert!(alignment_score_from_probability(-1.0, 1.0, 0.0).is_err());
    }
}
