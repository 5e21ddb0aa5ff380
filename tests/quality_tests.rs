// Integration tests for the PHRED quality model and mapping quality rules

use ferrous_seedmap::core::quality::{
    self, MAX_MAPQ, MAX_QUALITY, QualityError, REPEAT_ALIGNMENT_SCORE, UNKNOWN_ALIGNMENT_SCORE,
    UNKNOWN_MAPQ,
};

#[test]
fn test_error_and_correct_are_complementary() {
    for q in 0..=MAX_QUALITY {
        let p_error = quality::log_error(q).unwrap().exp();
        let p_correct = quality::log_correct(q).unwrap().exp();
        assert!((p_error + p_correct - 1.0).abs() < 1e-12, "q={q}");
        assert_eq!(quality::log_match(q).unwrap(), quality::log_correct(q).unwrap());
    }
}

#[test]
fn test_mismatch_table_agrees_with_formula() {
    for q in 0..=MAX_QUALITY {
        let table = quality::log_mismatch(q).unwrap();
        let direct = quality::log_mismatch_slow(q);
        assert!(table == direct || (table - direct).abs() < 1e-12, "q={q}");
    }
    // Error probability 1 at q=0 makes the ratio unbounded
    assert_eq!(quality::log_mismatch(0).unwrap(), f64::INFINITY);
    assert!(quality::log_substitution(0).unwrap().is_finite());
}

#[test]
fn test_mismatch_costs_more_with_quality() {
    let q20 = quality::log_substitution(20).unwrap();
    let q40 = quality::log_substitution(40).unwrap();
    assert!(quality::lp_less(q40, q20));
    assert!(quality::log_match(40).unwrap() > quality::log_match(20).unwrap());
}

#[test]
fn test_out_of_range_quality_rejected() {
    for f in [quality::log_error, quality::log_correct, quality::log_mismatch] {
        let err = f(MAX_QUALITY + 1).unwrap_err();
        assert!(matches!(err, QualityError::QualityOutOfRange { quality: 94, max: 93 }));
        assert!(err.is_precondition());
    }
}

#[test]
fn test_lp_comparisons() {
    assert!(quality::lp_equals(-10.0, -10.0 + 1e-9));
    assert!(!quality::lp_equals(-10.0, -10.001));
    assert!(!quality::lp_less(-10.0, -10.0 + 1e-9));
    assert!(quality::lp_less(-10.001, -10.0));
}

#[test]
fn test_alignment_score_unique_vs_repeat() {
    let correction = quality::rest_of_genome_correction(3_000_000_000, 100);
    assert!(correction > 0.0 && correction < 1e-40);

    // Nothing competes except the genome correction
    let unique = quality::alignment_score_from_probability(correction, 1e-5, 0.0).unwrap();
    assert!(quality::is_unique(unique));

    // Two equally likely placements
    let repeat = quality::alignment_score_from_probability(correction, 1e-5, 1e-5).unwrap();
    assert_eq!(repeat, REPEAT_ALIGNMENT_SCORE);
    assert!(!quality::is_unique(repeat));
}

#[test]
fn test_alignment_score_rejects_invalid_input() {
    assert!(matches!(
        quality::alignment_score_from_probability(0.0, 0.5, 0.0),
        Err(QualityError::InvalidProbability(_))
    ));
    assert!(quality::alignment_score_from_probability(1e-9, f64::NAN, 0.0).is_err());
    assert!(quality::alignment_score_from_probability(-1.0, 0.5, 0.0).is_err());
}

#[test]
fn test_score_to_mapq_caps() {
    assert_eq!(quality::score_to_mapq(0).unwrap(), 0);
    assert_eq!(quality::score_to_mapq(37).unwrap(), 37);
    assert_eq!(quality::score_to_mapq(1000).unwrap(), MAX_MAPQ);
    assert!(matches!(
        quality::score_to_mapq(UNKNOWN_ALIGNMENT_SCORE),
        Err(QualityError::UnknownScore)
    ));
}

#[test]
fn test_pick_mapq_proper_pair_rescue() {
    // Repeat end of a proper pair is rescued up to what the mate supports
    assert_eq!(quality::pick_mapq(3, 40, true, 50).unwrap(), 40);
    assert_eq!(quality::pick_mapq(3, 40, true, 20).unwrap(), 20);
    // Not a proper pair: own score only
    assert_eq!(quality::pick_mapq(3, 40, false, 50).unwrap(), 3);
    // Never lowered by the template
    assert_eq!(quality::pick_mapq(45, 10, true, 10).unwrap(), 45);

    assert!(quality::pick_mapq(3, UNKNOWN_ALIGNMENT_SCORE, true, 50).is_err());
}

#[test]
fn test_pick_mapq_from_mate_caps_at_mate() {
    assert_eq!(quality::pick_mapq_from_mate(25, 50).unwrap(), 25);
    assert_eq!(quality::pick_mapq_from_mate(60, 30).unwrap(), 30);
    assert_eq!(quality::pick_mapq_from_mate(60, 500).unwrap(), MAX_MAPQ);
    assert!(matches!(
        quality::pick_mapq_from_mate(UNKNOWN_MAPQ, 30),
        Err(QualityError::UnknownMapq)
    ));
}

#[test]
fn test_trim_low_quality_end() {
    let mut qualities = vec![35u8; 40];
    qualities[37..].copy_from_slice(&[2, 2, 2]);
    assert_eq!(quality::trim_low_quality_end(&qualities, 20), 3);

    // A single good base inside a poor tail does not stop trimming
    qualities[34..].copy_from_slice(&[2, 2, 25, 2, 2, 2]);
    assert_eq!(quality::trim_low_quality_end(&qualities, 20), 6);

    assert_eq!(quality::trim_low_quality_end(&qualities, 0), 0);
    assert_eq!(quality::trim_low_quality_end(&qualities[..20], 20), 0);
}
