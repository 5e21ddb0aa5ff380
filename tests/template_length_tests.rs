// Template length model estimation and proper-pair checks

use ferrous_seedmap::core::alignment::{CigarOp, FragmentMetadata};
use ferrous_seedmap::core::quality;
use ferrous_seedmap::pipelines::template_length::{
    PairOrientation, TemplateLengthStatistics, infer_orientation,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn mate(contig_id: u32, position: i64, reverse: bool, length: u32) -> FragmentMetadata {
    let mut f = FragmentMetadata::new(0);
    f.reset_alignment(contig_id, reverse, position);
    f.cigar.push(CigarOp::M, length);
    f.observed_length = u64::from(length);
    f
}

/// FR pairs with template lengths around `center`
fn library(rng: &mut StdRng, count: usize, center: i64) -> Vec<(FragmentMetadata, FragmentMetadata)> {
    (0..count)
        .map(|i| {
            let start = i as i64 * 5000;
            let template = center + rng.gen_range(-30..=30);
            (
                mate(0, start, false, 100),
                mate(0, start + template - 100, true, 100),
            )
        })
        .collect()
}

#[test]
fn test_estimate_dominant_orientation() {
    let mut rng = StdRng::seed_from_u64(0x715_0000_0001);
    let mut pairs = library(&mut rng, 500, 350);
    // A minority of RF pairs does not change the model
    for i in 0..20 {
        let start = 10_000_000 + i * 5000;
        pairs.push((mate(0, start, true, 100), mate(0, start + 250, false, 100)));
    }

    let tls = TemplateLengthStatistics::estimate(pairs.iter().map(|(a, b)| (a, b)));
    assert!(tls.is_stable());
    assert_eq!(tls.orientation(), PairOrientation::FR);
    assert!((tls.median() as i64 - 350).abs() <= 30);
    assert!(tls.min() <= 320 && tls.max() >= 380, "{tls}");
    assert!((tls.mean() - 350.0).abs() < 10.0);
}

#[test]
fn test_proper_pair_rules() {
    let mut rng = StdRng::seed_from_u64(0x715_0000_0002);
    let pairs = library(&mut rng, 300, 400);
    let tls = TemplateLengthStatistics::estimate(pairs.iter().map(|(a, b)| (a, b)));

    let left = mate(0, 50_000, false, 100);
    assert!(tls.is_proper_pair(&left, &mate(0, 50_300, true, 100)));
    // Wrong orientation
    assert!(!tls.is_proper_pair(&left, &mate(0, 50_300, false, 100)));
    // Different contig
    assert!(!tls.is_proper_pair(&left, &mate(1, 50_300, true, 100)));
    // Far outside the bounds
    assert!(!tls.is_proper_pair(&left, &mate(0, 60_000, true, 100)));
    // Unaligned mate
    assert!(!tls.is_proper_pair(&left, &FragmentMetadata::new(1)));
}

#[test]
fn test_orientation_and_length_inference() {
    let (orientation, length) =
        infer_orientation(&mate(0, 500, true, 50), &mate(0, 100, true, 100)).unwrap();
    assert_eq!(orientation, PairOrientation::RR);
    assert_eq!(length, 450);
}

#[test]
fn test_user_model_drives_mapq_rescue() {
    let tls = TemplateLengthStatistics::user(PairOrientation::FR, 200, 600, 400);
    let repeat_end = mate(0, 1000, false, 100);
    let unique_mate = mate(0, 1300, true, 100);

    let proper = tls.is_proper_pair(&repeat_end, &unique_mate);
    assert!(proper);
    let mapq = quality::pick_mapq(3, 45, proper, 60).unwrap();
    assert_eq!(mapq, 45);

    let far_mate = mate(0, 5000, true, 100);
    let proper = tls.is_proper_pair(&repeat_end, &far_mate);
    assert_eq!(quality::pick_mapq(3, 45, proper, 60).unwrap(), 3);
}

#[test]
fn test_unstable_without_evidence() {
    let tls = TemplateLengthStatistics::estimate(std::iter::empty::<(&FragmentMetadata, &FragmentMetadata)>());
    assert!(!tls.is_stable());
    assert_eq!(tls, TemplateLengthStatistics::default());
}
