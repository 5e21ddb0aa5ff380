//! Template length model for paired reads
//!
//! Estimates, per barcode, the dominant mate orientation (FF, FR, RF, RR) and
//! the template lengths that count as a proper pair:
//!
//! - Collect template lengths of unique, same-contig pairs per orientation
//! - Keep the orientation with the most pairs (at least `MIN_DIR_CNT`)
//! - Percentile statistics with outlier removal for mean / std.dev
//! - Proper-pair bounds from the IQR, widened to `mean ± MAX_STDDEV·sd`

use std::fmt;

use crate::core::alignment::FragmentMetadata;

const MIN_DIR_CNT: usize = 10; // Minimum pairs for an orientation
const OUTLIER_BOUND: f64 = 2.0; // IQR multiplier for outliers
const MAPPING_BOUND: f64 = 3.0; // IQR multiplier for mapping
const MAX_STDDEV: f64 = 4.0; // Max standard deviations for boundaries
/// Longer templates are not used for estimation
pub const MAX_TEMPLATE_LENGTH: u64 = 10_000;

/// Relative strand of the leftmost and rightmost mate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PairOrientation {
    FF,
    FR,
    RF,
    RR,
}

impl PairOrientation {
    pub const ALL: [PairOrientation; 4] = [
        PairOrientation::FF,
        PairOrientation::FR,
        PairOrientation::RF,
        PairOrientation::RR,
    ];

    fn from_strands(left_reverse: bool, right_reverse: bool) -> Self {
        match (left_reverse, right_reverse) {
            (false, false) => PairOrientation::FF,
            (false, true) => PairOrientation::FR,
            (true, false) => PairOrientation::RF,
            (true, true) => PairOrientation::RR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PairOrientation::FF => "FF",
            PairOrientation::FR => "FR",
            PairOrientation::RF => "RF",
            PairOrientation::RR => "RR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for PairOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orientation and template length of two mates, `None` when they are on
/// different contigs or either is unaligned
pub fn infer_orientation(
    mate1: &FragmentMetadata,
    mate2: &FragmentMetadata,
) -> Option<(PairOrientation, u64)> {
    if !mate1.is_aligned() || !mate2.is_aligned() || mate1.contig_id != mate2.contig_id {
        return None;
    }
    let (left, right) = if mate1.position <= mate2.position {
        (mate1, mate2)
    } else {
        (mate2, mate1)
    };
    let begin = left.position.min(right.position);
    let end = left.end_position().max(right.end_position());
    let length = u64::try_from(end - begin).ok()?;
    Some((PairOrientation::from_strands(left.reverse, right.reverse), length))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLengthStatistics {
    orientation: PairOrientation,
    min: u64,
    max: u64,
    median: u64,
    mean: f64,
    std_dev: f64,
    stable: bool,
}

impl Default for TemplateLengthStatistics {
    fn default() -> Self {
        Self::unstable()
    }
}

impl TemplateLengthStatistics {
    /// Placeholder before estimation, or when there is not enough evidence.
    /// No pair is proper under an unstable model.
    pub fn unstable() -> Self {
        Self {
            orientation: PairOrientation::FR,
            min: 0,
            max: 0,
            median: 0,
            mean: 0.0,
            std_dev: 0.0,
            stable: false,
        }
    }

    /// Model supplied by the user; overrides estimation
    pub fn user(orientation: PairOrientation, min: u64, max: u64, median: u64) -> Self {
        Self {
            orientation,
            min,
            max,
            median,
            mean: median as f64,
            std_dev: 0.0,
            stable: true,
        }
    }

    /// Estimate from mate pairs of one barcode
    pub fn estimate<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a FragmentMetadata, &'a FragmentMetadata)>,
    {
        let mut lengths: [Vec<u64>; 4] = Default::default();
        for (mate1, mate2) in pairs {
            if let Some((orientation, length)) = infer_orientation(mate1, mate2) {
                if length > 0 && length <= MAX_TEMPLATE_LENGTH {
                    lengths[orientation as usize].push(length);
                }
            }
        }

        log::info!(
            "[TLS] # candidate unique pairs for (FF, FR, RF, RR): ({}, {}, {}, {})",
            lengths[0].len(),
            lengths[1].len(),
            lengths[2].len(),
            lengths[3].len()
        );

        let Some((best, _)) = lengths
            .iter()
            .enumerate()
            .max_by_key(|(d, sizes)| (sizes.len(), std::cmp::Reverse(*d)))
        else {
            return Self::unstable();
        };
        let orientation = PairOrientation::ALL[best];
        let sizes = &mut lengths[best];
        if sizes.len() < MIN_DIR_CNT {
            log::info!("[TLS] not enough pairs to estimate the template length model");
            return Self::unstable();
        }

        sizes.sort_unstable();
        let percentile = |p: f64| sizes[((p * sizes.len() as f64 + 0.499) as usize).min(sizes.len() - 1)];
        let p25 = percentile(0.25) as f64;
        let p50 = percentile(0.50);
        let p75 = percentile(0.75) as f64;
        let iqr = p75 - p25;

        let outlier_low = (p25 - OUTLIER_BOUND * iqr + 0.499).max(1.0);
        let outlier_high = p75 + OUTLIER_BOUND * iqr + 0.499;
        log::info!("[TLS] {orientation} (25, 50, 75) percentile: ({p25}, {p50}, {p75})");

        let inliers: Vec<f64> = sizes
            .iter()
            .map(|&s| s as f64)
            .filter(|&s| s >= outlier_low.trunc() && s <= outlier_high.trunc())
            .collect();
        if inliers.is_empty() {
            log::warn!("[TLS] no valid samples for orientation {orientation} within bounds");
            return Self::unstable();
        }
        let mean = inliers.iter().sum::<f64>() / inliers.len() as f64;
        let std_dev = (inliers.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / inliers.len() as f64).sqrt();
        log::info!("[TLS] mean and std.dev: ({mean:.2}, {std_dev:.2})");

        let low = (p25 - MAPPING_BOUND * iqr + 0.499).min(mean - MAX_STDDEV * std_dev + 0.499);
        let high = (p75 + MAPPING_BOUND * iqr + 0.499).max(mean + MAX_STDDEV * std_dev + 0.499);
        let min = low.max(1.0) as u64;
        let max = high.max(1.0) as u64;
        log::info!("[TLS] low and high boundaries for proper pairs: ({min}, {max})");

        Self {
            orientation,
            min,
            max,
            median: p50,
            mean,
            std_dev,
            stable: true,
        }
    }

    pub fn is_stable(&self) -> bool {
        self.stable
    }

    pub fn orientation(&self) -> PairOrientation {
        self.orientation
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn median(&self) -> u64 {
        self.median
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Same contig, the model's orientation and a template length within bounds
    pub fn is_proper_pair(&self, mate1: &FragmentMetadata, mate2: &FragmentMetadata) -> bool {
        if !self.stable {
            return false;
        }
        match infer_orientation(mate1, mate2) {
            Some((orientation, length)) => {
                orientation == self.orientation && length >= self.min && length <= self.max
            }
            None => false,
        }
    }
}

impl fmt::Display for TemplateLengthStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.stable {
            return write!(f, "TemplateLengthStatistics(unstable)");
        }
        write!(
            f,
            "TemplateLengthStatistics({}:{}-{}, median {}, mean {:.2}, sd {:.2})",
            self.orientation, self.min, self.max, self.median, self.mean, self.std_dev
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::CigarOp;

    fn mate(position: i64, reverse: bool) -> FragmentMetadata {
        let mut f = FragmentMetadata::new(0);
        f.reset_alignment(0, reverse, position);
        f.cigar.push(CigarOp::M, 100);
        f.observed_length = 100;
        f
    }

    #[test]
    fn test_infer_orientation() {
        let (o, len) = infer_orientation(&mate(1000, false), &mate(1200, true)).unwrap();
        assert_eq!(o, PairOrientation::FR);
        assert_eq!(len, 300);

        // Mate order does not matter
        let (o, len) = infer_orientation(&mate(1200, true), &mate(1000, false)).unwrap();
        assert_eq!(o, PairOrientation::FR);
        assert_eq!(len, 300);

        let mut other_contig = mate(1200, true);
        other_contig.contig_id = 1;
        assert!(infer_orientation(&mate(1000, false), &other_contig).is_none());
    }

    #[test]
    fn test_estimate_fr_library() {
        let pairs: Vec<_> = (0..200)
            .map(|i| (mate(i * 1000, false), mate(i * 1000 + 200 + i % 21 - 10, true)))
            .collect();
        let tls = TemplateLengthStatistics::estimate(pairs.iter().map(|(a, b)| (a, b)));
        assert!(tls.is_stable());
        assert_eq!(tls.orientation(), PairOrientation::FR);
        assert!(tls.min() < 290 && tls.max() > 310, "{tls}");
        assert!(tls.is_proper_pair(&mate(5000, false), &mate(5200, true)));
        assert!(!tls.is_proper_pair(&mate(5000, true), &mate(5200, false)));
        assert!(!tls.is_proper_pair(&mate(5000, false), &mate(9000, true)));
    }

    #[test]
    fn test_too_few_pairs_is_unstable() {
        let pairs: Vec<_> = (0..5).map(|i| (mate(i * 1000, false), mate(i * 1000 + 200, true))).collect();
        let tls = TemplateLengthStatistics::estimate(pairs.iter().map(|(a, b)| (a, b)));
        assert!(!tls.is_stable());
        assert!(!tls.is_proper_pair(&mate(0, false), &mate(200, true)));
    }

    #[test]
    fn test_user_model() {
        let tls = TemplateLengthStatistics::user(PairOrientation::RF, 100, 500, 300);
        assert!(tls.is_stable());
        assert!(tls.is_proper_pair(&mate(0, true), &mate(200, false)));
        assert_eq!(PairOrientation::parse("rf"), Some(PairOrientation::RF));
    }
}
