//! Seed search outcome counters
//!
//! `MatchFinderTileStats` is a commutative monoid under field-wise addition
//! with the all-zero record as identity. Workers keep a private record per
//! tile and partial results are combined in any order or tree shape.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Seed classification counts for one tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MatchFinderTileStats {
    /// Seeds with exactly one reference match
    pub unique_match_seeds: u64,
    /// Seeds with no reference match
    pub no_match_seeds: u64,
    /// Seeds with more than one match, below the repeat threshold
    pub repeat_match_seeds: u64,
    /// Seeds whose match count exceeded the repeat threshold
    pub too_many_repeats_seeds: u64,
    /// Matches produced by repeat seeds
    pub repeat_matches: u64,
}

impl MatchFinderTileStats {
    pub fn combine(self, other: Self) -> Self {
        Self {
            unique_match_seeds: self.unique_match_seeds + other.unique_match_seeds,
            no_match_seeds: self.no_match_seeds + other.no_match_seeds,
            repeat_match_seeds: self.repeat_match_seeds + other.repeat_match_seeds,
            too_many_repeats_seeds: self.too_many_repeats_seeds + other.too_many_repeats_seeds,
            repeat_matches: self.repeat_matches + other.repeat_matches,
        }
    }

    pub fn total_seeds(&self) -> u64 {
        self.unique_match_seeds
            + self.no_match_seeds
            + self.repeat_match_seeds
            + self.too_many_repeats_seeds
    }

    /// Fraction of seeds classified as repeats (0 when no seeds were searched)
    pub fn repeat_seed_ratio(&self) -> f64 {
        let total = self.total_seeds();
        if total == 0 {
            0.0
        } else {
            (self.repeat_match_seeds + self.too_many_repeats_seeds) as f64 / total as f64
        }
    }
}

impl Add for MatchFinderTileStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.combine(rhs)
    }
}

impl AddAssign for MatchFinderTileStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.combine(rhs);
    }
}

impl Sum for MatchFinderTileStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a MatchFinderTileStats> for MatchFinderTileStats {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    fn stats(seed: u64) -> MatchFinderTileStats {
        MatchFinderTileStats {
            unique_match_seeds: seed * 7,
            no_match_seeds: seed % 5,
            repeat_match_seeds: seed * 3 + 1,
            too_many_repeats_seeds: seed % 2,
            repeat_matches: seed * 11,
        }
    }

    #[test]
    fn test_identity() {
        let a = stats(9);
        assert_eq!(a + MatchFinderTileStats::default(), a);
        assert_eq!(MatchFinderTileStats::default() + a, a);
    }

    #[test]
    fn test_commutative_and_associative() {
        let (a, b, c) = (stats(1), stats(2), stats(3));
        assert_eq!(a + b, b + a);
        assert_eq!((a + b) + c, a + (b + c));
    }

    #[test]
    fn test_parallel_reduce_matches_sequential() {
        let tiles: Vec<_> = (0..1000).map(stats).collect();
        let sequential: MatchFinderTileStats = tiles.iter().sum();
        let parallel = tiles
            .par_iter()
            .copied()
            .reduce(MatchFinderTileStats::default, Add::add);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_ratio() {
        let s = MatchFinderTileStats {
            unique_match_seeds: 6,
            repeat_match_seeds: 3,
            too_many_repeats_seeds: 1,
            ..Default::default()
        };
        assert_eq!(s.total_seeds(), 10);
        assert!((s.repeat_seed_ratio() - 0.4).abs() < 1e-12);
        assert_eq!(MatchFinderTileStats::default().repeat_seed_ratio(), 0.0);
    }
}
