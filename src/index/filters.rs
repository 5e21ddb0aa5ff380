//! Contig acceptance predicates and decoy classification
//!
//! Reporting and output stages decide per contig whether it takes part in the
//! run. The decision is a single capability (`ContigFilter::include`) so any
//! predicate value, including a plain closure, can be passed where filtering
//! is needed.

use regex::Regex;

use super::IndexError;
use super::contig::Contig;

/// Decides whether a contig is included in a filtered contig list
pub trait ContigFilter {
    fn include(&self, contig: &Contig) -> bool;
}

impl<F> ContigFilter for F
where
    F: Fn(&Contig) -> bool,
{
    fn include(&self, contig: &Contig) -> bool {
        self(contig)
    }
}

/// Includes every contig
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllContigs;

impl ContigFilter for AcceptAllContigs {
    fn include(&self, _contig: &Contig) -> bool {
        true
    }
}

/// Excludes contigs carrying the decoy flag
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectDecoyContigs;

impl ContigFilter for RejectDecoyContigs {
    fn include(&self, contig: &Contig) -> bool {
        !contig.decoy
    }
}

/// Classifies a contig name as decoy or not
pub trait DecoyClassifier {
    fn is_decoy(&self, contig_name: &str) -> bool;
}

impl<F> DecoyClassifier for F
where
    F: Fn(&str) -> bool,
{
    fn is_decoy(&self, contig_name: &str) -> bool {
        self(contig_name)
    }
}

/// Decoy classifier matching a regular expression anywhere in the contig name
#[derive(Debug, Clone)]
pub struct DecoyNamePattern {
    regex: Regex,
}

impl DecoyNamePattern {
    pub fn new(pattern: &str) -> Result<Self, IndexError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl DecoyClassifier for DecoyNamePattern {
    fn is_decoy(&self, contig_name: &str) -> bool {
        self.regex.is_match(contig_name)
    }
}

/// Excludes contigs whose name the classifier reports as decoy, regardless of
/// the stored decoy flag
#[derive(Debug, Clone)]
pub struct RejectDecoyByName<C = DecoyNamePattern> {
    classifier: C,
}

impl<C: DecoyClassifier> RejectDecoyByName<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }
}

impl RejectDecoyByName<DecoyNamePattern> {
    pub fn from_pattern(pattern: &str) -> Result<Self, IndexError> {
        Ok(Self::new(DecoyNamePattern::new(pattern)?))
    }
}

impl<C: DecoyClassifier> ContigFilter for RejectDecoyByName<C> {
    fn include(&self, contig: &Contig) -> bool {
        !self.classifier.is_decoy(&contig.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contig(name: &str, decoy: bool) -> Contig {
        let mut c = Contig::new(0, name, 0, 10);
        c.decoy = decoy;
        c
    }

    #[test]
    fn test_stock_filters() {
        let decoy = contig("chrUn_decoy", true);
        let primary = contig("chr1", false);

        assert!(AcceptAllContigs.include(&decoy));
        assert!(AcceptAllContigs.include(&primary));
        assert!(!RejectDecoyContigs.include(&decoy));
        assert!(RejectDecoyContigs.include(&primary));
    }

    #[test]
    fn test_decoy_name_pattern_searches_substring() {
        let pattern = DecoyNamePattern::new("decoy|hs37d5").unwrap();
        assert!(pattern.is_decoy("chrUn_JTFH01000001v1_decoy"));
        assert!(pattern.is_decoy("hs37d5"));
        assert!(!pattern.is_decoy("chr1"));
    }

    #[test]
    fn test_reject_by_name_ignores_flag() {
        let filter = RejectDecoyByName::from_pattern("_decoy$").unwrap();
        assert!(!filter.include(&contig("chrUn_decoy", false)));
        assert!(filter.include(&contig("chr1", true)));
    }

    #[test]
    fn test_closure_filter() {
        let short_only = |c: &Contig| c.total_bases < 100;
        assert!(short_only.include(&contig("chrM", false)));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = DecoyNamePattern::new("(unclosed").unwrap_err();
        assert!(matches!(err, IndexError::InvalidDecoyPattern(_)));
    }
}
