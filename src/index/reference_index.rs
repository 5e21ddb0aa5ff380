//! Sorted reference catalog
//!
//! `ReferenceIndex` describes one preprocessed reference: its contigs, the
//! k-mer hash-table shards for every supported seed length and the optional
//! k-uniqueness / k-repeatness annotation tables.
//!
//! # Invariants
//!
//! - Contig indices are dense with no gaps or duplicates, starting at the
//!   first contig's index. A standalone reference starts at 0; a partial
//!   reference prepared for merging starts where the one it continues ends.
//!   Filtered listings and offset lookups rely on this.
//! - Contigs are ordered by `genomic_position` and do not overlap.
//! - Within a seed length every shard has a unique `(mask_width, mask)` and
//!   `mask < 2^mask_width`.
//!
//! The contig invariants are checked by `rebuild()` after every mutation
//! (`put_contig`, `merge`). A failed mutation leaves the catalog unchanged.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::IndexError;
use super::contig::{Contig, ReferencePosition, genome_length, genomic_offset_to_position};
use super::filters::{ContigFilter, DecoyClassifier};

pub const OLDEST_SUPPORTED_FORMAT_VERSION: u32 = 3;
pub const CURRENT_FORMAT_VERSION: u32 = 9;

/// Longest seed a packed k-mer can hold, 2 bits per base in a `u128`
pub const MAX_SEED_LENGTH: u32 = 64;

/// One hash-table shard of the k-mer space for a given seed length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskFile {
    pub path: PathBuf,
    /// Number of high-order k-mer bits used to partition the k-mer space
    pub mask_width: u32,
    /// This shard's partition value, in `[0, 2^mask_width)`
    pub mask: u32,
    /// Number of k-mers stored in the shard
    pub kmers: u64,
}

impl MaskFile {
    pub fn new(path: impl Into<PathBuf>, mask_width: u32, mask: u32, kmers: u64) -> Self {
        Self {
            path: path.into(),
            mask_width,
            mask,
            kmers,
        }
    }

    #[inline]
    fn identity(&self) -> (u32, u32) {
        (self.mask_width, self.mask)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationType {
    /// Consecutive matches needed to have few distance-k neighbors and no repeats
    KUniqueness,
    /// Consecutive matches needed to have no neighbors at all
    KRepeatness,
}

impl AnnotationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationType::KUniqueness => "kuniqueness",
            AnnotationType::KRepeatness => "krepeatness",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "kuniqueness" => Some(AnnotationType::KUniqueness),
            "krepeatness" => Some(AnnotationType::KRepeatness),
            _ => None,
        }
    }
}

impl fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// k-uniqueness or k-repeatness side table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationFile {
    pub annotation_type: AnnotationType,
    pub path: PathBuf,
    /// Distance / context parameter the table was computed for
    pub k: u32,
}

impl fmt::Display for AnnotationFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotationFile({},{})", self.k, self.path.display())
    }
}

/// Reference catalog: contigs, k-mer shards and annotations
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceIndex {
    format_version: u32,
    contigs: Vec<Contig>,
    mask_files: BTreeMap<u32, Vec<MaskFile>>,
    annotations: Vec<AnnotationFile>,
}

impl Default for ReferenceIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self {
            format_version: CURRENT_FORMAT_VERSION,
            contigs: Vec::new(),
            mask_files: BTreeMap::new(),
            annotations: Vec::new(),
        }
    }

    /// Empty catalog declaring an explicit format version
    pub fn with_format_version(format_version: u32) -> Result<Self, IndexError> {
        check_format_version(format_version)?;
        Ok(Self {
            format_version,
            ..Self::new()
        })
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    // ========================================================================
    // Contigs
    // ========================================================================

    /// Contigs in karyotype order; `contigs()[i].index == first_contig_index() + i`
    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    /// Index of the first contig, 0 when the catalog has none
    pub fn first_contig_index(&self) -> u32 {
        self.contigs.first().map_or(0, |c| c.index)
    }

    /// Index the next appended contig must carry
    pub fn next_contig_index(&self) -> usize {
        self.first_contig_index() as usize + self.contigs.len()
    }

    pub fn contig_count(&self) -> usize {
        self.contigs.len()
    }

    pub fn contig(&self, index: u32) -> Option<&Contig> {
        let slot = index.checked_sub(self.first_contig_index())?;
        self.contigs.get(slot as usize)
    }

    /// Store a contig at its index: replaces an existing contig or appends the
    /// next one. Any other index would open a gap and is rejected. The first
    /// contig of an empty catalog sets where numbering starts.
    pub fn put_contig(&mut self, contig: Contig) -> Result<(), IndexError> {
        let first = if self.contigs.is_empty() {
            contig.index
        } else {
            self.first_contig_index()
        };
        let expected = self.next_contig_index();
        let slot = match contig.index.checked_sub(first) {
            Some(slot) if slot as usize <= self.contigs.len() => slot as usize,
            _ => {
                return Err(IndexError::ContigDensity {
                    index: contig.index,
                    expected,
                });
            }
        };

        let replaced = if slot < self.contigs.len() {
            Some(std::mem::replace(&mut self.contigs[slot], contig))
        } else {
            self.contigs.push(contig);
            None
        };

        if let Err(e) = self.rebuild() {
            match replaced {
                Some(previous) => self.contigs[slot] = previous,
                None => {
                    self.contigs.pop();
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Restore karyotype order and verify the density and genomic-order
    /// invariants over the whole contig list.
    pub fn rebuild(&mut self) -> Result<(), IndexError> {
        self.contigs.sort_by_key(|c| c.index);
        validate_contigs(&self.contigs)
    }

    /// Contigs accepted by `filter`, in karyotype order
    pub fn filtered_contigs<F: ContigFilter + ?Sized>(&self, filter: &F) -> Vec<Contig> {
        self.contigs
            .iter()
            .filter(|c| filter.include(c))
            .cloned()
            .collect()
    }

    pub fn filtered_contig_count<F: ContigFilter + ?Sized>(&self, filter: &F) -> usize {
        self.contigs.iter().filter(|c| filter.include(c)).count()
    }

    /// Set every contig's decoy flag from its name
    pub fn classify_decoys<C: DecoyClassifier + ?Sized>(&mut self, classifier: &C) -> usize {
        let mut decoys = 0;
        for contig in &mut self.contigs {
            contig.decoy = classifier.is_decoy(&contig.name);
            if contig.decoy {
                decoys += 1;
            }
        }
        log::debug!(
            "Classified {} of {} contigs as decoy",
            decoys,
            self.contigs.len()
        );
        decoys
    }

    pub fn genome_length(&self) -> u64 {
        genome_length(&self.contigs)
    }

    /// See [`genomic_offset_to_position`]
    pub fn genomic_offset_to_position(&self, genomic_offset: u64) -> ReferencePosition {
        genomic_offset_to_position(genomic_offset, &self.contigs)
    }

    /// True when all contigs come from the same sequence file
    pub fn single_file_reference(&self) -> bool {
        self.contigs
            .windows(2)
            .all(|w| w[0].file_path == w[1].file_path)
    }

    // ========================================================================
    // K-mer shards
    // ========================================================================

    /// Append a shard to the list of `seed_length`, which must be between 1
    /// and [`MAX_SEED_LENGTH`]
    pub fn add_mask_file(
        &mut self,
        seed_length: u32,
        mask_width: u32,
        mask: u32,
        path: impl Into<PathBuf>,
        kmers: u64,
    ) -> Result<(), IndexError> {
        if seed_length == 0 || seed_length > MAX_SEED_LENGTH {
            return Err(IndexError::UnsupportedSeedLength(seed_length));
        }
        if mask_width >= 32 || u64::from(mask) >= 1u64 << mask_width {
            return Err(IndexError::InvalidMask { mask_width, mask });
        }

        let shards = self.mask_files.entry(seed_length).or_default();
        if shards
            .iter()
            .any(|s| s.identity() == (mask_width, mask))
        {
            return Err(IndexError::DuplicateShard {
                seed_length,
                mask_width,
                mask,
            });
        }
        shards.push(MaskFile::new(path, mask_width, mask, kmers));
        Ok(())
    }

    pub fn supports_seed_length(&self, seed_length: u32) -> bool {
        self.mask_files.contains_key(&seed_length)
    }

    pub fn seed_lengths(&self) -> impl Iterator<Item = u32> + '_ {
        self.mask_files.keys().copied()
    }

    pub fn mask_files(&self, seed_length: u32) -> Result<&[MaskFile], IndexError> {
        self.mask_files
            .get(&seed_length)
            .map(Vec::as_slice)
            .ok_or(IndexError::UnsupportedSeedLength(seed_length))
    }

    /// Total number of k-mers over all shards of a seed length
    pub fn total_kmers(&self, seed_length: u32) -> u64 {
        self.mask_files
            .get(&seed_length)
            .map(|shards| shards.iter().map(|s| s.kmers).sum())
            .unwrap_or(0)
    }

    /// Shard holding `kmer`, a k-mer of `seed_length` bases packed 2 bits per
    /// base with the first base in the high-order bits.
    pub fn shard_for_kmer(&self, seed_length: u32, kmer: u128) -> Result<Option<&MaskFile>, IndexError> {
        let shards = self.mask_files(seed_length)?;
        let kmer_bits = seed_length
            .checked_mul(2)
            .filter(|&bits| bits <= u128::BITS)
            .ok_or(IndexError::UnsupportedSeedLength(seed_length))?;
        Ok(shards.iter().find(|shard| {
            let Some(shift) = kmer_bits.checked_sub(shard.mask_width) else {
                return false;
            };
            let prefix = if shard.mask_width == 0 {
                0
            } else {
                kmer.checked_shr(shift).unwrap_or(0)
            };
            prefix == u128::from(shard.mask)
        }))
    }

    /// True when the shards of `seed_length` share one mask width and cover
    /// every mask value exactly once
    pub fn is_complete_partition(&self, seed_length: u32) -> bool {
        let Some(shards) = self.mask_files.get(&seed_length) else {
            return false;
        };
        let Some(first) = shards.first() else {
            return false;
        };
        let width = first.mask_width;
        if shards.iter().any(|s| s.mask_width != width) {
            return false;
        }

        let expected = 1usize << width;
        if shards.len() != expected {
            return false;
        }
        let mut seen = vec![false; expected];
        for shard in shards {
            let slot = &mut seen[shard.mask as usize];
            if *slot {
                return false;
            }
            *slot = true;
        }
        true
    }

    pub fn clear_masks(&mut self) {
        self.mask_files.clear();
    }

    // ========================================================================
    // Annotations
    // ========================================================================

    fn annotation(&self, annotation_type: AnnotationType) -> Option<&AnnotationFile> {
        self.annotations
            .iter()
            .find(|a| a.annotation_type == annotation_type)
    }

    pub fn has_annotation(&self, annotation_type: AnnotationType) -> bool {
        self.annotation(annotation_type).is_some()
    }

    /// Annotation of the given type. Callers check `has_annotation` first;
    /// asking for a missing one is a precondition failure.
    pub fn get_annotation(&self, annotation_type: AnnotationType) -> Result<&AnnotationFile, IndexError> {
        self.annotation(annotation_type)
            .ok_or(IndexError::MissingAnnotation(annotation_type))
    }

    /// Create or replace the annotation of the given type
    pub fn set_annotation(&mut self, annotation_type: AnnotationType, path: impl Into<PathBuf>, k: u32) {
        let annotation = AnnotationFile {
            annotation_type,
            path: path.into(),
            k,
        };
        match self
            .annotations
            .iter_mut()
            .find(|a| a.annotation_type == annotation_type)
        {
            Some(existing) => *existing = annotation,
            None => self.annotations.push(annotation),
        }
    }

    pub fn annotations(&self) -> &[AnnotationFile] {
        &self.annotations
    }

    pub fn has_kuniqueness_annotation(&self) -> bool {
        self.has_annotation(AnnotationType::KUniqueness)
    }

    pub fn kuniqueness_annotation(&self) -> Result<&AnnotationFile, IndexError> {
        self.get_annotation(AnnotationType::KUniqueness)
    }

    pub fn set_kuniqueness_annotation(&mut self, path: impl Into<PathBuf>, k: u32) {
        self.set_annotation(AnnotationType::KUniqueness, path, k);
    }

    pub fn has_krepeatness_annotation(&self) -> bool {
        self.has_annotation(AnnotationType::KRepeatness)
    }

    pub fn krepeatness_annotation(&self) -> Result<&AnnotationFile, IndexError> {
        self.get_annotation(AnnotationType::KRepeatness)
    }

    pub fn set_krepeatness_annotation(&mut self, path: impl Into<PathBuf>, k: u32) {
        self.set_annotation(AnnotationType::KRepeatness, path, k);
    }

    pub fn clear_annotations(&mut self) {
        self.annotations.clear();
    }

    // ========================================================================
    // Whole-catalog operations
    // ========================================================================

    /// Union `other` into this catalog.
    ///
    /// `other` must continue the contig numbering: its lowest index has to be
    /// `self.next_contig_index()`. Two catalogs that both number their contigs
    /// from 0 are rejected rather than renumbered. Shards with an identity already
    /// present for the same seed length are rejected, and annotations are
    /// adopted only for types this catalog does not have yet. On error the
    /// catalog is left unchanged.
    pub fn merge(&mut self, other: ReferenceIndex) -> Result<(), IndexError> {
        let expected = self.next_contig_index();
        if let Some(first) = other.contigs.iter().map(|c| c.index).min() {
            if !self.contigs.is_empty() && first as usize != expected {
                return Err(IndexError::MergeDensity { first, expected });
            }
        }

        let mut contigs = self.contigs.clone();
        contigs.extend(other.contigs);
        contigs.sort_by_key(|c| c.index);
        validate_contigs(&contigs).map_err(|e| match e {
            IndexError::ContigDensity { index, expected } => IndexError::MergeDensity {
                first: index,
                expected,
            },
            other => other,
        })?;

        let mut mask_files = self.mask_files.clone();
        for (seed_length, shards) in other.mask_files {
            let merged = mask_files.entry(seed_length).or_default();
            for shard in shards {
                if merged.iter().any(|s| s.identity() == shard.identity()) {
                    return Err(IndexError::DuplicateShard {
                        seed_length,
                        mask_width: shard.mask_width,
                        mask: shard.mask,
                    });
                }
                merged.push(shard);
            }
        }

        let mut annotations = self.annotations.clone();
        for annotation in other.annotations {
            match annotations
                .iter()
                .find(|a| a.annotation_type == annotation.annotation_type)
            {
                Some(existing) if *existing != annotation => {
                    return Err(IndexError::AnnotationConflict(annotation.annotation_type));
                }
                Some(_) => {}
                None => annotations.push(annotation),
            }
        }

        log::debug!(
            "Merged reference: {} -> {} contigs, {} seed lengths",
            self.contigs.len(),
            contigs.len(),
            mask_files.len()
        );

        self.contigs = contigs;
        self.mask_files = mask_files;
        self.annotations = annotations;
        Ok(())
    }

    /// Resolve relative contig, shard and annotation paths against `base`
    pub fn make_absolute_paths(&mut self, base: &Path) {
        let absolute = |p: &mut PathBuf| {
            if p.is_relative() && !p.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        for contig in &mut self.contigs {
            absolute(&mut contig.file_path);
        }
        for shard in self.mask_files.values_mut().flatten() {
            absolute(&mut shard.path);
        }
        for annotation in &mut self.annotations {
            absolute(&mut annotation.path);
        }
    }
}

/// Length of the longest genome in a list of references
pub fn longest_genome_length(references: &[ReferenceIndex]) -> u64 {
    references
        .iter()
        .map(ReferenceIndex::genome_length)
        .max()
        .unwrap_or(0)
}

pub(crate) fn check_format_version(format_version: u32) -> Result<(), IndexError> {
    if (OLDEST_SUPPORTED_FORMAT_VERSION..=CURRENT_FORMAT_VERSION).contains(&format_version) {
        Ok(())
    } else {
        Err(IndexError::UnsupportedVersion {
            found: format_version,
            oldest: OLDEST_SUPPORTED_FORMAT_VERSION,
            current: CURRENT_FORMAT_VERSION,
        })
    }
}

/// Density and genomic-order check over a contig list sorted by index
fn validate_contigs(contigs: &[Contig]) -> Result<(), IndexError> {
    let first = contigs.first().map_or(0, |c| c.index as usize);
    let mut previous_end = 0u64;
    for (slot, contig) in contigs.iter().enumerate() {
        let expected = first + slot;
        if contig.index as usize != expected {
            return Err(IndexError::ContigDensity {
                index: contig.index,
                expected,
            });
        }
        if slot > 0 && contig.genomic_position < previous_end {
            return Err(IndexError::GenomicOrder {
                index: contig.index,
                name: contig.name.clone(),
                genomic_position: contig.genomic_position,
                previous_end,
            });
        }
        previous_end = contig.genomic_end();
    }
    Ok(())
}
