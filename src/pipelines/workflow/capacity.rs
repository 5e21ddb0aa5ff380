//! Bin capacity planning
//!
//! Match finding distributes fragments into reference-ordered bins; output
//! generation loads one bin at a time. The plan sizes bins so that a bin per
//! output thread fits in the available memory:
//!
//! - `estimated_fragment_size`: bytes one fragment occupies in a bin
//! - `target_fragments_per_bin`: user bin size / fragment size, or the
//!   memory-derived optimum
//! - `target_bin_length`: reference bases a bin spans at the expected coverage
//! - `target_bin_size`: user bin size, or fragments per bin × fragment size

use super::options::WorkflowOpt;
use super::WorkflowError;

/// Fixed per-fragment bookkeeping stored next to bases and CIGAR
const FRAGMENT_HEADER_BYTES: u64 = 64;
/// Bytes per CIGAR operation
const CIGAR_OP_BYTES: u64 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct CapacityPlan {
    pub cores: usize,
    pub match_finding_threads: usize,
    pub reporting_threads: usize,
    pub output_threads: usize,
    pub available_memory: u64,
    pub expected_coverage: u32,
    pub expected_compression_ratio: f64,
    pub estimated_fragment_size: u64,
    pub target_fragments_per_bin: u64,
    pub target_bin_length: u64,
    pub target_bin_size: u64,
}

/// Upper bound on the bytes one fragment occupies in a bin: header, bases
/// and qualities, worst-case CIGAR, and the cluster name
pub fn estimate_fragment_size(max_read_length: usize, cluster_name_length: usize) -> u64 {
    let read_length = max_read_length as u64;
    FRAGMENT_HEADER_BYTES
        + read_length
        + (read_length / 2 + 1) * CIGAR_OP_BYTES
        + cluster_name_length as u64
}

/// Fragments per bin such that every core can hold one bin and its
/// compressed output in memory at once. Never less than one.
pub fn estimate_optimum_fragments_per_bin(
    fragment_size: u64,
    available_memory: u64,
    compression_ratio: f64,
    cores: usize,
) -> u64 {
    if fragment_size == 0 || cores == 0 || compression_ratio <= 0.0 {
        return 1;
    }
    let per_core = available_memory as f64 / cores as f64;
    let bytes_per_fragment = fragment_size as f64 * (1.0 + compression_ratio);
    ((per_core / bytes_per_fragment) as u64).max(1)
}

impl CapacityPlan {
    pub fn new(options: &WorkflowOpt) -> Result<Self, WorkflowError> {
        options
            .validate()
            .map_err(|errors| WorkflowError::InvalidOptions(errors.join("; ")))?;

        let estimated_fragment_size =
            estimate_fragment_size(options.max_read_length, options.cluster_name_length);
        let target_fragments_per_bin = if options.target_bin_size > 0 {
            (options.target_bin_size / estimated_fragment_size).max(1)
        } else {
            estimate_optimum_fragments_per_bin(
                estimated_fragment_size,
                options.available_memory,
                options.expected_compression_ratio,
                options.cores,
            )
        };
        let target_bin_length = target_fragments_per_bin / u64::from(options.expected_coverage)
            * options.max_read_length as u64;
        let target_bin_size = if options.target_bin_size > 0 {
            options.target_bin_size
        } else {
            target_fragments_per_bin * estimated_fragment_size
        };

        Ok(Self {
            cores: options.cores,
            match_finding_threads: options.match_finding_threads,
            reporting_threads: options.reporting_threads,
            output_threads: options.output_threads,
            available_memory: options.available_memory,
            expected_coverage: options.expected_coverage,
            expected_compression_ratio: options.expected_compression_ratio,
            estimated_fragment_size,
            target_fragments_per_bin,
            target_bin_length,
            target_bin_size,
        })
    }

    /// Memory one output worker may use
    pub fn per_thread_memory(&self) -> u64 {
        self.available_memory / self.output_threads.max(1) as u64
    }

    pub fn log(&self) {
        log::info!("Workflow: cores {}", self.cores);
        log::info!("Workflow: expected coverage {}", self.expected_coverage);
        log::info!(
            "Workflow: estimated fragment size {}",
            self.estimated_fragment_size
        );
        log::info!(
            "Workflow: target fragments per bin {}",
            self.target_fragments_per_bin
        );
        log::info!("Workflow: target bin length {}", self.target_bin_length);
        log::info!("Workflow: target bin size {}", self.target_bin_size);
    }
}
