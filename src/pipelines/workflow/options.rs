//! Workflow configuration
//!
//! `WorkflowOpt` is the plain options struct the workflow consumes;
//! `WorkflowCliOptions` is its clap-derived command-line form.

use std::path::PathBuf;

use clap::Args;

use super::memory::AllocationMode;
use crate::pipelines::template_length::{PairOrientation, TemplateLengthStatistics};

pub const DEFAULT_DECOY_REGEX: &str = "^hs37d5$|^NC_007605$|_decoy$|^chrEBV$";

#[derive(Debug, Clone)]
pub struct WorkflowOpt {
    // Directories
    pub temp_directory: PathBuf,
    pub output_directory: PathBuf,

    // Threads
    pub cores: usize,
    pub match_finding_threads: usize,
    pub reporting_threads: usize,
    pub output_threads: usize,

    // Memory and binning
    pub available_memory: u64,
    /// Bytes per bin; 0 derives the size from available memory
    pub target_bin_size: u64,
    pub expected_coverage: u32,
    /// Compressed over uncompressed output size
    pub expected_compression_ratio: f64,
    pub allocation_mode: AllocationMode,
    pub cleanup_intermediary: bool,

    // Reference and reads
    pub decoy_regex: String,
    pub seed_length: u32,
    pub max_read_length: usize,
    pub cluster_name_length: usize,

    /// Overrides per-barcode estimation when set
    pub user_template_length: Option<TemplateLengthStatistics>,
}

impl Default for WorkflowOpt {
    fn default() -> Self {
        let cores = num_cpus::get().max(1);
        WorkflowOpt {
            temp_directory: PathBuf::from("Temp"),
            output_directory: PathBuf::from("Aligned"),

            cores,
            match_finding_threads: cores,
            reporting_threads: cores,
            output_threads: cores,

            available_memory: 8 * 1024 * 1024 * 1024,
            target_bin_size: 0,
            expected_coverage: 60,
            expected_compression_ratio: 0.3,
            allocation_mode: AllocationMode::Off,
            cleanup_intermediary: false,

            decoy_regex: DEFAULT_DECOY_REGEX.to_string(),
            seed_length: 32,
            max_read_length: 151,
            cluster_name_length: 0,

            user_template_length: None,
        }
    }
}

impl WorkflowOpt {
    /// Validate parameters for consistency.
    /// Returns Ok(()) if valid, or Err with description of issues
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.cores < 1 {
            errors.push(format!("cores must be >= 1, got {}", self.cores));
        }
        for (name, threads) in [
            ("match_finding_threads", self.match_finding_threads),
            ("reporting_threads", self.reporting_threads),
            ("output_threads", self.output_threads),
        ] {
            if threads < 1 {
                errors.push(format!("{name} must be >= 1, got {threads}"));
            }
        }

        if self.expected_coverage < 1 {
            errors.push(format!(
                "expected_coverage must be >= 1, got {}",
                self.expected_coverage
            ));
        }
        if !(self.expected_compression_ratio > 0.0 && self.expected_compression_ratio <= 1.0) {
            errors.push(format!(
                "expected_compression_ratio must be in (0, 1], got {}",
                self.expected_compression_ratio
            ));
        }
        if self.target_bin_size == 0 && self.available_memory == 0 {
            errors.push("available_memory must be > 0 when target_bin_size is not set".to_string());
        }
        if self.max_read_length < 1 {
            errors.push(format!(
                "max_read_length must be >= 1, got {}",
                self.max_read_length
            ));
        }
        if self.seed_length < 1 {
            errors.push(format!("seed_length must be >= 1, got {}", self.seed_length));
        }
        if let Err(e) = regex::Regex::new(&self.decoy_regex) {
            errors.push(format!("invalid decoy regex '{}': {e}", self.decoy_regex));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Parse a user template-length model "ORIENTATION,MIN,MAX[,MEDIAN]".
    /// The median defaults to the midpoint of the bounds.
    pub fn parse_template_length(s: &str) -> Result<TemplateLengthStatistics, String> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() < 3 || parts.len() > 4 {
            return Err(format!(
                "Template length must be ORIENTATION,MIN,MAX[,MEDIAN]: {s}"
            ));
        }

        let orientation = PairOrientation::parse(parts[0])
            .ok_or_else(|| format!("Invalid pair orientation: {}", parts[0]))?;
        let min = parts[1]
            .parse::<u64>()
            .map_err(|_| format!("Invalid template length min: {}", parts[1]))?;
        let max = parts[2]
            .parse::<u64>()
            .map_err(|_| format!("Invalid template length max: {}", parts[2]))?;
        if min > max {
            return Err(format!("Template length min {min} exceeds max {max}"));
        }
        let median = match parts.get(3) {
            Some(m) => m
                .parse::<u64>()
                .map_err(|_| format!("Invalid template length median: {m}"))?,
            None => min + (max - min) / 2,
        };

        Ok(TemplateLengthStatistics::user(orientation, min, max, median))
    }
}

#[derive(Debug, Clone, Args)]
pub struct WorkflowCliOptions {
    // ===== Directories =====
    /// Directory for intermediary bin files
    #[arg(long, value_name = "DIR", default_value = "Temp")]
    pub temp_directory: PathBuf,

    /// Directory for stats, reports and per-project output
    #[arg(short = 'o', long, value_name = "DIR", default_value = "Aligned")]
    pub output_directory: PathBuf,

    // ===== Threads =====
    /// Number of threads (default: all available cores)
    #[arg(short = 't', long, value_name = "INT")]
    pub threads: Option<usize>,

    /// Threads for match finding (default: --threads)
    #[arg(long, value_name = "INT")]
    pub match_finding_threads: Option<usize>,

    /// Threads for report generation (default: --threads)
    #[arg(long, value_name = "INT")]
    pub reporting_threads: Option<usize>,

    /// Threads for output generation (default: --threads)
    #[arg(long, value_name = "INT")]
    pub output_threads: Option<usize>,

    // ===== Memory and binning =====
    /// Memory available to the workflow, in megabytes
    #[arg(short = 'm', long, value_name = "MB", default_value_t = 8192)]
    pub memory_mb: u64,

    /// Target bin size in megabytes; 0 derives it from available memory
    #[arg(long, value_name = "MB", default_value_t = 0)]
    pub target_bin_size_mb: u64,

    /// Expected coverage of the genome
    #[arg(long, value_name = "INT", default_value_t = 60)]
    pub expected_coverage: u32,

    /// Expected ratio of compressed to uncompressed output
    #[arg(long, value_name = "FLOAT", default_value_t = 0.3)]
    pub expected_compression_ratio: f64,

    /// Behaviour when a stage exceeds its memory budget
    #[arg(long, value_enum, default_value_t = AllocationMode::Off)]
    pub allocation_mode: AllocationMode,

    /// Remove intermediary bin files once output is generated
    #[arg(long)]
    pub cleanup_intermediary: bool,

    // ===== Reference and reads =====
    /// Contigs whose name matches are flagged as decoys
    #[arg(long, value_name = "REGEX", default_value = DEFAULT_DECOY_REGEX)]
    pub decoy_regex: String,

    /// Seed length used for match finding
    #[arg(short = 'k', long, value_name = "INT", default_value_t = 32)]
    pub seed_length: u32,

    /// Longest read length in the run
    #[arg(long, value_name = "INT", default_value_t = 151)]
    pub max_read_length: usize,

    /// Bytes reserved per fragment for the cluster name
    #[arg(long, value_name = "INT", default_value_t = 0)]
    pub cluster_name_length: usize,

    /// Template length model ORIENTATION,MIN,MAX[,MEDIAN] [inferred]
    #[arg(short = 'I', long, value_name = "STR")]
    pub template_length: Option<String>,
}

impl WorkflowCliOptions {
    pub fn into_opt(self) -> Result<WorkflowOpt, String> {
        let mut opt = WorkflowOpt::default();

        let cores = self.threads.unwrap_or(opt.cores);
        if cores < 1 {
            return Err(format!("Invalid thread count {cores}"));
        }
        opt.cores = cores;
        opt.match_finding_threads = self.match_finding_threads.unwrap_or(cores);
        opt.reporting_threads = self.reporting_threads.unwrap_or(cores);
        opt.output_threads = self.output_threads.unwrap_or(cores);

        opt.temp_directory = self.temp_directory;
        opt.output_directory = self.output_directory;

        opt.available_memory = self.memory_mb * 1024 * 1024;
        opt.target_bin_size = self.target_bin_size_mb * 1024 * 1024;
        opt.expected_coverage = self.expected_coverage;
        opt.expected_compression_ratio = self.expected_compression_ratio;
        opt.allocation_mode = self.allocation_mode;
        opt.cleanup_intermediary = self.cleanup_intermediary;

        opt.decoy_regex = self.decoy_regex;
        opt.seed_length = self.seed_length;
        opt.max_read_length = self.max_read_length;
        opt.cluster_name_length = self.cluster_name_length;

        if let Some(tls) = self.template_length {
            opt.user_template_length = Some(WorkflowOpt::parse_template_length(&tls)?);
        }

        opt.validate().map_err(|errors| errors.join("; "))?;
        Ok(opt)
    }
}
