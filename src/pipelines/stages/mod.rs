//! Pipeline stage abstraction layer
//!
//! This module defines the `PipelineStage` trait that the workflow's
//! collaborators implement. The workflow runs three stages in strict order,
//! each consuming the complete output of the previous one:
//!
//! ```text
//! Match finding → Alignment reports → Output generation
//! ```
//!
//! Every stage is handed a `StageContext` carrying the capacity plan, the
//! reference indices and a thread pool sized for that stage. Stages are
//! independently testable and can be swapped for alternative implementations.

use std::io;
use std::path::PathBuf;

use rayon::ThreadPool;
use thiserror::Error;

use crate::core::alignment::FragmentError;
use crate::core::quality::QualityError;
use crate::index::{IndexError, ReferenceIndex};
use crate::pipelines::template_length::TemplateLengthStatistics;
use crate::pipelines::workflow::bins::{BarcodeOutputMap, BinMetadata};
use crate::pipelines::workflow::capacity::CapacityPlan;
use crate::pipelines::workflow::found_matches::FoundMatchesMetadata;
use crate::pipelines::workflow::memory::AllocationControl;
use crate::pipelines::workflow::metadata::{BarcodeMetadata, TileMetadata};
use crate::pipelines::workflow::options::WorkflowOpt;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("allocation of {requested} bytes exceeds the {budget}-byte budget")]
    AllocationLimit { requested: u64, budget: u64 },

    #[error(transparent)]
    Fragment(#[from] FragmentError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Quality(#[from] QualityError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Failed(String),
}

/// Shared, read-only state handed to a stage for one invocation
pub struct StageContext<'a> {
    pub options: &'a WorkflowOpt,
    pub capacity: &'a CapacityPlan,
    pub references: &'a [ReferenceIndex],
    /// Worker pool sized for this stage; run parallel work via `install`
    pub thread_pool: &'a ThreadPool,
    pub allocation: &'a AllocationControl,
}

/// One step of the alignment workflow
pub trait PipelineStage {
    type Input;
    type Output;

    fn process(&self, input: Self::Input, ctx: &StageContext) -> Result<Self::Output, StageError>;

    fn name(&self) -> &'static str;

    /// Checked by the workflow before `process`
    fn validate(&self, _input: &Self::Input) -> Result<(), StageError> {
        Ok(())
    }
}

// ============================================================================
// Stage inputs and outputs
// ============================================================================

#[derive(Debug, Clone)]
pub struct MatchFindingInput {
    pub tiles: Vec<TileMetadata>,
    pub barcodes: Vec<BarcodeMetadata>,
    pub temp_directory: PathBuf,
}

/// Everything match finding hands to the later stages
#[derive(Debug, Clone, Default)]
pub struct MatchFindingOutput {
    pub found_matches: FoundMatchesMetadata,
    pub bins: Vec<BinMetadata>,
    /// One model per barcode, indexed like the barcode list
    pub template_length_statistics: Vec<TemplateLengthStatistics>,
}

#[derive(Debug, Clone)]
pub struct ReportingInput {
    pub found_matches: FoundMatchesMetadata,
    pub barcodes: Vec<BarcodeMetadata>,
    pub stats_directory: PathBuf,
    pub reports_directory: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ReportingOutput {
    pub reports: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct OutputInput {
    pub tiles: Vec<TileMetadata>,
    pub barcodes: Vec<BarcodeMetadata>,
    pub bins: Vec<BinMetadata>,
    pub template_length_statistics: Vec<TemplateLengthStatistics>,
    pub projects_directory: PathBuf,
}

pub type MatchFindingStage =
    dyn PipelineStage<Input = MatchFindingInput, Output = MatchFindingOutput> + Send + Sync;
pub type ReportingStage =
    dyn PipelineStage<Input = ReportingInput, Output = ReportingOutput> + Send + Sync;
pub type OutputStage =
    dyn PipelineStage<Input = OutputInput, Output = BarcodeOutputMap> + Send + Sync;

/// The three collaborators a workflow drives
pub struct WorkflowStages {
    pub match_finding: Box<MatchFindingStage>,
    pub reporting: Box<ReportingStage>,
    pub output: Box<OutputStage>,
}
