//! Alignment workflow orchestrator
//!
//! Drives the stages through the transition table:
//!
//! ```text
//! Start ──FindMatches──▶ MatchingDone ──GenerateReports──▶ ReportsDone
//!       ──GenerateOutput──▶ OutputDone (Finish)
//! ```
//!
//! Each stage runs on its own rayon pool sized from the capacity plan. Stage
//! results are committed, and the state advanced, only when the stage
//! succeeds; a failed step leaves the workflow where it was.
//!
//! # Usage
//!
//! ```ignore
//! let mut workflow = AlignWorkflow::new(options, references, tiles, barcodes, stages)?;
//! workflow.run()?;
//! workflow.cleanup_intermediary()?;
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use super::bins::{BarcodeOutputMap, BinMetadata, remove_bin_files};
use super::capacity::CapacityPlan;
use super::found_matches::FoundMatchesMetadata;
use super::memory::AllocationControl;
use super::metadata::{BarcodeMetadata, TileMetadata};
use super::options::WorkflowOpt;
use super::state::{self, StageAction, WorkflowState};
use super::WorkflowError;
use crate::index::{DecoyNamePattern, ReferenceIndex};
use crate::pipelines::stages::{
    MatchFindingInput, OutputInput, PipelineStage, ReportingInput, StageContext, StageError,
    WorkflowStages,
};
use crate::pipelines::template_length::TemplateLengthStatistics;

const STATS_DIRECTORY: &str = "Stats";
const REPORTS_DIRECTORY: &str = "Reports";
const PROJECTS_DIRECTORY: &str = "Projects";

pub struct AlignWorkflow {
    options: WorkflowOpt,
    capacity: CapacityPlan,
    references: Vec<ReferenceIndex>,
    tiles: Vec<TileMetadata>,
    barcodes: Vec<BarcodeMetadata>,
    stages: WorkflowStages,
    allocation: AllocationControl,

    stats_directory: PathBuf,
    reports_directory: PathBuf,
    projects_directory: PathBuf,

    state: WorkflowState,
    found_matches: FoundMatchesMetadata,
    bins: Vec<BinMetadata>,
    /// One model per barcode
    template_length_statistics: Vec<TemplateLengthStatistics>,
    reports: Vec<PathBuf>,
    barcode_outputs: BarcodeOutputMap,
}

impl AlignWorkflow {
    /// Create a workflow at `Start`.
    ///
    /// Validates the options, plans bin capacity, flags decoy contigs in
    /// every reference and creates the output directory layout.
    pub fn new(
        options: WorkflowOpt,
        mut references: Vec<ReferenceIndex>,
        tiles: Vec<TileMetadata>,
        barcodes: Vec<BarcodeMetadata>,
        stages: WorkflowStages,
    ) -> Result<Self, WorkflowError> {
        let capacity = CapacityPlan::new(&options)?;
        capacity.log();

        if let Some(barcode) = barcodes
            .iter()
            .find(|b| b.reference_index >= references.len())
        {
            return Err(WorkflowError::Precondition(format!(
                "barcode '{}' refers to reference {} but only {} are loaded",
                barcode.name,
                barcode.reference_index,
                references.len()
            )));
        }

        let decoys = DecoyNamePattern::new(&options.decoy_regex)?;
        for (i, reference) in references.iter_mut().enumerate() {
            let flagged = reference.classify_decoys(&decoys);
            log::info!(
                "Reference {}: {} contigs, {} decoys",
                i,
                reference.contig_count(),
                flagged
            );
        }

        let stats_directory = options.output_directory.join(STATS_DIRECTORY);
        let reports_directory = options.output_directory.join(REPORTS_DIRECTORY);
        let projects_directory = options.output_directory.join(PROJECTS_DIRECTORY);
        for dir in [
            options.temp_directory.as_path(),
            options.output_directory.as_path(),
            stats_directory.as_path(),
            reports_directory.as_path(),
            projects_directory.as_path(),
        ] {
            fs::create_dir_all(dir)?;
        }

        let allocation = AllocationControl::new(options.available_memory);
        let template_length_statistics = vec![TemplateLengthStatistics::unstable(); barcodes.len()];

        Ok(Self {
            options,
            capacity,
            references,
            tiles,
            barcodes,
            stages,
            allocation,
            stats_directory,
            reports_directory,
            projects_directory,
            state: WorkflowState::Start,
            found_matches: FoundMatchesMetadata::default(),
            bins: Vec::new(),
            template_length_statistics,
            reports: Vec::new(),
            barcode_outputs: BarcodeOutputMap::new(),
        })
    }

    // ========================================================================
    // State machine
    // ========================================================================

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn next_state(&self) -> WorkflowState {
        state::transition(self.state).next
    }

    /// Run the action of the current state and advance. At Finish this is a
    /// no-op. Returns the new state.
    pub fn step(&mut self) -> Result<WorkflowState, WorkflowError> {
        let transition = state::transition(self.state);
        match transition.action {
            StageAction::FindMatches => self.find_matches()?,
            StageAction::GenerateReports => self.generate_reports()?,
            StageAction::GenerateOutput => self.generate_output()?,
            StageAction::None => {
                log::info!("Already at the Finish state");
                return Ok(self.state);
            }
        }
        self.state = transition.next;
        log::debug!("Workflow state: {}", self.state);
        Ok(self.state)
    }

    /// Run all stages from `Start`, then remove intermediary files when the
    /// options ask for it
    pub fn run(&mut self) -> Result<(), WorkflowError> {
        const EXPECTED: [WorkflowState; 3] = [
            WorkflowState::MatchingDone,
            WorkflowState::ReportsDone,
            WorkflowState::OutputDone,
        ];

        self.expect_state(WorkflowState::Start)?;
        for expected in EXPECTED {
            self.step()?;
            self.expect_state(expected)?;
        }

        if self.options.cleanup_intermediary {
            self.cleanup_intermediary()?;
        }
        Ok(())
    }

    /// Rewind to an earlier state, dropping the results of the stages after
    /// it. `Start` is always reachable. Returns the state rewound from.
    ///
    /// Rewinding before `MatchingDone` deletes the bin files of the dropped
    /// matching results. If that fails the workflow is left unchanged.
    pub fn rewind(&mut self, target: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        if !state::can_rewind_to(self.state, target) {
            return Err(WorkflowError::Precondition(format!(
                "Aligner rewind from {} to {} is not possible",
                self.state, target
            )));
        }

        if target < WorkflowState::MatchingDone && !self.bins.is_empty() {
            let removed = remove_bin_files(&self.bins)?;
            log::info!("Rewind to {} removed {} bin files", target, removed);
        }

        let previous = self.state;
        if target < WorkflowState::OutputDone {
            self.barcode_outputs.clear();
        }
        if target < WorkflowState::ReportsDone {
            self.reports.clear();
        }
        if target < WorkflowState::MatchingDone {
            self.found_matches = FoundMatchesMetadata::default();
            self.bins.clear();
            self.template_length_statistics =
                vec![TemplateLengthStatistics::unstable(); self.barcodes.len()];
        }
        self.state = target;
        log::info!("Workflow state rewind to {} successful", target);
        Ok(previous)
    }

    /// Remove bin files once output is generated. Before Finish the bins are
    /// still needed and nothing is removed. Returns the number of files removed.
    pub fn cleanup_intermediary(&mut self) -> Result<usize, WorkflowError> {
        if !self.state.is_finish() {
            log::debug!(
                "Keeping intermediary bin files at state {}",
                self.state
            );
            return Ok(0);
        }
        log::info!("Removing intermediary bin files");
        let removed = remove_bin_files(&self.bins)?;
        log::info!("Removing intermediary bin files done. {} files removed.", removed);
        Ok(removed)
    }

    fn expect_state(&self, expected: WorkflowState) -> Result<(), WorkflowError> {
        if self.state != expected {
            return Err(WorkflowError::Precondition(format!(
                "Unexpected state {}, expected {}",
                self.state, expected
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Stage actions
    // ========================================================================

    fn find_matches(&mut self) -> Result<(), WorkflowError> {
        let input = MatchFindingInput {
            tiles: self.tiles.clone(),
            barcodes: self.barcodes.clone(),
            temp_directory: self.options.temp_directory.clone(),
        };
        let stage = self.stages.match_finding.as_ref();
        let mut output = self.run_stage(stage, input, self.capacity.match_finding_threads)?;

        let name = stage.name();
        if output.template_length_statistics.is_empty() {
            output.template_length_statistics =
                vec![TemplateLengthStatistics::unstable(); self.barcodes.len()];
        } else if output.template_length_statistics.len() != self.barcodes.len() {
            return Err(WorkflowError::Stage {
                stage: name,
                source: StageError::ValidationFailed(format!(
                    "{} template length models for {} barcodes",
                    output.template_length_statistics.len(),
                    self.barcodes.len()
                )),
            });
        }
        if let Some(user) = &self.options.user_template_length {
            log::info!("Using user template length model: {}", user);
            output.template_length_statistics.fill(user.clone());
        }

        let totals = output.found_matches.total_stats();
        log::info!(
            "Match finding: {} seeds ({} unique, {} no match, {} repeat, {} too many repeats), repeat ratio {:.3}",
            totals.total_seeds(),
            totals.unique_match_seeds,
            totals.no_match_seeds,
            totals.repeat_match_seeds,
            totals.too_many_repeats_seeds,
            totals.repeat_seed_ratio()
        );
        for (barcode, tls) in self.barcodes.iter().zip(&output.template_length_statistics) {
            log::debug!("Barcode {}: {}", barcode.name, tls);
        }

        self.found_matches = output.found_matches;
        self.bins = output.bins;
        self.template_length_statistics = output.template_length_statistics;
        Ok(())
    }

    fn generate_reports(&mut self) -> Result<(), WorkflowError> {
        let input = ReportingInput {
            found_matches: self.found_matches.clone(),
            barcodes: self.barcodes.clone(),
            stats_directory: self.stats_directory.clone(),
            reports_directory: self.reports_directory.clone(),
        };
        let output = self.run_stage(
            self.stages.reporting.as_ref(),
            input,
            self.capacity.reporting_threads,
        )?;
        log::debug!("Reporting: {} reports", output.reports.len());

        self.reports = output.reports;
        Ok(())
    }

    fn generate_output(&mut self) -> Result<(), WorkflowError> {
        let input = OutputInput {
            tiles: self.tiles.clone(),
            barcodes: self.barcodes.clone(),
            bins: self.bins.clone(),
            template_length_statistics: self.template_length_statistics.clone(),
            projects_directory: self.projects_directory.clone(),
        };
        let outputs = {
            let _allocation = self.allocation.enter_stage(self.options.allocation_mode);
            self.run_stage(
                self.stages.output.as_ref(),
                input,
                self.capacity.output_threads,
            )?
        };
        log::debug!("Output: {} barcode files", outputs.len());

        self.barcode_outputs = outputs;
        Ok(())
    }

    fn run_stage<I, O>(
        &self,
        stage: &(dyn PipelineStage<Input = I, Output = O> + Send + Sync),
        input: I,
        threads: usize,
    ) -> Result<O, WorkflowError> {
        let name = stage.name();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{name}-{i}"))
            .build()?;
        let ctx = StageContext {
            options: &self.options,
            capacity: &self.capacity,
            references: &self.references,
            thread_pool: &pool,
            allocation: &self.allocation,
        };

        log::info!("Stage '{}' on {} threads", name, threads);
        stage
            .validate(&input)
            .and_then(|()| stage.process(input, &ctx))
            .map_err(|source| WorkflowError::Stage {
                stage: name,
                source,
            })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn options(&self) -> &WorkflowOpt {
        &self.options
    }

    pub fn capacity(&self) -> &CapacityPlan {
        &self.capacity
    }

    pub fn references(&self) -> &[ReferenceIndex] {
        &self.references
    }

    pub fn barcodes(&self) -> &[BarcodeMetadata] {
        &self.barcodes
    }

    pub fn allocation(&self) -> &AllocationControl {
        &self.allocation
    }

    pub fn found_matches(&self) -> &FoundMatchesMetadata {
        &self.found_matches
    }

    pub fn bins(&self) -> &[BinMetadata] {
        &self.bins
    }

    pub fn template_length_statistics(&self) -> &[TemplateLengthStatistics] {
        &self.template_length_statistics
    }

    pub fn reports(&self) -> &[PathBuf] {
        &self.reports
    }

    pub fn barcode_outputs(&self) -> &BarcodeOutputMap {
        &self.barcode_outputs
    }

    pub fn projects_directory(&self) -> &Path {
        &self.projects_directory
    }
}
