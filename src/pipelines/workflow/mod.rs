//! Resumable alignment workflow
//!
//! `AlignWorkflow` drives the three stages through the states
//! `Start → MatchingDone → ReportsDone → OutputDone`. Each state keeps the
//! results its stage produced, so a workflow can be rewound to an earlier
//! state and re-run from there without repeating the earlier stages.

pub mod bins;
pub mod capacity;
pub mod found_matches;
pub mod memory;
pub mod metadata;
pub mod options;
pub mod orchestrator;
pub mod state;

use std::io;

use thiserror::Error;

use crate::index::IndexError;
use crate::pipelines::stages::StageError;

pub use bins::{BarcodeOutputMap, BinMetadata, remove_bin_files};
pub use capacity::{CapacityPlan, estimate_fragment_size, estimate_optimum_fragments_per_bin};
pub use found_matches::FoundMatchesMetadata;
pub use memory::{AllocationControl, AllocationMode, ScopedAllocation};
pub use metadata::{BarcodeMetadata, TileMetadata};
pub use options::{WorkflowCliOptions, WorkflowOpt};
pub use orchestrator::AlignWorkflow;
pub use state::{StageAction, TRANSITIONS, Transition, WorkflowState, legal_rewind_targets};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: StageError,
    },

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl WorkflowError {
    pub fn is_precondition(&self) -> bool {
        match self {
            WorkflowError::Precondition(_) | WorkflowError::InvalidOptions(_) => true,
            WorkflowError::Index(e) => e.is_precondition(),
            WorkflowError::Stage {
                source: StageError::ValidationFailed(_),
                ..
            } => true,
            _ => false,
        }
    }
}
