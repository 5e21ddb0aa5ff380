//! Alignment workflow and the stages it drives.
//!
//! - `stages`: the `PipelineStage` trait and stage inputs/outputs
//! - `template_length`: per-barcode pair orientation and template-length model
//! - `workflow`: options, capacity planning and the resumable orchestrator

pub mod stages;
pub mod template_length;
pub mod workflow;
