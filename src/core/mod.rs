//! Core reusable components for alignment operations.
//!
//! These components do not depend on how matches were found and are shared
//! by every stage of the workflow.
//!
//! - `quality` - PHRED log-probability tables, alignment score and mapq
//! - `statistics` - per-tile seed search counters
//! - `alignment` - reads, CIGARs and candidate fragment construction

pub mod alignment;
pub mod quality;
pub mod statistics;
