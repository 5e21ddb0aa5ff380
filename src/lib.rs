//! ferrous-seedmap: seed-and-extend short read alignment core.
//!
//! - `index`: sorted reference catalog (contigs, k-mer shards, annotations)
//! - `core`: quality model, tile statistics and fragment construction
//! - `pipelines`: template-length model and the resumable alignment workflow

pub mod core;
pub mod index;
pub mod pipelines;
