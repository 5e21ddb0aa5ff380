//! Run layout: tiles and barcodes

/// One unit of sequencing input processed by match finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMetadata {
    /// Position in the run's tile list
    pub index: usize,
    pub lane: u32,
    pub name: String,
    pub cluster_count: u64,
}

impl TileMetadata {
    pub fn new(index: usize, lane: u32, name: impl Into<String>, cluster_count: u64) -> Self {
        Self {
            index,
            lane,
            name: name.into(),
            cluster_count,
        }
    }
}

/// Sample barcode; output and template-length models are kept per barcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeMetadata {
    /// Position in the run's barcode list
    pub index: usize,
    pub name: String,
    pub sample: String,
    pub project: String,
    /// Index of the reference this barcode aligns against
    pub reference_index: usize,
}

impl BarcodeMetadata {
    pub fn new(index: usize, name: impl Into<String>, sample: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            sample: sample.into(),
            project: "default".to_string(),
            reference_index: 0,
        }
    }
}
