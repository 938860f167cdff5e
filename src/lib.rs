// lib.rs - mutationscan library root

//! # mutationscan - Alignment-based variant detection and co-occurrence analysis
//!
//! This library aligns per-genome gene sequences against wild-type
//! references, calls substitutions and indels in reference coordinates, and
//! summarizes which mutations travel together across a genome collection.
//!
//! ## Features
//!
//! - **Global and local alignment**: Needleman-Wunsch and Smith-Waterman with linear gap scoring
//! - **Variant calling**: substitutions and collapsed indel runs at 1-based reference positions
//! - **Batch detection**: parallel (genome, gene) processing with per-pair error isolation
//! - **Co-occurrence statistics**: pair counts, frequencies and Fisher exact p-values
//! - **Artifacts**: LZ4-compressed alignment files for reuse across runs
//!
//! ## Basic Usage
//!
//! ```rust
//! use mutationscan::prelude::*;
//!
//! let mut manifest = AlignmentManifest::new();
//! manifest.push(
//!     "gyrA",
//!     AlignmentSource::sequences("MSDLAREITPVNIEE", [("g1", "MSDLAREITPVNLEE"), ("g2", "MSDLAREITPVNLEE")]),
//! );
//!
//! let detector = VariantDetector::new(AlignmentConfig::default(), AlignmentMode::Global);
//! let result = detector.detect(&manifest, &["g1", "g2"])?;
//! assert_eq!(result.summary().pairs_with_variants, 2);
//!
//! let pairs = analyze(&result.records, 2, 2);
//! assert!(pairs.is_empty());
//! # Ok::<(), mutationscan::MutationScanError>(())
//! ```

// Re-export all main modules
pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod observe;
pub mod output;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::config::{ScanConfig, ValidatedConfig};
    pub use crate::core::{align, analyze, call_variants, mutation_patterns, variant_support};
    pub use crate::core::{Aligner, Alignment, AlignmentConfig, AlignmentMode};
    pub use crate::core::{AnalyzerConfig, CooccurrenceAnalyzer, CooccurrencePair};
    pub use crate::core::{CancellationToken, DetectionResult, GeneFilter, VariantDetector};
    pub use crate::core::{MutationRecordSet, Variant, VariantKind, VariantSignature};
    pub use crate::data::{AlignmentArtifact, AlignmentManifest, AlignmentSource, Sequence};
    pub use crate::error::{ErrorKind, MutationScanError, Result};
    pub use crate::observe::{LogObserver, ProgressObserver, ScanObserver, SilentObserver};
    pub use crate::output::{write_table, TableFormat};
}

// Re-export main types at the root level for convenience
pub use core::{AlignmentConfig, AlignmentMode, MutationRecordSet, VariantDetector};
pub use error::{ErrorKind, MutationScanError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!(
        "mutationscan v{} - Alignment-based variant detection and co-occurrence analysis",
        VERSION
    )
}
