// mod.rs - Core logic module

pub mod alignment;
pub mod cooccurrence;
pub mod detector;
pub mod records;
pub mod variant;

// Re-export main types for convenience
pub use alignment::{align, compute_alignment_stats, Aligner, Alignment, AlignmentConfig, AlignmentMode, AlignedRegion};
pub use cooccurrence::{
    analyze, mutation_patterns, variant_support, AnalyzerConfig, CooccurrenceAnalyzer, CooccurrencePair,
    MutationPattern, VariantSupport,
};
pub use detector::{CancellationToken, DetectionResult, DetectionSummary, GeneFilter, PairError, VariantDetector};
pub use records::{MutationRecordSet, PairSummary};
pub use variant::{call_variants, Variant, VariantKind, VariantSignature};
