// mod.rs - Data structures module

pub mod artifact;
pub mod manifest;
pub mod sequence;

// Re-export main types for convenience
pub use artifact::AlignmentArtifact;
pub use manifest::{AlignmentManifest, AlignmentSource, ManifestEntry};
pub use sequence::{load_fasta, load_queries, load_reference, Alphabet, Sequence};
