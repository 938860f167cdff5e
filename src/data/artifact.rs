// artifact.rs - Pre-computed alignment artifacts (LZ4-compressed JSON)

use crate::core::alignment::{Aligner, Alignment, AlignmentConfig, AlignmentMode};
use crate::data::sequence::Sequence;
use crate::error::{MutationScanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub version: String,
    pub created: String,
    pub gene: String,
    pub alignment_config: Option<AlignmentConfig>,
    pub mode: Option<AlignmentMode>,
    pub total_alignments: usize,
    pub format_version: u32,
}

/// Alignments of one gene keyed by genome id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentArtifact {
    pub metadata: ArtifactMetadata,
    pub alignments: BTreeMap<String, Alignment>,
}

impl AlignmentArtifact {
    pub fn new(gene: &str) -> Self {
        Self {
            metadata: ArtifactMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                created: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                gene: gene.to_string(),
                alignment_config: None,
                mode: None,
                total_alignments: 0,
                format_version: ARTIFACT_FORMAT_VERSION,
            },
            alignments: BTreeMap::new(),
        }
    }

    /// Align every query against the reference and collect the results
    pub fn from_sequences<'a>(
        aligner: &Aligner,
        mode: AlignmentMode,
        reference: &Sequence,
        queries: impl IntoIterator<Item = &'a Sequence>,
    ) -> Result<Self> {
        let mut artifact = Self::new(reference.gene());
        artifact.metadata.alignment_config = Some(aligner.config().clone());
        artifact.metadata.mode = Some(mode);
        for query in queries {
            let alignment = aligner.align(reference, query, mode)?;
            artifact.insert(query.id(), alignment);
        }
        Ok(artifact)
    }

    pub fn insert(&mut self, genome_id: &str, alignment: Alignment) {
        self.alignments.insert(genome_id.to_string(), alignment);
        self.metadata.total_alignments = self.alignments.len();
    }

    pub fn gene(&self) -> &str {
        &self.metadata.gene
    }

    /// Save to LZ4 compressed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec(self)?;
        let compressed = lz4_flex::compress_prepend_size(&data);
        std::fs::write(path, compressed)?;
        Ok(())
    }

    /// Load from LZ4 compressed JSON
    pub fn load(path: &Path) -> Result<Self> {
        let compressed = std::fs::read(path)?;
        let decompressed = lz4_flex::decompress_size_prepended(&compressed).map_err(|e| MutationScanError::Parse {
            context: format!("alignment artifact {}", path.display()),
            message: format!("Failed to decompress: {}", e),
        })?;
        let artifact: AlignmentArtifact = serde_json::from_slice(&decompressed)?;
        if artifact.metadata.format_version > ARTIFACT_FORMAT_VERSION {
            return Err(MutationScanError::Parse {
                context: format!("alignment artifact {}", path.display()),
                message: format!("unsupported format version {}", artifact.metadata.format_version),
            });
        }
        Ok(artifact)
    }
}
