// manifest.rs - Per-gene description of where alignments come from

use crate::core::alignment::Alignment;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the alignments of one gene are found
#[derive(Debug, Clone)]
pub enum AlignmentSource {
    /// Wild-type reference and per-genome query residues, aligned on demand.
    /// Residues are checked against their alphabet when the run resolves them.
    Sequences {
        reference: Vec<u8>,
        queries: HashMap<String, Vec<u8>>,
    },
    /// FASTA files: the first record of `reference` is the wild type and
    /// record ids in `queries` are genome ids
    FastaFiles { reference: PathBuf, queries: PathBuf },
    /// Alignments computed elsewhere, keyed by genome id
    Alignments(HashMap<String, Alignment>),
    /// Artifact written by `AlignmentArtifact::save`
    ArtifactFile(PathBuf),
}

impl AlignmentSource {
    pub fn sequences<I, K, V>(reference: impl AsRef<[u8]>, queries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<[u8]>,
    {
        AlignmentSource::Sequences {
            reference: reference.as_ref().to_vec(),
            queries: queries
                .into_iter()
                .map(|(k, v)| (k.into(), v.as_ref().to_vec()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub gene: String,
    /// `None` marks an entry that names a gene but gives no data
    pub source: Option<AlignmentSource>,
}

/// Ordered gene manifest; processing follows insertion order
#[derive(Debug, Clone, Default)]
pub struct AlignmentManifest {
    entries: Vec<ManifestEntry>,
}

/// On-disk TOML layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    genes: Vec<ManifestGene>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestGene {
    name: String,
    reference: Option<String>,
    queries: Option<String>,
    alignments: Option<String>,
}

impl AlignmentManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, gene: impl Into<String>, source: AlignmentSource) -> &mut Self {
        self.entries.push(ManifestEntry {
            gene: gene.into(),
            source: Some(source),
        });
        self
    }

    pub fn push_empty(&mut self, gene: impl Into<String>) -> &mut Self {
        self.entries.push(ManifestEntry {
            gene: gene.into(),
            source: None,
        });
        self
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn genes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.gene.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a TOML manifest.
    ///
    /// Each `[[genes]]` table names a gene and either `reference` + `queries`
    /// FASTA paths or an `alignments` artifact path. Relative paths resolve
    /// against the manifest's directory; a table with neither becomes an
    /// empty entry.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&content, base)
    }

    pub fn from_toml_str(content: &str, base: &Path) -> Result<Self> {
        let file: ManifestFile = toml::from_str(content)?;
        let resolve = |p: &str| {
            let path = PathBuf::from(p);
            if path.is_absolute() {
                path
            } else {
                base.join(path)
            }
        };

        let mut manifest = Self::new();
        for gene in file.genes {
            let source = match (&gene.alignments, &gene.reference, &gene.queries) {
                (Some(alignments), _, _) => Some(AlignmentSource::ArtifactFile(resolve(alignments))),
                (None, Some(reference), Some(queries)) => Some(AlignmentSource::FastaFiles {
                    reference: resolve(reference),
                    queries: resolve(queries),
                }),
                _ => None,
            };
            manifest.entries.push(ManifestEntry {
                gene: gene.name,
                source,
            });
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_from_toml() {
        let content = r#"
[[genes]]
name = "gyrA"
reference = "refs/gyrA.faa"
queries = "/data/gyrA.faa"

[[genes]]
name = "parC"
alignments = "parC.json.lz4"

[[genes]]
name = "marR"
reference = "refs/marR.faa"
"#;
        let manifest = AlignmentManifest::from_toml_str(content, Path::new("/runs/r1")).unwrap();
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.genes().collect::<Vec<_>>(), vec!["gyrA", "parC", "marR"]);

        match &manifest.entries()[0].source {
            Some(AlignmentSource::FastaFiles { reference, queries }) => {
                assert_eq!(reference, &PathBuf::from("/runs/r1/refs/gyrA.faa"));
                assert_eq!(queries, &PathBuf::from("/data/gyrA.faa"));
            }
            other => panic!("unexpected source: {:?}", other),
        }
        assert!(matches!(manifest.entries()[1].source, Some(AlignmentSource::ArtifactFile(_))));
        assert!(manifest.entries()[2].source.is_none());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(AlignmentManifest::from_toml_str("[[genes]]\nreference = 3", Path::new(".")).is_err());
    }
}
