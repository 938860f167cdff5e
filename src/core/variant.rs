// variant.rs - Variant calling from aligned strings

use crate::core::alignment::Alignment;
use crate::data::sequence::GAP;
use crate::error::{MutationScanError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    Substitution,
    Insertion,
    Deletion,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::Substitution => write!(f, "substitution"),
            VariantKind::Insertion => write!(f, "insertion"),
            VariantKind::Deletion => write!(f, "deletion"),
        }
    }
}

/// A single mutation call against the wild-type reference.
///
/// `position` is 1-based in the ungapped reference. Deletions report the
/// first deleted residue; insertions report the last reference residue
/// before the inserted run (0 when the run precedes the reference).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    pub gene: String,
    pub genome_id: String,
    pub position: usize,
    /// Reference residues; `-` for insertions
    pub reference_residue: String,
    /// Observed residues; `-` for deletions
    pub observed_residue: String,
    pub kind: VariantKind,
}

impl Variant {
    /// Short mutation notation, e.g. `S83L`, `H34del`, `12insGG`
    pub fn notation(&self) -> String {
        match self.kind {
            VariantKind::Substitution => {
                format!("{}{}{}", self.reference_residue, self.position, self.observed_residue)
            }
            VariantKind::Deletion => format!("{}{}del", self.reference_residue, self.position),
            VariantKind::Insertion => format!("{}ins{}", self.position, self.observed_residue),
        }
    }

    pub fn signature(&self) -> VariantSignature {
        let mutant = match self.kind {
            VariantKind::Substitution => self.observed_residue.clone(),
            VariantKind::Insertion => format!("ins{}", self.observed_residue),
            VariantKind::Deletion => format!("del{}", self.reference_residue),
        };
        VariantSignature {
            gene: self.gene.clone(),
            position: self.position,
            mutant,
        }
    }
}

/// Genome-independent identity of a variant: gene, position and mutant residue
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantSignature {
    pub gene: String,
    pub position: usize,
    pub mutant: String,
}

impl fmt::Display for VariantSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.gene, self.position, self.mutant)
    }
}

/// Open run of gap columns on one strand
struct IndelRun {
    kind: VariantKind,
    position: usize,
    residues: String,
}

impl IndelRun {
    fn into_variant(self, gene: &str, genome_id: &str) -> Variant {
        let (reference_residue, observed_residue) = match self.kind {
            VariantKind::Deletion => (self.residues, "-".to_string()),
            _ => ("-".to_string(), self.residues),
        };
        Variant {
            gene: gene.to_string(),
            genome_id: genome_id.to_string(),
            position: self.position,
            reference_residue,
            observed_residue,
            kind: self.kind,
        }
    }
}

/// Walk an alignment column by column and emit variants in reference order.
///
/// Adjacent gap columns on the same strand collapse into one indel. Unequal
/// strand lengths and gap-gap columns are invariant violations.
pub fn call_variants(alignment: &Alignment, gene: &str, genome_id: &str) -> Result<Vec<Variant>> {
    let reference = alignment.reference_aligned.as_bytes();
    let query = alignment.query_aligned.as_bytes();

    if reference.len() != query.len() {
        return Err(MutationScanError::AlignmentMismatch {
            reference_len: reference.len(),
            query_len: query.len(),
        });
    }

    if let Some(region) = alignment.region {
        if region.reference_end.checked_sub(region.reference_start).is_none() {
            return Err(MutationScanError::NegativeCoordinate { column: 0 });
        }
    }

    let mut consumed = alignment.reference_offset();
    let mut variants = Vec::new();
    let mut run: Option<IndelRun> = None;

    for (column, (&r, &q)) in reference.iter().zip(query.iter()).enumerate() {
        let r = r.to_ascii_uppercase();
        let q = q.to_ascii_uppercase();

        match (r == GAP, q == GAP) {
            (true, true) => return Err(MutationScanError::InvalidAlignmentColumn { column }),
            (false, false) => {
                if let Some(open) = run.take() {
                    variants.push(open.into_variant(gene, genome_id));
                }
                consumed += 1;
                if r != q {
                    variants.push(Variant {
                        gene: gene.to_string(),
                        genome_id: genome_id.to_string(),
                        position: consumed,
                        reference_residue: (r as char).to_string(),
                        observed_residue: (q as char).to_string(),
                        kind: VariantKind::Substitution,
                    });
                }
            }
            (false, true) => {
                consumed += 1;
                match run.as_mut() {
                    Some(open) if open.kind == VariantKind::Deletion => open.residues.push(r as char),
                    _ => {
                        if let Some(open) = run.take() {
                            variants.push(open.into_variant(gene, genome_id));
                        }
                        run = Some(IndelRun {
                            kind: VariantKind::Deletion,
                            position: consumed,
                            residues: (r as char).to_string(),
                        });
                    }
                }
            }
            (true, false) => match run.as_mut() {
                Some(open) if open.kind == VariantKind::Insertion => open.residues.push(q as char),
                _ => {
                    if let Some(open) = run.take() {
                        variants.push(open.into_variant(gene, genome_id));
                    }
                    run = Some(IndelRun {
                        kind: VariantKind::Insertion,
                        position: consumed,
                        residues: (q as char).to_string(),
                    });
                }
            },
        }
    }

    if let Some(open) = run.take() {
        variants.push(open.into_variant(gene, genome_id));
    }

    Ok(variants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::{AlignedRegion, Aligner, AlignmentConfig, AlignmentMode};

    fn global(reference: &str, query: &str) -> Alignment {
        Alignment::new(reference, query, 0, AlignmentMode::Global, None)
    }

    #[test]
    fn test_identical_sequence_has_no_variants() {
        let aligner = Aligner::default();
        let alignment = aligner
            .align_residues(b"ATGAAAGCGTAA", b"ATGAAAGCGTAA", AlignmentMode::Global)
            .unwrap();
        let variants = call_variants(&alignment, "blaTEM", "genome_1").unwrap();
        assert!(variants.is_empty());
    }

    #[test]
    fn test_single_substitution_in_his_tag() {
        let reference = "MKRISIPSRRLRLPPPLERSHRLLPSPPPSLMSHHHHHHH";
        let mutant = "MKRISIPSRRLRLPPPLERSHRLLPSPPPSLMSHHAHHHH";
        let alignment = Aligner::default()
            .align_residues(reference.as_bytes(), mutant.as_bytes(), AlignmentMode::Global)
            .unwrap();
        assert!(!alignment.has_gaps());

        let variants = call_variants(&alignment, "gyrA", "GCF_000005845").unwrap();
        assert_eq!(variants.len(), 1);
        let variant = &variants[0];
        assert_eq!(variant.position, 36);
        assert_eq!(variant.reference_residue, "H");
        assert_eq!(variant.observed_residue, "A");
        assert_eq!(variant.kind, VariantKind::Substitution);
        assert_eq!(variant.notation(), "H36A");
        assert_eq!(variant.signature().to_string(), "gyrA:36:A");
    }

    #[test]
    fn test_deletion_run_collapses() {
        let variants = call_variants(&global("MKRISIPS", "MKRI--PS"), "parC", "g1").unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].kind, VariantKind::Deletion);
        assert_eq!(variants[0].position, 5);
        assert_eq!(variants[0].reference_residue, "SI");
        assert_eq!(variants[0].observed_residue, "-");
    }

    #[test]
    fn test_insertion_anchored_at_previous_reference_residue() {
        let variants = call_variants(&global("MKR--IPS", "MKRGGIPS"), "parC", "g1").unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].kind, VariantKind::Insertion);
        assert_eq!(variants[0].position, 3);
        assert_eq!(variants[0].observed_residue, "GG");
        assert_eq!(variants[0].notation(), "3insGG");

        let leading = call_variants(&global("--MK", "AAMK"), "parC", "g1").unwrap();
        assert_eq!(leading[0].position, 0);
    }

    #[test]
    fn test_runs_split_by_match_columns() {
        let variants = call_variants(&global("MKRISIPS", "M-R-SIPS"), "parC", "g1").unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].position, 2);
        assert_eq!(variants[1].position, 4);
    }

    #[test]
    fn test_insertion_then_deletion_are_separate() {
        let variants = call_variants(&global("MK-RI", "MKG-I"), "parC", "g1").unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].kind, VariantKind::Insertion);
        assert_eq!(variants[0].position, 2);
        assert_eq!(variants[1].kind, VariantKind::Deletion);
        assert_eq!(variants[1].position, 3);
    }

    #[test]
    fn test_substitution_bound_and_ordering() {
        let aligner = Aligner::new(AlignmentConfig::custom(2, -1, -2));
        let alignment = aligner
            .align_residues(b"MKRISIPSRRLRLPPPLERS", b"MKAISLPSRWLRLPQPLEES", AlignmentMode::Global)
            .unwrap();
        let variants = call_variants(&alignment, "rpoB", "g1").unwrap();

        let n_ref = alignment.reference_aligned.bytes().filter(|&b| b != GAP).count();
        let stats = alignment.stats();
        let subs: Vec<_> = variants
            .iter()
            .filter(|v| v.kind == VariantKind::Substitution)
            .collect();
        assert!(subs.len() <= n_ref - stats.matches);
        assert!(subs.windows(2).all(|w| w[0].position < w[1].position));
        assert_eq!(subs.len(), 5);
    }

    #[test]
    fn test_local_alignment_uses_reference_offset() {
        let alignment = Alignment::new(
            "RISI",
            "RASI",
            5,
            AlignmentMode::Local,
            Some(AlignedRegion {
                reference_start: 2,
                reference_end: 6,
                query_start: 0,
                query_end: 4,
            }),
        );
        let variants = call_variants(&alignment, "gyrA", "g1").unwrap();
        assert_eq!(variants[0].position, 4);
        assert_eq!(variants[0].notation(), "I4A");
    }

    #[test]
    fn test_unequal_lengths_are_invariant_violations() {
        let err = call_variants(&global("MKRI", "MKR"), "gyrA", "g1").unwrap_err();
        assert!(matches!(err, MutationScanError::AlignmentMismatch { .. }));
        assert!(err.is_invariant_violation());

        let err = call_variants(&global("MK-I", "MK-I"), "gyrA", "g1").unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_inverted_region_is_rejected() {
        let alignment = Alignment::new(
            "RI",
            "RI",
            4,
            AlignmentMode::Local,
            Some(AlignedRegion {
                reference_start: 6,
                reference_end: 2,
                query_start: 0,
                query_end: 2,
            }),
        );
        let err = call_variants(&alignment, "gyrA", "g1").unwrap_err();
        assert!(matches!(err, MutationScanError::NegativeCoordinate { .. }));
    }
}
