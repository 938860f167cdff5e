// sequence.rs - Validated residue sequences and FASTA loading

use crate::error::{MutationScanError, Result};
use bio::io::fasta;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Gap symbol used in aligned strings
pub const GAP: u8 = b'-';

const NUCLEOTIDES: &[u8] = b"ACGTUNRYKMSWBDHV";
const AMINO_ACIDS: &[u8] = b"ACDEFGHIKLMNPQRSTVWYBZJUOX*";

/// Residue alphabet of a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alphabet {
    Nucleotide,
    Protein,
}

impl Alphabet {
    pub fn contains(&self, residue: u8) -> bool {
        let upper = residue.to_ascii_uppercase();
        match self {
            Alphabet::Nucleotide => NUCLEOTIDES.contains(&upper),
            Alphabet::Protein => AMINO_ACIDS.contains(&upper),
        }
    }

    /// Nucleotide when every residue is a nucleotide symbol, otherwise protein
    pub fn detect(residues: &[u8]) -> Self {
        if !residues.is_empty() && residues.iter().all(|&r| Alphabet::Nucleotide.contains(r)) {
            Alphabet::Nucleotide
        } else {
            Alphabet::Protein
        }
    }

    /// Check every residue, reporting the first offending one (1-based position)
    pub fn validate(&self, residues: &[u8], context: &str) -> Result<()> {
        match residues.iter().position(|&r| !self.contains(r)) {
            Some(idx) => Err(MutationScanError::InvalidAlphabet {
                context: context.to_string(),
                residue: residues[idx] as char,
                position: idx + 1,
            }),
            None => Ok(()),
        }
    }
}

/// A gene sequence from one genome (or the wild-type reference)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    id: String,
    gene: String,
    residues: Vec<u8>,
    alphabet: Alphabet,
}

impl Sequence {
    /// Build a sequence, upper-casing residues and checking them against the
    /// detected alphabet. Gap symbols are rejected.
    pub fn new(id: impl Into<String>, gene: impl Into<String>, residues: impl AsRef<[u8]>) -> Result<Self> {
        let residues: Vec<u8> = residues.as_ref().iter().map(|r| r.to_ascii_uppercase()).collect();
        let alphabet = Alphabet::detect(&residues);
        Self::with_alphabet(id, gene, residues, alphabet)
    }

    /// Build a sequence against an explicit alphabet
    pub fn with_alphabet(
        id: impl Into<String>,
        gene: impl Into<String>,
        residues: impl AsRef<[u8]>,
        alphabet: Alphabet,
    ) -> Result<Self> {
        let id = id.into();
        let gene = gene.into();
        let residues: Vec<u8> = residues.as_ref().iter().map(|r| r.to_ascii_uppercase()).collect();
        alphabet.validate(&residues, &format!("{} ({})", id, gene))?;
        Ok(Self {
            id,
            gene,
            residues,
            alphabet,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn gene(&self) -> &str {
        &self.gene
    }

    pub fn residues(&self) -> &[u8] {
        &self.residues
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

/// Read every record of a FASTA file for one gene.
///
/// Records are returned in file order keyed by their id. Records that fail
/// the alphabet check are returned as errors alongside the valid ones so the
/// caller can attribute them to a single genome.
pub fn load_fasta(fasta_path: &Path, gene: &str) -> Result<Vec<(String, Result<Sequence>)>> {
    let file = File::open(fasta_path).map_err(|e| MutationScanError::Parse {
        context: format!("FASTA file {}", fasta_path.display()),
        message: e.to_string(),
    })?;

    let reader = fasta::Reader::new(BufReader::new(file));
    let mut records = Vec::new();

    for record_result in reader.records() {
        let record = record_result.map_err(|e| MutationScanError::Parse {
            context: format!("FASTA record in {}", fasta_path.display()),
            message: e.to_string(),
        })?;

        let id = record.id().to_string();
        let sequence = Sequence::new(id.clone(), gene, record.seq());
        records.push((id, sequence));
    }

    Ok(records)
}

/// Load the first record of a FASTA file as the wild-type reference
pub fn load_reference(fasta_path: &Path, gene: &str) -> Result<Sequence> {
    load_fasta(fasta_path, gene)?
        .into_iter()
        .next()
        .ok_or_else(|| MutationScanError::MissingSequence(format!("reference for {} in {}", gene, fasta_path.display())))?
        .1
}

/// Query sequences of one gene keyed by genome id
pub type QuerySet = HashMap<String, Result<Sequence>>;

/// Load query sequences of one gene; record ids are genome ids
pub fn load_queries(fasta_path: &Path, gene: &str) -> Result<QuerySet> {
    Ok(load_fasta(fasta_path, gene)?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_alphabet_detection() {
        assert_eq!(Alphabet::detect(b"ATGC"), Alphabet::Nucleotide);
        assert_eq!(Alphabet::detect(b"MKRISIPS"), Alphabet::Protein);
        assert_eq!(Alphabet::detect(b""), Alphabet::Protein);
    }

    #[test]
    fn test_sequence_uppercases_residues() {
        let seq = Sequence::new("g1", "gyrA", "atgc").unwrap();
        assert_eq!(seq.residues(), b"ATGC");
        assert_eq!(seq.alphabet(), Alphabet::Nucleotide);
        assert_eq!(seq.len(), 4);
    }

    #[test]
    fn test_gap_symbol_rejected() {
        let err = Sequence::new("ref", "gyrA", "MK-RI").unwrap_err();
        match err {
            MutationScanError::InvalidAlphabet { residue, position, .. } => {
                assert_eq!(residue, '-');
                assert_eq!(position, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_protein_with_digits_rejected() {
        assert!(Sequence::new("g1", "parC", "MKR1S").is_err());
        assert!(Sequence::with_alphabet("g1", "parC", "MKRS", Alphabet::Nucleotide).is_err());
    }

    #[test]
    fn test_load_fasta_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ">genome_a\nMKRISI\n>genome_b\nMKR1SI\n>genome_c\nmkrasi").unwrap();

        let records = load_queries(file.path(), "gyrA").unwrap();
        assert_eq!(records.len(), 3);
        assert!(records["genome_a"].is_ok());
        assert!(records["genome_b"].is_err());
        assert_eq!(records["genome_c"].as_ref().unwrap().residues(), b"MKRASI");

        let reference = load_reference(file.path(), "gyrA").unwrap();
        assert_eq!(reference.id(), "genome_a");
    }
}
