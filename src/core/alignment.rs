// alignment.rs - Scoring configuration, alignment model and the NW/SW aligner

use crate::data::sequence::{Alphabet, Sequence, GAP};
use crate::error::{MutationScanError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound on scoring-matrix cells (about 512 MiB of `i64`)
pub const DEFAULT_MAX_MATRIX_CELLS: usize = 64 * 1024 * 1024;

/// Configuration for sequence alignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    pub match_score: i32,
    pub mismatch_penalty: i32,
    pub gap_penalty: i32,
    pub max_matrix_cells: usize,
    pub description: Option<String>,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            match_score: 2,
            mismatch_penalty: -1,
            gap_penalty: -1,
            max_matrix_cells: DEFAULT_MAX_MATRIX_CELLS,
            description: Some("Default alignment parameters".to_string()),
        }
    }
}

impl AlignmentConfig {
    /// Create configuration from preset name
    pub fn from_mode(mode: &str) -> Result<Self> {
        let (match_score, mismatch_penalty, gap_penalty, description) = match mode {
            "default" => (2, -1, -1, "Default alignment parameters"),
            "protein" => (5, -3, -4, "Protein alignment (gap-averse)"),
            "dna" => (2, -3, -5, "Standard DNA alignment"),
            "dna-strict" => (3, -4, -8, "Strict DNA alignment (higher penalties)"),
            "dna-permissive" => (1, 0, -2, "Permissive DNA alignment (lower penalties)"),
            _ => {
                return Err(MutationScanError::InvalidConfig(format!(
                    "Unknown scoring preset: {}. Use: default, protein, dna, dna-strict, dna-permissive",
                    mode
                )))
            }
        };
        Ok(Self {
            match_score,
            mismatch_penalty,
            gap_penalty,
            max_matrix_cells: DEFAULT_MAX_MATRIX_CELLS,
            description: Some(description.to_string()),
        })
    }

    /// Create custom configuration
    pub fn custom(match_score: i32, mismatch_penalty: i32, gap_penalty: i32) -> Self {
        Self {
            match_score,
            mismatch_penalty,
            gap_penalty,
            max_matrix_cells: DEFAULT_MAX_MATRIX_CELLS,
            description: Some("Custom alignment parameters".to_string()),
        }
    }

    pub fn with_max_matrix_cells(mut self, max_matrix_cells: usize) -> Self {
        self.max_matrix_cells = max_matrix_cells;
        self
    }

    #[inline]
    fn substitution(&self, a: u8, b: u8) -> i64 {
        if a == b {
            self.match_score as i64
        } else {
            self.mismatch_penalty as i64
        }
    }
}

/// Alignment algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignmentMode {
    /// Needleman-Wunsch over the full length of both sequences
    Global,
    /// Smith-Waterman over the best-scoring substrings
    Local,
}

impl FromStr for AlignmentMode {
    type Err = MutationScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "global" | "nw" | "needleman-wunsch" => Ok(AlignmentMode::Global),
            "local" | "sw" | "smith-waterman" => Ok(AlignmentMode::Local),
            _ => Err(MutationScanError::InvalidConfig(format!(
                "Invalid alignment mode: {}. Use: global, local",
                s
            ))),
        }
    }
}

impl AlignmentMode {
    pub fn description(&self) -> &str {
        match self {
            AlignmentMode::Global => "Global (Needleman-Wunsch)",
            AlignmentMode::Local => "Local (Smith-Waterman)",
        }
    }
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentMode::Global => write!(f, "global"),
            AlignmentMode::Local => write!(f, "local"),
        }
    }
}

/// Offsets of a local alignment in the original sequences (0-based, half-open)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedRegion {
    pub reference_start: usize,
    pub reference_end: usize,
    pub query_start: usize,
    pub query_end: usize,
}

/// A pairwise alignment of a query against a wild-type reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub reference_aligned: String,
    pub query_aligned: String,
    pub score: i64,
    pub mode: AlignmentMode,
    /// Present for local alignments only
    pub region: Option<AlignedRegion>,
}

/// Column statistics of an alignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentStats {
    pub matches: usize,
    pub substitutions: usize,
    pub indel_events: usize,
    pub indel_residues: usize,
    pub length: usize,
    pub identity_percent: f64,
}

impl Alignment {
    pub fn new(
        reference_aligned: impl Into<String>,
        query_aligned: impl Into<String>,
        score: i64,
        mode: AlignmentMode,
        region: Option<AlignedRegion>,
    ) -> Self {
        Self {
            reference_aligned: reference_aligned.into(),
            query_aligned: query_aligned.into(),
            score,
            mode,
            region,
        }
    }

    fn empty(mode: AlignmentMode) -> Self {
        let region = match mode {
            AlignmentMode::Local => Some(AlignedRegion {
                reference_start: 0,
                reference_end: 0,
                query_start: 0,
                query_end: 0,
            }),
            AlignmentMode::Global => None,
        };
        Self::new(String::new(), String::new(), 0, mode, region)
    }

    /// Number of aligned columns
    pub fn len(&self) -> usize {
        self.reference_aligned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reference_aligned.is_empty() && self.query_aligned.is_empty()
    }

    /// Ungapped reference offset of the first aligned column
    pub fn reference_offset(&self) -> usize {
        self.region.map(|r| r.reference_start).unwrap_or(0)
    }

    pub fn has_gaps(&self) -> bool {
        self.reference_aligned.bytes().any(|b| b == GAP) || self.query_aligned.bytes().any(|b| b == GAP)
    }

    pub fn stats(&self) -> AlignmentStats {
        compute_alignment_stats(&self.query_aligned, &self.reference_aligned)
    }

    pub fn identity_percent(&self) -> f64 {
        self.stats().identity_percent
    }

    /// Check that both strands are equal length and drawn from a residue
    /// alphabet plus the gap symbol.
    pub fn validate(&self) -> Result<()> {
        if self.reference_aligned.len() != self.query_aligned.len() {
            return Err(MutationScanError::AlignmentMismatch {
                reference_len: self.reference_aligned.len(),
                query_len: self.query_aligned.len(),
            });
        }
        for (label, strand) in [("reference strand", &self.reference_aligned), ("query strand", &self.query_aligned)] {
            let residues: Vec<u8> = strand.bytes().filter(|&b| b != GAP).collect();
            let alphabet = Alphabet::detect(&residues);
            alphabet.validate(&residues, label)?;
        }
        Ok(())
    }
}

/// Compute column statistics from aligned strings
pub fn compute_alignment_stats(query: &str, reference: &str) -> AlignmentStats {
    let query_bytes = query.as_bytes();
    let ref_bytes = reference.as_bytes();
    let length = query_bytes.len().min(ref_bytes.len());

    let mut matches = 0;
    let mut substitutions = 0;
    let mut indel_events = 0;
    let mut indel_residues = 0;
    let mut in_gap = false;

    for i in 0..length {
        let q = query_bytes[i];
        let r = ref_bytes[i];

        if q == GAP || r == GAP {
            if !in_gap {
                indel_events += 1;
                in_gap = true;
            }
            indel_residues += 1;
        } else {
            in_gap = false;
            if q == r {
                matches += 1;
            } else {
                substitutions += 1;
            }
        }
    }

    let identity_percent = if length == 0 {
        0.0
    } else {
        matches as f64 / length as f64 * 100.0
    };

    AlignmentStats {
        matches,
        substitutions,
        indel_events,
        indel_residues,
        length,
        identity_percent,
    }
}

#[derive(Clone, Copy)]
enum Step {
    Diagonal,
    Up,
    Left,
}

/// Dense (n+1) x (m+1) score matrix, row-major with reference along rows
struct ScoreMatrix {
    cells: Vec<i64>,
    cols: usize,
}

impl ScoreMatrix {
    fn allocate(rows: usize, cols: usize, limit: usize) -> Result<Self> {
        let cells = rows.checked_mul(cols).ok_or(MutationScanError::ResourceExhausted {
            cells: usize::MAX,
            limit,
        })?;
        if cells > limit {
            return Err(MutationScanError::ResourceExhausted { cells, limit });
        }
        let mut buffer: Vec<i64> = Vec::new();
        buffer
            .try_reserve_exact(cells)
            .map_err(|_| MutationScanError::ResourceExhausted { cells, limit })?;
        buffer.resize(cells, 0);
        Ok(Self { cells: buffer, cols })
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> i64 {
        self.cells[i * self.cols + j]
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize, value: i64) {
        self.cells[i * self.cols + j] = value;
    }
}

/// Pairwise aligner for gene-length sequences
#[derive(Debug, Clone, Default)]
pub struct Aligner {
    config: AlignmentConfig,
}

impl Aligner {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Align a query against a reference
    pub fn align(&self, reference: &Sequence, query: &Sequence, mode: AlignmentMode) -> Result<Alignment> {
        self.align_residues(reference.residues(), query.residues(), mode)
    }

    /// Align raw residue slices; residues are compared byte for byte and
    /// must be printable ASCII other than the gap symbol
    pub fn align_residues(&self, reference: &[u8], query: &[u8], mode: AlignmentMode) -> Result<Alignment> {
        check_residue_bytes(reference, "reference")?;
        check_residue_bytes(query, "query")?;
        match mode {
            AlignmentMode::Global => self.global(reference, query),
            AlignmentMode::Local => self.local(reference, query),
        }
    }

    fn global(&self, reference: &[u8], query: &[u8]) -> Result<Alignment> {
        if reference.is_empty() || query.is_empty() {
            return Ok(degenerate_global(reference, query));
        }

        let (n, m) = (reference.len(), query.len());
        let gap = self.config.gap_penalty as i64;
        let mut h = ScoreMatrix::allocate(n + 1, m + 1, self.config.max_matrix_cells)?;

        for i in 1..=n {
            h.set(i, 0, (i as i64).saturating_mul(gap));
        }
        for j in 1..=m {
            h.set(0, j, (j as i64).saturating_mul(gap));
        }
        for i in 1..=n {
            for j in 1..=m {
                let diag = h.get(i - 1, j - 1).saturating_add(self.config.substitution(reference[i - 1], query[j - 1]));
                let up = h.get(i - 1, j).saturating_add(gap);
                let left = h.get(i, j - 1).saturating_add(gap);
                h.set(i, j, diag.max(up).max(left));
            }
        }

        let (reference_aligned, query_aligned, _, _) = self.traceback(&h, reference, query, n, m, false);
        Ok(Alignment::new(reference_aligned, query_aligned, h.get(n, m), AlignmentMode::Global, None))
    }

    fn local(&self, reference: &[u8], query: &[u8]) -> Result<Alignment> {
        if reference.is_empty() || query.is_empty() {
            return Ok(Alignment::empty(AlignmentMode::Local));
        }

        let (n, m) = (reference.len(), query.len());
        let gap = self.config.gap_penalty as i64;
        let mut h = ScoreMatrix::allocate(n + 1, m + 1, self.config.max_matrix_cells)?;

        let mut best = (0, 0, 0);
        for i in 1..=n {
            for j in 1..=m {
                let diag = h.get(i - 1, j - 1).saturating_add(self.config.substitution(reference[i - 1], query[j - 1]));
                let up = h.get(i - 1, j).saturating_add(gap);
                let left = h.get(i, j - 1).saturating_add(gap);
                let score = diag.max(up).max(left).max(0);
                h.set(i, j, score);
                // strict comparison keeps the first maximum in row-major order
                if score > best.0 {
                    best = (score, i, j);
                }
            }
        }

        let (best_score, end_i, end_j) = best;
        if best_score <= 0 {
            return Ok(Alignment::empty(AlignmentMode::Local));
        }

        let (reference_aligned, query_aligned, start_i, start_j) =
            self.traceback(&h, reference, query, end_i, end_j, true);
        let region = AlignedRegion {
            reference_start: start_i,
            reference_end: end_i,
            query_start: start_j,
            query_end: end_j,
        };
        Ok(Alignment::new(reference_aligned, query_aligned, best_score, AlignmentMode::Local, Some(region)))
    }

    /// Walk back from (i, j). Ties prefer diagonal, then up, then left.
    /// Local tracebacks stop at the first zero cell.
    fn traceback(
        &self,
        h: &ScoreMatrix,
        reference: &[u8],
        query: &[u8],
        mut i: usize,
        mut j: usize,
        local: bool,
    ) -> (String, String, usize, usize) {
        let gap = self.config.gap_penalty as i64;
        let mut ref_rev = Vec::with_capacity(i + j);
        let mut query_rev = Vec::with_capacity(i + j);

        loop {
            if local && h.get(i, j) <= 0 {
                break;
            }
            if i == 0 && j == 0 {
                break;
            }

            let current = h.get(i, j);
            let step = if i > 0 && j > 0
                && current == h.get(i - 1, j - 1).saturating_add(self.config.substitution(reference[i - 1], query[j - 1]))
            {
                Step::Diagonal
            } else if i > 0 && (j == 0 || current == h.get(i - 1, j).saturating_add(gap)) {
                Step::Up
            } else {
                Step::Left
            };

            match step {
                Step::Diagonal => {
                    ref_rev.push(reference[i - 1]);
                    query_rev.push(query[j - 1]);
                    i -= 1;
                    j -= 1;
                }
                Step::Up => {
                    ref_rev.push(reference[i - 1]);
                    query_rev.push(GAP);
                    i -= 1;
                }
                Step::Left => {
                    ref_rev.push(GAP);
                    query_rev.push(query[j - 1]);
                    j -= 1;
                }
            }
        }

        ref_rev.reverse();
        query_rev.reverse();
        (
            String::from_utf8_lossy(&ref_rev).into_owned(),
            String::from_utf8_lossy(&query_rev).into_owned(),
            i,
            j,
        )
    }
}

fn check_residue_bytes(residues: &[u8], context: &str) -> Result<()> {
    match residues.iter().position(|&r| !r.is_ascii_graphic() || r == GAP) {
        Some(idx) => Err(MutationScanError::InvalidAlphabet {
            context: context.to_string(),
            residue: char::from(residues[idx]),
            position: idx + 1,
        }),
        None => Ok(()),
    }
}

/// Global alignment with an empty side: the empty side becomes all gaps,
/// the other side is copied verbatim and the score is zero.
fn degenerate_global(reference: &[u8], query: &[u8]) -> Alignment {
    let gaps = |len: usize| String::from_utf8_lossy(&vec![GAP; len]).into_owned();
    let (reference_aligned, query_aligned) = if reference.is_empty() {
        (gaps(query.len()), String::from_utf8_lossy(query).into_owned())
    } else {
        (String::from_utf8_lossy(reference).into_owned(), gaps(reference.len()))
    };
    Alignment::new(reference_aligned, query_aligned, 0, AlignmentMode::Global, None)
}

/// Align with the given scoring, without building an [`Aligner`] first
pub fn align(reference: &Sequence, query: &Sequence, mode: AlignmentMode, config: &AlignmentConfig) -> Result<Alignment> {
    Aligner::new(config.clone()).align(reference, query, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn seq(residues: &str) -> Sequence {
        Sequence::new("s", "gene", residues).unwrap()
    }

    #[test]
    fn test_self_alignment_has_no_gaps() {
        let s = seq("MKRISIPSRRLRLPPPLERSHRLLPSPPPSLMSHHHHHHH");
        let alignment = align(&s, &s, AlignmentMode::Global, &AlignmentConfig::default()).unwrap();

        assert!(!alignment.has_gaps());
        assert_eq!(alignment.score, 2 * s.len() as i64);
        assert_eq!(alignment.identity_percent(), 100.0);
        assert_eq!(alignment.reference_aligned, alignment.query_aligned);
    }

    #[test]
    fn test_global_prefers_substitution_over_gaps() {
        let aligner = Aligner::default();
        let alignment = aligner
            .align_residues(b"ACGT", b"AGGT", AlignmentMode::Global)
            .unwrap();
        assert_eq!(alignment.reference_aligned, "ACGT");
        assert_eq!(alignment.query_aligned, "AGGT");
        assert_eq!(alignment.score, 5);
    }

    #[test]
    fn test_global_deletion_is_gapped() {
        let aligner = Aligner::new(AlignmentConfig::custom(2, -3, -2));
        let alignment = aligner
            .align_residues(b"MKRISIPS", b"MKRIPS", AlignmentMode::Global)
            .unwrap();
        assert_eq!(alignment.reference_aligned.len(), alignment.query_aligned.len());
        assert_eq!(alignment.query_aligned.matches('-').count(), 2);
        assert_eq!(alignment.reference_aligned, "MKRISIPS");
        let stats = alignment.stats();
        assert_eq!(stats.indel_events, 1);
        assert_eq!(stats.indel_residues, 2);
        assert_eq!(stats.matches, 6);
    }

    #[test]
    fn test_global_empty_side() {
        let aligner = Aligner::default();
        let alignment = aligner.align_residues(b"", b"ACG", AlignmentMode::Global).unwrap();
        assert_eq!(alignment.score, 0);
        assert_eq!(alignment.reference_aligned, "---");
        assert_eq!(alignment.query_aligned, "ACG");

        let alignment = aligner.align_residues(b"ACGT", b"", AlignmentMode::Global).unwrap();
        assert_eq!(alignment.query_aligned, "----");

        let alignment = aligner.align_residues(b"", b"", AlignmentMode::Global).unwrap();
        assert!(alignment.is_empty());
    }

    #[test]
    fn test_local_brackets_embedded_motif() {
        let motif = "MKRISIPSRRL";
        let noisy = format!("WWYYWWHH{}HHWWYYWW", motif);
        let alignment = align(&seq(motif), &seq(&noisy), AlignmentMode::Local, &AlignmentConfig::default()).unwrap();

        let region = alignment.region.unwrap();
        assert_eq!(region.query_start, 8);
        assert_eq!(region.query_end, 8 + motif.len());
        assert_eq!(region.reference_start, 0);
        assert_eq!(region.reference_end, motif.len());
        assert_eq!(alignment.query_aligned, motif);
        assert_eq!(alignment.score, 2 * motif.len() as i64);
    }

    #[test]
    fn test_local_motif_in_reference() {
        let alignment = Aligner::default()
            .align_residues(b"TTTTTGATTACATTTTT", b"GATTACA", AlignmentMode::Local)
            .unwrap();
        let region = alignment.region.unwrap();
        assert_eq!((region.reference_start, region.reference_end), (5, 12));
        assert_eq!((region.query_start, region.query_end), (0, 7));
        assert_eq!(alignment.reference_offset(), 5);
    }

    #[test]
    fn test_local_without_positive_cells_is_empty() {
        let alignment = Aligner::default()
            .align_residues(b"AAAA", b"CCCC", AlignmentMode::Local)
            .unwrap();
        assert!(alignment.is_empty());
        assert_eq!(alignment.score, 0);
        assert_eq!(alignment.len(), 0);
    }

    #[test]
    fn test_zero_scores_allowed() {
        let aligner = Aligner::new(AlignmentConfig::custom(0, 0, 0));
        let alignment = aligner.align_residues(b"ACGT", b"ACGT", AlignmentMode::Global).unwrap();
        assert_eq!(alignment.score, 0);
        assert_eq!(alignment.reference_aligned, "ACGT");
        assert_eq!(alignment.query_aligned, "ACGT");
    }

    #[test]
    fn test_extreme_penalties_do_not_overflow() {
        let gap = i32::MIN / 2;
        let aligner = Aligner::new(AlignmentConfig::custom(2, -1, gap));
        let alignment = aligner.align_residues(b"AAAA", b"A", AlignmentMode::Global).unwrap();
        assert_eq!(alignment.score, 2 + 3 * gap as i64);
        assert_eq!(alignment.reference_aligned, "AAAA");
        assert_eq!(alignment.query_aligned, "---A");

        let aligner = Aligner::new(AlignmentConfig::custom(i32::MAX, i32::MIN, i32::MIN));
        let alignment = aligner
            .align_residues(b"CCGATTACACC", b"GATTACA", AlignmentMode::Local)
            .unwrap();
        assert_eq!(alignment.score, 7 * i32::MAX as i64);
        assert_eq!(alignment.reference_offset(), 2);
    }

    #[test]
    fn test_raw_residues_must_be_ascii() {
        let aligner = Aligner::default();
        let err = aligner
            .align_residues(&[b'A', 0xC3, 0xA9], b"A", AlignmentMode::Global)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        match err {
            MutationScanError::InvalidAlphabet { context, position, .. } => {
                assert_eq!(context, "reference");
                assert_eq!(position, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = aligner
            .align_residues(b"ACGT", b"AC-T", AlignmentMode::Local)
            .unwrap_err();
        assert!(matches!(err, MutationScanError::InvalidAlphabet { position: 3, .. }));
    }

    #[test]
    fn test_matrix_limit_exhausted() {
        let config = AlignmentConfig::default().with_max_matrix_cells(10);
        let err = Aligner::new(config)
            .align_residues(b"ACGTACGT", b"ACGTACGT", AlignmentMode::Global)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_presets() {
        assert!(AlignmentConfig::from_mode("protein").is_ok());
        assert!(AlignmentConfig::from_mode("dna-strict").is_ok());
        assert!(AlignmentConfig::from_mode("blosum").is_err());
        assert_eq!("SW".parse::<AlignmentMode>().unwrap(), AlignmentMode::Local);
        assert!("semi-global".parse::<AlignmentMode>().is_err());
    }

    #[test]
    fn test_validate_rejects_unequal_strands() {
        let alignment = Alignment::new("ACGT", "ACG", 0, AlignmentMode::Global, None);
        assert!(alignment.validate().unwrap_err().is_invariant_violation());

        let alignment = Alignment::new("AC-T", "AC1T", 0, AlignmentMode::Global, None);
        assert!(!alignment.validate().unwrap_err().is_invariant_violation());
    }
}
