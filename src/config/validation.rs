// validation.rs - Configuration validation

use crate::config::ScanConfig;
use crate::core::alignment::{AlignmentConfig, AlignmentMode};
use crate::core::cooccurrence::{AnalyzerConfig, CooccurrenceAnalyzer, DEFAULT_MIN_SUPPORT};
use crate::core::detector::{GeneFilter, VariantDetector};
use crate::error::{MutationScanError, Result};
use regex::Regex;
use std::str::FromStr;

/// Settings resolved into the types the detector and analyzer take
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub alignment_mode: AlignmentMode,
    pub alignment_config: AlignmentConfig,
    pub threads: Option<usize>,
    pub analyzer: AnalyzerConfig,
    pub gene_filter: GeneFilter,
}

impl ValidatedConfig {
    pub fn build_detector(&self) -> VariantDetector {
        let detector = VariantDetector::new(self.alignment_config.clone(), self.alignment_mode)
            .with_gene_filter(self.gene_filter.clone());
        match self.threads {
            Some(threads) => detector.with_threads(threads),
            None => detector,
        }
    }

    pub fn build_analyzer(&self) -> CooccurrenceAnalyzer {
        CooccurrenceAnalyzer::new(self.analyzer)
    }
}

fn invalid(message: impl Into<String>) -> MutationScanError {
    MutationScanError::InvalidConfig(message.into())
}

fn compile(pattern: &Option<String>, name: &str) -> Result<Option<Regex>> {
    pattern
        .as_deref()
        .map(|p| Regex::new(p).map_err(|e| invalid(format!("Invalid {} regex: {}", name, e))))
        .transpose()
}

impl ScanConfig {
    /// Resolve defaults and range-check the run settings. Scores may be any integer.
    pub fn validate(&self) -> Result<ValidatedConfig> {
        let alignment_mode = match &self.alignment_mode {
            Some(mode) => AlignmentMode::from_str(mode)?,
            None => AlignmentMode::Global,
        };

        let defaults = AlignmentConfig::default();
        let custom = self.match_score.is_some() || self.mismatch_penalty.is_some() || self.gap_penalty.is_some();
        let mut alignment_config = if custom {
            AlignmentConfig::custom(
                self.match_score.unwrap_or(defaults.match_score),
                self.mismatch_penalty.unwrap_or(defaults.mismatch_penalty),
                self.gap_penalty.unwrap_or(defaults.gap_penalty),
            )
        } else {
            AlignmentConfig::from_mode(self.scoring_preset.as_deref().unwrap_or("default"))?
        };

        if let Some(cells) = self.max_matrix_cells {
            if cells == 0 {
                return Err(invalid("max_matrix_cells must be greater than 0"));
            }
            alignment_config = alignment_config.with_max_matrix_cells(cells);
        }

        if self.threads == Some(0) {
            return Err(invalid("threads must be greater than 0"));
        }

        let min_support = self.min_support.unwrap_or(DEFAULT_MIN_SUPPORT);
        if min_support == 0 {
            return Err(invalid("min_support must be at least 1"));
        }
        if let Some(p) = self.max_p_value {
            if !(p > 0.0 && p <= 1.0) {
                return Err(invalid("max_p_value must be in (0.0, 1.0]"));
            }
        }

        let gene_filter = GeneFilter::new(
            compile(&self.include_genes, "include_genes")?,
            compile(&self.exclude_genes, "exclude_genes")?,
        );

        Ok(ValidatedConfig {
            alignment_mode,
            alignment_config,
            threads: self.threads,
            analyzer: AnalyzerConfig {
                min_support,
                max_p_value: self.max_p_value,
            },
            gene_filter,
        })
    }
}
