// settings.rs - Configuration file support

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Scan settings as written in a TOML file. Every field is optional;
/// `validate` fills in defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ScanConfig {
    // Alignment
    pub alignment_mode: Option<String>,
    pub scoring_preset: Option<String>,
    pub match_score: Option<i32>,
    pub mismatch_penalty: Option<i32>,
    pub gap_penalty: Option<i32>,
    pub max_matrix_cells: Option<usize>,

    // Performance
    pub threads: Option<usize>,

    // Co-occurrence
    pub min_support: Option<usize>,
    pub max_p_value: Option<f64>,

    // Gene filtering
    pub include_genes: Option<String>,
    pub exclude_genes: Option<String>,
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: ScanConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Overlay `other` on top of `self`; values set in `other` win
    pub fn merge(mut self, other: ScanConfig) -> Self {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        overlay!(
            alignment_mode,
            scoring_preset,
            match_score,
            mismatch_penalty,
            gap_penalty,
            max_matrix_cells,
            threads,
            min_support,
            max_p_value,
            include_genes,
            exclude_genes
        );
        self
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# mutationscan.toml - Configuration file for mutationscan

# =============================================================================
# ALIGNMENT SETTINGS
# =============================================================================

# Alignment mode: global (Needleman-Wunsch) or local (Smith-Waterman)
alignment_mode = "global"

# Scoring preset: default, protein, dna, dna-strict, dna-permissive
scoring_preset = "default"

# Custom scores (override the preset when any is set)
# match_score = 2
# mismatch_penalty = -1
# gap_penalty = -1

# Upper bound on scoring matrix cells per alignment
max_matrix_cells = 67108864

# =============================================================================
# PERFORMANCE
# =============================================================================

# Number of threads (omit for the global rayon pool)
# threads = 8

# =============================================================================
# CO-OCCURRENCE
# =============================================================================

# Minimum number of genomes sharing a pair
min_support = 2

# Drop pairs with a Fisher exact p-value above this bound
# max_p_value = 0.05

# =============================================================================
# GENE FILTERING
# =============================================================================

# Include only genes matching regex pattern
# include_genes = "^(gyr|par)"

# Exclude genes matching regex pattern
# exclude_genes = "^bla"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config: ScanConfig = toml::from_str(&ScanConfig::generate_sample()).unwrap();
        assert_eq!(config.alignment_mode.as_deref(), Some("global"));
        assert_eq!(config.min_support, Some(2));
        assert!(config.threads.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.toml");
        let config = ScanConfig {
            alignment_mode: Some("local".to_string()),
            threads: Some(4),
            max_p_value: Some(0.01),
            ..ScanConfig::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(ScanConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = ScanConfig {
            alignment_mode: Some("global".to_string()),
            min_support: Some(3),
            ..ScanConfig::default()
        };
        let overrides = ScanConfig {
            alignment_mode: Some("local".to_string()),
            ..ScanConfig::default()
        };
        let merged = base.merge(overrides);
        assert_eq!(merged.alignment_mode.as_deref(), Some("local"));
        assert_eq!(merged.min_support, Some(3));
    }

    #[test]
    fn test_unknown_key_type_is_error() {
        assert!(toml::from_str::<ScanConfig>("threads = \"many\"").is_err());
    }
}
