// records.rs - Run-wide mutation record set

use crate::core::variant::{Variant, VariantSignature};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of one successfully processed (genome, gene) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSummary {
    pub gene: String,
    pub genome_id: String,
    pub variants: usize,
}

/// Every variant called in one run, in processing order.
///
/// Append-only: pairs are added as a whole and never edited afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationRecordSet {
    variants: Vec<Variant>,
    pairs: Vec<PairSummary>,
}

impl MutationRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record set from loose variants, e.g. calls imported from an
    /// earlier run. Pair summaries are derived in first-seen order.
    pub fn from_variants(variants: Vec<Variant>) -> Self {
        let mut pairs: Vec<PairSummary> = Vec::new();
        for variant in &variants {
            match pairs
                .iter_mut()
                .find(|p| p.gene == variant.gene && p.genome_id == variant.genome_id)
            {
                Some(pair) => pair.variants += 1,
                None => pairs.push(PairSummary {
                    gene: variant.gene.clone(),
                    genome_id: variant.genome_id.clone(),
                    variants: 1,
                }),
            }
        }
        Self { variants, pairs }
    }

    /// Append the result of one pair
    pub fn push_pair(&mut self, gene: &str, genome_id: &str, variants: Vec<Variant>) {
        self.pairs.push(PairSummary {
            gene: gene.to_string(),
            genome_id: genome_id.to_string(),
            variants: variants.len(),
        });
        self.variants.extend(variants);
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn pairs(&self) -> &[PairSummary] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Distinct genome ids carrying at least one variant
    pub fn genome_ids(&self) -> BTreeSet<&str> {
        self.variants.iter().map(|v| v.genome_id.as_str()).collect()
    }

    /// Deduplicated signature set per genome
    pub fn signatures_by_genome(&self) -> BTreeMap<&str, BTreeSet<VariantSignature>> {
        let mut profiles: BTreeMap<&str, BTreeSet<VariantSignature>> = BTreeMap::new();
        for variant in &self.variants {
            profiles
                .entry(variant.genome_id.as_str())
                .or_default()
                .insert(variant.signature());
        }
        profiles
    }

    /// Variants of one gene across all genomes
    pub fn for_gene<'a>(&'a self, gene: &'a str) -> impl Iterator<Item = &'a Variant> + 'a {
        self.variants.iter().filter(move |v| v.gene == gene)
    }
}
