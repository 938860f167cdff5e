// cooccurrence.rs - Cross-genome co-occurrence statistics over called variants

use crate::core::records::MutationRecordSet;
use crate::core::variant::VariantSignature;
use crate::observe::{ScanObserver, SilentObserver};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub const DEFAULT_MIN_SUPPORT: usize = 2;

/// Two distinct signatures observed together in `count` genomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooccurrencePair {
    pub signature_a: VariantSignature,
    pub signature_b: VariantSignature,
    pub count: usize,
    pub frequency: f64,
    /// One-sided Fisher exact test for enrichment of joint presence
    pub p_value: f64,
}

impl CooccurrencePair {
    /// `a|b`, the key pairs are ordered by on equal counts
    pub fn combined_signature(&self) -> String {
        format!("{}|{}", self.signature_a, self.signature_b)
    }
}

/// How many genomes carry one signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSupport {
    pub signature: VariantSignature,
    pub genomes: usize,
    pub frequency: f64,
}

/// A complete per-genome signature set shared by `genomes` genomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationPattern {
    pub signatures: Vec<VariantSignature>,
    pub genomes: usize,
    pub frequency: f64,
}

impl MutationPattern {
    pub fn label(&self) -> String {
        self.signatures
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("+")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub min_support: usize,
    /// Drop pairs whose p-value exceeds this bound
    pub max_p_value: Option<f64>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_support: DEFAULT_MIN_SUPPORT,
            max_p_value: None,
        }
    }
}

/// Per-genome signature sets plus the population they are measured against
struct GenomeProfiles<'a> {
    profiles: BTreeMap<&'a str, BTreeSet<VariantSignature>>,
    population: usize,
}

impl<'a> GenomeProfiles<'a> {
    /// Genomes processed without variants still count toward the population
    fn new(records: &'a MutationRecordSet, population_size: usize) -> Self {
        let profiles = records.signatures_by_genome();
        let observed: BTreeSet<&str> = records
            .pairs()
            .iter()
            .map(|p| p.genome_id.as_str())
            .chain(profiles.keys().copied())
            .collect();
        Self {
            profiles,
            population: population_size.max(observed.len()),
        }
    }

    fn is_empty(&self) -> bool {
        self.population == 0 || self.profiles.is_empty()
    }

    fn frequency(&self, count: usize) -> f64 {
        count as f64 / self.population as f64
    }

    fn support_counts(&self) -> BTreeMap<&VariantSignature, usize> {
        let mut counts = BTreeMap::new();
        for signatures in self.profiles.values() {
            for signature in signatures {
                *counts.entry(signature).or_insert(0) += 1;
            }
        }
        counts
    }
}

pub struct CooccurrenceAnalyzer {
    config: AnalyzerConfig,
    observer: Arc<dyn ScanObserver>,
}

impl CooccurrenceAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            observer: Arc::new(SilentObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Count unordered pairs of distinct signatures sharing a genome.
    ///
    /// The population is `population_size` or the number of genomes seen in
    /// `records`, whichever is larger.
    pub fn analyze(&self, records: &MutationRecordSet, population_size: usize) -> Vec<CooccurrencePair> {
        let profiles = GenomeProfiles::new(records, population_size);
        if profiles.is_empty() {
            self.observer.analysis_finished(0);
            return Vec::new();
        }

        let mut joint: BTreeMap<(&VariantSignature, &VariantSignature), usize> = BTreeMap::new();
        for signatures in profiles.profiles.values() {
            let mut ordered: Vec<(String, &VariantSignature)> =
                signatures.iter().map(|s| (s.to_string(), s)).collect();
            ordered.sort();
            for (i, (_, a)) in ordered.iter().enumerate() {
                for (_, b) in &ordered[i + 1..] {
                    *joint.entry((*a, *b)).or_insert(0) += 1;
                }
            }
        }

        let support = profiles.support_counts();
        let fisher = FisherExact::new(profiles.population);
        let min_support = self.config.min_support;

        let mut pairs: Vec<CooccurrencePair> = joint
            .into_iter()
            .filter(|&(_, count)| count >= min_support)
            .map(|((a, b), count)| CooccurrencePair {
                signature_a: a.clone(),
                signature_b: b.clone(),
                count,
                frequency: profiles.frequency(count),
                p_value: fisher.enrichment_p_value(count, support[a], support[b]),
            })
            .filter(|pair| self.config.max_p_value.map_or(true, |max| pair.p_value <= max))
            .collect();

        sort_by_count_then_key(&mut pairs, |p| p.count, CooccurrencePair::combined_signature);
        self.observer.analysis_finished(pairs.len());
        pairs
    }

    pub fn variant_support(&self, records: &MutationRecordSet, population_size: usize) -> Vec<VariantSupport> {
        let profiles = GenomeProfiles::new(records, population_size);
        if profiles.is_empty() {
            return Vec::new();
        }

        let mut support: Vec<VariantSupport> = profiles
            .support_counts()
            .into_iter()
            .map(|(signature, genomes)| VariantSupport {
                signature: signature.clone(),
                genomes,
                frequency: profiles.frequency(genomes),
            })
            .collect();
        sort_by_count_then_key(&mut support, |s| s.genomes, |s| s.signature.to_string());
        support
    }

    /// Whole-genome signature sets of size two or more carried by at least
    /// `min_support` genomes
    pub fn mutation_patterns(&self, records: &MutationRecordSet, population_size: usize) -> Vec<MutationPattern> {
        let profiles = GenomeProfiles::new(records, population_size);
        if profiles.is_empty() {
            return Vec::new();
        }

        let mut counts: BTreeMap<&BTreeSet<VariantSignature>, usize> = BTreeMap::new();
        for signatures in profiles.profiles.values().filter(|s| s.len() >= 2) {
            *counts.entry(signatures).or_insert(0) += 1;
        }

        let mut patterns: Vec<MutationPattern> = counts
            .into_iter()
            .filter(|&(_, genomes)| genomes >= self.config.min_support)
            .map(|(signatures, genomes)| MutationPattern {
                signatures: signatures.iter().cloned().collect(),
                genomes,
                frequency: profiles.frequency(genomes),
            })
            .collect();
        sort_by_count_then_key(&mut patterns, |p| p.genomes, MutationPattern::label);
        patterns
    }
}

impl Default for CooccurrenceAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

fn sort_by_count_then_key<T>(items: &mut [T], count: impl Fn(&T) -> usize, key: impl Fn(&T) -> String) {
    items.sort_by_cached_key(|item| (std::cmp::Reverse(count(item)), key(item)));
}

/// Pairwise co-occurrence with default analyzer settings apart from `min_support`
pub fn analyze(records: &MutationRecordSet, min_support: usize, population_size: usize) -> Vec<CooccurrencePair> {
    CooccurrenceAnalyzer::new(AnalyzerConfig {
        min_support,
        max_p_value: None,
    })
    .analyze(records, population_size)
}

pub fn variant_support(records: &MutationRecordSet, population_size: usize) -> Vec<VariantSupport> {
    CooccurrenceAnalyzer::default().variant_support(records, population_size)
}

pub fn mutation_patterns(records: &MutationRecordSet, min_support: usize, population_size: usize) -> Vec<MutationPattern> {
    CooccurrenceAnalyzer::new(AnalyzerConfig {
        min_support,
        max_p_value: None,
    })
    .mutation_patterns(records, population_size)
}

/// Below this `k`, `ln_choose` sums logs of the exact product
const EXACT_CHOOSE_TERMS: usize = 64;

/// Lanczos approximation (g = 7, n = 9)
fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        let pi = std::f64::consts::PI;
        (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut sum = COEFFS[0];
        for (i, &c) in COEFFS[1..].iter().enumerate() {
            sum += c / (x + i as f64 + 1.0);
        }
        let t = x + 7.5;
        0.5 * (2.0 * std::f64::consts::PI).ln() + t.ln() * (x + 0.5) - t + sum.ln()
    }
}

/// ln C(n, k) for k <= n
fn ln_choose(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    if k == 0 {
        return 0.0;
    }
    if k <= EXACT_CHOOSE_TERMS {
        (1..=k).map(|i| ((n - k + i) as f64 / i as f64).ln()).sum()
    } else {
        ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
    }
}

/// Hypergeometric upper tail over a fixed population
struct FisherExact {
    population: usize,
}

impl FisherExact {
    fn new(population: usize) -> Self {
        Self { population }
    }

    /// P(X >= joint) for X ~ Hypergeometric(population, support_a, support_b)
    fn enrichment_p_value(&self, joint: usize, support_a: usize, support_b: usize) -> f64 {
        let n = self.population;
        if support_a > n || support_b > n {
            return 1.0;
        }
        let lower = joint.max(support_a.saturating_add(support_b).saturating_sub(n));
        let upper = support_a.min(support_b);
        if lower > upper {
            return 0.0;
        }

        // ln P(X = lower), then P(X = x + 1) / P(X = x) term by term
        let mut ln_term = ln_choose(support_a, lower) + ln_choose(n - support_a, support_b - lower)
            - ln_choose(n, support_b);
        let mut p = 0.0;
        for x in lower..=upper {
            p += ln_term.exp();
            if x < upper {
                let rest = (n - support_a - (support_b - x)) as f64;
                ln_term += ((support_a - x) as f64).ln() + ((support_b - x) as f64).ln()
                    - ((x + 1) as f64).ln()
                    - (rest + 1.0).ln();
            }
        }
        p.clamp(0.0, 1.0)
    }
}
