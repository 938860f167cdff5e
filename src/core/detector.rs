// detector.rs - Batch variant detection over (genome, gene) pairs

use crate::core::alignment::{Aligner, Alignment, AlignmentConfig, AlignmentMode};
use crate::core::records::MutationRecordSet;
use crate::core::variant::{call_variants, Variant};
use crate::data::artifact::AlignmentArtifact;
use crate::data::manifest::{AlignmentManifest, AlignmentSource, ManifestEntry};
use crate::data::sequence::{load_queries, load_reference, Sequence};
use crate::error::{ErrorKind, MutationScanError, Result};
use crate::observe::{ScanObserver, SilentObserver};
use crc32fast::Hasher;
use rayon::prelude::*;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

type SharedError = Arc<MutationScanError>;

/// Error attached to the (genome, gene) pair it came from
#[derive(Debug, Clone)]
pub struct PairError {
    pub gene: String,
    pub genome_id: String,
    pub error: SharedError,
}

impl PairError {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn is_invariant_violation(&self) -> bool {
        self.error.is_invariant_violation()
    }
}

/// Pair counts of one detection run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionSummary {
    pub pairs_total: usize,
    /// Pairs that were attempted (succeeded or failed)
    pub pairs_processed: usize,
    pub pairs_succeeded: usize,
    pub pairs_with_variants: usize,
    pub pairs_failed: usize,
    /// Pairs never attempted because the run was cancelled
    pub pairs_skipped: usize,
    pub variants: usize,
    /// Distinct alignments computed after allele deduplication
    pub unique_alignments: usize,
    pub cancelled: bool,
}

#[derive(Debug)]
pub struct DetectionResult {
    pub records: MutationRecordSet,
    pub errors: Vec<PairError>,
    pub summary: DetectionSummary,
}

impl DetectionResult {
    pub fn summary(&self) -> DetectionSummary {
        self.summary
    }

    pub fn into_records(self) -> MutationRecordSet {
        self.records
    }
}

/// Include/exclude regex filters on gene names
#[derive(Debug, Clone, Default)]
pub struct GeneFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl GeneFilter {
    pub fn new(include: Option<Regex>, exclude: Option<Regex>) -> Self {
        Self { include, exclude }
    }

    pub fn from_patterns(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: include.map(Regex::new).transpose()?,
            exclude: exclude.map(Regex::new).transpose()?,
        })
    }

    pub fn accepts(&self, gene: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(gene) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(gene) {
                return false;
            }
        }
        true
    }
}

/// Cooperative cancellation flag, checked between pairs
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A manifest entry with its data loaded and checked
enum ResolvedSource<'m> {
    Sequences {
        reference: Sequence,
        queries: HashMap<String, std::result::Result<Sequence, SharedError>>,
    },
    Alignments(Cow<'m, HashMap<String, Alignment>>),
    Unavailable(SharedError),
}

enum PairPlan<'a> {
    Align(usize),
    Precomputed(&'a Alignment),
    Fail(SharedError),
}

struct PairTask<'a> {
    gene: &'a str,
    genome_id: &'a str,
    plan: PairPlan<'a>,
}

struct AlignJob<'a> {
    reference: &'a Sequence,
    query: &'a Sequence,
}

enum PairOutcome {
    Called(Vec<Variant>),
    Failed(PairError),
    Skipped,
}

fn compute_crc32(sequence: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(sequence);
    hasher.finalize()
}

/// Runs alignment and variant calling for every (genome, gene) pair
pub struct VariantDetector {
    aligner: Aligner,
    mode: AlignmentMode,
    gene_filter: GeneFilter,
    threads: Option<usize>,
    observer: Arc<dyn ScanObserver>,
    cancellation: CancellationToken,
}

impl VariantDetector {
    pub fn new(config: AlignmentConfig, mode: AlignmentMode) -> Self {
        Self {
            aligner: Aligner::new(config),
            mode,
            gene_filter: GeneFilter::default(),
            threads: None,
            observer: Arc::new(SilentObserver),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Use a dedicated pool of `threads` workers instead of the global pool
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_gene_filter(mut self, gene_filter: GeneFilter) -> Self {
        self.gene_filter = gene_filter;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn mode(&self) -> AlignmentMode {
        self.mode
    }

    /// Process every gene of the manifest against every genome.
    ///
    /// Per-pair failures are collected in the result; only resource
    /// exhaustion while allocating a scoring matrix aborts the run.
    pub fn detect<S: AsRef<str> + Sync>(
        &self,
        manifest: &AlignmentManifest,
        genomes: &[S],
    ) -> Result<DetectionResult> {
        let start = Instant::now();
        let genomes: Vec<&str> = genomes.iter().map(|g| g.as_ref()).collect();

        let resolved: Vec<(&str, ResolvedSource)> = manifest
            .entries()
            .iter()
            .filter(|entry| self.gene_filter.accepts(&entry.gene))
            .map(|entry| (entry.gene.as_str(), self.resolve(entry)))
            .collect();

        let (tasks, jobs) = plan_pairs(&resolved, &genomes);
        self.observer.batch_started(tasks.len());

        let outcomes = self.run_in_pool(|| self.execute(&tasks, &jobs))??;

        let mut records = MutationRecordSet::new();
        let mut errors = Vec::new();
        let mut summary = DetectionSummary {
            pairs_total: tasks.len(),
            unique_alignments: jobs.len(),
            ..DetectionSummary::default()
        };

        for (task, outcome) in tasks.iter().zip(outcomes) {
            match outcome {
                PairOutcome::Called(variants) => {
                    summary.pairs_processed += 1;
                    summary.pairs_succeeded += 1;
                    if !variants.is_empty() {
                        summary.pairs_with_variants += 1;
                    }
                    summary.variants += variants.len();
                    records.push_pair(task.gene, task.genome_id, variants);
                }
                PairOutcome::Failed(error) => {
                    summary.pairs_processed += 1;
                    summary.pairs_failed += 1;
                    errors.push(error);
                }
                PairOutcome::Skipped => summary.pairs_skipped += 1,
            }
        }
        summary.cancelled = summary.pairs_skipped > 0 || self.cancellation.is_cancelled();

        self.observer.batch_finished(&summary);
        self.observer
            .message(&format!("⏱️  Variant detection finished in {:.2}s", start.elapsed().as_secs_f64()));

        Ok(DetectionResult {
            records,
            errors,
            summary,
        })
    }

    fn run_in_pool<R: Send>(&self, op: impl FnOnce() -> R + Send) -> Result<R> {
        match self.threads {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| MutationScanError::InvalidConfig(format!("Failed to build thread pool: {}", e)))?;
                Ok(pool.install(op))
            }
            None => Ok(op()),
        }
    }

    /// Compute the distinct alignments, then call variants pair by pair.
    /// Both passes collect in input order so output never depends on scheduling.
    fn execute(&self, tasks: &[PairTask], jobs: &[AlignJob]) -> Result<Vec<PairOutcome>> {
        let computed: Vec<Option<Result<Alignment>>> = jobs
            .par_iter()
            .map(|job| {
                if self.cancellation.is_cancelled() {
                    return None;
                }
                Some(self.aligner.align(job.reference, job.query, self.mode))
            })
            .collect();

        let mut aligned: Vec<Option<std::result::Result<Alignment, SharedError>>> = Vec::with_capacity(computed.len());
        for result in computed {
            match result {
                Some(Err(e)) if e.is_fatal() => return Err(e),
                Some(r) => aligned.push(Some(r.map_err(Arc::new))),
                None => aligned.push(None),
            }
        }

        let outcomes = tasks
            .par_iter()
            .map(|task| {
                if self.cancellation.is_cancelled() {
                    return PairOutcome::Skipped;
                }

                let result = match &task.plan {
                    PairPlan::Fail(error) => Err(error.clone()),
                    PairPlan::Precomputed(alignment) => alignment
                        .validate()
                        .and_then(|_| call_variants(alignment, task.gene, task.genome_id))
                        .map_err(Arc::new),
                    PairPlan::Align(job) => match &aligned[*job] {
                        None => return PairOutcome::Skipped,
                        Some(Err(error)) => Err(error.clone()),
                        Some(Ok(alignment)) => {
                            call_variants(alignment, task.gene, task.genome_id).map_err(Arc::new)
                        }
                    },
                };

                match result {
                    Ok(variants) => {
                        self.observer.pair_finished(task.gene, task.genome_id, variants.len());
                        PairOutcome::Called(variants)
                    }
                    Err(error) => {
                        let pair_error = PairError {
                            gene: task.gene.to_string(),
                            genome_id: task.genome_id.to_string(),
                            error,
                        };
                        self.observer.pair_failed(&pair_error);
                        PairOutcome::Failed(pair_error)
                    }
                }
            })
            .collect();

        Ok(outcomes)
    }

    fn resolve<'m>(&self, entry: &'m ManifestEntry) -> ResolvedSource<'m> {
        let gene = entry.gene.as_str();
        let source = match &entry.source {
            Some(source) => source,
            None => return ResolvedSource::Unavailable(Arc::new(MutationScanError::EmptyManifestEntry(gene.to_string()))),
        };

        let resolved = match source {
            AlignmentSource::Sequences { reference, queries } => {
                Sequence::new(format!("{} reference", gene), gene, reference).map(|reference| {
                    let queries = queries
                        .iter()
                        .map(|(genome, residues)| {
                            (genome.clone(), Sequence::new(genome.clone(), gene, residues).map_err(Arc::new))
                        })
                        .collect();
                    ResolvedSource::Sequences { reference, queries }
                })
            }
            AlignmentSource::FastaFiles { reference, queries } => load_reference(reference, gene).and_then(|reference| {
                let queries = load_queries(queries, gene)?
                    .into_iter()
                    .map(|(genome, sequence)| (genome, sequence.map_err(Arc::new)))
                    .collect();
                Ok(ResolvedSource::Sequences { reference, queries })
            }),
            AlignmentSource::Alignments(alignments) => Ok(ResolvedSource::Alignments(Cow::Borrowed(alignments))),
            AlignmentSource::ArtifactFile(path) => AlignmentArtifact::load(path)
                .map(|artifact| ResolvedSource::Alignments(Cow::Owned(artifact.alignments.into_iter().collect()))),
        };

        resolved.unwrap_or_else(|e| {
            self.observer
                .message(&format!("⚠️  Gene {} unavailable for all genomes: {}", gene, e));
            ResolvedSource::Unavailable(Arc::new(e))
        })
    }
}

/// Lay out pairs gene-major in manifest order and deduplicate identical
/// query sequences within a gene into shared alignment jobs.
fn plan_pairs<'a>(
    resolved: &'a [(&'a str, ResolvedSource<'a>)],
    genomes: &[&'a str],
) -> (Vec<PairTask<'a>>, Vec<AlignJob<'a>>) {
    let mut tasks = Vec::with_capacity(resolved.len() * genomes.len());
    let mut jobs: Vec<AlignJob> = Vec::new();

    for &(gene, ref source) in resolved {
        let mut by_crc: HashMap<u32, Vec<usize>> = HashMap::new();

        for &genome_id in genomes {
            let missing = || {
                PairPlan::Fail(Arc::new(MutationScanError::MissingAlignmentSource {
                    gene: gene.to_string(),
                    genome_id: genome_id.to_string(),
                }))
            };

            let plan = match source {
                ResolvedSource::Unavailable(error) => PairPlan::Fail(error.clone()),
                ResolvedSource::Alignments(alignments) => match alignments.get(genome_id) {
                    Some(alignment) => PairPlan::Precomputed(alignment),
                    None => missing(),
                },
                ResolvedSource::Sequences { reference, queries } => match queries.get(genome_id) {
                    None => missing(),
                    Some(Err(error)) => PairPlan::Fail(error.clone()),
                    Some(Ok(query)) => {
                        let candidates = by_crc
                            .entry(compute_crc32(query.residues()))
                            .or_default();
                        // CRC collisions fall through to a fresh job
                        let existing = candidates
                            .iter()
                            .copied()
                            .find(|&job| jobs[job].query.residues() == query.residues());
                        let job = existing.unwrap_or_else(|| {
                            jobs.push(AlignJob { reference, query });
                            candidates.push(jobs.len() - 1);
                            jobs.len() - 1
                        });
                        PairPlan::Align(job)
                    }
                },
            };

            tasks.push(PairTask {
                gene,
                genome_id,
                plan,
            });
        }
    }

    (tasks, jobs)
}
