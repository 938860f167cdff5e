// observe.rs - Injected progress and logging hooks

use crate::core::detector::{DetectionSummary, PairError};
use indicatif::{ProgressBar, ProgressStyle};

/// Hooks the detector and analyzer call while they run.
///
/// Every method has a no-op default; implementors override what they need.
/// Hooks may be called concurrently from worker threads.
pub trait ScanObserver: Send + Sync {
    fn batch_started(&self, _total_pairs: usize) {}

    fn pair_finished(&self, _gene: &str, _genome_id: &str, _variants: usize) {}

    fn pair_failed(&self, _error: &PairError) {}

    fn batch_finished(&self, _summary: &DetectionSummary) {}

    fn analysis_finished(&self, _pairs: usize) {}

    /// Free-form informational message
    fn message(&self, _message: &str) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl ScanObserver for SilentObserver {}

/// Forwards events to the `log` facade; the host decides where they go
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ScanObserver for LogObserver {
    fn batch_started(&self, total_pairs: usize) {
        log::info!("🧬 Detecting variants in {} (genome, gene) pairs", total_pairs);
    }

    fn pair_finished(&self, gene: &str, genome_id: &str, variants: usize) {
        log::debug!("{} / {}: {} variants", genome_id, gene, variants);
    }

    fn pair_failed(&self, error: &PairError) {
        log::warn!("⚠️  {} / {}: {}", error.genome_id, error.gene, error.error);
    }

    fn batch_finished(&self, summary: &DetectionSummary) {
        log::info!(
            "✅ Variant detection complete: {} processed, {} with variants, {} failed, {} skipped",
            summary.pairs_processed,
            summary.pairs_with_variants,
            summary.pairs_failed,
            summary.pairs_skipped
        );
    }

    fn analysis_finished(&self, pairs: usize) {
        log::info!("📊 Co-occurrence analysis found {} pairs", pairs);
    }

    fn message(&self, message: &str) {
        log::info!("{}", message);
    }
}

/// Terminal progress bar over the pair batch
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanObserver for ProgressObserver {
    fn batch_started(&self, total_pairs: usize) {
        self.bar.set_length(total_pairs as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {per_sec} ETA: {eta}")
        {
            self.bar.set_style(style.progress_chars("#>-"));
        }
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    }

    fn pair_finished(&self, _gene: &str, _genome_id: &str, _variants: usize) {
        self.bar.inc(1);
    }

    fn pair_failed(&self, _error: &PairError) {
        self.bar.inc(1);
    }

    fn batch_finished(&self, summary: &DetectionSummary) {
        self.bar.finish_with_message(format!(
            "✅ {} pairs processed, {} failed",
            summary.pairs_processed, summary.pairs_failed
        ));
    }

    fn message(&self, message: &str) {
        self.bar.println(message);
    }
}
