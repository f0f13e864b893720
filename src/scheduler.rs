//! Parallel traversal of the corpus
//!
//! A blocking thread walks the corpus directory tree and pushes every file
//! path into a bounded queue, which makes the walk wait whenever decoding
//! falls behind. A fixed set of worker tasks pulls paths from that queue and
//! decompresses one volume at a time. Parsing, normalization and merging into
//! the shared [`Aggregator`] are CPU-bound, so they are handed over to the
//! blocking thread pool.

use crate::{
    aggregate::{Aggregate, Aggregator},
    config::{Config, Mode},
    corpus,
    progress::{ProgressConfig, ProgressReport, ProgressTracker},
    stats::{FileOutcome, RunStats, RunSummary},
    tokens,
    volume::{self, DecodeError, Volume},
    Result,
};
use anyhow::Context;
use std::{path::PathBuf, sync::Arc};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinSet,
};

/// Result of a corpus traversal
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunOutcome {
    /// Corpus-wide tables
    pub aggregate: Aggregate,

    /// What happened to the corpus files
    pub summary: RunSummary,
}

/// Count tokens in every volume of the corpus
///
/// Fails if the corpus root cannot be walked, in which case no volume is
/// processed. Individual files which cannot be decoded are skipped and
/// accounted for in the [`RunSummary`].
pub async fn run(config: Arc<Config>, report: &ProgressReport) -> Result<RunOutcome> {
    // Check out the corpus before doing anything else
    let paths = corpus::files(&config.corpus, config.follow_links)
        .context("starting the corpus traversal")?;
    log::info!(
        "Counting tokens in {} with {} workers",
        config.corpus.display(),
        config.jobs
    );

    // Set up shared state
    let aggregator = Arc::new(Aggregator::new());
    let stats = Arc::new(RunStats::new());
    let files = report.add(
        "Counting tokens in volumes",
        ProgressConfig::new(0).allow_adding_work(),
    );
    let (sender, receiver) = mpsc::channel(config.queue_depth.get());
    let receiver = Arc::new(Mutex::new(receiver));

    // Start the workers
    let mut workers = JoinSet::new();
    for _ in 0..config.jobs.get() {
        workers.spawn(worker(
            config.clone(),
            receiver.clone(),
            aggregator.clone(),
            stats.clone(),
            files.clone(),
        ));
    }
    // The queue must close if every worker is gone
    drop(receiver);

    // Feed them with corpus files
    let walker = {
        let stats = stats.clone();
        tokio::task::spawn_blocking(move || walk(paths, sender, &stats, &files))
    };

    // Wait for everything to be done
    walker.await.context("walking the corpus")?;
    while let Some(worker) = workers.join_next().await {
        worker.context("running a volume worker")??;
    }
    let aggregator = Arc::into_inner(aggregator)
        .expect("all workers are done, so nothing else should hold the aggregator");
    let summary = stats.summary();
    debug_assert_eq!(summary.discovered, summary.done());
    Ok(RunOutcome {
        aggregate: aggregator.finish(),
        summary,
    })
}

/// Send corpus file paths to the workers
///
/// Runs on a blocking thread, and blocks whenever the path queue is full.
fn walk(
    paths: impl Iterator<Item = walkdir::Result<PathBuf>>,
    sender: mpsc::Sender<PathBuf>,
    stats: &RunStats,
    files: &ProgressTracker,
) {
    for path in paths {
        match path {
            Ok(path) => {
                stats.file_discovered();
                files.add_work(1);
                if sender.blocking_send(path).is_err() {
                    log::error!("All workers are gone, stopping the corpus traversal");
                    break;
                }
            }
            Err(e) => {
                log::warn!("Failed to inspect a corpus entry: {e}");
                stats.walk_error();
            }
        }
    }
    files.done_adding_work();
}

/// Process volume files until the path queue is closed and empty
async fn worker(
    config: Arc<Config>,
    paths: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
    aggregator: Arc<Aggregator>,
    stats: Arc<RunStats>,
    files: ProgressTracker,
) -> Result<()> {
    loop {
        let Some(path) = paths.lock().await.recv().await else {
            break;
        };
        let done = match volume::load(&path).await {
            Ok(json) => {
                let config = config.clone();
                let aggregator = aggregator.clone();
                let stats = stats.clone();
                tokio::task::spawn_blocking(move || {
                    let outcome = volume::parse(&path, &json)
                        .map(|volume| count(&config, volume, &aggregator));
                    record(&stats, outcome)
                })
                .await
                .context("counting tokens in a volume")?
            }
            Err(e) => record(&stats, Err(e)),
        };
        files.make_progress(1);
        if done % config.log_every.get() == 0 {
            log::info!("{done} corpus files done so far: {}", stats.summary());
        }
    }
    Ok(())
}

/// Count a decoded volume, unless the language filter rejects it
fn count(config: &Config, volume: Volume, aggregator: &Aggregator) -> FileOutcome<'static> {
    if config.accepts_language(volume.language.as_deref()) {
        merge(config, volume, aggregator);
        FileOutcome::Processed
    } else {
        log::trace!(
            "Ignoring volume {} in language {:?}",
            volume.id,
            volume.language
        );
        FileOutcome::Filtered
    }
}

/// Account for the final state of a file
///
/// Returns the number of files that are done so far, including this one.
fn record(stats: &RunStats, outcome: Result<FileOutcome<'static>, DecodeError>) -> u64 {
    match outcome {
        Ok(outcome) => stats.file_done(outcome),
        Err(e) => {
            log::warn!("Skipping corpus file: {e}");
            stats.file_done(FileOutcome::Failed(&e))
        }
    }
}

/// Merge the counts of a volume into the aggregate
fn merge(config: &Config, volume: Volume, aggregator: &Aggregator) {
    let year = volume.year_key(config.year_bucketing);
    aggregator.merge_volume(&year, volume.total_token_count());
    if config.mode == Mode::TokenCounts {
        aggregator.merge_volume_tokens(&year, tokens::normalize_volume(&volume));
    }
}
