//! This program computes token frequency statistics over the HathiTrust
//! Research Center "Extracted Features" dataset, whose general documentation
//! you can find at <https://analytics.hathitrust.org/datasets>.
//!
//! Every volume of the dataset is a bzip2-compressed JSON file, carrying
//! per-page token counts broken down by part-of-speech tag. We walk a local
//! copy of the corpus, decode every volume in parallel, and merge the counts
//! into per-year tables.

mod aggregate;
mod config;
mod corpus;
mod output;
mod progress;
mod scheduler;
mod stats;
mod tokens;
mod volume;

use crate::{
    config::{Config, Mode},
    progress::ProgressReport,
};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::{
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    sync::Arc,
};
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

/// Count tokens across a local copy of the HTRC Extracted Features corpus
///
/// Every regular file below the corpus root is treated as a bzip2-compressed
/// JSON volume. Files which cannot be read or parsed are skipped and counted,
/// they never abort the run.
#[derive(Parser, Debug)]
#[command(version, author)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Kind of statistics to be computed
#[derive(Subcommand, Debug)]
enum Command {
    /// Total token count for each publication year
    YearCounts {
        /// Root directory of the corpus
        corpus: PathBuf,

        /// Where the JSON year -> count table should be written
        output: PathBuf,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Count of each normalized token for each publication year
    TokenCounts {
        /// Root directory of the corpus
        corpus: PathBuf,

        /// Where the JSON year -> token -> count table should be written
        ///
        /// The table is written to stdout if this is not specified.
        output: Option<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },
}
//
impl Command {
    /// Where the final table should go, if not stdout
    fn output(&self) -> Option<&PathBuf> {
        match self {
            Self::YearCounts { output, .. } => Some(output),
            Self::TokenCounts { output, .. } => output.as_ref(),
        }
    }
}

/// Options shared by all subcommands
#[derive(clap::Args, Debug)]
pub struct RunOptions {
    /// Number of volumes that are decoded concurrently
    ///
    /// Defaults to the number of CPU cores available to this process.
    #[arg(short, long)]
    jobs: Option<NonZeroUsize>,

    /// Maximal number of discovered file paths awaiting a worker
    ///
    /// Directory traversal pauses when this many paths are queued, which
    /// bounds memory usage when the filesystem is faster than decoding.
    #[arg(long, default_value = "1024")]
    queue_depth: NonZeroUsize,

    /// Only count volumes in this language, e.g. "eng"
    ///
    /// Matched against the volume's `metadata.language` field. All volumes
    /// are counted if this is not specified.
    #[arg(short, long)]
    language: Option<Box<str>>,

    /// Bucket volumes by parsed integer year instead of raw `pubDate` string
    ///
    /// Raw bucketing keeps odd publication dates like "18uu" apart from each
    /// other. Parsed bucketing merges all of them into year "0".
    #[arg(long, default_value_t = false)]
    parsed_years: bool,

    /// Follow symbolic links while walking the corpus
    #[arg(long, default_value_t = false)]
    follow_links: bool,

    /// Log a progress message every time this many volumes are done
    #[arg(long, default_value = "1000")]
    log_every: NonZeroU64,
}
//
impl Args {
    /// Decode and validate CLI arguments
    pub fn parse_and_check() -> Result<Self> {
        // Decode CLI arguments
        let args = Args::parse();

        // Check CLI arguments for basic sanity
        if let Some(output) = args.command.output() {
            anyhow::ensure!(
                !output.is_dir(),
                "output path {} is a directory",
                output.display()
            );
        }
        Ok(args)
    }

    /// Split CLI arguments into run configuration and output location
    pub fn into_config(self) -> (Arc<Config>, Option<PathBuf>) {
        match self.command {
            Command::YearCounts {
                corpus,
                output,
                options,
            } => (
                Config::from_cli(corpus, Mode::YearCounts, options),
                Some(output),
            ),
            Command::TokenCounts {
                corpus,
                output,
                options,
            } => (Config::from_cli(corpus, Mode::TokenCounts, options), output),
        }
    }
}
//
#[tokio::main]
async fn main() -> Result<()> {
    // Set up logging
    setup_logging().map_err(|e| anyhow::format_err!("{e}"))?;

    // Decode CLI arguments
    let (config, output) = Args::parse_and_check()?.into_config();

    // Set up progress reporting
    let report = ProgressReport::new();

    // Walk the corpus and count tokens
    let outcome = scheduler::run(config.clone(), &report).await?;

    // Tell the user about files that didn't make it
    let summary = outcome.summary;
    log::info!("Corpus traversal done: {summary}");
    eprintln!("{summary}");

    // Save the requested table
    output::save(&outcome.aggregate, config.mode, output.as_deref()).await
}

/// Use anyhow for Result type erasure
pub use anyhow::Result;

/// Lowercase token made of ASCII letters
pub type Token = Box<str>;

/// Publication year bucket, as it will appear in the output
///
/// This is a string rather than an integer because the corpus stores years as
/// strings, and some of them are not plain integers.
pub type YearKey = Arc<str>;

/// Number of token occurences
///
/// The full corpus holds several hundred billion tokens, and some years
/// concentrate a large share of them, so 32-bit counts are not enough.
pub type Count = u64;

/// Set up logging
fn setup_logging() -> syslog::Result<()> {
    syslog::init(
        syslog::Facility::LOG_USER,
        if cfg!(feature = "log-trace") {
            LevelFilter::Trace
        } else if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
        None,
    )
}

/// Use jemalloc for improved multi-thread performance
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;
