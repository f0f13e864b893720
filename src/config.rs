//! Processing pipeline configuration

use crate::RunOptions;
use std::{
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    sync::Arc,
};

/// Final process configuration
///
/// This is the result of digesting CLI arguments. Please refer to
/// [`RunOptions`] to know more about common fields.
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Config {
    /// Root directory of the corpus
    pub corpus: PathBuf,

    /// Kind of statistics being computed
    pub mode: Mode,

    /// How volumes are assigned to a publication year bucket
    pub year_bucketing: YearBucketing,

    /// Number of concurrent volume decoding workers
    pub jobs: NonZeroUsize,

    // Other fields have the same meaning as in RunOptions
    pub language: Option<Box<str>>,
    pub queue_depth: NonZeroUsize,
    pub follow_links: bool,
    pub log_every: NonZeroU64,
}
//
impl Config {
    /// Default configuration for a certain corpus and counting mode
    pub fn new(corpus: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            corpus: corpus.into(),
            mode,
            year_bucketing: YearBucketing::Raw,
            jobs: default_jobs(),
            language: None,
            queue_depth: NonZeroUsize::new(1024).expect("1024 is not zero"),
            follow_links: false,
            log_every: NonZeroU64::new(1000).expect("1000 is not zero"),
        }
    }

    /// Determine process configuration from CLI arguments
    pub(crate) fn from_cli(corpus: PathBuf, mode: Mode, options: RunOptions) -> Arc<Self> {
        let RunOptions {
            jobs,
            queue_depth,
            language,
            parsed_years,
            follow_links,
            log_every,
        } = options;
        let mut config = Self::new(corpus, mode)
            .with_queue_depth(queue_depth)
            .with_year_bucketing(if parsed_years {
                YearBucketing::Parsed
            } else {
                YearBucketing::Raw
            });
        if let Some(jobs) = jobs {
            config = config.with_jobs(jobs);
        }
        if let Some(language) = language {
            config = config.with_language(language);
        }
        Arc::new(Self {
            follow_links,
            log_every,
            ..config
        })
    }

    /// Rebuild with a different number of workers
    pub fn with_jobs(self, jobs: NonZeroUsize) -> Self {
        Self { jobs, ..self }
    }

    /// Rebuild with a different path queue capacity
    pub fn with_queue_depth(self, queue_depth: NonZeroUsize) -> Self {
        Self {
            queue_depth,
            ..self
        }
    }

    /// Rebuild with a language filter
    pub fn with_language(self, language: impl Into<Box<str>>) -> Self {
        Self {
            language: Some(language.into()),
            ..self
        }
    }

    /// Rebuild with a different year bucketing policy
    pub fn with_year_bucketing(self, year_bucketing: YearBucketing) -> Self {
        Self {
            year_bucketing,
            ..self
        }
    }

    /// Truth that a volume in this language should be counted
    pub fn accepts_language(&self, language: Option<&str>) -> bool {
        match &self.language {
            Some(expected) => language == Some(&**expected),
            None => true,
        }
    }
}

/// Kind of statistics being computed
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Mode {
    /// Total token count per year
    YearCounts,

    /// Count of every normalized token per year
    TokenCounts,
}

/// How volumes are assigned to a publication year bucket
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum YearBucketing {
    /// Use the `pubDate` string exactly as found in the volume, or the empty
    /// string if there is none
    #[default]
    Raw,

    /// Use the decimal form of the parsed year, which is 0 for every volume
    /// whose `pubDate` is not an integer
    Parsed,
}

/// Default number of workers: one per available CPU core
fn default_jobs() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
