//! Run statistics
//!
//! These counters only exist for the user's information. They are kept apart
//! from the [`Aggregator`](crate::aggregate::Aggregator) so that token counts
//! do not depend on them in any way.

use crate::volume::DecodeError;
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

/// Live counters of a corpus traversal
#[derive(Debug, Default)]
pub struct RunStats {
    /// Files that were found by directory traversal
    discovered: AtomicU64,

    /// Volumes whose counts were merged into the aggregate
    processed: AtomicU64,

    /// Volumes that were decoded, but rejected by the language filter
    filtered: AtomicU64,

    /// Files that could not be opened, read or decompressed
    unreadable: AtomicU64,

    /// Files whose content is not a well-formed volume
    malformed: AtomicU64,

    /// Directory entries that could not be inspected
    walk_errors: AtomicU64,

    /// Files that reached a final state, whichever it is
    done: AtomicU64,
}
//
impl RunStats {
    /// Set up the counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a file was found
    pub fn file_discovered(&self) {
        self.discovered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that a directory entry could not be inspected
    pub fn walk_error(&self) {
        self.walk_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that a file reached a final state
    ///
    /// Returns the number of files that are done so far, including this one.
    pub fn file_done(&self, outcome: FileOutcome<'_>) -> u64 {
        let counter = match outcome {
            FileOutcome::Processed => &self.processed,
            FileOutcome::Filtered => &self.filtered,
            FileOutcome::Failed(DecodeError::Io { .. }) => &self.unreadable,
            FileOutcome::Failed(
                DecodeError::Parse { .. }
                | DecodeError::MissingField { .. }
                | DecodeError::Overflow { .. },
            ) => &self.malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.done.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current state of the counters
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            discovered: self.discovered.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            unreadable: self.unreadable.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            walk_errors: self.walk_errors.load(Ordering::Relaxed),
        }
    }
}

/// Final state of one file
#[derive(Debug)]
pub enum FileOutcome<'error> {
    /// Volume counts were merged
    Processed,

    /// Volume was rejected by the language filter
    Filtered,

    /// File was skipped because it could not be decoded
    Failed(&'error DecodeError),
}

/// Snapshot of [`RunStats`]
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RunSummary {
    // Fields have the same meaning as in RunStats
    pub discovered: u64,
    pub processed: u64,
    pub filtered: u64,
    pub unreadable: u64,
    pub malformed: u64,
    pub walk_errors: u64,
}
//
impl RunSummary {
    /// Files that were skipped due to a decoding failure
    pub fn skipped(&self) -> u64 {
        self.unreadable + self.malformed
    }

    /// Files that reached a final state
    pub fn done(&self) -> u64 {
        self.processed + self.filtered + self.skipped()
    }
}
//
impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} volumes processed, {} filtered out, {} files skipped ({} unreadable, {} malformed)",
            self.processed,
            self.filtered,
            self.skipped(),
            self.unreadable,
            self.malformed,
        )?;
        if self.walk_errors > 0 {
            write!(f, ", {} directory entries could not be listed", self.walk_errors)?;
        }
        Ok(())
    }
}
