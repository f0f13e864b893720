//! Corpus-wide accumulation of per-volume counts
//!
//! Workers merge their results into an [`Aggregator`] as soon as they are done
//! with a volume. Storage is sharded across independently locked sub-maps, so
//! merges that target different keys rarely contend, while merges that target
//! the same key are serialized by the owning shard's lock and never lose an
//! increment. Since merging is a plain sum, the final tables do not depend on
//! the order in which volumes were processed.

use crate::{tokens::NormalizedTokenCounts, Count, Token, YearKey};
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Total token count per year bucket
pub type YearCounts = BTreeMap<Box<str>, Count>;

/// Count of each normalized token per year bucket
pub type YearTokenCounts = BTreeMap<Box<str>, BTreeMap<Token, Count>>;

/// Concurrent accumulator of per-volume counts
#[derive(Debug, Default)]
pub struct Aggregator {
    /// Total token count per year
    years: DashMap<YearKey, Count>,

    /// Token count per (year, token) pair
    year_tokens: DashMap<(YearKey, Token), Count>,
}
//
impl Aggregator {
    /// Set up an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a volume's total token count to its year
    ///
    /// The year bucket is created even if the count is zero.
    pub fn merge_volume(&self, year: &YearKey, total: Count) {
        let mut entry = self.years.entry(year.clone()).or_insert(0);
        if !add(&mut entry, total) {
            log::warn!("Token count of year {year:?} overflowed, it is now capped");
        }
    }

    /// Add a volume's normalized token counts to its year
    pub fn merge_volume_tokens(&self, year: &YearKey, counts: NormalizedTokenCounts) {
        for (token, count) in counts {
            let mut entry = self.year_tokens.entry((year.clone(), token)).or_insert(0);
            if !add(&mut entry, count) {
                let (year, token) = entry.key();
                log::warn!("Count of token {token:?} in year {year:?} overflowed, it is now capped");
            }
        }
    }

    /// Collect the final, sorted tables
    ///
    /// Every year that went through [`merge_volume()`](Self::merge_volume)
    /// appears in the token table too, possibly without any token.
    pub fn finish(self) -> Aggregate {
        let mut year_tokens = YearTokenCounts::new();
        let years = self
            .years
            .into_iter()
            .map(|(year, count)| {
                year_tokens.entry(Box::from(&*year)).or_default();
                (Box::from(&*year), count)
            })
            .collect::<YearCounts>();
        for ((year, token), count) in self.year_tokens {
            year_tokens
                .entry(Box::from(&*year))
                .or_default()
                .insert(token, count);
        }
        Aggregate { years, year_tokens }
    }
}

/// Add to a running count, saturating instead of overflowing
///
/// Returns false if the count saturated.
fn add(total: &mut Count, count: Count) -> bool {
    match total.checked_add(count) {
        Some(sum) => {
            *total = sum;
            true
        }
        None => {
            *total = Count::MAX;
            false
        }
    }
}

/// Final corpus-wide tables
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Aggregate {
    /// Total token count per year
    pub years: YearCounts,

    /// Count of each normalized token per year
    pub year_tokens: YearTokenCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts<const N: usize>(entries: [(&str, Count); N]) -> NormalizedTokenCounts {
        entries.into_iter().map(|(t, c)| (t.into(), c)).collect()
    }

    #[test]
    fn sequential_merges() {
        let aggregator = Aggregator::new();
        let y1900 = YearKey::from("1900");
        let y1901 = YearKey::from("1901");
        let empty = YearKey::from("");
        aggregator.merge_volume(&y1900, 10);
        aggregator.merge_volume(&y1901, 7);
        aggregator.merge_volume(&y1900, 15);
        aggregator.merge_volume(&empty, 0);
        aggregator.merge_volume_tokens(&y1900, counts([("the", 3), ("cat", 1)]));
        aggregator.merge_volume_tokens(&y1900, counts([("the", 2)]));
        aggregator.merge_volume_tokens(&y1901, counts([("dog", 4)]));

        let aggregate = aggregator.finish();
        assert_eq!(
            aggregate.years,
            YearCounts::from([("".into(), 0), ("1900".into(), 25), ("1901".into(), 7)])
        );
        assert_eq!(aggregate.year_tokens.len(), 3);
        assert!(aggregate.year_tokens[""].is_empty());
        assert_eq!(
            aggregate.year_tokens["1900"],
            BTreeMap::from([("cat".into(), 1), ("the".into(), 5)])
        );
        assert_eq!(
            aggregate.year_tokens["1901"],
            BTreeMap::from([("dog".into(), 4)])
        );
    }

    #[test]
    fn overflow_saturates() {
        let aggregator = Aggregator::new();
        let year = YearKey::from("1900");
        aggregator.merge_volume(&year, Count::MAX - 1);
        aggregator.merge_volume(&year, 5);
        aggregator.merge_volume(&year, 1);
        aggregator.merge_volume_tokens(&year, counts([("the", Count::MAX)]));
        aggregator.merge_volume_tokens(&year, counts([("the", 1), ("cat", 2)]));

        let aggregate = aggregator.finish();
        assert_eq!(aggregate.years["1900"], Count::MAX);
        assert_eq!(
            aggregate.year_tokens["1900"],
            BTreeMap::from([("cat".into(), 2), ("the".into(), Count::MAX)])
        );
    }

    #[test]
    fn no_lost_updates() {
        const THREADS: usize = 8;
        const ROUNDS: Count = 5_000;
        let aggregator = Aggregator::new();
        let years = ["1900", "1901", "1902"].map(YearKey::from);
        std::thread::scope(|s| {
            for thread in 0..THREADS {
                let aggregator = &aggregator;
                let years = &years;
                s.spawn(move || {
                    for round in 0..ROUNDS {
                        // Everyone hammers the same keys, in different orders
                        let year = &years[(thread + round as usize) % years.len()];
                        aggregator.merge_volume(year, 1);
                        aggregator.merge_volume_tokens(year, counts([("the", 2), ("a", 1)]));
                    }
                });
            }
        });

        let aggregate = aggregator.finish();
        let total = THREADS as Count * ROUNDS;
        assert_eq!(aggregate.years.values().sum::<Count>(), total);
        let the = aggregate
            .year_tokens
            .values()
            .map(|tokens| tokens["the"])
            .sum::<Count>();
        assert_eq!(the, 2 * total);
        let a = aggregate
            .year_tokens
            .values()
            .map(|tokens| tokens["a"])
            .sum::<Count>();
        assert_eq!(a, total);
        for (year, count) in &aggregate.years {
            assert_eq!(aggregate.year_tokens[year]["a"], *count);
        }
    }
}
