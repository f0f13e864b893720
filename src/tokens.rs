//! Token normalization
//!
//! The corpus records raw tokens as they were found by OCR and tokenization,
//! broken down by part-of-speech tag. We only care about plain words, so we
//! lowercase every token, reject anything that is not made of ASCII letters
//! after that, and sum counts across part-of-speech tags.

use crate::{
    volume::{Page, Volume},
    Count, Token,
};
use std::collections::{hash_map, HashMap};

/// Occurence count of each normalized token
pub type NormalizedTokenCounts = HashMap<Token, Count>;

/// Normalize a raw token, or reject it if it does not look like a word
pub fn normalize_token(token: &str) -> Option<Token> {
    let lower = token.to_lowercase();
    if !lower.is_empty() && lower.bytes().all(|b| b.is_ascii_lowercase()) {
        Some(lower.into())
    } else {
        log::trace!("Rejected token {token:?} because it's not a word");
        None
    }
}

/// Normalized token counts of a single page
pub fn normalize(page: &Page) -> NormalizedTokenCounts {
    let mut counts = NormalizedTokenCounts::new();
    for (token, pos_counts) in &page.token_pos_counts {
        let Some(token) = normalize_token(token) else {
            continue;
        };
        add(&mut counts, token, pos_counts.values().sum());
    }
    counts
}

/// Normalized token counts of a whole volume
///
/// Every count is bounded by the sum of all per-tag counts of the volume,
/// which decoding checks to fit in a [`Count`].
pub fn normalize_volume(volume: &Volume) -> NormalizedTokenCounts {
    let mut counts = NormalizedTokenCounts::new();
    for page in volume.pages.iter() {
        for (token, count) in normalize(page) {
            add(&mut counts, token, count);
        }
    }
    counts
}

/// Add some occurences of a normalized token to a table
///
/// Different casings of a raw token end up in the same entry this way.
fn add(counts: &mut NormalizedTokenCounts, token: Token, count: Count) {
    match counts.entry(token) {
        hash_map::Entry::Occupied(o) => *o.into_mut() += count,
        hash_map::Entry::Vacant(v) => {
            v.insert(count);
        }
    }
}
