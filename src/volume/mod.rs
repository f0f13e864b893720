//! Decoding of individual corpus volumes

mod document;

use self::document::{Document, RawPage};
use crate::{config::YearBucketing, Count, YearKey};
use async_compression::tokio::bufread::BzDecoder;
use std::{
    collections::HashMap,
    io,
    path::Path,
};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncReadExt, BufReader},
};

/// Year of Gregorian Calendar
///
/// Set to 0 when the volume's publication date is not an integer.
pub type Year = i32;

/// Raw per-page token table: token -> part-of-speech tag -> occurence count
pub type TokenPosCounts = HashMap<Box<str>, HashMap<Box<str>, Count>>;

/// One digitized volume of the corpus
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Volume {
    /// Corpus-assigned identifier
    pub id: Box<str>,

    /// Publication date as found in the volume, or empty if there is none
    pub year_string: Box<str>,

    /// Publication year, or 0 if `year_string` is not an integer
    pub year: Year,

    /// Language code, if known
    pub language: Option<Box<str>>,

    /// Pages in reading order
    pub pages: Box<[Page]>,
}
//
impl Volume {
    /// Build a volume from its JSON document
    ///
    /// Fails if the volume identifier is missing or if the token counts add up
    /// beyond what a [`Count`] can hold. Every other odd field is replaced with
    /// a default value.
    fn from_document(path: &Path, document: Document) -> Result<Self, DecodeError> {
        let Document {
            id,
            metadata,
            features,
        } = document;
        let id = id.ok_or_else(|| DecodeError::MissingField {
            path: path.into(),
            field: "id",
        })?;
        let metadata = metadata.unwrap_or_default();

        // Coerce the publication date, falling back to year 0
        let year_string: Box<str> = match metadata.pub_date {
            Some(serde_json::Value::String(s)) => s.into(),
            Some(serde_json::Value::Number(n)) if n.is_i64() || n.is_u64() => {
                n.to_string().into()
            }
            None | Some(serde_json::Value::Null) => "".into(),
            Some(other) => {
                log::debug!("Volume {id} has a pubDate of unexpected type: {other}");
                "".into()
            }
        };
        let year = year_string.parse::<Year>().unwrap_or_else(|_| {
            log::debug!("Volume {id} has non-integer pubDate {year_string:?}, using year 0");
            0
        });

        // Languages are only used for filtering, odd ones simply never match
        let language = match metadata.language {
            Some(serde_json::Value::String(s)) => Some(s.into()),
            _ => None,
        };

        let pages: Box<[Page]> = features.pages.into_iter().map(Page::from).collect();
        if !counts_fit(&pages) {
            return Err(DecodeError::Overflow { path: path.into() });
        }
        Ok(Self {
            id,
            year_string,
            year,
            language,
            pages,
        })
    }

    /// Output bucket that this volume belongs to
    pub fn year_key(&self, bucketing: YearBucketing) -> YearKey {
        match bucketing {
            YearBucketing::Raw => YearKey::from(&*self.year_string),
            YearBucketing::Parsed => YearKey::from(self.year.to_string()),
        }
    }

    /// Total number of token occurences across all pages
    ///
    /// Decoded volumes are checked so that this sum cannot overflow.
    pub fn total_token_count(&self) -> Count {
        self.pages.iter().map(|page| page.total_token_count).sum()
    }
}

/// One page of a [`Volume`]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Page {
    /// Number of token occurences in the page body
    pub total_token_count: Count,

    /// Raw token table of the page body
    pub token_pos_counts: TokenPosCounts,
}
//
impl From<RawPage> for Page {
    fn from(raw: RawPage) -> Self {
        let body = raw.body.unwrap_or_default();
        let total_token_count = body.token_count.map_or(0, |count| {
            count.as_u64().unwrap_or_else(|| {
                log::debug!("Page has a tokenCount of {count}, counting it as 0");
                0
            })
        });
        let token_pos_counts = body
            .token_pos_count
            .unwrap_or_default()
            .into_iter()
            .map(|(token, pos_counts)| {
                let pos_counts = match pos_counts {
                    serde_json::Value::Object(pos_counts) => pos_counts
                        .into_iter()
                        .filter_map(|(tag, count)| match count.as_u64() {
                            Some(count) => Some((tag.into_boxed_str(), count)),
                            None => {
                                log::debug!("Ignoring {token:?}/{tag} count of {count}");
                                None
                            }
                        })
                        .collect(),
                    other => {
                        log::debug!("Ignoring {token:?} counts of unexpected type: {other}");
                        HashMap::new()
                    }
                };
                (token, pos_counts)
            })
            .collect();
        Self {
            total_token_count,
            token_pos_counts,
        }
    }
}

/// Truth that the page totals and the per-tag counts of a volume both sum up
/// to something that fits in a [`Count`]
///
/// Any sum that the rest of the pipeline takes over a single volume is bounded
/// by one of these two.
fn counts_fit(pages: &[Page]) -> bool {
    pages
        .iter()
        .try_fold((0 as Count, 0 as Count), |(total, tagged), page| {
            let total = total.checked_add(page.total_token_count)?;
            let tagged = page
                .token_pos_counts
                .values()
                .flat_map(|pos_counts| pos_counts.values())
                .try_fold(tagged, |acc, &count| acc.checked_add(count))?;
            Some((total, tagged))
        })
        .is_some()
}

/// Reasons why a file could not be decoded into a [`Volume`]
///
/// These only concern a single file, and the file should be skipped.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// File could not be opened, read or decompressed
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: Box<Path>,
        #[source]
        source: io::Error,
    },

    /// Decompressed content is not a JSON document of the expected shape
    #[error("{} is not a valid volume: {source}", .path.display())]
    Parse {
        path: Box<Path>,
        #[source]
        source: serde_json::Error,
    },

    /// A mandatory field is absent
    #[error("{} has no {field} field", .path.display())]
    MissingField {
        path: Box<Path>,
        field: &'static str,
    },

    /// Token counts are too large to be summed up
    #[error("{} has token counts that overflow when summed", .path.display())]
    Overflow { path: Box<Path> },
}

/// Load and decompress a volume file
///
/// The result is meant to be handed over to [`parse()`], which is CPU-bound
/// and should not run on an async task.
pub async fn load(path: &Path) -> Result<Vec<u8>, DecodeError> {
    let io_error = |source| DecodeError::Io {
        path: path.into(),
        source,
    };
    let file = File::open(path).await.map_err(io_error)?;
    let mut decoder = BzDecoder::new(BufReader::new(file));
    decoder.multiple_members(true);
    let mut json = Vec::new();
    decoder.read_to_end(&mut json).await.map_err(io_error)?;
    Ok(json)
}

/// Parse the decompressed JSON content of a volume file
pub fn parse(path: &Path, json: &[u8]) -> Result<Volume, DecodeError> {
    let document = serde_json::from_slice::<Document>(json).map_err(|source| DecodeError::Parse {
        path: path.into(),
        source,
    })?;
    Volume::from_document(path, document)
}

/// Write a bzip2-compressed volume file
#[cfg(test)]
pub async fn write_compressed(path: &Path, content: &[u8]) -> io::Result<()> {
    use async_compression::tokio::write::BzEncoder;
    use tokio::io::AsyncWriteExt;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut encoder = BzEncoder::new(File::create(path).await?);
    encoder.write_all(content).await?;
    encoder.shutdown().await
}
