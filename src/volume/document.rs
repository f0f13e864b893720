//! On-disk shape of an Extracted Features volume
//!
//! Only the fields that we actually use are declared, everything else in the
//! JSON document is skipped by the parser. Fields that may be absent or have
//! an unexpected type in some volumes are wrapped in `Option` or kept as raw
//! JSON values so that a single odd field does not reject the whole volume.

use serde::Deserialize;
use std::collections::HashMap;

/// Top-level JSON document
#[derive(Debug, Deserialize)]
pub struct Document {
    /// Corpus-assigned volume identifier
    pub id: Option<Box<str>>,

    /// Bibliographic metadata
    #[serde(default)]
    pub metadata: Option<Metadata>,

    /// Page-level features
    pub features: Features,
}

/// Bibliographic metadata of a volume
#[derive(Debug, Default, Deserialize)]
pub struct Metadata {
    /// Publication date, normally a string of digits
    #[serde(rename = "pubDate", default)]
    pub pub_date: Option<serde_json::Value>,

    /// Language code, e.g. "eng"
    #[serde(default)]
    pub language: Option<serde_json::Value>,
}

/// Page-level features of a volume
#[derive(Debug, Deserialize)]
pub struct Features {
    /// Pages in reading order
    pub pages: Vec<RawPage>,
}

/// Features of a single page
#[derive(Debug, Deserialize)]
pub struct RawPage {
    /// Features of the page body (i.e. minus header and footer)
    #[serde(default)]
    pub body: Option<Section>,
}

/// Features of a page section
#[derive(Debug, Default, Deserialize)]
pub struct Section {
    /// Number of token occurences in this section, normally an integer
    #[serde(rename = "tokenCount", default)]
    pub token_count: Option<serde_json::Value>,

    /// Occurence count of each token, for each part-of-speech tag
    ///
    /// Per-tag counts are left as raw JSON since some of them are not
    /// integers in the wild.
    #[serde(rename = "tokenPosCount", default)]
    pub token_pos_count: Option<HashMap<Box<str>, serde_json::Value>>,
}
