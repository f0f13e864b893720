//! Persistence of the final counts

use crate::{aggregate::Aggregate, config::Mode, Result};
use anyhow::Context;
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Serialize the table that matters for a certain counting mode
///
/// Keys are sorted, so equal aggregates always serialize to the same bytes.
pub fn to_json(aggregate: &Aggregate, mode: Mode) -> Result<Vec<u8>> {
    match mode {
        Mode::YearCounts => serde_json::to_vec(&aggregate.years),
        Mode::TokenCounts => serde_json::to_vec(&aggregate.year_tokens),
    }
    .context("converting counts to JSON")
}

/// Save the table that matters for a certain counting mode to a file, or to
/// stdout if no output path is specified
pub async fn save(aggregate: &Aggregate, mode: Mode, path: Option<&Path>) -> Result<()> {
    let json = to_json(aggregate, mode)?;
    match path {
        Some(path) => tokio::fs::write(path, &json)
            .await
            .with_context(|| format!("saving counts to {}", path.display())),
        None => {
            let mut stdout = BufWriter::new(tokio::io::stdout());
            stdout.write_all(&json).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await.context("printing counts")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{YearCounts, YearTokenCounts};
    use std::collections::BTreeMap;

    fn aggregate() -> Aggregate {
        Aggregate {
            years: YearCounts::from([("1951".into(), 102938), ("1923".into(), 48213)]),
            year_tokens: YearTokenCounts::from([(
                "1923".into(),
                BTreeMap::from([("the".into(), 4012), ("and".into(), 2750)]),
            )]),
        }
    }

    #[test]
    fn json_layout() {
        let aggregate = aggregate();
        assert_eq!(
            to_json(&aggregate, Mode::YearCounts).unwrap(),
            br#"{"1923":48213,"1951":102938}"#
        );
        assert_eq!(
            to_json(&aggregate, Mode::TokenCounts).unwrap(),
            br#"{"1923":{"and":2750,"the":4012}}"#
        );
    }

    #[tokio::test]
    async fn save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("years.json");
        save(&aggregate(), Mode::YearCounts, Some(&path)).await.unwrap();
        let saved: YearCounts = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved, aggregate().years);

        let bad_path = dir.path().join("missing/years.json");
        assert!(save(&aggregate(), Mode::YearCounts, Some(&bad_path)).await.is_err());
    }
}
