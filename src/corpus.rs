//! Enumeration of the files of a local corpus copy

use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

/// The corpus root cannot be walked, so nothing can be done
#[derive(Debug, Error)]
#[error("cannot list corpus root {}", .root.display())]
pub struct RootAccessError {
    root: Box<Path>,
    #[source]
    source: io::Error,
}

/// Recursively list every regular file below `root`
///
/// The root is checked upfront, and failure to list it is reported as a
/// [`RootAccessError`]. Past this point, errors are reported per directory
/// entry in the output sequence, and enumeration carries on with the next
/// entries. Every call starts a new traversal, in directory listing order.
pub fn files(
    root: &Path,
    follow_links: bool,
) -> Result<impl Iterator<Item = walkdir::Result<PathBuf>>, RootAccessError> {
    check_root(root)?;
    let walker = WalkDir::new(root).follow_links(follow_links).into_iter();
    Ok(walker.filter_map(|entry| match entry {
        Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
        Ok(entry) => {
            log::trace!("Not a volume file: {}", entry.path().display());
            None
        }
        Err(e) => Some(Err(e)),
    }))
}

/// Make sure that the corpus root is a directory that we can list
fn check_root(root: &Path) -> Result<(), RootAccessError> {
    let error = |source| RootAccessError {
        root: root.into(),
        source,
    };
    let metadata = std::fs::metadata(root).map_err(error)?;
    if !metadata.is_dir() {
        return Err(error(io::Error::new(
            io::ErrorKind::Other,
            "not a directory",
        )));
    }
    std::fs::read_dir(root).map_err(error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::BTreeSet, fs};

    fn touch(path: PathBuf) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root.join("a.json.bz2"));
        touch(root.join("x/b.json.bz2"));
        touch(root.join("x/y/z/c"));
        fs::create_dir_all(root.join("empty/dir")).unwrap();

        let found = files(root, false)
            .unwrap()
            .map(Result::unwrap)
            .collect::<BTreeSet<_>>();
        let expected = ["a.json.bz2", "x/b.json.bz2", "x/y/z/c"]
            .into_iter()
            .map(|rel| root.join(rel))
            .collect::<BTreeSet<_>>();
        assert_eq!(found, expected);

        // Each call is a fresh traversal
        assert_eq!(files(root, false).unwrap().count(), 3);
    }

    #[test]
    fn bad_roots() {
        let dir = tempfile::tempdir().unwrap();
        assert!(files(&dir.path().join("nope"), false).is_err());

        let file = dir.path().join("file");
        touch(file.clone());
        assert!(files(&file, false).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn entry_errors_do_not_stop_enumeration() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root.join("a/1"));
        touch(root.join("b/2"));
        std::os::unix::fs::symlink(root.join("gone"), root.join("a/dangling")).unwrap();

        // Without link following, links are silently ignored
        assert_eq!(files(root, false).unwrap().filter(Result::is_ok).count(), 2);

        // With link following, the dangling one is an error among successes
        let results = files(root, true).unwrap().collect::<Vec<_>>();
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    }
}
