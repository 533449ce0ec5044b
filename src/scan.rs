//! Directory scanning. [`Scanner`] is the seam between a
//! [`crate::collection::Collection`] and the filesystem; [`GlobScanner`] is
//! the implementation collections use unless told otherwise.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::collection::{Error, Result};

/// `*` stays within a path segment; `**` crosses segments.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Finds the content files under a directory.
pub trait Scanner: Send + Sync {
    /// Returns the files under `content_path` matched by `patterns`, in
    /// discovery order and without duplicates. Patterns prefixed with `!`
    /// exclude whatever they match. When `recursive` is set every pattern
    /// applies at any depth; otherwise only to direct children.
    fn scan(
        &self,
        content_path: &Path,
        patterns: &[String],
        recursive: bool,
    ) -> Result<Vec<PathBuf>>;
}

/// Scans with [`glob`] patterns. Returned paths sit under the canonicalized
/// content directory; a file reached by several patterns, or through a
/// symlink as well as directly, is only returned once, under the path it was
/// first found at.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobScanner;

impl Scanner for GlobScanner {
    fn scan(
        &self,
        content_path: &Path,
        patterns: &[String],
        recursive: bool,
    ) -> Result<Vec<PathBuf>> {
        if !content_path.is_dir() {
            return Err(Error::Configuration(format!(
                "content path `{}` is not a directory",
                content_path.display()
            )));
        }
        let root = content_path.canonicalize().map_err(|err| Error::Scan {
            path: content_path.to_owned(),
            err,
        })?;
        let escaped_root = match root.to_str() {
            Some(root) => Pattern::escape(root.trim_end_matches('/')),
            None => {
                return Err(Error::Configuration(format!(
                    "content path `{}` is not valid UTF-8",
                    root.display()
                )))
            }
        };

        let depth = if recursive { "**/" } else { "" };
        let (excludes, includes): (Vec<&String>, Vec<&String>) =
            patterns.iter().partition(|p| p.starts_with('!'));
        let excludes = excludes
            .into_iter()
            .map(|p| {
                Pattern::new(&format!("{}{}", depth, &p[1..])).map_err(|err| Error::Pattern {
                    pattern: p.clone(),
                    err,
                })
            })
            .collect::<Result<Vec<Pattern>>>()?;

        let mut seen = HashSet::new();
        let mut paths = Vec::new();
        for include in includes {
            let pattern = format!("{}/{}{}", escaped_root, depth, include);
            tracing::debug!(%pattern, "globbing");
            let entries = glob::glob_with(&pattern, MATCH_OPTIONS).map_err(|err| Error::Pattern {
                pattern: include.clone(),
                err,
            })?;
            for entry in entries {
                let path = entry.map_err(|err| Error::Scan {
                    path: err.path().to_owned(),
                    err: err.into_error(),
                })?;
                if !path.is_file() {
                    continue;
                }
                let relative = path.strip_prefix(&root).unwrap_or(path.as_path());
                if excludes
                    .iter()
                    .any(|exclude| exclude.matches_path_with(relative, MATCH_OPTIONS))
                {
                    tracing::debug!(path = %path.display(), "excluded");
                    continue;
                }
                let key = path.canonicalize().unwrap_or_else(|_| path.clone());
                if seen.insert(key) {
                    paths.push(path);
                }
            }
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn content_dir(files: &[&str]) -> std::io::Result<TempDir> {
        let dir = tempfile::tempdir()?;
        for file in files {
            let path = dir.path().join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, "body")?;
        }
        Ok(dir)
    }

    fn relative_names(dir: &TempDir, paths: Vec<PathBuf>) -> Vec<String> {
        let root = dir.path().canonicalize().unwrap();
        paths
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    fn patterns(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_non_recursive() -> Result<()> {
        let dir = content_dir(&["a.md", "b.html", "c.txt", "sub/d.md"]).unwrap();
        let paths = GlobScanner.scan(dir.path(), &patterns(&["*.md", "*.html"]), false)?;
        assert_eq!(vec!["a.md", "b.html"], relative_names(&dir, paths));
        Ok(())
    }

    #[test]
    fn test_recursive() -> Result<()> {
        let dir = content_dir(&["a.md", "sub/b.md", "sub/deeper/c.md"]).unwrap();
        let paths = GlobScanner.scan(dir.path(), &patterns(&["*.md"]), true)?;
        let mut names = relative_names(&dir, paths);
        names.sort();
        assert_eq!(vec!["a.md", "sub/b.md", "sub/deeper/c.md"], names);
        Ok(())
    }

    #[test]
    fn test_exclude() -> Result<()> {
        let dir = content_dir(&["a.md", "draft.md", "sub/draft-two.md"]).unwrap();
        let paths = GlobScanner.scan(dir.path(), &patterns(&["*.md", "!draft*"]), false)?;
        assert_eq!(vec!["a.md"], relative_names(&dir, paths));

        let paths = GlobScanner.scan(dir.path(), &patterns(&["*.md", "!draft*"]), true)?;
        assert_eq!(vec!["a.md"], relative_names(&dir, paths));
        Ok(())
    }

    #[test]
    fn test_overlapping_patterns() -> Result<()> {
        let dir = content_dir(&["a.md", "b.md"]).unwrap();
        let paths = GlobScanner.scan(dir.path(), &patterns(&["*.md", "a.*"]), false)?;
        assert_eq!(vec!["a.md", "b.md"], relative_names(&dir, paths));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_returned_once() -> Result<()> {
        let dir = content_dir(&["a.md"]).unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.md"), dir.path().join("b.md")).unwrap();
        let paths = GlobScanner.scan(dir.path(), &patterns(&["*.md"]), false)?;
        assert_eq!(vec!["a.md"], relative_names(&dir, paths));
        Ok(())
    }

    #[test]
    fn test_directories_are_skipped() -> Result<()> {
        let dir = content_dir(&["a.md", "folder.md/inner.txt"]).unwrap();
        let paths = GlobScanner.scan(dir.path(), &patterns(&["*.md"]), false)?;
        assert_eq!(vec!["a.md"], relative_names(&dir, paths));
        Ok(())
    }

    #[test]
    fn test_missing_directory() {
        let err = GlobScanner
            .scan(Path::new("./testdata/does-not-exist"), &patterns(&["*.md"]), false)
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = content_dir(&["a.md"]).unwrap();
        let err = GlobScanner
            .scan(dir.path(), &patterns(&["[.md"]), false)
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
