//! Site tree walker.
//!
//! First stage of the conversion pipeline. Enumerates every regular file
//! under the site root and yields it as a [`SiteFile`] carrying its relative
//! path, depth, classification and size. Payloads are not read here; they
//! stay on disk until a later stage needs them.
//!
//! ## Ordering
//!
//! Within each directory, subdirectories come first, then files, each group
//! sorted by name. The sequence is therefore identical across runs, which
//! keeps reports and archive listings diff-friendly:
//!
//! ```text
//! site/
//! ├── blog/            → blog/a.html, blog/b.html   (directories first)
//! │   ├── b.html
//! │   └── a.html
//! ├── .nojekyll        → .nojekyll                  (dotfiles are included)
//! └── index.html       → index.html
//! ```
//!
//! ## Symlinks
//!
//! Symlinks are followed. A link that points back at one of its own
//! ancestors fails the walk with [`WalkError::SymlinkCycle`] instead of
//! descending forever. A link whose target is gone is skipped with a
//! warning.

use crate::mime;
use crate::types::{Payload, SiteFile, depth_of};
use std::cmp::Ordering;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Fatal traversal failures. Any of these aborts the run before entries exist.
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Cannot read site root {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Site root is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Symlink cycle: {path} points back to {ancestor}")]
    SymlinkCycle { path: PathBuf, ancestor: PathBuf },
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}

impl WalkError {
    /// Wrap an I/O failure on a specific file.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        WalkError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Lazy iterator over the regular files of a site.
pub struct SiteWalker {
    root: PathBuf,
    inner: walkdir::IntoIter,
}

/// Start walking `root`.
///
/// The root itself is checked eagerly so an unreadable or missing root fails
/// here rather than on the first call to `next`.
pub fn walk(root: &Path) -> Result<SiteWalker, WalkError> {
    let meta = std::fs::metadata(root).map_err(|source| WalkError::Root {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(WalkError::NotADirectory(root.to_path_buf()));
    }

    let inner = WalkDir::new(root)
        .follow_links(true)
        .sort_by(directories_first)
        .into_iter();

    Ok(SiteWalker {
        root: root.to_path_buf(),
        inner,
    })
}

fn is_dir_like(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() || (entry.path_is_symlink() && entry.path().is_dir())
}

fn directories_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    is_dir_like(b)
        .cmp(&is_dir_like(a))
        .then_with(|| a.file_name().cmp(b.file_name()))
}

impl Iterator for SiteWalker {
    type Item = Result<SiteFile, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) if is_dangling_symlink(&err) => {
                    warn!(path = ?err.path(), "dangling symlink skipped");
                    continue;
                }
                Err(err) => return Some(Err(convert_walk_error(err))),
            };
            if !entry.file_type().is_file() {
                continue;
            }
            return Some(self.site_file(&entry));
        }
    }
}

impl SiteWalker {
    fn site_file(&self, entry: &DirEntry) -> Result<SiteFile, WalkError> {
        let path = relative_posix_path(&self.root, entry.path())?;
        let size = entry
            .metadata()
            .map_err(convert_walk_error)?
            .len();
        let classification = mime::classify_path(&path);

        Ok(SiteFile {
            depth: depth_of(&path),
            content_type: classification.content_type,
            family: classification.family,
            size,
            payload: Payload::OnDisk(entry.path().to_path_buf()),
            path,
        })
    }
}

/// Render `path` relative to `root` with `/` separators.
fn relative_posix_path(root: &Path, path: &Path) -> Result<String, WalkError> {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => {
                let name = name
                    .to_str()
                    .ok_or_else(|| WalkError::NonUtf8Path(path.to_path_buf()))?;
                segments.push(name);
            }
            Component::CurDir => {}
            _ => return Err(WalkError::NonUtf8Path(path.to_path_buf())),
        }
    }
    Ok(segments.join("/"))
}

/// A link whose target does not exist names no file, so there is nothing to yield.
fn is_dangling_symlink(err: &walkdir::Error) -> bool {
    let target_missing = err
        .io_error()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound);
    target_missing
        && err.path().is_some_and(|path| {
            std::fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
        })
}

fn convert_walk_error(err: walkdir::Error) -> WalkError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    if let Some(ancestor) = err.loop_ancestor() {
        return WalkError::SymlinkCycle {
            path,
            ancestor: ancestor.to_path_buf(),
        };
    }
    let depth = err.depth();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("directory walk failed"));
    if depth == 0 {
        WalkError::Root { path, source }
    } else {
        WalkError::Io { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::ContentFamily;
    use crate::test_helpers::write_site;

    fn paths(root: &Path) -> Vec<String> {
        walk(root)
            .unwrap()
            .map(|f| f.unwrap().path)
            .collect()
    }

    #[test]
    fn yields_relative_posix_paths_with_depth() {
        let tmp = write_site(&[
            ("index.html", "<html></html>"),
            ("css/style.css", "body{}"),
            ("a/b/c/deep.txt", "deep"),
        ]);

        let files: Vec<SiteFile> = walk(tmp.path()).unwrap().map(Result::unwrap).collect();
        let deep = files.iter().find(|f| f.path == "a/b/c/deep.txt").unwrap();
        assert_eq!(deep.depth, 3);
        assert_eq!(deep.size, 4);
        let index = files.iter().find(|f| f.path == "index.html").unwrap();
        assert_eq!(index.depth, 0);
        assert_eq!(index.family, ContentFamily::Markup);
    }

    #[test]
    fn directories_before_files_then_lexicographic() {
        let tmp = write_site(&[
            ("z.html", ""),
            ("a.html", ""),
            ("blog/b.html", ""),
            ("blog/a.html", ""),
            ("assets/x.css", ""),
        ]);
        assert_eq!(
            paths(tmp.path()),
            vec![
                "assets/x.css",
                "blog/a.html",
                "blog/b.html",
                "a.html",
                "z.html"
            ]
        );
    }

    #[test]
    fn order_is_stable_across_runs() {
        let tmp = write_site(&[("b/1.txt", ""), ("a/2.txt", ""), ("c.txt", "")]);
        assert_eq!(paths(tmp.path()), paths(tmp.path()));
    }

    #[test]
    fn hidden_files_are_included() {
        let tmp = write_site(&[(".nojekyll", ""), (".well-known/security.txt", "x")]);
        let found = paths(tmp.path());
        assert!(found.contains(&".nojekyll".to_string()));
        assert!(found.contains(&".well-known/security.txt".to_string()));
    }

    #[test]
    fn case_is_preserved() {
        let tmp = write_site(&[("Docs/ReadMe.HTML", "")]);
        assert_eq!(paths(tmp.path()), vec!["Docs/ReadMe.HTML"]);
    }

    #[test]
    fn payload_stays_on_disk() {
        let tmp = write_site(&[("a.css", "body{}")]);
        let file = walk(tmp.path()).unwrap().next().unwrap().unwrap();
        assert!(!file.payload.is_in_memory());
        assert_eq!(&*file.payload.read().unwrap(), b"body{}");
    }

    #[test]
    fn missing_root_is_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = walk(&tmp.path().join("nope"));
        assert!(matches!(result, Err(WalkError::Root { .. })));
    }

    #[test]
    fn file_root_is_error() {
        let tmp = write_site(&[("index.html", "")]);
        let result = walk(&tmp.path().join("index.html"));
        assert!(matches!(result, Err(WalkError::NotADirectory(_))));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_fails_the_walk() {
        let tmp = write_site(&[("docs/page.html", "")]);
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("docs/loop")).unwrap();

        let results: Vec<_> = walk(tmp.path()).unwrap().collect();
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(WalkError::SymlinkCycle { .. })))
        );
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_skipped() {
        let tmp = write_site(&[("index.html", "")]);
        std::os::unix::fs::symlink(tmp.path().join("gone.html"), tmp.path().join("old.html"))
            .unwrap();

        let files: Vec<SiteFile> = walk(tmp.path()).unwrap().map(Result::unwrap).collect();
        let found: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(found, vec!["index.html"]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_fails_the_walk() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = write_site(&[("index.html", ""), ("private/a.html", "")]);
        let locked = tmp.path().join("private");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        // Privileged users read through mode 000; nothing to observe then.
        if std::fs::read_dir(&locked).is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let results: Vec<_> = walk(tmp.path()).unwrap().collect();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(WalkError::Io { path, .. }) if path.ends_with("private")))
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_is_followed() {
        let tmp = write_site(&[("real/a.txt", "abc")]);
        std::os::unix::fs::symlink(tmp.path().join("real/a.txt"), tmp.path().join("link.txt"))
            .unwrap();
        let files: Vec<SiteFile> = walk(tmp.path()).unwrap().map(Result::unwrap).collect();
        let link = files.iter().find(|f| f.path == "link.txt").unwrap();
        assert_eq!(link.size, 3);
    }
}
