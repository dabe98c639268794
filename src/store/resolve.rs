//! Path resolution and root containment
//!
//! Turns untrusted client-relative paths into validated absolute locations
//! inside the store root. Every other store component consumes only the
//! `ResolvedLocation` values produced here.

use log::warn;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::StoreError;

/// The single base directory all client-visible paths are relative to.
///
/// Canonicalized once at startup and immutable for the process lifetime.
pub struct StoreRoot {
    base: PathBuf,
}

impl StoreRoot {
    /// Opens the store root, creating the directory if it does not exist yet.
    pub fn open(base: &Path) -> io::Result<Self> {
        fs::create_dir_all(base)?;
        let base = base.canonicalize()?;
        Ok(Self { base })
    }

    /// Returns the canonical absolute path of the root.
    pub fn as_path(&self) -> &Path {
        &self.base
    }
}

/// An absolute location proven to be the store root or a descendant of it.
///
/// Only `resolve` constructs these; holding one is the permission to touch
/// storage at that path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    real: PathBuf,
}

impl ResolvedLocation {
    pub fn as_path(&self) -> &Path {
        &self.real
    }

    /// Derives the location of a direct child from its directory-entry name.
    ///
    /// Entry names cannot contain separators, so the child stays inside the
    /// root whenever `self` does.
    pub(crate) fn child(&self, name: &std::ffi::OsStr) -> ResolvedLocation {
        ResolvedLocation {
            real: self.real.join(name),
        }
    }
}

/// Resolves a client-relative path against the store root.
///
/// Returns the validated absolute location together with the normalized
/// virtual path (`"a/b.txt"` form, empty for the root itself). Fails with
/// `PathEscape` for any input that would land outside the root: `..` chains,
/// absolute paths, NUL bytes, or symlinks pointing out of the tree.
pub fn resolve(root: &StoreRoot, relative: &str) -> Result<(ResolvedLocation, String), StoreError> {
    let logical = normalize(relative).ok_or_else(|| {
        warn!("Rejected escaping path from client: {:?}", relative);
        StoreError::PathEscape(relative.to_string())
    })?;

    let joined = root.base.join(&logical);
    let real = realize(&joined)?;

    if !real.starts_with(&root.base) {
        warn!(
            "Rejected path resolving outside the store root: {:?} -> {}",
            relative,
            real.display()
        );
        return Err(StoreError::PathEscape(relative.to_string()));
    }

    let virtual_path = logical
        .iter()
        .map(|segment| segment.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Ok((ResolvedLocation { real }, virtual_path))
}

/// Collapses `.` and `..` segments on the logical path, without consulting
/// the real tree. Returns `None` when the path steps above the root or uses
/// an absolute prefix.
fn normalize(relative: &str) -> Option<PathBuf> {
    if relative.contains('\0') {
        return None;
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(segment) => normalized.push(segment),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(normalized)
}

/// Canonicalizes `joined` to its real absolute form, resolving symlinks.
///
/// For targets that do not exist yet (uploads), canonicalizes the deepest
/// existing ancestor and re-appends the remaining normalized segments so the
/// containment check still sees the real prefix.
fn realize(joined: &Path) -> Result<PathBuf, StoreError> {
    let mut existing = joined.to_path_buf();
    let mut pending: Vec<OsString> = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(mut real) => {
                for segment in pending.iter().rev() {
                    real.push(segment);
                }
                return Ok(real);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match (existing.file_name(), existing.parent()) {
                    (Some(name), Some(parent)) => {
                        pending.push(name.to_os_string());
                        existing = parent.to_path_buf();
                    }
                    _ => return Err(StoreError::Io(e)),
                }
            }
            Err(e) => return Err(StoreError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn open_root(dir: &Path) -> StoreRoot {
        StoreRoot::open(dir).expect("store root")
    }

    #[test]
    fn resolves_plain_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = open_root(dir.path());
        let (loc, virt) = resolve(&root, "foo/bar.txt").unwrap();
        assert_eq!(virt, "foo/bar.txt");
        assert!(loc.as_path().starts_with(root.as_path()));
    }

    #[test]
    fn empty_path_is_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = open_root(dir.path());
        let (loc, virt) = resolve(&root, "").unwrap();
        assert_eq!(virt, "");
        assert_eq!(loc.as_path(), root.as_path());
    }

    #[test]
    fn collapses_dot_segments() {
        let dir = tempfile::tempdir().unwrap();
        let root = open_root(dir.path());
        let (_, virt) = resolve(&root, "./a/./b.txt").unwrap();
        assert_eq!(virt, "a/b.txt");
    }

    #[test]
    fn parent_segments_resolve_logically() {
        let dir = tempfile::tempdir().unwrap();
        let root = open_root(dir.path());
        let (_, virt) = resolve(&root, "a/sub/../b.txt").unwrap();
        assert_eq!(virt, "a/b.txt");
    }

    #[test]
    fn rejects_escape_above_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = open_root(dir.path());
        assert!(matches!(
            resolve(&root, "a/../../etc/passwd"),
            Err(StoreError::PathEscape(_))
        ));
        assert!(matches!(
            resolve(&root, "../x"),
            Err(StoreError::PathEscape(_))
        ));
    }

    #[test]
    fn rejects_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = open_root(dir.path());
        assert!(matches!(
            resolve(&root, "/etc/passwd"),
            Err(StoreError::PathEscape(_))
        ));
    }

    #[test]
    fn rejects_nul_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let root = open_root(dir.path());
        assert!(matches!(
            resolve(&root, "a\0b"),
            Err(StoreError::PathEscape(_))
        ));
    }

    #[test]
    fn ignores_empty_segments() {
        let dir = tempfile::tempdir().unwrap();
        let root = open_root(dir.path());
        let (_, virt) = resolve(&root, "a//b.txt").unwrap();
        assert_eq!(virt, "a/b.txt");
    }

    #[test]
    fn resolves_missing_tail_for_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let root = open_root(dir.path());
        let (loc, virt) = resolve(&root, "new/deep/file.bin").unwrap();
        assert_eq!(virt, "new/deep/file.bin");
        assert!(loc.as_path().starts_with(root.as_path()));
        assert!(!loc.as_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_escape() {
        let outside = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let root = open_root(dir.path());
        std::os::unix::fs::symlink(outside.path(), dir.path().join("out")).unwrap();

        assert!(matches!(
            resolve(&root, "out/secret.txt"),
            Err(StoreError::PathEscape(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn accepts_symlink_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = open_root(dir.path());
        fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let (loc, _) = resolve(&root, "alias/file.txt").unwrap();
        assert!(loc.as_path().starts_with(root.as_path()));
    }
}
