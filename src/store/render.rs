//! Directory-level view assembly
//!
//! Builds the navigable representation of one directory level (parent link
//! plus children partitioned into directories and files) for any
//! presentation layer to render. Storage access is delegated to the catalog.

use crate::error::StoreError;
use crate::store::catalog;
use crate::store::resolve::ResolvedLocation;

/// One navigable child entry: display name plus the relative path a client
/// can feed back into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub name: String,
    pub path: String,
}

/// A rendered snapshot of one directory level.
#[derive(Debug, Clone)]
pub struct NavView {
    /// Normalized virtual path of the browsed directory (empty for the root).
    pub path: String,
    /// Logical parent to navigate up to; `None` at the store root.
    pub parent: Option<String>,
    pub directories: Vec<NavEntry>,
    pub files: Vec<NavEntry>,
}

/// Renders the directory level at `loc`.
///
/// `virtual_path` must be the normalized relative path that resolved to
/// `loc`. Children are sorted by name for stable display; the catalog itself
/// promises no order.
pub fn render(loc: &ResolvedLocation, virtual_path: &str) -> Result<NavView, StoreError> {
    let mut entries = catalog::list(loc)?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let mut directories = Vec::new();
    let mut files = Vec::new();
    for entry in entries {
        let nav = NavEntry {
            path: join_virtual(virtual_path, &entry.name),
            name: entry.name,
        };
        if entry.kind.is_dir() {
            directories.push(nav);
        } else {
            files.push(nav);
        }
    }

    Ok(NavView {
        path: virtual_path.to_string(),
        parent: parent_of(virtual_path),
        directories,
        files,
    })
}

/// Child relative path = parent relative path + child name.
fn join_virtual(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Logical parent of a normalized virtual path; `None` at the root.
fn parent_of(virtual_path: &str) -> Option<String> {
    if virtual_path.is_empty() {
        return None;
    }
    Some(
        virtual_path
            .rsplit_once('/')
            .map(|(parent, _)| parent.to_string())
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::resolve::{StoreRoot, resolve};
    use std::fs::{self, File};

    #[test]
    fn parent_links_walk_up_to_the_root() {
        assert_eq!(parent_of(""), None);
        assert_eq!(parent_of("a"), Some(String::new()));
        assert_eq!(parent_of("a/b/c"), Some("a/b".to_string()));
    }

    #[test]
    fn renders_empty_root_without_parent() {
        let dir = tempfile::tempdir().unwrap();
        let root = StoreRoot::open(dir.path()).unwrap();
        let (loc, virt) = resolve(&root, "").unwrap();

        let view = render(&loc, &virt).unwrap();
        assert_eq!(view.parent, None);
        assert!(view.directories.is_empty());
        assert!(view.files.is_empty());
    }

    #[test]
    fn partitions_and_sorts_children() {
        let dir = tempfile::tempdir().unwrap();
        let root = StoreRoot::open(dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("docs/zeta")).unwrap();
        fs::create_dir(dir.path().join("docs/alpha")).unwrap();
        File::create(dir.path().join("docs/notes.txt")).unwrap();

        let (loc, virt) = resolve(&root, "docs").unwrap();
        let view = render(&loc, &virt).unwrap();

        assert_eq!(view.parent, Some(String::new()));
        assert_eq!(
            view.directories,
            vec![
                NavEntry {
                    name: "alpha".into(),
                    path: "docs/alpha".into()
                },
                NavEntry {
                    name: "zeta".into(),
                    path: "docs/zeta".into()
                },
            ]
        );
        assert_eq!(
            view.files,
            vec![NavEntry {
                name: "notes.txt".into(),
                path: "docs/notes.txt".into()
            }]
        );
    }
}
