//! Entry enumeration and classification
//!
//! Lists the direct children of a resolved location. Entries are recomputed
//! on every call; storage can change underneath between requests.

use std::fs;
use std::io;

use crate::error::StoreError;
use crate::store::TEMP_SUFFIX;
use crate::store::resolve::ResolvedLocation;

/// Classification of one store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        self == EntryKind::Directory
    }
}

/// One item inside the store: name, kind, and its resolved location.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    pub location: ResolvedLocation,
}

/// Lists the direct children of `loc`, one `Entry` per child, in no
/// guaranteed order.
///
/// Fails with `NotFound` if the location no longer exists, `NotDirectory` if
/// it exists but is not a directory, `Io` for any other storage failure.
/// Symlinked children are classified by their target kind only; in-progress
/// upload temporaries are skipped.
pub fn list(loc: &ResolvedLocation) -> Result<Vec<Entry>, StoreError> {
    let meta = fs::metadata(loc.as_path()).map_err(|e| classify_missing(e, loc))?;
    if !meta.is_dir() {
        return Err(StoreError::NotDirectory(display_path(loc)));
    }

    let mut entries = Vec::new();
    for dirent in fs::read_dir(loc.as_path()).map_err(|e| classify_missing(e, loc))? {
        let dirent = dirent.map_err(StoreError::Io)?;
        let name = dirent.file_name().to_string_lossy().into_owned();
        if name.ends_with(TEMP_SUFFIX) {
            continue;
        }

        // Follows a symlink just far enough to learn file-vs-directory of
        // the target; a broken link counts as a file.
        let location = loc.child(&dirent.file_name());
        let kind = match fs::metadata(location.as_path()) {
            Ok(target) if target.is_dir() => EntryKind::Directory,
            _ => EntryKind::File,
        };

        entries.push(Entry {
            name,
            kind,
            location,
        });
    }

    Ok(entries)
}

fn classify_missing(e: io::Error, loc: &ResolvedLocation) -> StoreError {
    match e.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(display_path(loc)),
        io::ErrorKind::NotADirectory => StoreError::NotDirectory(display_path(loc)),
        _ => StoreError::Io(e),
    }
}

fn display_path(loc: &ResolvedLocation) -> String {
    loc.as_path().display().to_string()
}
