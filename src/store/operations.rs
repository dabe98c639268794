//! Store operations
//!
//! The facade every transport call goes through: upload, download, list,
//! delete, and browse, wired through path resolution and per-path mutation
//! locks. All operations re-check on-storage state at the moment they act.

use log::{error, info};
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::StoreError;
use crate::store::TEMP_SUFFIX;
use crate::store::catalog;
use crate::store::locks::MutationCoordinator;
use crate::store::render::{self, NavView};
use crate::store::resolve::{StoreRoot, resolve};

const BUFFER_SIZE: usize = 8192;

/// A managed file store rooted at a single directory.
pub struct Store {
    root: StoreRoot,
    coordinator: MutationCoordinator,
}

impl Store {
    /// Opens the store rooted at `base`, creating the directory if missing.
    pub fn open(base: &Path) -> io::Result<Self> {
        let root = StoreRoot::open(base)?;
        info!("Store root opened at {}", root.as_path().display());
        Ok(Self {
            root,
            coordinator: MutationCoordinator::new(),
        })
    }

    /// Canonical absolute path of the store root.
    pub fn root_path(&self) -> &Path {
        self.root.as_path()
    }

    /// Stores the content read from `reader` at `relative`, creating missing
    /// intermediate directories and atomically overwriting any existing file.
    ///
    /// The content lands in a temporary file beside the target and is renamed
    /// over it, so a concurrent reader never observes a partial write.
    /// Returns the number of bytes written.
    pub async fn upload<R>(&self, relative: &str, reader: &mut R) -> Result<u64, StoreError>
    where
        R: AsyncRead + Unpin,
    {
        let (loc, virtual_path) = resolve(&self.root, relative)?;
        let _guard = self.coordinator.acquire(&loc).await;

        if loc.as_path().is_dir() {
            return Err(StoreError::Io(io::Error::other(format!(
                "target is a directory: {}",
                virtual_path
            ))));
        }

        if let Some(parent) = loc.as_path().parent() {
            fs::create_dir_all(parent).map_err(StoreError::Io)?;
        }

        // The cleanup guard removes the temporary on every early exit,
        // including cancellation mid-stream.
        let temp_path = temp_sibling(loc.as_path());
        let mut cleanup = TempCleanup {
            path: &temp_path,
            armed: true,
        };

        let written = write_temp(&temp_path, reader).await.map_err(|e| {
            error!("Upload of {} failed mid-write: {}", virtual_path, e);
            StoreError::Io(e)
        })?;

        fs::rename(&temp_path, loc.as_path()).map_err(|e| {
            error!("Failed to publish upload {}: {}", virtual_path, e);
            StoreError::Io(e)
        })?;
        cleanup.armed = false;

        info!("Stored {} ({} bytes)", virtual_path, written);
        Ok(written)
    }

    /// Opens the file at `relative` for reading, returning the content
    /// stream and its length. Directories and missing paths are `NotFound`.
    pub fn download(&self, relative: &str) -> Result<(File, u64), StoreError> {
        let (loc, virtual_path) = resolve(&self.root, relative)?;

        let file = File::open(loc.as_path()).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
                StoreError::NotFound(virtual_path.clone())
            }
            _ => StoreError::Io(e),
        })?;

        let meta = file.metadata().map_err(StoreError::Io)?;
        if meta.is_dir() {
            return Err(StoreError::NotFound(virtual_path));
        }

        info!("Serving {} ({} bytes)", virtual_path, meta.len());
        Ok((file, meta.len()))
    }

    /// Returns the fully-qualified relative paths of every file in the
    /// store, sorted.
    ///
    /// Walks the tree one level at a time through the catalog instead of
    /// recursing; a directory that vanishes mid-walk is skipped.
    pub fn list_all(&self) -> Result<Vec<String>, StoreError> {
        let (root_loc, _) = resolve(&self.root, "")?;

        let mut files = Vec::new();
        let mut pending = VecDeque::from([(root_loc, String::new())]);
        while let Some((loc, virtual_path)) = pending.pop_front() {
            let entries = match catalog::list(&loc) {
                Ok(entries) => entries,
                Err(StoreError::NotFound(_)) if !virtual_path.is_empty() => continue,
                Err(e) => return Err(e),
            };

            for entry in entries {
                let child_path = if virtual_path.is_empty() {
                    entry.name.clone()
                } else {
                    format!("{}/{}", virtual_path, entry.name)
                };
                if entry.kind.is_dir() {
                    pending.push_back((entry.location, child_path));
                } else {
                    files.push(child_path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Deletes the file at `relative`.
    ///
    /// Existence is re-checked under the mutation lock: a target that is
    /// already gone fails with `NotFound` rather than silently succeeding.
    pub async fn delete(&self, relative: &str) -> Result<(), StoreError> {
        let (loc, virtual_path) = resolve(&self.root, relative)?;
        let _guard = self.coordinator.acquire(&loc).await;

        let meta = fs::symlink_metadata(loc.as_path()).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(virtual_path.clone()),
            _ => StoreError::Io(e),
        })?;
        if meta.is_dir() {
            return Err(StoreError::Io(io::Error::other(format!(
                "target is a directory: {}",
                virtual_path
            ))));
        }

        fs::remove_file(loc.as_path()).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(virtual_path.clone()),
            _ => StoreError::Io(e),
        })?;

        info!("Deleted {}", virtual_path);
        Ok(())
    }

    /// Renders one directory level for browsing.
    pub fn browse(&self, relative: &str) -> Result<NavView, StoreError> {
        let (loc, virtual_path) = resolve(&self.root, relative)?;
        render::render(&loc, &virtual_path)
    }
}

struct TempCleanup<'a> {
    path: &'a Path,
    armed: bool,
}

impl Drop for TempCleanup<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(self.path);
        }
    }
}

fn temp_sibling(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(TEMP_SUFFIX);
    target.with_file_name(name)
}

/// Streams `reader` into a freshly created temporary file, chunk by chunk.
async fn write_temp<R>(temp_path: &Path, reader: &mut R) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut temp_file = File::create(temp_path)?;
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut written = 0u64;

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        temp_file.write_all(&buffer[..n])?;
        written += n as u64;
    }

    temp_file.flush()?;
    Ok(written)
}
