//! Managed file store
//!
//! Path resolution, entry cataloging, per-path mutation locking, and
//! directory-view rendering over a single rooted directory tree.

pub mod catalog;
pub mod locks;
pub mod operations;
pub mod render;
pub mod resolve;

/// Suffix of in-progress upload temporaries, written beside their target.
pub(crate) const TEMP_SUFFIX: &str = ".part";

pub use catalog::{Entry, EntryKind};
pub use operations::Store;
pub use render::{NavEntry, NavView};
pub use resolve::{ResolvedLocation, StoreRoot};
