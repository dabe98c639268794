//! Per-path mutation serialization
//!
//! Provides a process-wide registry of lock tokens keyed by resolved path,
//! guaranteeing at most one in-flight mutation per distinct location.
//! Distinct locations never contend.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::store::resolve::ResolvedLocation;

/// Guard for one in-flight mutation; the lock is released when this drops,
/// on every exit path including cancellation.
pub struct MutationGuard {
    _permit: OwnedMutexGuard<()>,
}

/// Registry of per-path lock tokens, created lazily on first use and kept
/// for the process lifetime.
#[derive(Default)]
pub struct MutationCoordinator {
    tokens: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl MutationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the mutation lock for `loc`, waiting until any prior holder
    /// for the same location releases. Waiters are served in acquisition
    /// order.
    pub async fn acquire(&self, loc: &ResolvedLocation) -> MutationGuard {
        let token = {
            let mut tokens = self.tokens.lock().await;
            Arc::clone(tokens.entry(loc.as_path().to_path_buf()).or_default())
        };

        MutationGuard {
            _permit: token.lock_owned().await,
        }
    }

    /// Number of tokens currently registered.
    pub async fn token_count(&self) -> usize {
        self.tokens.lock().await.len()
    }
}
