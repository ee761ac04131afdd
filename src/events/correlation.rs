//! Correlation ids tying status events to the step that produced them.
//!
//! A [`Correlation`] is created once per top-level run and forked for each
//! sub-step that needs its own id (for example the synthesis stream), so an
//! observer can group token updates by step.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use uuid::Uuid;

/// Source of fresh correlation ids.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// `prefix-1`, `prefix-2`, ... in minting order.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

#[derive(Clone)]
pub struct Correlation {
    id: String,
    ids: Arc<dyn IdSource>,
}

impl Correlation {
    /// Start a new correlation chain, minting its first id from `ids`.
    pub fn root(ids: Arc<dyn IdSource>) -> Self {
        let id = ids.next_id();
        Self { id, ids }
    }

    /// A root correlation with a random id.
    pub fn random() -> Self {
        Self::root(Arc::new(UuidIds))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// A new correlation for a sub-step, minted from the same source.
    pub fn fork(&self) -> Self {
        Self {
            id: self.ids.next_id(),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl std::fmt::Debug for Correlation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlation").field("id", &self.id).finish()
    }
}
