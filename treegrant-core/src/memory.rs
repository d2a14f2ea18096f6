//! In-memory document provider
//!
//! Deterministic stand-in for a platform provider. Trees registered with
//! [`InMemoryProvider::add_tree`] count as interactively consented; grant
//! requests for any other tree are denied. Counters expose how many grant
//! requests were made and how many cursors are still open.

use crate::handle::TreeHandle;
use crate::provider::{DocumentProvider, FieldId, ProviderError, QueryTarget, RawRow, RowCursor, VecCursor};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    trees: HashMap<TreeHandle, Vec<RawRow>>,
    grants: BTreeSet<TreeHandle>,
}

#[derive(Default)]
pub struct InMemoryProvider {
    state: Mutex<MemoryState>,
    grant_requests: AtomicUsize,
    opened: AtomicUsize,
    open: Arc<AtomicUsize>,
    null_results: AtomicBool,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a consented tree whose root has `rows` as children
    pub fn add_tree(&self, tree: &TreeHandle, rows: Vec<RawRow>) {
        self.state().trees.insert(tree.clone(), rows);
    }

    /// Seed a persisted grant without going through a request
    pub fn grant_directly(&self, tree: &TreeHandle) {
        self.state().grants.insert(tree.clone());
    }

    /// Make every subsequent query return no result object
    pub fn set_null_results(&self, enabled: bool) {
        self.null_results.store(enabled, Ordering::SeqCst);
    }

    pub fn grant_requests(&self) -> usize {
        self.grant_requests.load(Ordering::SeqCst)
    }

    /// Cursors opened over the provider's lifetime
    pub fn opened_cursors(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Cursors opened and not yet closed
    pub fn open_cursors(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn is_granted(&self, tree: &TreeHandle) -> bool {
        self.state().grants.contains(tree)
    }
}

#[async_trait]
impl DocumentProvider for InMemoryProvider {
    async fn take_persistable_grant(&self, tree: &TreeHandle) -> Result<(), ProviderError> {
        self.grant_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        if !state.trees.contains_key(tree) {
            return Err(ProviderError::Denied(format!(
                "no interactive consent recorded for {}",
                tree
            )));
        }
        state.grants.insert(tree.clone());
        Ok(())
    }

    async fn release_persistable_grant(&self, tree: &TreeHandle) -> Result<(), ProviderError> {
        self.state().grants.remove(tree);
        Ok(())
    }

    async fn persisted_grants(&self) -> Result<Vec<TreeHandle>, ProviderError> {
        Ok(self.state().grants.iter().cloned().collect())
    }

    async fn open_query(
        &self,
        target: &QueryTarget,
        fields: &[FieldId],
    ) -> Result<Option<Box<dyn RowCursor>>, ProviderError> {
        if self.null_results.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let state = self.state();
        if !state.grants.contains(&target.tree) {
            return Err(ProviderError::Denied(format!("no grant for {}", target.tree)));
        }
        let rows = state
            .trees
            .get(&target.tree)
            .ok_or_else(|| ProviderError::Unavailable(format!("unknown tree {}", target.tree)))?
            .iter()
            .map(|row| project(row, fields))
            .collect();

        self.opened.fetch_add(1, Ordering::SeqCst);
        self.open.fetch_add(1, Ordering::SeqCst);
        let open = Arc::clone(&self.open);
        let cursor = VecCursor::new(rows).on_close(move || {
            open.fetch_sub(1, Ordering::SeqCst);
        });
        Ok(Some(Box::new(cursor)))
    }
}

/// Keep only the requested columns
fn project(row: &RawRow, fields: &[FieldId]) -> RawRow {
    let mut projected = RawRow::new();
    for &field in fields {
        if let Some(value) = row.get(field) {
            projected.set(field, value);
        }
    }
    projected
}
