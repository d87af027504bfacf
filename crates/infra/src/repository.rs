use std::collections::HashMap;
use std::sync::RwLock;

use loomerp_core::{DomainError, DomainResult, Entity};

/// Generic in-memory document store keyed by entity id.
///
/// Plain `insert` is last-write-wins. Mutations that must not race a
/// concurrent command on the same document go through [`Self::update`] /
/// [`Self::remove_if`], which run the caller's closure while the write lock
/// is held — the status check, its ledger side effect, and the write-back
/// form one critical section.
#[derive(Debug)]
pub struct InMemoryRepository<T: Entity> {
    items: RwLock<HashMap<T::Id, T>>,
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Entity + Clone> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: T) -> DomainResult<()> {
        let mut items = self.items.write().map_err(Self::poisoned)?;
        items.insert(item.id().clone(), item);
        Ok(())
    }

    /// Insert unless an existing entry matches `conflicts_with`. Check and
    /// insert happen under one lock, so two concurrent inserts cannot both
    /// pass the uniqueness check.
    pub fn insert_unique(
        &self,
        item: T,
        conflicts_with: impl Fn(&T) -> bool,
        conflict_msg: impl Into<String>,
    ) -> DomainResult<()> {
        let mut items = self.items.write().map_err(Self::poisoned)?;
        if items.values().any(|existing| conflicts_with(existing)) {
            return Err(DomainError::conflict(conflict_msg));
        }
        items.insert(item.id().clone(), item);
        Ok(())
    }

    /// Read-modify-write under the write lock.
    ///
    /// On error the closure must leave the value unchanged: validate before
    /// mutating, or work on a clone and assign it back on success.
    pub fn update<R>(
        &self,
        id: &T::Id,
        f: impl FnOnce(&mut T) -> DomainResult<R>,
    ) -> DomainResult<R> {
        let mut items = self.items.write().map_err(Self::poisoned)?;
        let item = items.get_mut(id).ok_or_else(DomainError::not_found)?;
        f(item)
    }

    /// Remove under the write lock, once `check` passes against the stored
    /// value. A concurrent update cannot slip between the check and the
    /// removal.
    pub fn remove_if<R>(
        &self,
        id: &T::Id,
        check: impl FnOnce(&T) -> DomainResult<R>,
    ) -> DomainResult<(T, R)> {
        let mut items = self.items.write().map_err(Self::poisoned)?;
        let item = items.get(id).ok_or_else(DomainError::not_found)?;
        let extra = check(item)?;
        let item = items.remove(id).ok_or_else(DomainError::not_found)?;
        Ok((item, extra))
    }

    pub fn get(&self, id: &T::Id) -> DomainResult<Option<T>> {
        let items = self.items.read().map_err(Self::poisoned)?;
        Ok(items.get(id).cloned())
    }

    pub fn require(&self, id: &T::Id) -> DomainResult<T> {
        self.get(id)?.ok_or_else(DomainError::not_found)
    }

    pub fn remove(&self, id: &T::Id) -> DomainResult<Option<T>> {
        let mut items = self.items.write().map_err(Self::poisoned)?;
        Ok(items.remove(id))
    }

    pub fn all(&self) -> DomainResult<Vec<T>> {
        let items = self.items.read().map_err(Self::poisoned)?;
        Ok(items.values().cloned().collect())
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> DomainResult<Vec<T>> {
        let items = self.items.read().map_err(Self::poisoned)?;
        Ok(items.values().filter(|t| predicate(t)).cloned().collect())
    }

    pub fn len(&self) -> DomainResult<usize> {
        let items = self.items.read().map_err(Self::poisoned)?;
        Ok(items.len())
    }

    pub fn is_empty(&self) -> DomainResult<bool> {
        Ok(self.len()? == 0)
    }

    fn poisoned(_: impl core::fmt::Debug) -> DomainError {
        DomainError::conflict("repository lock poisoned")
    }
}
