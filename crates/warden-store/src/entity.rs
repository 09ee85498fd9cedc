//! Generic in-memory `EntityStore`.

use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use warden_contracts::error::{WardenError, WardenResult};
use warden_core::traits::{Entity, EntityStore};

/// Insertion-ordered entity table. Performs no access checks.
pub struct InMemoryEntityStore<T: Entity> {
    kind: String,
    rows: Mutex<Vec<T>>,
}

impl<T: Entity> InMemoryEntityStore<T> {
    /// `kind` names the entity in `NotFound` and `Conflict` errors.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            rows: Mutex::new(Vec::new()),
        }
    }

    fn rows(&self) -> WardenResult<MutexGuard<'_, Vec<T>>> {
        self.rows
            .lock()
            .map_err(|e| WardenError::store(format!("{} store lock poisoned: {e}", self.kind)))
    }

    fn not_found(&self, id: Uuid) -> WardenError {
        WardenError::NotFound {
            entity: self.kind.clone(),
            id: id.to_string(),
        }
    }
}

impl<T: Entity> EntityStore<T> for InMemoryEntityStore<T> {
    fn insert(&self, entity: &T) -> WardenResult<()> {
        let mut rows = self.rows()?;
        if rows.iter().any(|e| e.id() == entity.id()) {
            return Err(WardenError::Conflict {
                reason: format!("{} {} already exists", self.kind, entity.id()),
            });
        }
        rows.push(entity.clone());
        Ok(())
    }

    fn find(&self, id: Uuid) -> WardenResult<Option<T>> {
        Ok(self.rows()?.iter().find(|e| e.id() == id).cloned())
    }

    fn save(&self, entity: &T) -> WardenResult<()> {
        let mut rows = self.rows()?;
        match rows.iter_mut().find(|e| e.id() == entity.id()) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(())
            }
            None => Err(self.not_found(entity.id())),
        }
    }

    fn remove(&self, id: Uuid) -> WardenResult<()> {
        let mut rows = self.rows()?;
        let before = rows.len();
        rows.retain(|e| e.id() != id);
        if rows.len() == before {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    fn list(&self, limit: usize, offset: usize) -> WardenResult<Vec<T>> {
        Ok(self.rows()?.iter().skip(offset).take(limit).cloned().collect())
    }
}
