//! Per-user cells: a short-lived map lock hands out one lock per user, so work on
//! different users never contends and read-modify-write on one user is atomic.
//!
//! A cell whose value is back to its default is dropped from the map once no
//! other caller holds it, so the map only tracks users with live state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kcommon::UserId;

use crate::error::SessionError;

#[derive(Debug)]
pub(crate) struct KeyedCells<V> {
    name: &'static str,
    cells: Mutex<HashMap<UserId, Arc<Mutex<V>>>>,
}

impl<V: Default + PartialEq> KeyedCells<V> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            cells: Mutex::new(HashMap::new()),
        }
    }

    fn map_poisoned(&self) -> SessionError {
        SessionError::storage(format!("{} map lock poisoned", self.name))
    }

    fn cell(&self, user: UserId) -> Result<Arc<Mutex<V>>, SessionError> {
        let mut cells = self.cells.lock().map_err(|_| self.map_poisoned())?;
        Ok(Arc::clone(cells.entry(user).or_default()))
    }

    /// Runs `f` with exclusive access to the user's value.
    pub(crate) fn with<R>(
        &self,
        user: UserId,
        f: impl FnOnce(&mut V) -> R,
    ) -> Result<R, SessionError> {
        let cell = self.cell(user)?;
        let result = {
            let mut value = cell
                .lock()
                .map_err(|_| SessionError::storage(format!("{} entry lock poisoned", self.name)))?;
            f(&mut value)
        };
        drop(cell);
        self.evict_if_vacant(user)?;
        Ok(result)
    }

    fn evict_if_vacant(&self, user: UserId) -> Result<(), SessionError> {
        let mut cells = self.cells.lock().map_err(|_| self.map_poisoned())?;
        // Only the map holds the cell, so nobody can be waiting on it.
        let vacant = cells.get(&user).is_some_and(|cell| {
            Arc::strong_count(cell) == 1
                && cell
                    .try_lock()
                    .map(|value| *value == V::default())
                    .unwrap_or(false)
        });
        if vacant {
            cells.remove(&user);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.cells.lock().map(|cells| cells.len()).unwrap_or_default()
    }
}
