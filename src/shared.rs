// File: src/shared.rs
use crate::core::engine::PredictionEngine;
use crate::error::LoadResult;
use std::sync::{Arc, Mutex, OnceLock};

/// Holds one engine per process (or per test) and builds it at most once.
///
/// Concurrent first callers block on the init lock; the first to get it
/// runs the initializer and the rest see the finished engine. A failed
/// initialization leaves the cell empty so a later call can retry.
#[derive(Debug, Default)]
pub struct EngineCell {
    cell: OnceLock<Arc<PredictionEngine>>,
    init_lock: Mutex<()>,
}

impl EngineCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Option<Arc<PredictionEngine>> {
        self.cell.get().cloned()
    }

    pub fn get_or_try_init<F>(&self, init: F) -> LoadResult<Arc<PredictionEngine>>
    where
        F: FnOnce() -> LoadResult<PredictionEngine>,
    {
        if let Some(engine) = self.cell.get() {
            return Ok(Arc::clone(engine));
        }

        // A panicking initializer poisons the lock but leaves the cell empty.
        let _guard = self.init_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(engine) = self.cell.get() {
            return Ok(Arc::clone(engine));
        }

        let engine = Arc::new(init()?);
        tracing::debug!("Shared prediction engine initialized");
        Ok(Arc::clone(self.cell.get_or_init(|| engine)))
    }
}
