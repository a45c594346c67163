//! Cache generations: which partitions belong to the running version.
//!
//! A controller version owns exactly two partitions, the precache and the
//! runtime cache. Every other partition in storage is from an older (or
//! unrelated) generation and is deleted when the version activates.

use std::collections::BTreeSet;

use crate::Error;
use crate::cache::CacheStorage;
use crate::config::AppConfig;

/// The partition names that are current for one controller version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentNames {
    pub precache: String,
    pub runtime: String,
}

impl CurrentNames {
    pub fn contains(&self, name: &str) -> bool {
        name == self.precache || name == self.runtime
    }
}

/// Tracks the current generation and reconciles storage against it.
#[derive(Debug, Clone)]
pub struct GenerationManager {
    names: CurrentNames,
}

impl GenerationManager {
    pub fn new(precache: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self { names: CurrentNames { precache: precache.into(), runtime: runtime.into() } }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.precache_name, &config.runtime_name)
    }

    pub fn current_names(&self) -> &CurrentNames {
        &self.names
    }

    /// Names in `existing` that are not current and must be deleted.
    pub fn reconcile<'a, I>(&self, existing: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        existing
            .into_iter()
            .filter(|name| !self.names.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Delete every stale partition, waiting for each delete to finish.
    ///
    /// Stops at the first storage failure so an activation never completes
    /// while stale data is still present. Returns the deleted names.
    pub async fn evict(&self, storage: &dyn CacheStorage) -> Result<Vec<String>, Error> {
        let existing = storage.keys().await?;
        let stale = self.reconcile(existing.iter().map(String::as_str));

        let mut deleted = Vec::with_capacity(stale.len());
        for name in stale {
            storage
                .delete(&name)
                .await
                .map_err(|e| Error::Storage(format!("failed to delete stale partition {name}: {e}")))?;
            tracing::info!(partition = %name, "evicted stale cache partition");
            deleted.push(name);
        }

        Ok(deleted)
    }
}
