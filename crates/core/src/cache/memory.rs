//! In-process cache storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::entry::CachedEntry;
use super::request::Request;
use super::response::Response;
use super::storage::{CacheStorage, ensure_storable};
use crate::Error;

#[derive(Debug)]
struct Partition {
    name: String,
    entries: HashMap<String, CachedEntry>,
}

/// Cache storage that lives only as long as the process.
///
/// Partitions keep their creation order so `match_any` behaves the same as
/// the SQLite backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    partitions: RwLock<Vec<Partition>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        if !partitions.iter().any(|p| p.name == name) {
            partitions.push(Partition { name: name.to_string(), entries: HashMap::new() });
        }
        Ok(())
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let partitions = self.partitions.read().await;
        let hit = partitions
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.entries.get(&request.key()))
            .filter(|entry| entry.matches(request))
            .map(|entry| entry.response.clone());
        Ok(hit)
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        ensure_storable(request)?;
        let entry = CachedEntry::capture(request, response.clone());

        let mut partitions = self.partitions.write().await;
        match partitions.iter_mut().find(|p| p.name == name) {
            Some(partition) => {
                partition.entries.insert(entry.key.clone(), entry);
            }
            None => {
                let mut entries = HashMap::new();
                entries.insert(entry.key.clone(), entry);
                partitions.push(Partition { name: name.to_string(), entries });
            }
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions.iter().map(|p| p.name.clone()).collect())
    }

    async fn entries(&self, name: &str) -> Result<Vec<CachedEntry>, Error> {
        let partitions = self.partitions.read().await;
        let mut entries: Vec<CachedEntry> = partitions
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.entries.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(entries)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|p| p.name != name);
        Ok(partitions.len() != before)
    }
}
