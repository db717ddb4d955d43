use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BaseCheck, CachedCheck, PlaygroundStore, StoreError, PLAYGROUND_TTL};
use crate::protocol::CheckResult;

#[derive(Debug)]
struct Entry {
    base: Option<BaseCheck>,
    checks: Vec<CheckResult>,
    expires_at: Instant,
}

/// In-process playground cache with the same expiry rules as Redis
#[derive(Debug)]
pub struct MemoryPlaygroundStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl Default for MemoryPlaygroundStore {
    fn default() -> Self {
        Self::with_ttl(PLAYGROUND_TTL)
    }
}

impl MemoryPlaygroundStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl }
    }

    /// Number of runs currently held, expired or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn fresh_entry(&self) -> Entry {
        Entry { base: None, checks: Vec::new(), expires_at: Instant::now() + self.ttl }
    }
}

#[async_trait]
impl PlaygroundStore for MemoryPlaygroundStore {
    async fn store_base(&self, id: &str, base: &BaseCheck) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;

        // New runs sweep out runs nobody read before they expired
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);

        let entry = entries.entry(id.to_string()).or_insert_with(|| self.fresh_entry());
        entry.base = Some(base.clone());
        entry.expires_at = Instant::now() + self.ttl;
        Ok(())
    }

    async fn store_check(&self, id: &str, check: &CheckResult) -> Result<(), StoreError> {
        let check = check.clone().without_body();
        let mut entries = self.entries.write().await;
        let entry = entries.entry(id.to_string()).or_insert_with(|| self.fresh_entry());

        // Set semantics, identical results are stored once
        if !entry.checks.contains(&check) {
            entry.checks.push(check);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CachedCheck>, StoreError> {
        let mut entries = self.entries.write().await;

        let expired = match entries.get(id) {
            Some(entry) => entry.expires_at <= Instant::now(),
            None => return Ok(None),
        };
        if expired {
            entries.remove(id);
            return Ok(None);
        }

        Ok(entries
            .get(id)
            .and_then(|entry| entry.base.clone().map(|base| CachedCheck::new(base, entry.checks.clone()))))
    }
}
