// src/dedup/store/memory.rs
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;

use super::ProcessedStore;
use crate::dedup::{Fingerprint, KnownSet};
use crate::error::{MarkError, StoreUnavailable};

/// In-process processed set. Backs the `memory` backend and the tests;
/// reads and writes can be made to fail, and calls are counted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: Mutex<HashSet<Fingerprint>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    read_calls: AtomicUsize,
    mark_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys<I: IntoIterator<Item = Fingerprint>>(keys: I) -> Self {
        let s = Self::new();
        s.keys
            .lock()
            .expect("memory store mutex poisoned")
            .extend(keys);
        s
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn mark_calls(&self) -> usize {
        self.mark_calls.load(Ordering::SeqCst)
    }

    /// Current content, sorted.
    pub fn snapshot(&self) -> Vec<Fingerprint> {
        let mut v: Vec<_> = self
            .keys
            .lock()
            .expect("memory store mutex poisoned")
            .iter()
            .cloned()
            .collect();
        v.sort();
        v
    }
}

#[async_trait]
impl ProcessedStore for MemoryStore {
    async fn contains_batch(&self, _probe: &[Fingerprint]) -> KnownSet {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return KnownSet::Unavailable(StoreUnavailable::new("memory", "injected read failure"));
        }
        let keys = self.keys.lock().expect("memory store mutex poisoned");
        KnownSet::Available(keys.clone())
    }

    async fn mark(&self, fingerprints: &[Fingerprint]) -> Result<(), MarkError> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MarkError {
                backend: "memory",
                total: fingerprints.len(),
                failed: fingerprints.len(),
                cause: anyhow!("injected write failure"),
            });
        }
        self.keys
            .lock()
            .expect("memory store mutex poisoned")
            .extend(fingerprints.iter().cloned());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::fingerprint;

    #[tokio::test]
    async fn marking_twice_is_a_set_union() {
        let s = MemoryStore::new();
        let f = fingerprint("https://example.test/a").unwrap();
        s.mark(&[f.clone()]).await.unwrap();
        s.mark(&[f.clone()]).await.unwrap();
        assert_eq!(s.snapshot(), vec![f.clone()]);
        let known = s.contains_batch(&[]).await;
        assert!(known.contains(&f));
        assert_eq!(s.mark_calls(), 2);
    }

    #[tokio::test]
    async fn injected_failures_surface() {
        let s = MemoryStore::new();
        s.set_fail_reads(true);
        assert!(!s.contains_batch(&[]).await.is_available());
        s.set_fail_writes(true);
        let f = fingerprint("x").unwrap();
        let err = s.mark(&[f]).await.unwrap_err();
        assert_eq!(err.failed, 1);
        assert!(s.snapshot().is_empty());
    }
}
