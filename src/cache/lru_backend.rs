//! 容量受限 + 空闲过期的 LRU 后端
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rsuseragent_engine::FieldRecord;
use rustc_hash::FxHashMap;

use crate::cache::{CacheBackend, CacheResult};

struct Entry {
    record: Arc<FieldRecord>,
    last_access: Instant,
    tick: u64,
}

#[derive(Default)]
struct Inner {
    entries: FxHashMap<String, Entry>,
    // 访问序号 → 键，最小序号即最久未访问
    order: BTreeMap<u64, String>,
    tick: u64,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &str, now: Instant) {
        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(key) {
            self.order.remove(&entry.tick);
            entry.tick = tick;
            entry.last_access = now;
            self.order.insert(tick, key.to_string());
        }
    }

    /// 从最久未访问端清理过期条目，返回清理数量
    fn purge_expired(&mut self, now: Instant, idle_timeout: Duration) -> u64 {
        let mut purged = 0;
        while let Some((&tick, key)) = self.order.first_key_value() {
            let expired = self
                .entries
                .get(key)
                .map_or(true, |entry| now.duration_since(entry.last_access) >= idle_timeout);
            if !expired {
                break;
            }
            if let Some(key) = self.order.remove(&tick) {
                self.entries.remove(&key);
            }
            purged += 1;
        }
        purged
    }
}

pub struct LruBackend {
    inner: Mutex<Inner>,
    capacity: usize,
    idle_timeout: Duration,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl LruBackend {
    pub fn new(capacity: usize, idle_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            idle_timeout,
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn expire(&self, inner: &mut Inner, now: Instant) {
        let purged = inner.purge_expired(now, self.idle_timeout);
        if purged > 0 {
            log::trace!("Cache expired {} idle entries", purged);
            self.expirations.fetch_add(purged, Ordering::Relaxed);
        }
    }
}

impl CacheBackend for LruBackend {
    fn get(&self, key: &str) -> CacheResult<Option<Arc<FieldRecord>>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        self.expire(&mut inner, now);

        let Some(record) = inner.entries.get(key).map(|entry| Arc::clone(&entry.record)) else {
            return Ok(None);
        };
        inner.touch(key, now);
        Ok(Some(record))
    }

    fn put(&self, key: &str, record: Arc<FieldRecord>) -> CacheResult<()> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        self.expire(&mut inner, now);

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.record = record;
            inner.touch(key, now);
            return Ok(());
        }

        while inner.entries.len() >= self.capacity {
            let Some((_, oldest)) = inner.order.pop_first() else {
                break;
            };
            inner.entries.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }

        let tick = inner.next_tick();
        inner.order.insert(tick, key.to_string());
        inner.entries.insert(
            key.to_string(),
            Entry {
                record,
                last_access: now,
                tick,
            },
        );
        Ok(())
    }

    fn len(&self) -> CacheResult<usize> {
        Ok(self.inner.lock().entries.len())
    }

    fn clear(&self) -> CacheResult<()> {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        Ok(())
    }

    fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ua: &str) -> Arc<FieldRecord> {
        Arc::new(FieldRecord::new(ua))
    }

    #[test]
    fn test_lru_eviction_order() {
        let backend = LruBackend::new(2, Duration::from_secs(60));
        backend.put("a", record("a")).unwrap();
        backend.put("b", record("b")).unwrap();

        // 访问 a 后，b 成为最久未访问
        assert!(backend.get("a").unwrap().is_some());
        backend.put("c", record("c")).unwrap();

        assert!(backend.get("b").unwrap().is_none());
        assert!(backend.get("a").unwrap().is_some());
        assert!(backend.get("c").unwrap().is_some());
        assert_eq!(backend.len().unwrap(), 2);
        assert_eq!(backend.evictions(), 1);
    }

    #[test]
    fn test_replace_existing_key() {
        let backend = LruBackend::new(2, Duration::from_secs(60));
        backend.put("a", record("first")).unwrap();
        backend.put("a", record("second")).unwrap();
        assert_eq!(backend.len().unwrap(), 1);
        assert_eq!(backend.get("a").unwrap().unwrap().user_agent_string(), "second");
        assert_eq!(backend.evictions(), 0);
    }

    #[test]
    fn test_idle_expiry() {
        let backend = LruBackend::new(10, Duration::from_millis(20));
        backend.put("a", record("a")).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        assert!(backend.get("a").unwrap().is_none());
        assert_eq!(backend.expirations(), 1);
        assert_eq!(backend.len().unwrap(), 0);
    }

    #[test]
    fn test_clear() {
        let backend = LruBackend::new(10, Duration::from_secs(60));
        backend.put("a", record("a")).unwrap();
        backend.clear().unwrap();
        assert_eq!(backend.len().unwrap(), 0);
        assert!(backend.get("a").unwrap().is_none());
    }
}
