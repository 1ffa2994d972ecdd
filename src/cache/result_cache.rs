//! 结果缓存门面：命中返回值拷贝，后端故障降级为未命中
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rsuseragent_engine::FieldRecord;
use serde::Serialize;

use crate::cache::{CacheBackend, LruBackend};
use crate::config::CacheOptions;

/// 缓存统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub expirations: u64,
}

pub struct ResultCache {
    backend: Option<Box<dyn CacheBackend>>,
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
}

impl ResultCache {
    /// 按配置创建；容量为 0 时缓存关闭
    pub fn new(options: &CacheOptions) -> Self {
        let backend: Option<Box<dyn CacheBackend>> = if options.is_enabled() {
            Some(Box::new(LruBackend::new(options.capacity, options.idle_timeout)))
        } else {
            None
        };
        Self::with_backend(backend)
    }

    pub fn disabled() -> Self {
        Self::with_backend(None)
    }

    pub fn with_backend(backend: Option<Box<dyn CacheBackend>>) -> Self {
        Self {
            backend,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// 查找；命中时返回独立的值拷贝
    pub fn lookup(&self, key: &str) -> Option<FieldRecord> {
        let backend = self.backend.as_ref()?;
        match backend.get(key) {
            Ok(Some(record)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(FieldRecord::clone(&record))
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                log::debug!("Cache lookup failed, treated as miss: {}", e);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// 写入快照；调用方保留自己的记录
    pub fn insert(&self, key: &str, record: &FieldRecord) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        match backend.put(key, Arc::new(record.clone())) {
            Ok(()) => {
                self.insertions.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => log::debug!("Cache insert failed, ignored: {}", e),
        }
    }

    pub fn clear(&self) {
        if let Some(backend) = self.backend.as_ref() {
            if let Err(e) = backend.clear() {
                log::debug!("Cache clear failed: {}", e);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let (entries, evictions, expirations) = match self.backend.as_ref() {
            Some(backend) => (
                backend.len().unwrap_or(0),
                backend.evictions(),
                backend.expirations(),
            ),
            None => (0, 0, 0),
        };
        CacheStats {
            enabled: self.is_enabled(),
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            evictions,
            expirations,
        }
    }
}
