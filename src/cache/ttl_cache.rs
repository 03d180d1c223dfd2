use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::models::{CacheEntry, CacheOptions, CacheStats};
use crate::clock::{Clock, SystemClock};

struct Slot<V> {
    /// 写入序号，用于按写入顺序淘汰
    seq: u64,
    entry: CacheEntry<V>,
}

struct Inner<V> {
    entries: HashMap<String, Slot<V>>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
    hits: u64,
    misses: u64,
}

impl<V> Inner<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn remove(&mut self, key: &str) -> Option<Slot<V>> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.seq);
        Some(slot)
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    /// 取出未过期的条目，过期条目顺带删除
    fn live(&mut self, key: &str, now: i64) -> Option<&CacheEntry<V>> {
        let expired = self.entries.get(key)?.entry.is_expired(now);
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|slot| &slot.entry)
    }

    fn purge(&mut self, now: i64) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }
}

/// 带过期时间和容量上限的内存缓存
///
/// 读取时惰性删除过期条目，`size` / `stats` / `purge_expired` 会整体清理。
/// 容量满时淘汰最早写入的条目（按写入顺序，不是 LRU）。
pub struct TtlCache<V, C: Clock = SystemClock> {
    max_size: usize,
    default_ttl_ms: u64,
    clock: C,
    inner: Mutex<Inner<V>>,
}

impl<V> TtlCache<V, SystemClock> {
    pub fn new(options: CacheOptions) -> Self {
        Self::with_clock(options, SystemClock)
    }
}

impl<V, C: Clock> TtlCache<V, C> {
    pub fn with_clock(options: CacheOptions, clock: C) -> Self {
        Self {
            max_size: options.max_size,
            default_ttl_ms: options.default_ttl_ms,
            clock,
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// 写入缓存，`ttl_ms` 为空时使用默认有效期
    ///
    /// 已满时先淘汰最早写入的条目，覆盖已有的键也一样。
    /// 覆盖且未被淘汰的键保留原写入顺序。
    pub fn set(&self, key: impl Into<String>, value: V, ttl_ms: Option<u64>) {
        let key = key.into();
        let entry = CacheEntry {
            value,
            created_at: self.clock.now_ms(),
            ttl_ms: ttl_ms.unwrap_or(self.default_ttl_ms),
        };

        if self.max_size == 0 {
            return;
        }

        let mut inner = self.inner.lock();
        while inner.entries.len() >= self.max_size {
            match inner.evict_oldest() {
                Some(evicted) => tracing::debug!("Cache full, evicted {}", evicted),
                None => break,
            }
        }

        if let Some(slot) = inner.entries.get_mut(&key) {
            slot.entry = entry;
            return;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(key, Slot { seq, entry });
    }

    /// 键是否存在且未过期
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.inner.lock().live(key, now).is_some()
    }

    /// 删除指定键，返回是否删除了条目
    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    /// 删除所有以 `prefix` 开头的键，返回删除数量
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock();
        let keys: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &keys {
            inner.remove(key);
        }
        keys.len()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// 未过期条目数量，统计前先清理过期条目
    pub fn size(&self) -> usize {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        inner.purge(now);
        inner.entries.len()
    }

    /// 清理所有过期条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        self.inner.lock().purge(now)
    }
}

impl<V: Clone, C: Clock> TtlCache<V, C> {
    /// 读取未过期的值，不计入命中率
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        self.inner.lock().live(key, now).map(|entry| entry.value.clone())
    }

    /// 读取并计入命中率统计
    pub fn get_with_stats(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        let value = inner.live(key, now).map(|entry| entry.value.clone());

        if value.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        value
    }

    /// 命中时返回缓存值，否则调用 `compute` 计算并写入
    ///
    /// `compute` 在锁外执行，可以再次访问缓存。
    pub fn get_or_insert_with<F>(&self, key: &str, ttl_ms: Option<u64>, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get_with_stats(key) {
            return value;
        }

        let value = compute();
        self.set(key, value.clone(), ttl_ms);
        value
    }
}

impl<V: Serialize, C: Clock> TtlCache<V, C> {
    /// 缓存统计，先清理过期条目
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();
        inner.purge(now);

        let memory_usage = inner
            .entries
            .values()
            .map(|slot| {
                serde_json::to_string(&slot.entry.value)
                    .map(|json| json.len())
                    .unwrap_or(0)
            })
            .sum();

        let lookups = inner.hits + inner.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            inner.hits as f64 / lookups as f64
        };

        CacheStats {
            item_count: inner.entries.len(),
            max_size: self.max_size,
            memory_usage,
            hit_rate,
        }
    }
}

impl<V, C> TtlCache<V, C>
where
    V: Send + 'static,
    C: Clock + 'static,
{
    /// 启动定期清理过期条目的任务，缓存被释放后自动退出
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self);
        drop(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    tracing::debug!("Cache dropped, stopping sweeper");
                    break;
                };

                let purged = cache.purge_expired();
                if purged > 0 {
                    tracing::debug!("Cache sweeper purged {} expired entries", purged);
                }
            }
        })
    }
}
