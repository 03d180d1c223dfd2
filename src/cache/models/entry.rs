use serde::{Deserialize, Serialize};

/// 缓存配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// 最大条目数
    pub max_size: usize,
    /// 默认有效期，单位毫秒
    pub default_ttl_ms: u64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_size: 100,
            default_ttl_ms: 5 * 60 * 1000,
        }
    }
}

/// 缓存条目
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// 写入时间，Unix 毫秒
    pub created_at: i64,
    pub ttl_ms: u64,
}

impl<V> CacheEntry<V> {
    /// 超过有效期即视为不存在，即使尚未被清理
    pub fn is_expired(&self, now: i64) -> bool {
        let age = now.saturating_sub(self.created_at);
        age > i64::try_from(self.ttl_ms).unwrap_or(i64::MAX)
    }
}

/// 缓存统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub item_count: usize,
    pub max_size: usize,
    /// 所有值序列化为 JSON 后的字节数估算
    pub memory_usage: usize,
    /// 仅统计 `get_with_stats` 的读取
    pub hit_rate: f64,
}
