// 缓存模块
// 包含缓存数据结构和操作逻辑

pub mod keys;
pub mod models;
mod ttl_cache;

// 重新导出常用类型，方便其他模块使用
pub use models::{CacheEntry, CacheOptions, CacheStats};
pub use ttl_cache::TtlCache;
