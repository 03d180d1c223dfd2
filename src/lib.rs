use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use barter::BarterCalculator;
use cache::{TtlCache, keys::commodity_prefix};
use config::Config;
use rate_limit::RateLimiters;

pub mod barter;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub limiters: RateLimiters,
    pub cache: Arc<TtlCache<Value>>,
    barter: Arc<RwLock<Arc<BarterCalculator>>>,
}

impl AppState {
    pub fn new(config: Config, calculator: BarterCalculator) -> Self {
        Self {
            limiters: RateLimiters::from_config(&config),
            cache: Arc::new(TtlCache::new(config.cache_options())),
            barter: Arc::new(RwLock::new(Arc::new(calculator))),
            config: Arc::new(config),
        }
    }

    /// 当前使用的兑换计算器
    pub fn calculator(&self) -> Arc<BarterCalculator> {
        self.barter.read().clone()
    }

    /// 读取商品缓存，未命中时用当前兑换率表计算并写入
    ///
    /// 计算与写入都持有读锁，换表后不会留下按旧表写入的缓存。
    pub fn cached_with_calculator<E>(
        &self,
        key: &str,
        compute: impl FnOnce(&BarterCalculator) -> Result<Value, E>,
    ) -> Result<Value, E> {
        if let Some(cached) = self.cache.get_with_stats(key) {
            return Ok(cached);
        }

        let calculator = self.barter.read();
        let value = compute(calculator.as_ref())?;
        self.cache.set(key, value.clone(), None);
        Ok(value)
    }

    /// 替换兑换率表并清除商品缓存
    ///
    /// 返回新表中的商品数量和被清除的缓存条目数。
    pub fn replace_calculator(&self, calculator: BarterCalculator) -> (usize, usize) {
        let count = calculator.commodities().len();
        let mut current = self.barter.write();
        *current = Arc::new(calculator);
        let invalidated = self.cache.delete_prefix(commodity_prefix());
        (count, invalidated)
    }
}
