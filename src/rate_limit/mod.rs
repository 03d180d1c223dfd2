// 限流模块
// 滑动窗口限流器以及按用途划分的限流器集合

mod limiter;
mod models;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::Config;

pub use limiter::RateLimiter;
pub use models::{RateLimiterOptions, RequestRecord};

/// 按用途划分的限流器
///
/// 由应用启动时统一构建，通过 `AppState` 注入，不使用全局单例。
#[derive(Clone)]
pub struct RateLimiters {
    /// 普通数据接口
    pub api: Arc<RateLimiter>,
    /// 查询类接口
    pub search: Arc<RateLimiter>,
    /// 上传类接口
    pub upload: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api: Arc::new(RateLimiter::new(config.api_rate_limit())),
            search: Arc::new(RateLimiter::new(config.search_rate_limit())),
            upload: Arc::new(RateLimiter::new(config.upload_rate_limit())),
        }
    }

    /// 为每个限流器启动定期清理任务
    pub fn spawn_cleanup_loops(&self, every: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.api.clone().spawn_cleanup_loop("api", every),
            self.search.clone().spawn_cleanup_loop("search", every),
            self.upload.clone().spawn_cleanup_loop("upload", every),
        ]
    }

    /// 遍历全部限流器及其名称
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Arc<RateLimiter>)> {
        [
            ("api", &self.api),
            ("search", &self.search),
            ("upload", &self.upload),
        ]
        .into_iter()
    }
}
