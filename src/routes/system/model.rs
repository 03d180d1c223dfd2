use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
}

/// 单个限流器对当前调用方的状态
#[derive(Debug, Serialize, Deserialize)]
pub struct LimiterStatus {
    pub name: String,
    pub window_ms: u64,
    pub limit: u32,
    pub remaining: u32,
    /// 最早一条记录移出窗口的时间（Unix 毫秒），0 表示没有请求记录
    pub reset_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitStatusResponse {
    pub limiters: Vec<LimiterStatus>,
}
