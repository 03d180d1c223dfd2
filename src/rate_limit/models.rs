use serde::{Deserialize, Serialize};

/// 限流策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterOptions {
    /// 滑动窗口长度，单位毫秒
    pub window_ms: u64,
    /// 窗口内允许的最大请求数
    pub max_requests: u32,
    /// 成功的请求不计入限额
    #[serde(default)]
    pub skip_successful_requests: bool,
    /// 失败的请求不计入限额
    #[serde(default)]
    pub skip_failed_requests: bool,
}

impl RateLimiterOptions {
    pub fn new(window_ms: u64, max_requests: u32) -> Self {
        Self {
            window_ms,
            max_requests,
            skip_successful_requests: false,
            skip_failed_requests: false,
        }
    }

    pub fn skip_successful_requests(mut self, skip: bool) -> Self {
        self.skip_successful_requests = skip;
        self
    }

    pub fn skip_failed_requests(mut self, skip: bool) -> Self {
        self.skip_failed_requests = skip;
        self
    }

    /// 该条记录是否计入限额
    pub(crate) fn counts(&self, record: &RequestRecord) -> bool {
        if record.success {
            !self.skip_successful_requests
        } else {
            !self.skip_failed_requests
        }
    }
}

/// 单次请求记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Unix 毫秒时间戳
    pub timestamp: i64,
    pub success: bool,
}
