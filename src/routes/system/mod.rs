mod handler;
mod model;

pub use handler::{cache_stats, health, rate_limit_status};
pub use model::{HealthResponse, LimiterStatus, RateLimitStatusResponse};
