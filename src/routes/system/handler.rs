use axum::{
    Json,
    extract::{Extension, State},
};

use super::model::{HealthResponse, LimiterStatus, RateLimitStatusResponse};
use crate::{
    AppState,
    cache::CacheStats,
    middleware::ApiClient,
    utils::{ApiResponse, success_to_api_response},
};

pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    success_to_api_response(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

#[axum::debug_handler]
pub async fn cache_stats(State(state): State<AppState>) -> Json<ApiResponse<CacheStats>> {
    success_to_api_response(state.cache.stats())
}

/// 当前调用方在各限流器上的剩余额度，查询本身不计入限额
#[axum::debug_handler]
pub async fn rate_limit_status(
    State(state): State<AppState>,
    Extension(client): Extension<ApiClient>,
) -> Json<ApiResponse<RateLimitStatusResponse>> {
    let identifier = client.identifier();
    let limiters = state
        .limiters
        .iter()
        .map(|(name, limiter)| LimiterStatus {
            name: name.to_string(),
            window_ms: limiter.options().window_ms,
            limit: limiter.options().max_requests,
            remaining: limiter.remaining_requests(&identifier),
            reset_at: limiter.reset_time(&identifier),
        })
        .collect();

    success_to_api_response(RateLimitStatusResponse { limiters })
}
