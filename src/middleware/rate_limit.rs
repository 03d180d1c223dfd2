use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use super::auth::ApiClient;
use crate::{error::AppError, rate_limit::RateLimiter, utils::client_ip};

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// 限流标识：已认证的调用方按 API Key，否则按客户端 IP
fn request_identifier(req: &Request<Body>) -> String {
    match req.extensions().get::<ApiClient>() {
        Some(client) => client.identifier(),
        None => format!("ip:{}", client_ip(req)),
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let identifier = request_identifier(&req);

    let Some(remaining) = limiter.check_with_remaining(&identifier) else {
        let retry_after_secs = limiter.retry_after_ms(&identifier).div_ceil(1000).max(1);
        tracing::warn!(
            "Rate limit exceeded for {} on {}, retry after {}s",
            identifier,
            req.uri().path(),
            retry_after_secs
        );
        return Err(AppError::RateLimited { retry_after_secs });
    };

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(REMAINING_HEADER, HeaderValue::from(remaining));
    Ok(response)
}
