use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::{AppState, error::AppError, utils::hash_api_key};

pub const API_KEY_HEADER: &str = "x-api-key";

/// 通过 API Key 认证的调用方，认证后放入请求扩展
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub key_hash: String,
}

impl ApiClient {
    /// 限流使用的标识
    pub fn identifier(&self) -> String {
        format!("key:{}", self.key_hash)
    }
}

pub async fn require_api_key(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|header| header.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty());

    match api_key {
        Some(key) if state.config.is_valid_api_key(key) => {
            let client = ApiClient {
                key_hash: hash_api_key(key),
            };
            req.extensions_mut().insert(client);
            Ok(next.run(req).await)
        }
        Some(_) => {
            tracing::warn!("Rejected request to {} with invalid api key", req.uri().path());
            Err(AppError::Unauthorized)
        }
        None => Err(AppError::Unauthorized),
    }
}
