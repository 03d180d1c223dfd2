use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::utils::{error_codes, error_to_api_response};

/// 配置加载错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("failed to read rate table {path}: {source}")]
    RatesFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed rate table: {0}")]
    RatesFormat(#[from] serde_json::Error),
    #[error("exchange rate {from} -> {to} must be positive, got {rate}")]
    InvalidRate { from: String, to: String, rate: f64 },
}

/// 接口错误
#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    RateLimited { retry_after_secs: u64 },
    Validation(String),
    UnknownCommodity(String),
    UnknownPair { from: String, to: String },
    InternalServerError,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "未授权访问".to_string(),
            ),
            AppError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                error_codes::RATE_LIMIT,
                format!("请求过于频繁，请在{}秒后重试", retry_after_secs),
            ),
            AppError::Validation(reason) => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                reason.clone(),
            ),
            AppError::UnknownCommodity(name) => (
                StatusCode::NOT_FOUND,
                error_codes::NOT_FOUND,
                format!("商品 {} 不存在", name),
            ),
            AppError::UnknownPair { from, to } => (
                StatusCode::NOT_FOUND,
                error_codes::NOT_FOUND,
                format!("无法计算 {} 与 {} 之间的兑换", from, to),
            ),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "内部服务器错误".to_string(),
            ),
        };

        let body = error_to_api_response::<()>(code, msg);
        let mut response = (status, body).into_response();

        if let AppError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
