use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
#[cfg(debug_assertions)]
use tower_http::cors::CorsLayer;

use crate::{
    AppState,
    middleware::{log_errors, rate_limit, require_api_key},
};

pub mod barter;
pub mod commodity;
pub mod system;

/// 构建完整路由
pub fn build_router(state: AppState) -> Router {
    let limiters = state.limiters.clone();

    // 查询类接口
    let search_routes = Router::new()
        .route("/commodities", get(commodity::list_commodities))
        .route("/commodities/{commodity}/rates", get(commodity::commodity_rates))
        .layer(from_fn_with_state(limiters.search.clone(), rate_limit));

    // 普通数据接口
    let api_routes = Router::new()
        .route("/barter/exchange", post(barter::exchange))
        .route("/barter/fairness", post(barter::fairness))
        .route("/cache/stats", get(system::cache_stats))
        .layer(from_fn_with_state(limiters.api.clone(), rate_limit));

    // 上传类接口
    let upload_routes = Router::new()
        .route("/barter/rates", post(barter::upload_rates))
        .layer(from_fn_with_state(limiters.upload.clone(), rate_limit));

    // 需要 API Key 的路由，认证在限流之前执行
    let protected_routes = Router::new()
        .merge(search_routes)
        .merge(api_routes)
        .merge(upload_routes)
        .route("/rate-limit/status", get(system::rate_limit_status))
        .layer(from_fn_with_state(state.clone(), require_api_key));

    let public_routes = Router::new()
        .route("/health", get(system::health))
        .layer(from_fn_with_state(limiters.api.clone(), rate_limit));

    let routes = Router::new().merge(public_routes).merge(protected_routes);
    let base_uri = state.config.api_base_uri.trim_end_matches('/');
    let router = if base_uri.is_empty() {
        routes
    } else {
        Router::new().nest(base_uri, routes)
    };

    let router = router.layer(from_fn(log_errors));

    // 开发模式允许任意来源跨域
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    router.with_state(state)
}
