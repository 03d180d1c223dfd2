use std::net::{IpAddr, SocketAddr};

use agrimarket::{
    AppState,
    barter::{BarterCalculator, EquivalencyTable},
    config::Config,
    routes,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 加载兑换率表，未配置时使用内置表
    let table = match &config.barter_rates_path {
        Some(path) => {
            tracing::info!("Loading barter rate table from {}", path.display());
            EquivalencyTable::from_json_file(path).expect("Failed to load barter rate table")
        }
        None => EquivalencyTable::marketplace_defaults(),
    };
    tracing::info!("Barter rate table has {} commodities", table.commodities().len());

    let state = AppState::new(config, BarterCalculator::new(table));

    // 定期清理限流记录和过期缓存
    let cleanup_interval = state.config.cleanup_interval();
    state.limiters.spawn_cleanup_loops(cleanup_interval);
    state.cache.clone().spawn_sweeper(cleanup_interval);

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    let app = routes::build_router(state);

    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
