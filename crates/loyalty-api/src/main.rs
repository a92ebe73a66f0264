//! 积分账本服务入口
//!
//! 启动顺序：配置 -> 可观测性 -> 数据库与迁移 -> 对账 Worker -> HTTP 服务。

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use clap::Parser;
use loyalty_api::{
    auth::{JwtConfig, JwtManager},
    cli::Cli,
    handlers::health,
    repository::PgUserRepository,
    routes,
    service::IdentityService,
    state::AppState,
    worker::ReconcileWorker,
};
use loyalty_ledger::{AccountService, LedgerStore, PgLedgerStore, Reconciler, ReqwestAccrualClient};
use loyalty_shared::{
    config::{AppConfig, AuthConfig},
    database::Database,
    observability,
    retry::RetryPolicy,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

const SERVICE_NAME: &str = "loyalty-api";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 配置文件 -> LOYALTY_ 环境变量 -> 旧环境变量 -> 命令行参数
    let mut config = AppConfig::load(SERVICE_NAME)?;
    config.apply_overrides(&cli.overrides());

    let obs_config = config.observability.clone().with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    if config.auth.jwt_secret == AuthConfig::default().jwt_secret {
        if config.is_production() {
            anyhow::bail!("生产环境必须通过 LOYALTY_AUTH__JWT_SECRET 设置会话签名密钥");
        }
        warn!("Using default JWT secret - set LOYALTY_AUTH__JWT_SECRET for production");
    }

    // 初始化基础设施
    let db = Database::connect_with_retry(&config.database, &RetryPolicy::default()).await?;
    db.run_migrations().await?;

    let operation_timeout = Duration::from_secs(config.ledger.operation_timeout_secs);
    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(db.pool().clone()));

    let identity = IdentityService::new(
        Arc::new(PgUserRepository::new(db.pool().clone())),
        AccountService::new(store.clone()).with_timeout(operation_timeout),
        JwtManager::new(JwtConfig::from(config.auth.clone())),
    );
    let state = AppState::new(store.clone(), identity, operation_timeout);

    // 启动积分对账 Worker
    let accrual_client = ReqwestAccrualClient::new(
        config.accrual.base_url.clone(),
        Duration::from_secs(config.accrual.request_timeout_secs),
    )?;
    let reconciler =
        Reconciler::new(store, Arc::new(accrual_client)).with_store_timeout(operation_timeout);
    let worker = ReconcileWorker::new(
        reconciler,
        Duration::from_secs(config.accrual.poll_interval_secs),
    );
    info!(accrual = %config.accrual.base_url, "积分系统地址");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    let probes = Router::new().route("/health", get(health::health_check)).route(
        "/ready",
        get({
            let db_for_ready = db.clone();
            move || health::readiness_check(db_for_ready.clone())
        }),
    );
    let app = routes::build_app(state, probes);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 通知 Worker 在当前轮结束后退出
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker_handle.await {
        warn!(error = %e, "ReconcileWorker 异常退出");
    }

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
