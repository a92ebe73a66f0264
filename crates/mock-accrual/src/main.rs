//! 模拟积分计算系统入口

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use loyalty_shared::observability::{self, ObservabilityConfig};
use mock_accrual::cli::Cli;
use mock_accrual::{FixedWindowLimiter, MockState, Registry, accrual_routes};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let obs_config = ObservabilityConfig {
        log_level: cli.log_level.clone(),
        metrics_enabled: false,
        ..Default::default()
    }
    .with_service_name("mock-accrual");
    let _guard = observability::init(&obs_config).await?;

    let mut state = MockState::new(Arc::new(Registry::new()));
    if cli.rate_limit > 0 {
        info!(
            max_requests = cli.rate_limit,
            window_secs = cli.window_secs,
            "已启用限流"
        );
        state = state.with_limiter(FixedWindowLimiter::new(
            cli.rate_limit,
            Duration::from_secs(cli.window_secs),
        ));
    }

    let app = accrual_routes().with_state(state);

    let listener = TcpListener::bind(&cli.address).await?;
    info!("mock-accrual listening on {}", cli.address);

    axum::serve(listener, app).await?;

    Ok(())
}
