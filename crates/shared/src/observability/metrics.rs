//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
///
/// drop 时终止指标 HTTP 服务。
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

/// 注册通用指标描述
///
/// 描述会出现在 /metrics 端点的 HELP 注释中。
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "order_submissions_total",
        "Order submissions grouped by outcome"
    );

    metrics::describe_counter!("withdrawals_total", "Withdrawal attempts grouped by outcome");
    metrics::describe_histogram!(
        "withdrawal_duration_seconds",
        "Withdrawal authorization duration in seconds"
    );

    metrics::describe_counter!("reconcile_ticks_total", "Total number of reconciliation ticks");
    metrics::describe_histogram!(
        "reconcile_tick_duration_seconds",
        "Reconciliation tick duration in seconds"
    );
    metrics::describe_counter!(
        "reconcile_orders_total",
        "Per-order reconciliation outcomes"
    );
    metrics::describe_counter!(
        "accrual_rate_limited_total",
        "Number of times the accrual authority answered 429"
    );

    metrics::describe_gauge!(
        "worker_last_run_timestamp_seconds",
        "Unix timestamp of the last completed worker iteration"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录订单提交结果
///
/// outcome 取值：accepted / already_submitted / conflict / invalid / error
#[inline]
pub fn record_order_submission(outcome: &str) {
    metrics::counter!(
        "order_submissions_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录提现结果
#[inline]
pub fn record_withdrawal(outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "withdrawals_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::histogram!("withdrawal_duration_seconds").record(duration_secs);
}

/// 记录一次对账轮次
#[inline]
pub fn record_reconcile_tick(polled: usize, applied: usize, duration_secs: f64) {
    metrics::counter!("reconcile_ticks_total").increment(1);
    metrics::counter!("reconcile_orders_polled_total").increment(polled as u64);
    metrics::counter!("reconcile_orders_applied_total").increment(applied as u64);
    metrics::histogram!("reconcile_tick_duration_seconds").record(duration_secs);
}

/// 按结果累计订单级对账次数
///
/// outcome 取值：applied / ignored / not_registered / server_error / failure / deferred
#[inline]
pub fn record_reconcile_orders(outcome: &str, count: usize) {
    if count == 0 {
        return;
    }
    metrics::counter!(
        "reconcile_orders_total",
        "outcome" => outcome.to_string()
    )
    .increment(count as u64);
}

/// 记录外部积分系统限流
#[inline]
pub fn record_rate_limited() {
    metrics::counter!("accrual_rate_limited_total").increment(1);
}

/// 更新后台 worker 最近一次完成轮询的时间
#[inline]
pub fn set_worker_last_run(worker: &str) {
    metrics::gauge!(
        "worker_last_run_timestamp_seconds",
        "worker" => worker.to_string()
    )
    .set(chrono::Utc::now().timestamp() as f64);
}
