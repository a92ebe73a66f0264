//! 积分对账 Worker
//!
//! 按固定间隔驱动一轮对账：
//! 1. 读取所有未结算订单并逐个查询积分系统
//! 2. 把状态与积分批量写回账本
//!
//! 积分系统限流时本轮提前结束，下一轮至少等待 Retry-After（上限 60 秒）。
//! 收到关闭信号后在当前轮结束时退出。

use std::time::{Duration, Instant};

use loyalty_ledger::{Reconciler, TickReport};
use loyalty_shared::observability::metrics;
use tokio::sync::watch;
use tracing::{error, info};

const WORKER_NAME: &str = "reconcile_worker";

/// 积分对账 Worker
pub struct ReconcileWorker {
    reconciler: Reconciler,
    /// 轮询间隔
    poll_interval: Duration,
}

impl ReconcileWorker {
    pub fn new(reconciler: Reconciler, poll_interval: Duration) -> Self {
        Self {
            reconciler,
            poll_interval,
        }
    }

    /// 主循环：持续对账直到收到关闭信号
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(poll_interval = ?self.poll_interval, "ReconcileWorker 已启动");

        loop {
            let delay = match self.run_once().await {
                Some(report) => Reconciler::next_delay(&report, self.poll_interval),
                None => self.poll_interval,
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    // 发送端被丢弃也视为关闭
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("ReconcileWorker 已停止");
    }

    /// 执行一轮对账并记录指标
    ///
    /// 无法读取待对账订单时返回 None，下一轮按正常间隔重试
    pub async fn run_once(&self) -> Option<TickReport> {
        let start = Instant::now();

        let result = self.reconciler.tick().await;

        // 记录 Worker 健康状态
        metrics::set_worker_last_run(WORKER_NAME);

        match result {
            Ok(report) => {
                metrics::record_reconcile_tick(
                    report.polled,
                    report.applied,
                    start.elapsed().as_secs_f64(),
                );
                report.log();
                Some(report)
            }
            Err(e) => {
                error!(error = %e, "读取待对账订单失败");
                None
            }
        }
    }
}
