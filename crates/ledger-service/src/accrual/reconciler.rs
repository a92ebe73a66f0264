//! 对账轮次
//!
//! 每一轮：拉取所有非终态订单 -> 逐个向积分系统查询 -> 汇总后一次性写回。
//! 外部请求期间不持有任何存储锁；单个订单失败只记录并跳过；
//! 遇到 429 时本轮剩余订单全部推迟到下一轮。

use std::sync::Arc;
use std::time::Duration;

use loyalty_shared::observability::metrics;
use tracing::{debug, error, info, instrument, warn};

use super::client::{AccrualClient, AccrualReply};
use crate::error::Result;
use crate::models::StatusUpdate;
use crate::repository::LedgerStore;
use crate::service::{DEFAULT_OPERATION_TIMEOUT, bounded};

/// Retry-After 的最长等待
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// 单轮对账的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// 已发出查询的订单数
    pub polled: usize,
    /// 状态已写回
    pub applied: usize,
    /// 状态未前进或订单已不存在
    pub ignored: usize,
    /// 积分系统尚未登记（204）
    pub not_registered: usize,
    /// 积分系统故障（5xx）
    pub server_errors: usize,
    /// 网络、解析或写回失败
    pub failures: usize,
    /// 因限流推迟到下一轮的订单数（含触发限流的订单）
    pub deferred: usize,
    pub rate_limited: bool,
    /// 积分系统要求的等待时间
    pub retry_after: Option<Duration>,
}

/// 对账器
pub struct Reconciler {
    store: Arc<dyn LedgerStore>,
    client: Arc<dyn AccrualClient>,
    store_timeout: Duration,
}

impl Reconciler {
    pub fn new(store: Arc<dyn LedgerStore>, client: Arc<dyn AccrualClient>) -> Self {
        Self {
            store,
            client,
            store_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// 执行一轮对账
    ///
    /// 仅在无法读取待对账订单时返回错误，其余失败都计入报告。
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<TickReport> {
        let numbers = bounded(
            self.store_timeout,
            "list_unsettled",
            self.store.list_unsettled(),
        )
        .await?;

        let mut report = TickReport::default();
        let mut updates: Vec<StatusUpdate> = Vec::new();

        for (idx, number) in numbers.iter().enumerate() {
            report.polled += 1;

            match self.client.fetch(number).await {
                Ok(AccrualReply::Settled(response)) => {
                    debug!(number = %number, status = ?response.status, "积分系统已返回结果");
                    updates.push(response.into_update());
                }
                Ok(AccrualReply::NotRegistered) => {
                    report.not_registered += 1;
                    metrics::record_reconcile_orders("not_registered", 1);
                }
                Ok(AccrualReply::RateLimited { retry_after }) => {
                    report.rate_limited = true;
                    report.retry_after = retry_after;
                    report.deferred = numbers.len() - idx;
                    metrics::record_rate_limited();
                    warn!(
                        number = %number,
                        deferred = report.deferred,
                        retry_after_secs = retry_after.map(|d| d.as_secs()),
                        "积分系统限流，本轮剩余订单推迟到下一轮"
                    );
                    break;
                }
                Ok(AccrualReply::ServerError { status }) => {
                    report.server_errors += 1;
                    metrics::record_reconcile_orders("server_error", 1);
                    warn!(number = %number, status, "积分系统返回服务端错误");
                }
                Err(e) => {
                    report.failures += 1;
                    metrics::record_reconcile_orders("failure", 1);
                    warn!(number = %number, error = %e, "查询积分系统失败，跳过该订单");
                }
            }
        }

        metrics::record_reconcile_orders("deferred", report.deferred);

        if !updates.is_empty() {
            self.write_back(&updates, &mut report).await;
        }

        Ok(report)
    }

    /// 批量写回，超时按单条订单计算，慢订单不拖累其余订单
    async fn write_back(&self, updates: &[StatusUpdate], report: &mut TickReport) {
        match self
            .store
            .apply_status_updates(updates, self.store_timeout)
            .await
        {
            Ok(applied) => {
                report.applied += applied.applied;
                report.ignored += applied.ignored + applied.not_found;
                report.failures += applied.failed.len();

                metrics::record_reconcile_orders("applied", applied.applied);
                metrics::record_reconcile_orders("ignored", applied.ignored + applied.not_found);
                metrics::record_reconcile_orders("failure", applied.failed.len());

                if !applied.failed.is_empty() {
                    warn!(failed = ?applied.failed, "部分对账结果写回失败，下一轮重试");
                }
            }
            Err(e) => {
                report.failures += updates.len();
                metrics::record_reconcile_orders("failure", updates.len());
                error!(error = %e, count = updates.len(), "对账结果批量写回失败");
            }
        }
    }

    /// 下一轮开始前的等待时间
    ///
    /// 被限流且积分系统给出 Retry-After 时，至少等待该时长（上限 60 秒）。
    pub fn next_delay(report: &TickReport, interval: Duration) -> Duration {
        match (report.rate_limited, report.retry_after) {
            (true, Some(retry_after)) => interval.max(retry_after.min(MAX_RETRY_AFTER)),
            _ => interval,
        }
    }
}

impl TickReport {
    /// 记录本轮统计日志
    pub fn log(&self) {
        if self.polled == 0 {
            debug!("没有待对账的订单");
            return;
        }
        info!(
            polled = self.polled,
            applied = self.applied,
            ignored = self.ignored,
            not_registered = self.not_registered,
            server_errors = self.server_errors,
            failures = self.failures,
            deferred = self.deferred,
            rate_limited = self.rate_limited,
            "对账轮次完成"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accrual::client::{AccrualError, AccrualResponse, MockAccrualClient};
    use crate::models::{AccrualStatus, OrderStatus};
    use crate::repository::{MemoryLedgerStore, MockLedgerStore};
    use rust_decimal_macros::dec;

    async fn seeded_store(numbers: &[&str]) -> Arc<MemoryLedgerStore> {
        let store = Arc::new(MemoryLedgerStore::new());
        store.open_account("u1").await.unwrap();
        for number in numbers {
            store.insert_order("u1", number).await.unwrap();
        }
        store
    }

    fn settled(
        number: &str,
        status: AccrualStatus,
        accrual: Option<rust_decimal::Decimal>,
    ) -> AccrualReply {
        AccrualReply::Settled(AccrualResponse {
            order: number.to_string(),
            status,
            accrual,
        })
    }

    #[tokio::test]
    async fn test_tick_applies_settled_and_isolates_failures() {
        let store = seeded_store(&["18", "26", "34", "42"]).await;

        let mut client = MockAccrualClient::new();
        client.expect_fetch().times(4).returning(|number| match number {
            "18" => Ok(settled("18", AccrualStatus::Processed, Some(dec!(500)))),
            "26" => Err(AccrualError::Transport("connection reset".to_string())),
            "34" => Ok(AccrualReply::ServerError { status: 500 }),
            _ => Ok(AccrualReply::NotRegistered),
        });

        let reconciler = Reconciler::new(store.clone(), Arc::new(client));
        let report = reconciler.tick().await.unwrap();

        assert_eq!(report.polled, 4);
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(report.server_errors, 1);
        assert_eq!(report.not_registered, 1);
        assert!(!report.rate_limited);

        assert_eq!(
            store.list_unsettled().await.unwrap(),
            vec!["26".to_string(), "34".to_string(), "42".to_string()]
        );
        assert_eq!(store.get_balance("u1").await.unwrap().current, dec!(500));
    }

    #[tokio::test]
    async fn test_rate_limit_defers_rest_of_tick() {
        let store = seeded_store(&["18", "26", "34"]).await;

        let mut client = MockAccrualClient::new();
        client.expect_fetch().times(2).returning(|number| match number {
            "18" => Ok(settled("18", AccrualStatus::Processing, None)),
            _ => Ok(AccrualReply::RateLimited {
                retry_after: Some(Duration::from_secs(120)),
            }),
        });

        let reconciler = Reconciler::new(store.clone(), Arc::new(client));
        let report = reconciler.tick().await.unwrap();

        assert!(report.rate_limited);
        assert_eq!(report.polled, 2);
        assert_eq!(report.deferred, 2);
        assert_eq!(report.applied, 1);

        // PROCESSING 仍是非终态，三个订单都留待下一轮
        assert_eq!(store.list_unsettled().await.unwrap().len(), 3);
        assert_eq!(
            Reconciler::next_delay(&report, Duration::from_secs(10)),
            MAX_RETRY_AFTER
        );
    }

    #[tokio::test]
    async fn test_terminal_orders_are_not_polled() {
        let store = seeded_store(&["18"]).await;
        store
            .apply_status_update(&StatusUpdate::new("18", OrderStatus::Invalid, dec!(0)))
            .await
            .unwrap();

        // 未设置期望：任何查询都会 panic
        let reconciler = Reconciler::new(store, Arc::new(MockAccrualClient::new()));
        let report = reconciler.tick().await.unwrap();
        assert_eq!(report, TickReport::default());
    }

    #[tokio::test]
    async fn test_batch_write_failure_is_reported_not_raised() {
        let mut store = MockLedgerStore::new();
        store
            .expect_list_unsettled()
            .returning(|| Ok(vec!["18".to_string()]));
        store.expect_apply_status_updates().returning(|_, _| {
            Err(crate::error::LedgerError::Transient("deadlock".to_string()))
        });

        let mut client = MockAccrualClient::new();
        client
            .expect_fetch()
            .returning(|_| Ok(settled("18", AccrualStatus::Processed, Some(dec!(10)))));

        let reconciler = Reconciler::new(Arc::new(store), Arc::new(client));
        let report = reconciler.tick().await.unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(report.applied, 0);
    }

    /// 指定订单的状态写回会卡住，其余操作直接转发给内存存储
    struct StallingStore {
        inner: MemoryLedgerStore,
        stalled: &'static str,
    }

    #[async_trait::async_trait]
    impl LedgerStore for StallingStore {
        async fn open_account(&self, owner: &str) -> Result<bool> {
            self.inner.open_account(owner).await
        }

        async fn insert_order(&self, owner: &str, number: &str) -> Result<i64> {
            self.inner.insert_order(owner, number).await
        }

        async fn list_orders(&self, owner: &str) -> Result<Vec<crate::models::Order>> {
            self.inner.list_orders(owner).await
        }

        async fn list_unsettled(&self) -> Result<Vec<String>> {
            self.inner.list_unsettled().await
        }

        async fn apply_status_update(
            &self,
            update: &StatusUpdate,
        ) -> Result<crate::models::UpdateOutcome> {
            if update.number == self.stalled {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            self.inner.apply_status_update(update).await
        }

        async fn reserve_withdrawal(
            &self,
            owner: &str,
            order_number: &str,
            amount: rust_decimal::Decimal,
        ) -> Result<crate::models::Withdrawal> {
            self.inner
                .reserve_withdrawal(owner, order_number, amount)
                .await
        }

        async fn get_balance(&self, owner: &str) -> Result<crate::models::Balance> {
            self.inner.get_balance(owner).await
        }

        async fn list_withdrawals(&self, owner: &str) -> Result<Vec<crate::models::Withdrawal>> {
            self.inner.list_withdrawals(owner).await
        }
    }

    #[tokio::test]
    async fn test_slow_update_does_not_drop_other_owners_updates() {
        let store = Arc::new(StallingStore {
            inner: MemoryLedgerStore::new(),
            stalled: "18",
        });
        store.open_account("slow").await.unwrap();
        store.open_account("fast").await.unwrap();
        store.insert_order("slow", "18").await.unwrap();
        store.insert_order("fast", "26").await.unwrap();

        let mut client = MockAccrualClient::new();
        client
            .expect_fetch()
            .times(2)
            .returning(|number| Ok(settled(number, AccrualStatus::Processed, Some(dec!(100)))));

        let reconciler = Reconciler::new(store.clone(), Arc::new(client))
            .with_store_timeout(Duration::from_millis(100));
        let report = reconciler.tick().await.unwrap();

        assert_eq!(report.polled, 2);
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures, 1);

        assert_eq!(store.get_balance("fast").await.unwrap().current, dec!(100));
        assert_eq!(store.get_balance("slow").await.unwrap().current, dec!(0));
        assert_eq!(store.list_unsettled().await.unwrap(), vec!["18".to_string()]);
    }

    #[test]
    fn test_next_delay() {
        let interval = Duration::from_secs(10);
        assert_eq!(
            Reconciler::next_delay(&TickReport::default(), interval),
            interval
        );

        let short = TickReport {
            rate_limited: true,
            retry_after: Some(Duration::from_secs(3)),
            ..Default::default()
        };
        assert_eq!(Reconciler::next_delay(&short, interval), interval);

        let long = TickReport {
            rate_limited: true,
            retry_after: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        assert_eq!(
            Reconciler::next_delay(&long, interval),
            Duration::from_secs(30)
        );
    }
}
