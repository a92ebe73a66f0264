//! 账本查询服务
//!
//! 余额每次读取时实时汇总，不做缓存。

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use super::deadline::{DEFAULT_OPERATION_TIMEOUT, bounded};
use super::dto::{BalanceDto, OrderDto, WithdrawalDto};
use crate::error::Result;
use crate::repository::LedgerStore;

/// 账本查询服务
pub struct LedgerQueryService {
    store: Arc<dyn LedgerStore>,
    timeout: Duration,
}

impl LedgerQueryService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 订单列表，按提交时间升序
    #[instrument(skip(self))]
    pub async fn list_orders(&self, owner: &str) -> Result<Vec<OrderDto>> {
        let orders = bounded(self.timeout, "list_orders", self.store.list_orders(owner)).await?;
        Ok(orders.into_iter().map(OrderDto::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_balance(&self, owner: &str) -> Result<BalanceDto> {
        let balance = bounded(self.timeout, "get_balance", self.store.get_balance(owner)).await?;
        Ok(balance.into())
    }

    /// 提现历史，按处理时间升序
    #[instrument(skip(self))]
    pub async fn list_withdrawals(&self, owner: &str) -> Result<Vec<WithdrawalDto>> {
        let withdrawals = bounded(
            self.timeout,
            "list_withdrawals",
            self.store.list_withdrawals(owner),
        )
        .await?;
        Ok(withdrawals.into_iter().map(WithdrawalDto::from).collect())
    }
}
