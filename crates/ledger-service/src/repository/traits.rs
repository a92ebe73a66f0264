//! 存储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，PostgreSQL 与内存实现可互换

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::Result;
use crate::models::{ApplyReport, Balance, Order, StatusUpdate, UpdateOutcome, Withdrawal};
use crate::service::bounded;

/// 账本存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// 开立账本账户，返回是否新建
    async fn open_account(&self, owner: &str) -> Result<bool>;

    /// 登记订单，状态为 NEW
    ///
    /// 订单号已存在时按归属返回 DuplicateSameOwner 或 DuplicateOtherOwner。
    async fn insert_order(&self, owner: &str, number: &str) -> Result<i64>;

    /// 按提交时间升序列出订单
    async fn list_orders(&self, owner: &str) -> Result<Vec<Order>>;

    /// 列出所有非终态订单的订单号，按提交时间升序
    async fn list_unsettled(&self) -> Result<Vec<String>>;

    /// 应用单条状态更新
    ///
    /// 状态不前进时不做修改并返回 Ignored。
    async fn apply_status_update(&self, update: &StatusUpdate) -> Result<UpdateOutcome>;

    /// 批量应用状态更新
    ///
    /// 每条更新独立提交并各自受 `per_update` 超时约束，
    /// 单条失败或超时只记入 failed，不影响其余更新。
    async fn apply_status_updates(
        &self,
        updates: &[StatusUpdate],
        per_update: Duration,
    ) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        for update in updates {
            let applied = bounded(
                per_update,
                "apply_status_update",
                self.apply_status_update(update),
            )
            .await;
            match applied {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    warn!(number = %update.number, error = %e, "状态更新写入失败");
                    report.failed.push(update.number.clone());
                }
            }
        }
        Ok(report)
    }

    /// 预留并扣减提现
    ///
    /// 余额检查与扣减在所有者临界区内原子完成，成功后追加提现记录。
    async fn reserve_withdrawal(
        &self,
        owner: &str,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal>;

    /// 实时汇总余额
    async fn get_balance(&self, owner: &str) -> Result<Balance>;

    /// 按处理时间升序列出提现记录
    async fn list_withdrawals(&self, owner: &str) -> Result<Vec<Withdrawal>>;
}

/// 按提交时间从早到晚把 amount 分摊到可提现的订单上
///
/// 输入为 (订单键, 剩余可提现积分)，返回 (订单键, 本次扣减额)。
/// 调用方须先确认剩余总额不小于 amount。
pub fn allocate_debit<K: Clone>(remaining: &[(K, Decimal)], amount: Decimal) -> Vec<(K, Decimal)> {
    let mut left = amount;
    let mut plan = Vec::new();
    for (key, available) in remaining {
        if left <= Decimal::ZERO {
            break;
        }
        if *available <= Decimal::ZERO {
            continue;
        }
        let take = (*available).min(left);
        plan.push((key.clone(), take));
        left -= take;
    }
    plan
}
