//! 积分提现服务
//!
//! ## 提现流程
//!
//! 1. 金额与订单号校验 -> 2. 余额预检 -> 3. 确保挂靠订单存在
//!    -> 4. 存储内原子预留（余额复核 + 扣减 + 写提现记录）
//!
//! 第 2 步只用于尽早拒绝，真正的余额判定在第 4 步的临界区内完成。
//! 第 3 步沿用了旧有行为：提现挂靠的订单号不存在时，以当前用户名义登记一个
//! 零积分订单，用于在订单与提现历史中关联这笔支出。

use std::sync::Arc;
use std::time::{Duration, Instant};

use loyalty_shared::observability::metrics;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use super::deadline::{DEFAULT_OPERATION_TIMEOUT, bounded};
use crate::error::{LedgerError, Result};
use crate::luhn;
use crate::models::Withdrawal;
use crate::repository::LedgerStore;

/// 金额最多保留的小数位
const AMOUNT_SCALE: u32 = 2;

/// 积分提现服务
pub struct WithdrawalService {
    store: Arc<dyn LedgerStore>,
    timeout: Duration,
}

impl WithdrawalService {
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

    /// 从积分余额中提现
    ///
    /// 余额不足返回 InsufficientFunds，属于正常业务结果。
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn withdraw(
        &self,
        owner: &str,
        raw_order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal> {
        let start = Instant::now();
        let result = self.execute(owner, raw_order_number, amount).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(LedgerError::InsufficientFunds { .. }) => "insufficient_funds",
            Err(e) if e.is_business_error() => "rejected",
            Err(_) => "error",
        };
        metrics::record_withdrawal(outcome, start.elapsed().as_secs_f64());

        result
    }

    async fn execute(
        &self,
        owner: &str,
        raw_order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal> {
        // 1. 输入校验
        validate_amount(amount)?;
        let number = luhn::validate_order_number(raw_order_number)?;

        // 2. 余额预检
        let balance = bounded(self.timeout, "get_balance", self.store.get_balance(owner)).await?;
        if balance.current < amount {
            debug!(available = %balance.current, "余额预检未通过");
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: balance.current,
            });
        }

        // 3. 确保挂靠订单存在
        match bounded(
            self.timeout,
            "insert_order",
            self.store.insert_order(owner, &number),
        )
        .await
        {
            Ok(order_id) => debug!(order_id, "已登记提现挂靠订单"),
            Err(LedgerError::DuplicateSameOwner { .. }) => {}
            Err(e) => {
                if matches!(e, LedgerError::DuplicateOtherOwner { .. }) {
                    warn!(number = %number, "提现挂靠的订单属于其他用户");
                }
                return Err(e);
            }
        }

        // 4. 原子预留
        let withdrawal = bounded(
            self.timeout,
            "reserve_withdrawal",
            self.store.reserve_withdrawal(owner, &number, amount),
        )
        .await?;

        info!(
            owner = %owner,
            number = %number,
            withdrawal_id = withdrawal.id,
            "积分提现成功"
        );
        Ok(withdrawal)
    }
}

/// 金额必须为正，且不超过两位小数
fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!("金额必须为正数: {}", amount)));
    }
    if amount.round_dp(AMOUNT_SCALE) != amount {
        return Err(LedgerError::InvalidAmount(format!(
            "金额最多保留 {} 位小数: {}",
            AMOUNT_SCALE, amount
        )));
    }
    Ok(())
}
