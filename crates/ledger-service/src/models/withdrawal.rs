//! 提现记录与余额

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 一次已完成的提现，写入后不可修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Withdrawal {
    pub id: i64,
    pub owner: String,
    /// 提现挂靠的订单号
    pub order_number: String,
    pub amount: Decimal,
    pub processed_at: DateTime<Utc>,
}

/// 派生余额，每次读取时实时汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// 可用积分：Σaccrual − Σwithdrawn
    pub current: Decimal,
    /// 累计已提现
    pub withdrawn: Decimal,
}

impl Balance {
    pub fn new(total_accrual: Decimal, withdrawn: Decimal) -> Self {
        Self {
            current: total_accrual - withdrawn,
            withdrawn,
        }
    }
}
