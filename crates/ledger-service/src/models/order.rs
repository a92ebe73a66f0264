//! 订单模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::OrderStatus;

/// 账本中的订单
///
/// number 全局唯一，owner 一经写入不再变化。
/// accrual 仅在 PROCESSED 时非零，withdrawn 为已从该订单积分中提现的部分。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub number: String,
    pub owner: String,
    pub status: OrderStatus,
    pub accrual: Decimal,
    pub withdrawn: Decimal,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// 该订单尚可提现的积分
    pub fn remaining(&self) -> Decimal {
        self.accrual - self.withdrawn
    }
}

/// 单个订单的状态更新（来自对账）
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub number: String,
    pub status: OrderStatus,
    pub accrual: Decimal,
}

impl StatusUpdate {
    /// 构造状态更新，非 PROCESSED 状态的积分一律归零
    pub fn new(number: impl Into<String>, status: OrderStatus, accrual: Decimal) -> Self {
        let accrual = if status == OrderStatus::Processed {
            accrual.max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };
        Self {
            number: number.into(),
            status,
            accrual,
        }
    }
}

/// 单条状态更新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// 已写入
    Applied,
    /// 状态未前进（终态或过期数据），未做修改
    Ignored { current: OrderStatus },
    /// 订单不存在
    NotFound,
}

/// 批量状态更新的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub ignored: usize,
    pub not_found: usize,
    /// 写入失败的订单号，下一轮对账会重新拉取
    pub failed: Vec<String>,
}

impl ApplyReport {
    pub fn record(&mut self, outcome: UpdateOutcome) {
        match outcome {
            UpdateOutcome::Applied => self.applied += 1,
            UpdateOutcome::Ignored { .. } => self.ignored += 1,
            UpdateOutcome::NotFound => self.not_found += 1,
        }
    }
}
