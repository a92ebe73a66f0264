//! 内存订单登记表

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 积分系统侧的订单状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    #[default]
    Registered,
    Processing,
    Processed,
    Invalid,
}

/// 订单积分记录，同时也是 GET 的响应体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualRecord {
    pub order: String,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub accrual: Option<Decimal>,
}

impl AccrualRecord {
    /// 只有 PROCESSED 的记录携带积分
    pub fn normalized(mut self) -> Self {
        if self.status != RecordStatus::Processed {
            self.accrual = None;
        }
        self
    }
}

/// 订单登记表
#[derive(Debug, Default)]
pub struct Registry {
    records: DashMap<String, AccrualRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记或覆盖记录，返回是否为新登记
    pub fn upsert(&self, record: AccrualRecord) -> bool {
        let record = record.normalized();
        self.records.insert(record.order.clone(), record).is_none()
    }

    /// 查询记录，返回克隆，不持有锁
    pub fn get(&self, order: &str) -> Option<AccrualRecord> {
        self.records.get(order).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
