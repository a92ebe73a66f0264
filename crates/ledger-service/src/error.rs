//! 积分账本错误类型
//!
//! 业务结果（重复提交、余额不足等）与系统故障分开建模，
//! 持久层的原始错误在转换时即被归类，不会直接暴露给调用方。

use rust_decimal::Decimal;
use thiserror::Error;

/// 积分账本错误类型
#[derive(Debug, Error)]
pub enum LedgerError {
    // === 输入校验 ===
    #[error("订单号格式错误: {0}")]
    InvalidFormat(String),

    #[error("提现金额无效: {0}")]
    InvalidAmount(String),

    // === 业务结果 ===
    #[error("订单已由当前用户提交: {number}")]
    DuplicateSameOwner { number: String },

    #[error("订单已被其他用户提交: {number}")]
    DuplicateOtherOwner { number: String },

    #[error("积分余额不足: 需要 {requested}, 可用 {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("账本账户不存在: {0}")]
    OwnerNotFound(String),

    // === 系统错误 ===
    #[error("瞬时故障，可重试: {0}")]
    Transient(String),

    #[error("不可恢复的存储错误: {0}")]
    Fatal(String),
}

/// 积分账本 Result 类型别名
pub type Result<T> = std::result::Result<T, LedgerError>;

/// PostgreSQL 串行化失败
const PG_SERIALIZATION_FAILURE: &str = "40001";
/// PostgreSQL 死锁
const PG_DEADLOCK_DETECTED: &str = "40P01";

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Transient(err.to_string())
            }
            sqlx::Error::Database(db_err)
                if matches!(
                    db_err.code().as_deref(),
                    Some(PG_SERIALIZATION_FAILURE) | Some(PG_DEADLOCK_DETECTED)
                ) =>
            {
                Self::Transient(err.to_string())
            }
            _ => Self::Fatal(err.to_string()),
        }
    }
}

impl LedgerError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(self, Self::Transient(_) | Self::Fatal(_))
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "INVALID_ORDER_NUMBER",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::DuplicateSameOwner { .. } => "ORDER_ALREADY_SUBMITTED",
            Self::DuplicateOtherOwner { .. } => "ORDER_OWNED_BY_OTHER",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::OwnerNotFound(_) => "OWNER_NOT_FOUND",
            Self::Transient(_) => "TRANSIENT_ERROR",
            Self::Fatal(_) => "STORAGE_ERROR",
        }
    }
}
