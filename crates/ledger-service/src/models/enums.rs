//! 账本枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 订单状态
///
/// 状态机：NEW -> PROCESSING -> PROCESSED | INVALID。
/// 状态只能前进，终态（PROCESSED、INVALID）不再变化。
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 已登记，等待积分系统受理
    #[default]
    New,
    /// 积分系统计算中
    Processing,
    /// 计算完成，积分已到账
    Processed,
    /// 积分系统拒绝，不发放积分
    Invalid,
}

impl OrderStatus {
    /// 状态序号，用于判断状态是否前进
    pub fn rank(&self) -> u8 {
        match self {
            Self::New => 0,
            Self::Processing => 1,
            Self::Processed | Self::Invalid => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }

    /// 是否允许从当前状态迁移到 next
    ///
    /// 终态不可变；非终态只接受序号更大的状态，同级或回退的更新视为过期数据。
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Processed => "PROCESSED",
            Self::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            other => Err(format!("未知的订单状态: {}", other)),
        }
    }
}

/// 外部积分系统返回的订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    /// 已注册，尚未开始计算
    Registered,
    Processing,
    Processed,
    Invalid,
}

impl AccrualStatus {
    /// 映射为本地订单状态
    pub fn to_order_status(self) -> OrderStatus {
        match self {
            Self::Registered => OrderStatus::New,
            Self::Processing => OrderStatus::Processing,
            Self::Processed => OrderStatus::Processed,
            Self::Invalid => OrderStatus::Invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_never_change() {
        for terminal in [OrderStatus::Processed, OrderStatus::Invalid] {
            for next in [
                OrderStatus::New,
                OrderStatus::Processing,
                OrderStatus::Processed,
                OrderStatus::Invalid,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::New.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::New.can_transition_to(OrderStatus::Processed));
        assert!(OrderStatus::New.can_transition_to(OrderStatus::Invalid));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Processed));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::New));
        assert!(!OrderStatus::New.can_transition_to(OrderStatus::New));
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processed).unwrap(),
            "\"PROCESSED\""
        );
        let status: AccrualStatus = serde_json::from_str("\"REGISTERED\"").unwrap();
        assert_eq!(status.to_order_status(), OrderStatus::New);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("INVALID".parse::<OrderStatus>().unwrap(), OrderStatus::Invalid);
        assert!("DONE".parse::<OrderStatus>().is_err());
    }
}
