//! 服务层数据传输对象
//!
//! 对外 JSON 结构，与内部领域模型解耦。金额按 JSON 数字输出。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Balance, Order, OrderStatus, Withdrawal};

/// 订单 DTO
///
/// accrual 只在 PROCESSED 时输出
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderDto {
    pub number: String,
    pub status: OrderStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub accrual: Option<Decimal>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderDto {
    fn from(order: Order) -> Self {
        let accrual = (order.status == OrderStatus::Processed).then_some(order.accrual);
        Self {
            number: order.number,
            status: order.status,
            accrual,
            uploaded_at: order.submitted_at,
        }
    }
}

/// 余额 DTO
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BalanceDto {
    #[serde(with = "rust_decimal::serde::float")]
    pub current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub withdrawn: Decimal,
}

impl From<Balance> for BalanceDto {
    fn from(balance: Balance) -> Self {
        Self {
            current: balance.current,
            withdrawn: balance.withdrawn,
        }
    }
}

/// 提现记录 DTO
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WithdrawalDto {
    pub order: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalDto {
    fn from(withdrawal: Withdrawal) -> Self {
        Self {
            order: withdrawal.order_number,
            sum: withdrawal.amount,
            processed_at: withdrawal.processed_at,
        }
    }
}

/// 提现请求
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WithdrawRequest {
    pub order: String,
    pub sum: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn order(status: OrderStatus, accrual: Decimal) -> Order {
        let now = Utc::now();
        Order {
            id: 1,
            number: "79927398713".to_string(),
            owner: "u1".to_string(),
            status,
            accrual,
            withdrawn: Decimal::ZERO,
            submitted_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_accrual_only_for_processed() {
        let dto = OrderDto::from(order(OrderStatus::Processed, dec!(500)));
        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value["accrual"], json!(500.0));
        assert_eq!(value["status"], json!("PROCESSED"));

        let dto = OrderDto::from(order(OrderStatus::Processing, Decimal::ZERO));
        let value = serde_json::to_value(&dto).unwrap();
        assert!(value.get("accrual").is_none());
    }

    #[test]
    fn test_balance_serializes_numbers() {
        let dto = BalanceDto::from(Balance::new(dec!(500.5), dec!(42)));
        let value = serde_json::to_value(dto).unwrap();
        assert_eq!(value, json!({"current": 458.5, "withdrawn": 42.0}));
    }

    #[test]
    fn test_withdraw_request_accepts_number_sum() {
        let request: WithdrawRequest =
            serde_json::from_str(r#"{"order":"2377225624","sum":751}"#).unwrap();
        assert_eq!(request.sum, dec!(751));
        assert_eq!(request.order, "2377225624");
    }
}
