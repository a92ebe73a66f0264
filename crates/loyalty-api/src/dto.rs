//! 接入层请求/响应对象
//!
//! 订单、余额、提现的 JSON 结构在账本服务的 `dto` 模块中定义。

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use loyalty_ledger::dto::{BalanceDto, OrderDto, WithdrawRequest, WithdrawalDto};

/// 注册/登录请求
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CredentialsRequest {
    #[validate(length(min = 1, max = 64, message = "登录名长度必须在 1-64 之间"))]
    pub login: String,
    #[validate(length(min = 1, max = 128, message = "密码长度必须在 1-128 之间"))]
    pub password: String,
}

/// 会话响应
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: i64,
}
