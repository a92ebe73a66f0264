//! 领域模型
//!
//! 订单、提现记录与派生余额。金额统一使用 `Decimal`。

mod enums;
mod order;
mod withdrawal;

pub use enums::*;
pub use order::*;
pub use withdrawal::*;
