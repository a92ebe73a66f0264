//! 外部积分系统对接
//!
//! - `client`: 积分系统 HTTP 客户端
//! - `reconciler`: 对账轮次，把积分系统的结果同步到本地账本

mod client;
mod reconciler;

pub use client::*;
pub use reconciler::{MAX_RETRY_AFTER, Reconciler, TickReport};
