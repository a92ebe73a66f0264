//! 积分账本服务
//!
//! 负责订单积分的登记、对账与提现。
//!
//! ## 核心功能
//!
//! - **订单登记**：校验订单号（Luhn 校验位）后幂等写入账本，识别归属冲突
//! - **积分对账**：定时轮询外部积分计算系统，把订单状态与积分同步到本地
//! - **积分提现**：余额校验与扣减在同一个按所有者加锁的临界区内完成，杜绝透支
//! - **账本查询**：订单列表、余额、提现历史，余额始终实时汇总
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `luhn`: 订单号校验
//! - `repository`: 账本存储（PostgreSQL 与内存实现）
//! - `service`: 业务服务层
//! - `accrual`: 外部积分系统客户端与对账循环

pub mod accrual;
pub mod error;
pub mod luhn;
pub mod models;
pub mod repository;
pub mod service;

pub use accrual::{AccrualClient, AccrualReply, Reconciler, ReqwestAccrualClient, TickReport};
pub use error::{LedgerError, Result};
pub use models::*;
pub use repository::{LedgerStore, MemoryLedgerStore, PgLedgerStore};
pub use service::{
    AccountService, LedgerQueryService, SubmissionService, SubmitOutcome, WithdrawalService, dto,
};
