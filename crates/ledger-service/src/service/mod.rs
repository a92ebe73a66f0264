//! 业务服务层
//!
//! 在存储之上组合校验、超时与指标：
//! - `SubmissionService`: 订单登记
//! - `WithdrawalService`: 积分提现
//! - `AccountService`: 账本账户开立
//! - `LedgerQueryService`: 订单、余额、提现历史查询
//!
//! 所有存储调用都受统一的超时约束，超时按瞬时故障返回。

mod account_service;
mod deadline;
pub mod dto;
mod query_service;
mod submission_service;
mod withdrawal_service;

pub use account_service::AccountService;
pub use deadline::DEFAULT_OPERATION_TIMEOUT;
pub(crate) use deadline::bounded;
pub use query_service::LedgerQueryService;
pub use submission_service::{SubmissionService, SubmitOutcome};
pub use withdrawal_service::WithdrawalService;
