//! 模拟积分计算系统
//!
//! 本地开发与端到端测试时替代外部积分系统：
//!
//! - `GET /api/orders/{number}`：查询订单积分，未登记返回 204
//! - `POST /api/orders`：登记或更新订单结果
//! - 可选固定窗口限流，超限返回 429 并带 Retry-After
//!
//! ## 模块结构
//!
//! - `cli`: 命令行参数
//! - `rate_limit`: 固定窗口限流器
//! - `registry`: 内存订单登记表
//! - `routes`: HTTP 路由与处理器

pub mod cli;
pub mod rate_limit;
pub mod registry;
pub mod routes;

pub use rate_limit::FixedWindowLimiter;
pub use registry::{AccrualRecord, RecordStatus, Registry};
pub use routes::{MockState, accrual_routes};
