//! 积分服务 HTTP 接入层
//!
//! 对外提供用户注册登录、订单提交、余额查询与提现的 REST API，
//! 并负责启动后台对账 Worker。
//!
//! ## 模块结构
//!
//! - `auth`: JWT 会话令牌与密码哈希
//! - `cli`: 命令行参数
//! - `dto`: 接入层请求/响应对象
//! - `error`: 错误类型与 HTTP 映射
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 认证中间件
//! - `repository`: 用户凭据存储
//! - `routes`: 路由配置
//! - `service`: 身份服务
//! - `state`: 应用状态
//! - `worker`: 后台对账 Worker
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 会话：jsonwebtoken (HS256) + bcrypt

pub mod auth;
pub mod cli;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
pub mod worker;

pub use error::{ApiError, Result};
pub use state::AppState;
