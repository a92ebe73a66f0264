//! 认证模块
//!
//! 提供会话令牌生成、验证和密码处理功能

mod jwt;
mod password;

pub use jwt::{Claims, JwtConfig, JwtManager};
pub use password::{DEFAULT_COST, hash_password, verify_password};
