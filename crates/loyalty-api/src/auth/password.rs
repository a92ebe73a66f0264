//! 密码处理
//!
//! bcrypt 哈希，计算开销由调用方传入的 cost 决定

use bcrypt::{hash, verify};

use crate::error::ApiError;

pub use bcrypt::DEFAULT_COST;

/// 对密码进行哈希处理
pub fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    hash(password, cost).map_err(|e| ApiError::Internal(format!("密码哈希失败: {}", e)))
}

/// 验证密码
///
/// 比较明文密码与存储的哈希值
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    verify(password, hash).map_err(|e| ApiError::Internal(format!("密码验证失败: {}", e)))
}
