//! 用户仓储
//!
//! 只保存登录名与密码哈希，账本数据由账本服务负责。

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sqlx::PgPool;
use tracing::instrument;

use crate::error::Result;

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 创建用户，登录名已存在时返回 false
    async fn create(&self, login: &str, password_hash: &str) -> Result<bool>;

    /// 查询密码哈希
    async fn find_password_hash(&self, login: &str) -> Result<Option<String>>;
}

/// PostgreSQL 用户仓储
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self, password_hash))]
    async fn create(&self, login: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (login, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (login) DO NOTHING
            "#,
        )
        .bind(login)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_password_hash(&self, login: &str) -> Result<Option<String>> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE login = $1")
                .bind(login)
                .fetch_optional(&self.pool)
                .await?;
        Ok(hash)
    }
}

/// 内存用户仓储（测试和本地开发用）
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: DashMap<String, String>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, login: &str, password_hash: &str) -> Result<bool> {
        match self.users.entry(login.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(password_hash.to_string());
                Ok(true)
            }
        }
    }

    async fn find_password_hash(&self, login: &str) -> Result<Option<String>> {
        Ok(self.users.get(login).map(|entry| entry.value().clone()))
    }
}
