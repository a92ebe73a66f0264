//! 身份服务
//!
//! 注册、登录与会话令牌解析。注册成功时同时在账本中开户，
//! 登录时再次开户（幂等），修复注册中途失败留下的无账户用户。

use std::sync::Arc;

use loyalty_ledger::AccountService;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::auth::{DEFAULT_COST, JwtManager, hash_password, verify_password};
use crate::dto::CredentialsRequest;
use crate::error::{ApiError, Result};
use crate::repository::UserRepository;

/// 已建立的会话
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub login: String,
    pub token: String,
    pub expires_at: i64,
}

/// 身份服务
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    accounts: AccountService,
    jwt: JwtManager,
    bcrypt_cost: u32,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UserRepository>, accounts: AccountService, jwt: JwtManager) -> Self {
        Self {
            users,
            accounts,
            jwt,
            bcrypt_cost: DEFAULT_COST,
        }
    }

    /// 覆盖 bcrypt 计算开销（测试中使用较低的值）
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// 注册新用户并建立会话
    #[instrument(skip(self, request), fields(login = %request.login))]
    pub async fn register(&self, request: &CredentialsRequest) -> Result<Session> {
        request.validate()?;

        let password = request.password.clone();
        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| ApiError::Internal(format!("密码哈希任务失败: {}", e)))??;

        if !self.users.create(&request.login, &password_hash).await? {
            return Err(ApiError::LoginTaken(request.login.clone()));
        }

        self.accounts.open_account(&request.login).await?;
        info!("用户注册成功");

        self.issue(&request.login)
    }

    /// 校验凭据并建立会话
    #[instrument(skip(self, request), fields(login = %request.login))]
    pub async fn login(&self, request: &CredentialsRequest) -> Result<Session> {
        request.validate()?;

        let Some(stored_hash) = self.users.find_password_hash(&request.login).await? else {
            warn!("登录失败：用户不存在");
            return Err(ApiError::InvalidCredentials);
        };

        let password = request.password.clone();
        let matched = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| ApiError::Internal(format!("密码校验任务失败: {}", e)))??;
        if !matched {
            warn!("登录失败：密码错误");
            return Err(ApiError::InvalidCredentials);
        }

        if self.accounts.open_account(&request.login).await? {
            warn!("用户缺少账本账户，已补开");
        }

        self.issue(&request.login)
    }

    /// 解析会话令牌，返回账本所有者
    pub fn resolve(&self, token: &str) -> Result<String> {
        self.jwt.verify_token(token).map(|claims| claims.sub)
    }

    fn issue(&self, login: &str) -> Result<Session> {
        let (token, expires_at) = self.jwt.generate_token(login)?;
        Ok(Session {
            login: login.to_string(),
            token,
            expires_at,
        })
    }
}
