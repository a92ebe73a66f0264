//! JWT 会话令牌
//!
//! HS256 签名，`sub` 即登录名，也是账本所有者标识

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use loyalty_shared::config::AuthConfig;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 签名密钥
    pub secret: String,
    /// Token 过期时间（秒）
    pub expires_in_secs: i64,
    /// Token 签发者
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        AuthConfig::default().into()
    }
}

impl From<AuthConfig> for JwtConfig {
    fn from(config: AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret,
            expires_in_secs: config.token_ttl_secs,
            issuer: config.issuer,
        }
    }
}

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 登录名
    pub sub: String,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// 创建 JWT 管理器
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 Token，返回 (token, 过期时间戳)
    pub fn generate_token(&self, login: &str) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.expires_in_secs);

        let claims = Claims {
            sub: login.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT 生成失败: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析 Token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::Unauthorized("无效的 Token".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        Ok(token_data.claims)
    }

    /// 获取 Token 过期时间（秒）
    pub fn expires_in_secs(&self) -> i64 {
        self.config.expires_in_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_token() {
        let manager = JwtManager::new(JwtConfig::default());

        let (token, exp) = manager.generate_token("alice").unwrap();
        let claims = manager.verify_token(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp, exp);
        assert_eq!(claims.exp - claims.iat, manager.expires_in_secs());
    }

    #[test]
    fn test_invalid_token() {
        let manager = JwtManager::new(JwtConfig::default());
        assert!(manager.verify_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issuer = JwtManager::new(JwtConfig {
            secret: "another-secret".to_string(),
            ..JwtConfig::default()
        });
        let verifier = JwtManager::new(JwtConfig::default());

        let (token, _) = issuer.generate_token("alice").unwrap();
        assert!(matches!(
            verifier.verify_token(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // 超出 jsonwebtoken 默认 60 秒的时钟偏差容忍
        let manager = JwtManager::new(JwtConfig {
            expires_in_secs: -120,
            ..JwtConfig::default()
        });

        let (token, _) = manager.generate_token("alice").unwrap();
        assert!(matches!(
            manager.verify_token(&token),
            Err(ApiError::Unauthorized(msg)) if msg.contains("过期")
        ));
    }
}
