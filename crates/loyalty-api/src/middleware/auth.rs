//! 会话认证中间件
//!
//! 从 `Authorization: Bearer <token>` 或 `session_token` Cookie 中取出令牌，
//! 验证后把当前用户注入请求扩展。

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// 会话 Cookie 名称
pub const SESSION_COOKIE: &str = "session_token";

/// 已认证的当前用户（账本所有者）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub login: String,
}

/// 认证中间件
///
/// 只挂在受保护路由上，注册与登录不经过这里
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers()) else {
        return ApiError::Unauthorized("缺少认证 Token".to_string()).into_response();
    };

    match state.identity.resolve(&token) {
        Ok(login) => {
            request.extensions_mut().insert(AuthUser { login });
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// 提取会话令牌，Authorization 头优先
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}
