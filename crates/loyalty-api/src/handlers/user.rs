//! 注册与登录
//!
//! 成功时令牌同时放在 Authorization 响应头、session_token Cookie 和 JSON 响应体中

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::dto::{CredentialsRequest, SessionResponse};
use crate::error::{ApiError, Result};
use crate::middleware::SESSION_COOKIE;
use crate::service::Session;
use crate::state::AppState;

/// 用户注册
///
/// POST /api/user/register
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let session = state.identity.register(&request).await?;
    Ok(session_response(session))
}

/// 用户登录
///
/// POST /api/user/login
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let session = state.identity.login(&request).await?;
    Ok(session_response(session))
}

fn session_response(session: Session) -> Response {
    let max_age = (session.expires_at - Utc::now().timestamp()).max(0);
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, session.token, max_age
    );

    (
        StatusCode::OK,
        [
            (header::AUTHORIZATION, format!("Bearer {}", session.token)),
            (header::SET_COOKIE, cookie),
        ],
        Json(SessionResponse {
            token: session.token,
            expires_at: session.expires_at,
        }),
    )
        .into_response()
}
