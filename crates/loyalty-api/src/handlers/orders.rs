//! 订单提交与查询

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use loyalty_ledger::SubmitOutcome;

use crate::error::{ApiError, Result};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// 提交订单号
///
/// POST /api/user/orders，请求体为 text/plain 的订单号。
/// 新登记返回 202，本人重复提交返回 200。
pub async fn submit_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode> {
    let is_text = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/plain"));
    if !is_text {
        return Err(ApiError::BadRequest(
            "请求体必须为 text/plain 格式的订单号".to_string(),
        ));
    }
    if body.trim().is_empty() {
        return Err(ApiError::BadRequest("订单号不能为空".to_string()));
    }

    match state.submissions.submit(&user.login, &body).await? {
        SubmitOutcome::Accepted { .. } => Ok(StatusCode::ACCEPTED),
        SubmitOutcome::AlreadySubmitted => Ok(StatusCode::OK),
    }
}

/// 订单列表，按提交时间升序
///
/// GET /api/user/orders，没有订单时返回 204
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response> {
    let orders = state.queries.list_orders(&user.login).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(orders).into_response())
}
