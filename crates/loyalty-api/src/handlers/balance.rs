//! 余额、提现与提现历史

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::dto::{BalanceDto, WithdrawRequest, WithdrawalDto};
use crate::error::{ApiError, Result};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// 当前余额
///
/// GET /api/user/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BalanceDto>> {
    let balance = state.queries.get_balance(&user.login).await?;
    Ok(Json(balance))
}

/// 提现
///
/// POST /api/user/balance/withdraw，余额不足返回 402
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<Json<WithdrawalDto>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let withdrawal = state
        .withdrawals
        .withdraw(&user.login, &request.order, request.sum)
        .await?;

    Ok(Json(WithdrawalDto::from(withdrawal)))
}

/// 提现历史，按处理时间升序
///
/// GET /api/user/withdrawals，没有记录时返回 204
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response> {
    let withdrawals = state.queries.list_withdrawals(&user.login).await?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(withdrawals).into_response())
}
