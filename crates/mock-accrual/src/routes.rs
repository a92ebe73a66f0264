//! 模拟积分系统路由

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{debug, info, warn};

use crate::rate_limit::FixedWindowLimiter;
use crate::registry::{AccrualRecord, Registry};

/// 服务状态
#[derive(Clone, Default)]
pub struct MockState {
    pub registry: Arc<Registry>,
    /// 为 None 时不限流
    pub limiter: Option<Arc<FixedWindowLimiter>>,
}

impl MockState {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            limiter: None,
        }
    }

    pub fn with_limiter(mut self, limiter: FixedWindowLimiter) -> Self {
        self.limiter = Some(Arc::new(limiter));
        self
    }
}

/// 构建积分系统路由
pub fn accrual_routes() -> Router<MockState> {
    Router::new()
        .route("/api/orders/{number}", get(get_order))
        .route("/api/orders", post(register_order))
}

/// 查询订单积分
///
/// GET /api/orders/{number}：200 返回记录，204 未登记，429 限流
async fn get_order(State(state): State<MockState>, Path(number): Path<String>) -> Response {
    if let Some(limiter) = &state.limiter {
        if let Err(retry_after) = limiter.check() {
            warn!(number = %number, retry_after_secs = retry_after.as_secs(), "请求被限流");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.as_secs().to_string())],
                format!(
                    "No more than {} requests per minute allowed",
                    limiter.max_requests()
                ),
            )
                .into_response();
        }
    }

    match state.registry.get(&number) {
        Some(record) => {
            debug!(number = %number, status = ?record.status, "返回订单积分");
            Json(record).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// 登记或更新订单结果
///
/// POST /api/orders：新登记返回 202，覆盖已有记录返回 200
async fn register_order(
    State(state): State<MockState>,
    payload: Result<Json<AccrualRecord>, JsonRejection>,
) -> Response {
    let Json(record) = match payload {
        Ok(payload) => payload,
        Err(e) => return (StatusCode::BAD_REQUEST, e.body_text()).into_response(),
    };
    if record.order.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "order is required").into_response();
    }

    info!(order = %record.order, status = ?record.status, "登记订单结果");
    if state.registry.upsert(record) {
        StatusCode::ACCEPTED.into_response()
    } else {
        StatusCode::OK.into_response()
    }
}
