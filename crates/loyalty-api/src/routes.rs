//! 路由配置模块

use axum::{
    Router, middleware,
    routing::{get, post},
};
use loyalty_shared::observability::middleware as obs_middleware;

use crate::handlers;
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// 公开路由：注册与登录
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::user::register))
        .route("/login", post(handlers::user::login))
}

/// 需要会话令牌的路由
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            post(handlers::orders::submit_order).get(handlers::orders::list_orders),
        )
        .route("/balance", get(handlers::balance::get_balance))
        .route("/balance/withdraw", post(handlers::balance::withdraw))
        .route("/withdrawals", get(handlers::balance::list_withdrawals))
        .route(
            "/balance/withdrawals",
            get(handlers::balance::list_withdrawals),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// 构建 `/api/user` 下的全部路由
pub fn api_routes(state: AppState) -> Router<AppState> {
    public_routes().merge(protected_routes(state))
}

/// 构建完整应用
///
/// `extra` 用于挂载探针等不属于业务 API 的路由，同样经过可观测性中间件
pub fn build_app(state: AppState, extra: Router) -> Router {
    Router::new()
        .nest("/api/user", api_routes(state.clone()))
        .with_state(state)
        .merge(extra)
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
}
