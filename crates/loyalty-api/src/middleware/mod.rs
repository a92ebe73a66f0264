//! 中间件模块

mod auth;

pub use auth::{AuthUser, SESSION_COOKIE, auth_middleware, extract_token};
