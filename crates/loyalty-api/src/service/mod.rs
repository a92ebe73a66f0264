//! 接入层服务

mod identity_service;

pub use identity_service::{IdentityService, Session};
