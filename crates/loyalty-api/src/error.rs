//! 接入层错误类型定义
//!
//! 账本错误按种类映射为 HTTP 状态码，响应体统一为
//! `{success:false, code, message, data:null}`。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use loyalty_ledger::LedgerError;
use serde_json::json;

/// 系统级错误对外的统一提示
const GENERIC_FAULT_MESSAGE: &str = "服务内部错误，请稍后重试";

/// 接入层错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("用户名或密码错误")]
    InvalidCredentials,
    #[error("用户名已被占用: {0}")]
    LoginTaken(String),

    // 请求错误
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("请求格式错误: {0}")]
    BadRequest(String),

    // 账本错误
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::LoginTaken(_) => StatusCode::CONFLICT,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Ledger(e) => ledger_status(e),
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::LoginTaken(_) => "LOGIN_TAKEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Ledger(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为系统故障（详情只写日志，不返回给调用方）
    fn is_fault(&self) -> bool {
        match self {
            Self::Ledger(e) => !e.is_business_error(),
            Self::Database(_) | Self::Internal(_) => true,
            _ => false,
        }
    }
}

fn ledger_status(error: &LedgerError) -> StatusCode {
    match error {
        LedgerError::InvalidFormat(_) | LedgerError::InvalidAmount(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LedgerError::DuplicateSameOwner { .. } | LedgerError::DuplicateOtherOwner { .. } => {
            StatusCode::CONFLICT
        }
        LedgerError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        // 令牌有效但账本中没有该用户，视为会话失效
        LedgerError::OwnerNotFound(_) => StatusCode::UNAUTHORIZED,
        LedgerError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if self.is_fault() {
            tracing::error!(error = %self, code = self.error_code(), "请求处理失败");
            GENERIC_FAULT_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 接入层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("读取响应体失败");
        (status, serde_json::from_slice(&bytes).expect("响应体不是合法 JSON"))
    }

    #[test]
    fn test_ledger_status_mapping() {
        let cases = vec![
            (LedgerError::InvalidFormat("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (LedgerError::InvalidAmount("0".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                LedgerError::DuplicateOtherOwner { number: "18".into() },
                StatusCode::CONFLICT,
            ),
            (
                LedgerError::InsufficientFunds {
                    requested: dec!(10),
                    available: dec!(1),
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (LedgerError::OwnerNotFound("u".into()), StatusCode::UNAUTHORIZED),
            (LedgerError::Transient("timeout".into()), StatusCode::SERVICE_UNAVAILABLE),
            (LedgerError::Fatal("broken".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            let label = format!("{:?}", error);
            assert_eq!(ApiError::from(error).status_code(), expected, "{label}");
        }
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let (status, body) = body_json(ApiError::LoginTaken("alice".into())).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["code"], json!("LOGIN_TAKEN"));
        assert!(body["message"].as_str().unwrap().contains("alice"));
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_ledger_code_passes_through() {
        let error = ApiError::from(LedgerError::InsufficientFunds {
            requested: dec!(400),
            available: dec!(300),
        });
        let (_, body) = body_json(error).await;
        assert_eq!(body["code"], json!("INSUFFICIENT_FUNDS"));
    }

    #[tokio::test]
    async fn test_faults_hide_internal_details() {
        let faults = vec![
            (
                ApiError::from(LedgerError::Fatal("relation \"orders\" does not exist".into())),
                "relation",
            ),
            (
                ApiError::from(LedgerError::Transient("pool timed out".into())),
                "pool",
            ),
            (ApiError::Internal("bcrypt cost overflow".into()), "bcrypt"),
        ];

        for (error, leaked) in faults {
            let (_, body) = body_json(error).await;
            let message = body["message"].as_str().unwrap();
            assert!(!message.contains(leaked), "泄露了内部细节: {message}");
            assert_eq!(message, GENERIC_FAULT_MESSAGE);
        }
    }

    #[test]
    fn test_from_validation_errors() {
        use validator::{ValidationError, ValidationErrors};

        let mut errors = ValidationErrors::new();
        errors.add("login", ValidationError::new("length"));

        let error: ApiError = errors.into();
        assert!(matches!(&error, ApiError::Validation(msg) if msg.contains("login")));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }
}
