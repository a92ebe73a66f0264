//! 存活与就绪探针

use axum::Json;
use axum::http::StatusCode;
use loyalty_shared::database::Database;

const SERVICE_NAME: &str = "loyalty-api";

/// 存活探针：服务进程正常即返回 ok
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查数据库连接是否可用，不可用时返回 503
pub async fn readiness_check(db: Database) -> (StatusCode, Json<serde_json::Value>) {
    let db_ok = db.health_check().await.is_ok();
    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = Json(serde_json::json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "service": SERVICE_NAME,
        "checks": {
            "database": if db_ok { "ok" } else { "fail" }
        }
    }));
    (status, body)
}
