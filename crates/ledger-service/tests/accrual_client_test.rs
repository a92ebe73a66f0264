//! 积分系统 HTTP 客户端集成测试
//!
//! 在本地随机端口启动一个最小的 axum 服务模拟积分系统。

use std::time::Duration;

use axum::Router;
use axum::extract::Path;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use loyalty_ledger::accrual::AccrualError;
use loyalty_ledger::{AccrualClient, AccrualReply, AccrualStatus, ReqwestAccrualClient};
use rust_decimal_macros::dec;
use serde_json::json;
use tokio::net::TcpListener;

async fn order_handler(Path(number): Path<String>) -> Response {
    match number.as_str() {
        "79927398713" => (
            StatusCode::OK,
            axum::Json(json!({"order": number, "status": "PROCESSED", "accrual": 729.98})),
        )
            .into_response(),
        "2377225624" => (
            StatusCode::OK,
            axum::Json(json!({"order": number, "status": "PROCESSING"})),
        )
            .into_response(),
        "12345678903" => {
            let mut headers = HeaderMap::new();
            headers.insert(header::RETRY_AFTER, HeaderValue::from_static("7"));
            (StatusCode::TOO_MANY_REQUESTS, headers, "No more than N requests per minute allowed")
                .into_response()
        }
        "4561261212345467" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "18" => (
            StatusCode::OK,
            axum::Json(json!({"order": "26", "status": "PROCESSED", "accrual": 1})),
        )
            .into_response(),
        "34" => (StatusCode::OK, "not json").into_response(),
        "42" => StatusCode::NOT_FOUND.into_response(),
        "59" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            StatusCode::NO_CONTENT.into_response()
        }
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn spawn_accrual() -> String {
    let app = Router::new().route("/api/orders/{number}", get(order_handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn client() -> ReqwestAccrualClient {
    let base_url = spawn_accrual().await;
    ReqwestAccrualClient::new(base_url, Duration::from_millis(500)).unwrap()
}

#[tokio::test]
async fn test_processed_response() {
    let client = client().await;
    let reply = client.fetch("79927398713").await.unwrap();

    let AccrualReply::Settled(response) = reply else {
        panic!("expected settled reply, got {reply:?}");
    };
    assert_eq!(response.status, AccrualStatus::Processed);
    assert_eq!(response.accrual, Some(dec!(729.98)));
}

#[tokio::test]
async fn test_processing_without_accrual() {
    let client = client().await;
    let reply = client.fetch("2377225624").await.unwrap();

    let AccrualReply::Settled(response) = reply else {
        panic!("expected settled reply, got {reply:?}");
    };
    assert_eq!(response.status, AccrualStatus::Processing);
    assert_eq!(response.accrual, None);
}

#[tokio::test]
async fn test_not_registered() {
    let client = client().await;
    assert_eq!(
        client.fetch("5555555555554444").await.unwrap(),
        AccrualReply::NotRegistered
    );
}

#[tokio::test]
async fn test_rate_limited_with_retry_after() {
    let client = client().await;
    assert_eq!(
        client.fetch("12345678903").await.unwrap(),
        AccrualReply::RateLimited {
            retry_after: Some(Duration::from_secs(7))
        }
    );
}

#[tokio::test]
async fn test_server_error() {
    let client = client().await;
    assert_eq!(
        client.fetch("4561261212345467").await.unwrap(),
        AccrualReply::ServerError { status: 500 }
    );
}

#[tokio::test]
async fn test_mismatched_order_is_decode_error() {
    let client = client().await;
    assert!(matches!(
        client.fetch("18").await,
        Err(AccrualError::Decode(_))
    ));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let client = client().await;
    assert!(matches!(
        client.fetch("34").await,
        Err(AccrualError::Decode(_))
    ));
}

#[tokio::test]
async fn test_unexpected_status() {
    let client = client().await;
    assert!(matches!(
        client.fetch("42").await,
        Err(AccrualError::UnexpectedStatus(404))
    ));
}

#[tokio::test]
async fn test_request_timeout_is_transport_error() {
    let client = client().await;
    assert!(matches!(
        client.fetch("59").await,
        Err(AccrualError::Transport(_))
    ));
}

#[tokio::test]
async fn test_unreachable_authority() {
    let client =
        ReqwestAccrualClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
    assert!(matches!(
        client.fetch("79927398713").await,
        Err(AccrualError::Transport(_))
    ));
}
