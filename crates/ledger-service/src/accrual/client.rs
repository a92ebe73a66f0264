//! 积分系统客户端
//!
//! `GET {base_url}/api/orders/{number}` 的响应按状态码分类：
//! - 200：订单结果
//! - 204：积分系统尚未登记该订单
//! - 429：限流，可能带 Retry-After（秒）
//! - 5xx：积分系统故障
//!
//! 网络错误与响应体解析失败以 `AccrualError` 返回。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::models::{AccrualStatus, StatusUpdate};

/// 积分系统返回的订单结果
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(default)]
    pub accrual: Option<Decimal>,
}

impl AccrualResponse {
    /// 转换为本地状态更新，INVALID 等非 PROCESSED 状态积分归零
    pub fn into_update(self) -> StatusUpdate {
        StatusUpdate::new(
            self.order,
            self.status.to_order_status(),
            self.accrual.unwrap_or(Decimal::ZERO),
        )
    }
}

/// 一次查询的分类结果
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualReply {
    Settled(AccrualResponse),
    NotRegistered,
    RateLimited { retry_after: Option<Duration> },
    ServerError { status: u16 },
}

/// 积分系统调用错误
#[derive(Debug, Error)]
pub enum AccrualError {
    #[error("积分系统请求失败: {0}")]
    Transport(String),

    #[error("积分系统响应解析失败: {0}")]
    Decode(String),

    #[error("积分系统返回了意外的状态码: {0}")]
    UnexpectedStatus(u16),
}

/// 积分系统客户端接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccrualClient: Send + Sync {
    async fn fetch(&self, number: &str) -> Result<AccrualReply, AccrualError>;
}

/// 基于 reqwest 的积分系统客户端
pub struct ReqwestAccrualClient {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestAccrualClient {
    /// 创建客户端，timeout 约束单次请求的总耗时
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AccrualError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AccrualError::Transport(format!("创建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn order_url(&self, number: &str) -> String {
        format!("{}/api/orders/{}", self.base_url, number)
    }
}

/// 解析 Retry-After 秒数，HTTP 日期格式不支持
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl AccrualClient for ReqwestAccrualClient {
    #[instrument(skip(self))]
    async fn fetch(&self, number: &str) -> Result<AccrualReply, AccrualError> {
        let response = self
            .client
            .get(self.order_url(number))
            .send()
            .await
            .map_err(|e| AccrualError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "积分系统已响应");

        match status {
            StatusCode::OK => {
                let body: AccrualResponse = response
                    .json()
                    .await
                    .map_err(|e| AccrualError::Decode(e.to_string()))?;
                if body.order != number {
                    return Err(AccrualError::Decode(format!(
                        "响应订单号 {} 与请求 {} 不一致",
                        body.order, number
                    )));
                }
                Ok(AccrualReply::Settled(body))
            }
            StatusCode::NO_CONTENT => Ok(AccrualReply::NotRegistered),
            StatusCode::TOO_MANY_REQUESTS => Ok(AccrualReply::RateLimited {
                retry_after: parse_retry_after(response.headers()),
            }),
            s if s.is_server_error() => Ok(AccrualReply::ServerError { status: s.as_u16() }),
            s => Err(AccrualError::UnexpectedStatus(s.as_u16())),
        }
    }
}
