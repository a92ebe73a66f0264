//! 存储操作超时

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{LedgerError, Result};

/// 单次存储操作的默认超时
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// 在限定时间内完成存储操作，超时视为瞬时故障
pub(crate) async fn bounded<T, F>(limit: Duration, operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation,
                timeout_ms = limit.as_millis() as u64,
                "账本存储操作超时"
            );
            Err(LedgerError::Transient(format!("{} 超时", operation)))
        }
    }
}
