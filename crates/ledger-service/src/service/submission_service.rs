//! 订单登记服务
//!
//! 校验订单号后幂等写入账本：
//! - 校验位不合法直接拒绝，不访问存储
//! - 同一用户重复提交视为成功但不做任何修改
//! - 订单号已属于其他用户时返回冲突

use std::sync::Arc;
use std::time::Duration;

use loyalty_shared::observability::metrics;
use tracing::{info, instrument, warn};

use super::deadline::{DEFAULT_OPERATION_TIMEOUT, bounded};
use crate::error::{LedgerError, Result};
use crate::luhn;
use crate::repository::LedgerStore;

/// 订单登记结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 新订单已受理，等待对账
    Accepted { order_id: i64 },
    /// 当前用户此前已提交过该订单
    AlreadySubmitted,
}

/// 订单登记服务
pub struct SubmissionService {
    store: Arc<dyn LedgerStore>,
    timeout: Duration,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 提交订单号
    #[instrument(skip(self))]
    pub async fn submit(&self, owner: &str, raw_number: &str) -> Result<SubmitOutcome> {
        let number = match luhn::validate_order_number(raw_number) {
            Ok(number) => number,
            Err(e) => {
                metrics::record_order_submission("invalid");
                return Err(e);
            }
        };

        let result = bounded(
            self.timeout,
            "insert_order",
            self.store.insert_order(owner, &number),
        )
        .await;

        match result {
            Ok(order_id) => {
                metrics::record_order_submission("accepted");
                info!(owner = %owner, number = %number, order_id, "订单已受理");
                Ok(SubmitOutcome::Accepted { order_id })
            }
            Err(LedgerError::DuplicateSameOwner { .. }) => {
                metrics::record_order_submission("already_submitted");
                Ok(SubmitOutcome::AlreadySubmitted)
            }
            Err(e @ LedgerError::DuplicateOtherOwner { .. }) => {
                metrics::record_order_submission("conflict");
                warn!(owner = %owner, number = %number, "订单号已被其他用户提交");
                Err(e)
            }
            Err(e) => {
                metrics::record_order_submission("error");
                Err(e)
            }
        }
    }
}
