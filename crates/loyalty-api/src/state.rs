//! 应用状态定义

use std::sync::Arc;
use std::time::Duration;

use loyalty_ledger::{LedgerQueryService, LedgerStore, SubmissionService, WithdrawalService};

use crate::service::IdentityService;

/// Axum 应用共享状态
///
/// 所有服务都持有同一个账本存储，通过 Arc 在 handler 间共享
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub submissions: Arc<SubmissionService>,
    pub withdrawals: Arc<WithdrawalService>,
    pub queries: Arc<LedgerQueryService>,
}

impl AppState {
    /// 创建应用状态
    ///
    /// `operation_timeout` 约束每次账本存储操作的耗时
    pub fn new(
        store: Arc<dyn LedgerStore>,
        identity: IdentityService,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            identity: Arc::new(identity),
            submissions: Arc::new(
                SubmissionService::new(store.clone()).with_timeout(operation_timeout),
            ),
            withdrawals: Arc::new(
                WithdrawalService::new(store.clone()).with_timeout(operation_timeout),
            ),
            queries: Arc::new(LedgerQueryService::new(store).with_timeout(operation_timeout)),
        }
    }
}
