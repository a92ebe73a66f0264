//! 账本账户服务

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use super::deadline::{DEFAULT_OPERATION_TIMEOUT, bounded};
use crate::error::Result;
use crate::repository::LedgerStore;

/// 账本账户服务
///
/// 用户注册成功后开立账户；没有账户的所有者在账本中视为不存在。
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    timeout: Duration,
}

impl AccountService {
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

    /// 开立账户，已存在时返回 false
    #[instrument(skip(self))]
    pub async fn open_account(&self, owner: &str) -> Result<bool> {
        bounded(self.timeout, "open_account", self.store.open_account(owner)).await
    }
}
