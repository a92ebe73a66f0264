//! 内存账本存储
//!
//! 使用 DashMap 实现的内存存储，适用于测试和本地开发。
//! 每个所有者的账本放在独立的互斥锁后面，锁粒度与 PostgreSQL 实现的账户行锁一致。

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use super::traits::{LedgerStore, allocate_debit};
use crate::error::{LedgerError, Result};
use crate::models::{Balance, Order, OrderStatus, StatusUpdate, UpdateOutcome, Withdrawal};

/// 单个所有者的账本
#[derive(Debug, Default)]
struct Account {
    orders: Vec<Order>,
    withdrawals: Vec<Withdrawal>,
}

impl Account {
    fn balance(&self) -> Balance {
        let total_accrual: Decimal = self.orders.iter().map(|o| o.accrual).sum();
        let withdrawn: Decimal = self.orders.iter().map(|o| o.withdrawn).sum();
        Balance::new(total_accrual, withdrawn)
    }
}

/// 内存账本存储
///
/// 锁顺序固定为先订单号索引再账户锁，持锁期间不跨越 await。
#[derive(Debug)]
pub struct MemoryLedgerStore {
    accounts: DashMap<String, Arc<Mutex<Account>>>,
    /// 订单号 -> 所有者，保证订单号全局唯一
    order_index: DashMap<String, String>,
    next_order_id: AtomicI64,
    next_withdrawal_id: AtomicI64,
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            order_index: DashMap::new(),
            next_order_id: AtomicI64::new(1),
            next_withdrawal_id: AtomicI64::new(1),
        }
    }

    /// 取出账户句柄，不持有分片锁
    fn account(&self, owner: &str) -> Result<Arc<Mutex<Account>>> {
        self.accounts
            .get(owner)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::OwnerNotFound(owner.to_string()))
    }

    /// 订单总数
    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn open_account(&self, owner: &str) -> Result<bool> {
        match self.accounts.entry(owner.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(Account::default())));
                info!(owner = %owner, "账本账户已开立");
                Ok(true)
            }
        }
    }

    #[instrument(skip(self))]
    async fn insert_order(&self, owner: &str, number: &str) -> Result<i64> {
        let account = self.account(owner)?;

        match self.order_index.entry(number.to_string()) {
            Entry::Occupied(existing) if existing.get() == owner => {
                Err(LedgerError::DuplicateSameOwner {
                    number: number.to_string(),
                })
            }
            Entry::Occupied(_) => Err(LedgerError::DuplicateOtherOwner {
                number: number.to_string(),
            }),
            Entry::Vacant(slot) => {
                let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
                let now = Utc::now();
                account.lock().orders.push(Order {
                    id,
                    number: number.to_string(),
                    owner: owner.to_string(),
                    status: OrderStatus::New,
                    accrual: Decimal::ZERO,
                    withdrawn: Decimal::ZERO,
                    submitted_at: now,
                    updated_at: now,
                });
                slot.insert(owner.to_string());
                debug!(order_id = id, "订单已登记");
                Ok(id)
            }
        }
    }

    async fn list_orders(&self, owner: &str) -> Result<Vec<Order>> {
        let account = self.account(owner)?;
        let mut orders = account.lock().orders.clone();
        orders.sort_by(|a, b| (a.submitted_at, a.id).cmp(&(b.submitted_at, b.id)));
        Ok(orders)
    }

    async fn list_unsettled(&self) -> Result<Vec<String>> {
        let accounts: Vec<Arc<Mutex<Account>>> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut pending: Vec<(chrono::DateTime<Utc>, i64, String)> = Vec::new();
        for account in accounts {
            let account = account.lock();
            pending.extend(
                account
                    .orders
                    .iter()
                    .filter(|o| !o.status.is_terminal())
                    .map(|o| (o.submitted_at, o.id, o.number.clone())),
            );
        }
        pending.sort();

        Ok(pending.into_iter().map(|(_, _, number)| number).collect())
    }

    #[instrument(skip(self), fields(number = %update.number, status = %update.status))]
    async fn apply_status_update(&self, update: &StatusUpdate) -> Result<UpdateOutcome> {
        let Some(owner) = self
            .order_index
            .get(&update.number)
            .map(|entry| entry.value().clone())
        else {
            return Ok(UpdateOutcome::NotFound);
        };

        let account = self.account(&owner)?;
        let mut account = account.lock();
        let Some(order) = account
            .orders
            .iter_mut()
            .find(|o| o.number == update.number)
        else {
            return Ok(UpdateOutcome::NotFound);
        };

        if !order.status.can_transition_to(update.status) {
            return Ok(UpdateOutcome::Ignored {
                current: order.status,
            });
        }

        order.status = update.status;
        order.accrual = update.accrual;
        order.updated_at = Utc::now();
        Ok(UpdateOutcome::Applied)
    }

    #[instrument(skip(self))]
    async fn reserve_withdrawal(
        &self,
        owner: &str,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal> {
        let account = self.account(owner)?;
        let mut account = account.lock();

        let balance = account.balance();
        if balance.current < amount {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: balance.current,
            });
        }

        let mut candidates: Vec<(usize, &Order)> = account
            .orders
            .iter()
            .enumerate()
            .filter(|(_, o)| o.status == OrderStatus::Processed && o.remaining() > Decimal::ZERO)
            .collect();
        candidates.sort_by(|(_, a), (_, b)| (a.submitted_at, a.id).cmp(&(b.submitted_at, b.id)));
        let remaining: Vec<(usize, Decimal)> = candidates
            .into_iter()
            .map(|(idx, o)| (idx, o.remaining()))
            .collect();

        let now = Utc::now();
        for (idx, debit) in allocate_debit(&remaining, amount) {
            let order = &mut account.orders[idx];
            order.withdrawn += debit;
            order.updated_at = now;
        }

        let withdrawal = Withdrawal {
            id: self.next_withdrawal_id.fetch_add(1, Ordering::SeqCst),
            owner: owner.to_string(),
            order_number: order_number.to_string(),
            amount,
            processed_at: now,
        };
        account.withdrawals.push(withdrawal.clone());

        info!(withdrawal_id = withdrawal.id, "提现已入账");
        Ok(withdrawal)
    }

    async fn get_balance(&self, owner: &str) -> Result<Balance> {
        let account = self.account(owner)?;
        let balance = account.lock().balance();
        Ok(balance)
    }

    async fn list_withdrawals(&self, owner: &str) -> Result<Vec<Withdrawal>> {
        let account = self.account(owner)?;
        let mut withdrawals = account.lock().withdrawals.clone();
        withdrawals.sort_by(|a, b| (a.processed_at, a.id).cmp(&(b.processed_at, b.id)));
        Ok(withdrawals)
    }
}
