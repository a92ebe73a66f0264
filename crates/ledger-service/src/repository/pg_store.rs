//! PostgreSQL 账本存储
//!
//! 每个所有者在 ledger_accounts 中有一行，`SELECT ... FOR NO KEY UPDATE` 锁住这一行即进入
//! 该所有者的临界区。余额相关的读改写（提现预留、状态更新）都在持有该行锁的事务中执行。
//! 该锁模式与外键检查的 KEY SHARE 锁不冲突，同一所有者登记新订单无需等待临界区。

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row};
use tracing::{debug, info, instrument, warn};

use super::traits::{LedgerStore, allocate_debit};
use crate::error::{LedgerError, Result};
use crate::models::{Balance, Order, OrderStatus, StatusUpdate, UpdateOutcome, Withdrawal};

/// PostgreSQL 外键约束失败
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL 账本存储
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 锁定所有者账户行，进入该所有者的临界区
    ///
    /// 账户不存在时返回 OwnerNotFound
    async fn lock_account(conn: &mut PgConnection, owner: &str) -> Result<()> {
        sqlx::query("SELECT owner FROM ledger_accounts WHERE owner = $1 FOR NO KEY UPDATE")
            .bind(owner)
            .fetch_optional(conn)
            .await?
            .map(|_| ())
            .ok_or_else(|| LedgerError::OwnerNotFound(owner.to_string()))
    }

    async fn account_exists(&self, owner: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM ledger_accounts WHERE owner = $1)")
                .bind(owner)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn ensure_account(&self, owner: &str) -> Result<()> {
        if self.account_exists(owner).await? {
            Ok(())
        } else {
            Err(LedgerError::OwnerNotFound(owner.to_string()))
        }
    }

    /// 汇总余额（调用方决定是否在临界区内）
    async fn sum_balance(conn: &mut PgConnection, owner: &str) -> Result<Balance> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(accrual), 0) AS total_accrual,
                   COALESCE(SUM(withdrawn), 0) AS total_withdrawn
            FROM orders
            WHERE owner = $1
            "#,
        )
        .bind(owner)
        .fetch_one(conn)
        .await?;

        Ok(Balance::new(
            row.get::<Decimal, _>("total_accrual"),
            row.get::<Decimal, _>("total_withdrawn"),
        ))
    }

    /// 把并发插入竞争中败下阵的订单号归类为重复提交
    fn classify_duplicate(owner: &str, existing_owner: &str, number: &str) -> LedgerError {
        if existing_owner == owner {
            LedgerError::DuplicateSameOwner {
                number: number.to_string(),
            }
        } else {
            LedgerError::DuplicateOtherOwner {
                number: number.to_string(),
            }
        }
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(PG_FOREIGN_KEY_VIOLATION)
    )
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    #[instrument(skip(self))]
    async fn open_account(&self, owner: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO ledger_accounts (owner) VALUES ($1) ON CONFLICT (owner) DO NOTHING",
        )
        .bind(owner)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() == 1;
        if created {
            info!(owner = %owner, "账本账户已开立");
        }
        Ok(created)
    }

    /// 插入与归属判定在一条语句内完成；唯一约束冲突时返回已有记录的所有者
    #[instrument(skip(self))]
    async fn insert_order(&self, owner: &str, number: &str) -> Result<i64> {
        let row = sqlx::query(
            r#"
            WITH inserted AS (
                INSERT INTO orders (number, owner)
                VALUES ($1, $2)
                ON CONFLICT (number) DO NOTHING
                RETURNING id, owner
            )
            SELECT id, owner, TRUE AS inserted FROM inserted
            UNION ALL
            SELECT id, owner, FALSE AS inserted FROM orders
            WHERE number = $1 AND NOT EXISTS (SELECT 1 FROM inserted)
            "#,
        )
        .bind(number)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                LedgerError::OwnerNotFound(owner.to_string())
            } else {
                LedgerError::from(e)
            }
        })?;

        match row {
            Some(row) if row.get::<bool, _>("inserted") => {
                let id: i64 = row.get("id");
                debug!(order_id = id, "订单已登记");
                Ok(id)
            }
            Some(row) => {
                let existing_owner: String = row.get("owner");
                Err(Self::classify_duplicate(owner, &existing_owner, number))
            }
            None => {
                // 冲突行在本语句快照之后才提交，重新读取一次
                let existing_owner: Option<String> =
                    sqlx::query_scalar("SELECT owner FROM orders WHERE number = $1")
                        .bind(number)
                        .fetch_optional(&self.pool)
                        .await?;
                match existing_owner {
                    Some(existing_owner) => {
                        Err(Self::classify_duplicate(owner, &existing_owner, number))
                    }
                    None => Err(LedgerError::Transient(format!(
                        "订单 {} 插入冲突但未找到已有记录",
                        number
                    ))),
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, owner: &str) -> Result<Vec<Order>> {
        self.ensure_account(owner).await?;

        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, number, owner, status, accrual, withdrawn, submitted_at, updated_at
            FROM orders
            WHERE owner = $1
            ORDER BY submitted_at ASC, id ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    #[instrument(skip(self))]
    async fn list_unsettled(&self) -> Result<Vec<String>> {
        let numbers = sqlx::query_scalar::<_, String>(
            r#"
            SELECT number
            FROM orders
            WHERE status IN ('NEW', 'PROCESSING')
            ORDER BY submitted_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(numbers)
    }

    #[instrument(skip(self), fields(number = %update.number, status = %update.status))]
    async fn apply_status_update(&self, update: &StatusUpdate) -> Result<UpdateOutcome> {
        // owner 写入后不变，可以先于加锁读取
        let owner: Option<String> =
            sqlx::query_scalar("SELECT owner FROM orders WHERE number = $1")
                .bind(&update.number)
                .fetch_optional(&self.pool)
                .await?;
        let Some(owner) = owner else {
            warn!("对账返回的订单在本地不存在");
            return Ok(UpdateOutcome::NotFound);
        };

        let mut tx = self.pool.begin().await?;
        Self::lock_account(&mut tx, &owner).await?;

        let current: OrderStatus =
            sqlx::query_scalar("SELECT status FROM orders WHERE number = $1 FOR UPDATE")
                .bind(&update.number)
                .fetch_one(&mut *tx)
                .await?;

        if !current.can_transition_to(update.status) {
            debug!(current = %current, "状态未前进，忽略更新");
            return Ok(UpdateOutcome::Ignored { current });
        }

        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, accrual = $3, updated_at = NOW()
            WHERE number = $1
            "#,
        )
        .bind(&update.number)
        .bind(update.status)
        .bind(update.accrual)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(accrual = %update.accrual, "订单状态已更新");
        Ok(UpdateOutcome::Applied)
    }

    #[instrument(skip(self))]
    async fn reserve_withdrawal(
        &self,
        owner: &str,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Withdrawal> {
        let mut tx = self.pool.begin().await?;
        Self::lock_account(&mut tx, owner).await?;

        let balance = Self::sum_balance(&mut tx, owner).await?;
        if balance.current < amount {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: balance.current,
            });
        }

        let rows = sqlx::query(
            r#"
            SELECT id, accrual - withdrawn AS remaining
            FROM orders
            WHERE owner = $1 AND status = 'PROCESSED' AND accrual > withdrawn
            ORDER BY submitted_at ASC, id ASC
            FOR UPDATE
            "#,
        )
        .bind(owner)
        .fetch_all(&mut *tx)
        .await?;

        let remaining: Vec<(i64, Decimal)> = rows
            .iter()
            .map(|row| (row.get("id"), row.get("remaining")))
            .collect();

        for (order_id, debit) in allocate_debit(&remaining, amount) {
            sqlx::query(
                r#"
                UPDATE orders
                SET withdrawn = withdrawn + $2, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(order_id)
            .bind(debit)
            .execute(&mut *tx)
            .await?;
        }

        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (owner, order_number, amount)
            VALUES ($1, $2, $3)
            RETURNING id, owner, order_number, amount, processed_at
            "#,
        )
        .bind(owner)
        .bind(order_number)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(withdrawal_id = withdrawal.id, "提现已入账");
        Ok(withdrawal)
    }

    #[instrument(skip(self))]
    async fn get_balance(&self, owner: &str) -> Result<Balance> {
        self.ensure_account(owner).await?;
        let mut conn = self.pool.acquire().await?;
        Self::sum_balance(&mut conn, owner).await
    }

    #[instrument(skip(self))]
    async fn list_withdrawals(&self, owner: &str) -> Result<Vec<Withdrawal>> {
        self.ensure_account(owner).await?;

        let withdrawals = sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT id, owner, order_number, amount, processed_at
            FROM withdrawals
            WHERE owner = $1
            ORDER BY processed_at ASC, id ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(withdrawals)
    }
}
