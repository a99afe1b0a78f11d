//! # Transaction Repository
//!
//! Read side of the committed transaction ledger.
//!
//! Writes happen in exactly one place, the checkout engine; this
//! repository only retrieves what it committed. Receipt retrieval
//! enforces ownership: a cashier may only open receipts for sales they
//! rang up themselves, an administrator may open any.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::checkout::{Receipt, ReceiptLine};
use crate::error::{DbError, DbResult};
use pos_core::{Actor, CoreError, Role, SaleLine, Transaction};

const TRANSACTION_COLUMNS: &str = "id, cashier_id, subtotal_cents, vat_cents, \
     grand_total_cents, payment_method, status, created_at";

const SALE_COLUMNS: &str =
    "id, transaction_id, product_id, quantity, unit_price_cents, line_total_cents, created_at";

/// One cashier's activity for the current day, shown on their dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashierDaySummary {
    pub transaction_count: i64,
    pub revenue_cents: i64,
    pub items_sold: i64,
}

/// Repository for committed transactions and their sale lines.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a transaction by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let tx = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tx)
    }

    /// Gets the sale lines belonging to a transaction.
    pub async fn lines(&self, transaction_id: &str) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE transaction_id = ?1 ORDER BY created_at, id"
        ))
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Retrieves a full receipt, enforcing ownership.
    ///
    /// Cashiers may only open receipts for their own transactions;
    /// administrators may open any. The denial is Unauthorized rather
    /// than NotFound so the presentation layer can distinguish "no such
    /// receipt" from "not yours".
    pub async fn receipt(&self, transaction_id: &str, actor: &Actor) -> DbResult<Receipt> {
        let transaction = self
            .get_by_id(transaction_id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", transaction_id))?;

        if actor.role != Role::Admin && transaction.cashier_id != actor.user_id {
            return Err(DbError::Core(CoreError::Unauthorized {
                required: "receipt owner or administrator",
            }));
        }

        let lines = sqlx::query_as::<_, ReceiptLine>(
            "SELECT s.id, s.product_id, p.code AS product_code, p.name AS product_name, \
                    s.quantity, s.unit_price_cents, s.line_total_cents \
             FROM sales s \
             JOIN products p ON p.id = s.product_id \
             WHERE s.transaction_id = ?1 \
             ORDER BY s.created_at, s.id",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(transaction_id = %transaction_id, lines = lines.len(), "Receipt retrieved");

        Ok(Receipt { transaction, lines })
    }

    /// Lists transactions, newest first, paged.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lists one cashier's transactions, newest first, paged.
    pub async fn list_by_cashier(
        &self,
        cashier_id: &str,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE cashier_id = ?1 \
             ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
        ))
        .bind(cashier_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// One cashier's sales summary for today (UTC day boundary).
    pub async fn cashier_today(&self, cashier_id: &str) -> DbResult<CashierDaySummary> {
        let today = Utc::now().date_naive();

        let (transaction_count, revenue_cents): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(grand_total_cents), 0) \
             FROM transactions \
             WHERE cashier_id = ?1 AND date(created_at) = ?2 AND status = 'completed'",
        )
        .bind(cashier_id)
        .bind(today.to_string())
        .fetch_one(&self.pool)
        .await?;

        let items_sold: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(s.quantity), 0) \
             FROM sales s \
             JOIN transactions t ON t.id = s.transaction_id \
             WHERE t.cashier_id = ?1 AND date(t.created_at) = ?2 AND t.status = 'completed'",
        )
        .bind(cashier_id)
        .bind(today.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(CashierDaySummary {
            transaction_count,
            revenue_cents,
            items_sold,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
