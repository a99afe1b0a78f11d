//! # Checkout Engine
//!
//! The only writer of transactions, sale lines, and stock decrements.
//!
//! ## Commit Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                          │
//! │    1. Re-validate every cart line against CURRENT stock         │
//! │       (cart availability checks were advisory only)             │
//! │    2. INSERT the transaction row (totals from the cart)         │
//! │    3. Per line: INSERT the sale row, then the conditional       │
//! │       decrement                                                 │
//! │         UPDATE products                                         │
//! │         SET stock_quantity = stock_quantity - ?n                │
//! │         WHERE id = ?id AND stock_quantity >= ?n                 │
//! │       rows_affected == 0 → a concurrent commit won the race →   │
//! │       abort everything                                          │
//! │  COMMIT                                                         │
//! │                                                                 │
//! │  Any early return drops the transaction guard → ROLLBACK.       │
//! │  The cart is cleared only after COMMIT succeeds; on failure     │
//! │  the cashier still has it, to amend and retry.                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The double check (step 1 and the step-3 guard) is not redundant:
//! step 1 produces a precise error naming the product before any row is
//! written; the step-3 guard catches commits that interleave after
//! step 1 read the stock.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::ProductRepository;
use pos_core::{
    Cart, CoreError, PaymentMethod, SaleLine, Transaction, TransactionStatus,
};

// =============================================================================
// Receipt
// =============================================================================

/// One line of a receipt: the stored sale joined with the product's
/// current code and name for display.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReceiptLine {
    pub id: String,
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    /// Unit price at sale time, not the product's current price.
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// A committed transaction with its sale lines, ready for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction: Transaction,
    pub lines: Vec<ReceiptLine>,
}

// =============================================================================
// Checkout Engine
// =============================================================================

/// Commits carts into the ledger, atomically.
#[derive(Debug, Clone)]
pub struct CheckoutEngine {
    pool: SqlitePool,
}

impl CheckoutEngine {
    /// Creates a new CheckoutEngine.
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutEngine { pool }
    }

    /// Commits the cart as one sale.
    ///
    /// All-or-nothing: either the transaction row, every sale line, and
    /// every stock decrement land together, or the database is left
    /// exactly as it was. On success the cart is cleared and the receipt
    /// returned; on any failure the cart is left intact.
    pub async fn commit(
        &self,
        cart: &mut Cart,
        cashier_id: &str,
        payment_method: PaymentMethod,
    ) -> DbResult<Receipt> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let totals = cart.totals();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        // Authoritative re-validation against current stock. The numbers
        // the cart showed the cashier may be stale by now.
        for line in cart.lines() {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                    .bind(&line.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            let available = match current {
                Some(stock) => stock,
                None => return Err(DbError::not_found("Product", &line.code)),
            };

            if available < line.quantity {
                warn!(
                    code = %line.code,
                    available,
                    requested = line.quantity,
                    "Checkout aborted: insufficient stock"
                );
                return Err(CoreError::InsufficientStock {
                    code: line.code.clone(),
                    available,
                    requested: line.quantity,
                }
                .into());
            }
        }

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            cashier_id: cashier_id.to_string(),
            subtotal_cents: totals.subtotal_cents,
            vat_cents: totals.vat_cents,
            grand_total_cents: totals.grand_total_cents,
            payment_method,
            status: TransactionStatus::Completed,
            created_at: now,
        };

        sqlx::query(
            "INSERT INTO transactions \
             (id, cashier_id, subtotal_cents, vat_cents, grand_total_cents, \
              payment_method, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&transaction.id)
        .bind(&transaction.cashier_id)
        .bind(transaction.subtotal_cents)
        .bind(transaction.vat_cents)
        .bind(transaction.grand_total_cents)
        .bind(transaction.payment_method)
        .bind(transaction.status)
        .bind(transaction.created_at)
        .execute(&mut *tx)
        .await?;

        let mut receipt_lines = Vec::with_capacity(cart.line_count());

        for line in cart.lines() {
            let sale = SaleLine {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction.id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                line_total_cents: line.line_total_cents(),
                created_at: now,
            };

            sqlx::query(
                "INSERT INTO sales \
                 (id, transaction_id, product_id, quantity, unit_price_cents, \
                  line_total_cents, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&sale.id)
            .bind(&sale.transaction_id)
            .bind(&sale.product_id)
            .bind(sale.quantity)
            .bind(sale.unit_price_cents)
            .bind(sale.line_total_cents)
            .bind(sale.created_at)
            .execute(&mut *tx)
            .await?;

            let decremented =
                ProductRepository::decrement_stock(&mut *tx, &line.product_id, line.quantity, now)
                    .await?;

            if !decremented {
                // A concurrent commit took the stock between our
                // re-validation and this decrement.
                let available: i64 =
                    sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                        .bind(&line.product_id)
                        .fetch_one(&mut *tx)
                        .await?;

                warn!(
                    code = %line.code,
                    available,
                    requested = line.quantity,
                    "Checkout aborted: stock taken by concurrent sale"
                );
                return Err(CoreError::InsufficientStock {
                    code: line.code.clone(),
                    available,
                    requested: line.quantity,
                }
                .into());
            }

            receipt_lines.push(ReceiptLine {
                id: sale.id,
                product_id: sale.product_id,
                product_code: line.code.clone(),
                product_name: line.name.clone(),
                quantity: sale.quantity,
                unit_price_cents: sale.unit_price_cents,
                line_total_cents: sale.line_total_cents,
            });
        }

        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            cashier_id = %cashier_id,
            lines = receipt_lines.len(),
            grand_total_cents = transaction.grand_total_cents,
            "Checkout committed"
        );

        cart.clear();

        Ok(Receipt {
            transaction,
            lines: receipt_lines,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use pos_core::Role;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_cashier(db: &Database) -> String {
        db.users()
            .create("Thandi", "thandi@example.com", "hash", Role::Staff)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_commit_happy_path() {
        let db = test_db().await;
        let cashier_id = seed_cashier(&db).await;
        let product = db
            .products()
            .create("COCOLA-500", "Coca-Cola 500ml", "Beverages", 1299, 25)
            .await
            .unwrap();

        let mut cart = Cart::new();
        cart.add(&product, 3).unwrap();

        let receipt = db
            .checkout()
            .commit(&mut cart, &cashier_id, PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(receipt.transaction.subtotal_cents, 3897);
        assert_eq!(receipt.transaction.vat_cents, 585);
        assert_eq!(receipt.transaction.grand_total_cents, 4482);
        assert_eq!(receipt.transaction.status, TransactionStatus::Completed);
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.lines[0].quantity, 3);

        // stock decremented, cart emptied
        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 22);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_commit_empty_cart_rejected() {
        let db = test_db().await;
        let cashier_id = seed_cashier(&db).await;

        let mut cart = Cart::new();
        let err = db
            .checkout()
            .commit(&mut cart, &cashier_id, PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_price_frozen_at_add_time() {
        let db = test_db().await;
        let cashier_id = seed_cashier(&db).await;
        let product = db
            .products()
            .create("COCOLA-500", "Coca-Cola 500ml", "Beverages", 1299, 25)
            .await
            .unwrap();

        let mut cart = Cart::new();
        cart.add(&product, 2).unwrap();

        // Price rises after the item was rung up.
        db.products()
            .update(
                &product.id,
                &product.code,
                &product.name,
                &product.category,
                1499,
                product.stock_quantity,
            )
            .await
            .unwrap();

        let receipt = db
            .checkout()
            .commit(&mut cart, &cashier_id, PaymentMethod::Card)
            .await
            .unwrap();

        assert_eq!(receipt.lines[0].unit_price_cents, 1299);
        assert_eq!(receipt.transaction.subtotal_cents, 2598);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_trace() {
        let db = test_db().await;
        let cashier_id = seed_cashier(&db).await;
        let cola = db
            .products()
            .create("COCOLA-500", "Coca-Cola 500ml", "Beverages", 1299, 25)
            .await
            .unwrap();
        let chips = db
            .products()
            .create("CHIPS-120", "Salted Chips 120g", "Snacks", 899, 4)
            .await
            .unwrap();

        let mut cart = Cart::new();
        cart.add(&cola, 2).unwrap();
        cart.add(&chips, 4).unwrap();

        // Stock drains under the cart before checkout.
        db.products()
            .update(
                &chips.id,
                &chips.code,
                &chips.name,
                &chips.category,
                chips.price_cents,
                2,
            )
            .await
            .unwrap();

        let err = db
            .checkout()
            .commit(&mut cart, &cashier_id, PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock {
                available: 2,
                requested: 4,
                ..
            })
        ));

        // No rows written, no stock touched, cart intact for amendment.
        let tx_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let sale_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(tx_count, 0);
        assert_eq!(sale_count, 0);

        let cola_after = db.products().get_by_id(&cola.id).await.unwrap().unwrap();
        assert_eq!(cola_after.stock_quantity, 25);

        assert_eq!(cart.line_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_commits_for_last_units() {
        let db = test_db().await;
        let cashier_id = seed_cashier(&db).await;
        let product = db
            .products()
            .create("COCOLA-500", "Coca-Cola 500ml", "Beverages", 1299, 5)
            .await
            .unwrap();

        let mut cart_a = Cart::new();
        cart_a.add(&product, 5).unwrap();
        let mut cart_b = Cart::new();
        cart_b.add(&product, 5).unwrap();

        let engine_a = db.checkout();
        let engine_b = db.checkout();
        let (a, b) = tokio::join!(
            engine_a.commit(&mut cart_a, &cashier_id, PaymentMethod::Cash),
            engine_b.commit(&mut cart_b, &cashier_id, PaymentMethod::Card),
        );

        // Exactly one commit wins the last 5 units, and the loser sees
        // insufficient stock with refreshed numbers, never a panic or a
        // partial write.
        assert_eq!(
            a.is_ok() as u8 + b.is_ok() as u8,
            1,
            "exactly one of the racing commits must succeed"
        );
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(
            loser.unwrap_err(),
            DbError::Core(CoreError::InsufficientStock {
                available: 0,
                requested: 5,
                ..
            })
        ));

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 0);

        let tx_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(tx_count, 1);
    }

    #[tokio::test]
    async fn test_racing_commits_across_connections() {
        // File-backed pool with two connections, so the two commits run
        // in genuinely separate transactions instead of serializing on
        // a single shared connection.
        let path = std::env::temp_dir().join(format!("pos-race-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(2))
            .await
            .unwrap();

        let cashier_id = seed_cashier(&db).await;
        let product = db
            .products()
            .create("COCOLA-500", "Coca-Cola 500ml", "Beverages", 1299, 5)
            .await
            .unwrap();

        let mut cart_a = Cart::new();
        cart_a.add(&product, 5).unwrap();
        let mut cart_b = Cart::new();
        cart_b.add(&product, 5).unwrap();

        let engine_a = db.checkout();
        let engine_b = db.checkout();
        let (a, b) = tokio::join!(
            engine_a.commit(&mut cart_a, &cashier_id, PaymentMethod::Cash),
            engine_b.commit(&mut cart_b, &cashier_id, PaymentMethod::Card),
        );

        assert_eq!(
            a.is_ok() as u8 + b.is_ok() as u8,
            1,
            "exactly one of the racing commits must succeed"
        );

        // Depending on interleaving the loser fails the stock re-check
        // or hits SQLite's writer conflict while the winner holds the
        // write lock. Both roll back cleanly; nothing else is allowed.
        let loser = if a.is_err() { a } else { b };
        match loser.unwrap_err() {
            DbError::Core(CoreError::InsufficientStock { .. }) | DbError::Conflict(_) => {}
            other => panic!("unexpected loser error: {other:?}"),
        }

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 0);

        let tx_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(tx_count, 1);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
